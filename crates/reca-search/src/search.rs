//! Bounded-beam level search over the model lattice.
//!
//! Each level expands every model in the beam through the configured
//! neighborhood, scores the merged candidate set, and keeps the best
//! `width`. The returned ranking covers every candidate evaluated across
//! all levels, deduplicated by print name.

use crate::events::{EventHandler, SearchEvent};
use crate::limit::Limit;
use crate::neighbors::{NeighborKind, Neighborhood};
use crate::statistic::Statistic;
use reca_core::executor::Executor;
use reca_core::manager::VbManager;
use reca_core::model::Model;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Beam width: models carried to the next level.
    pub width: usize,
    pub max_levels: usize,
    pub statistic: Statistic,
    pub kind: NeighborKind,
    /// Wall-clock budget, checked between levels.
    pub deadline: Option<Duration>,
    /// Evaluation budget, checked between levels.
    pub max_models: Option<usize>,
    pub executor: Executor,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            width: 3,
            max_levels: 7,
            statistic: Statistic::default(),
            kind: NeighborKind::default(),
            deadline: None,
            max_models: None,
            executor: Executor::Serial,
        }
    }
}

impl SearchConfig {
    /// Fold a [Limit] into the configuration.
    pub fn with_limit(mut self, limit: Limit) -> Self {
        match limit {
            Limit::Levels(levels) => self.max_levels = levels,
            Limit::Seconds(seconds) => self.deadline = Some(Duration::from_secs_f64(seconds)),
            Limit::Models(models) => self.max_models = Some(models),
        }
        self
    }
}

/// One scored model from a search.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchCandidate {
    pub model: Arc<Model>,
    pub print_name: String,
    pub statistic: f64,
    /// The level the candidate first appeared at.
    pub level: usize,
}

pub struct LevelSearch {
    config: SearchConfig,
    handlers: Vec<Box<dyn EventHandler>>,
    cancel: Arc<AtomicBool>,
}

impl LevelSearch {
    pub fn new(config: SearchConfig) -> Self {
        LevelSearch {
            config,
            handlers: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn on_event(&mut self, handler: impl EventHandler + 'static) -> &mut Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// A flag the caller can set from another thread to stop the search at
    /// the next level boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the search from `seed`, returning every candidate evaluated,
    /// best first. Parallel and sequential execution produce identical
    /// rankings: workers fork cache-empty managers over the shared input
    /// and the merged results are deduplicated and sorted deterministically.
    pub fn run(&mut self, manager: &mut VbManager, seed: &Model) -> Vec<SearchCandidate> {
        let statistic = self.config.statistic;
        let kind = self.config.kind;
        let direction = manager.direction();
        let started = Instant::now();

        self.emit(SearchEvent::Started {
            total_levels: self.config.max_levels,
            statistic_name: statistic.name(),
        });

        let mut beam: Vec<Arc<Model>> = vec![manager.intern_model(seed.clone())];
        let mut ranked: BTreeMap<String, SearchCandidate> = BTreeMap::new();
        let mut evaluated = 0usize;
        let mut levels_run = 0usize;

        for level in 1..=self.config.max_levels {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
            if self
                .config
                .deadline
                .is_some_and(|deadline| started.elapsed() >= deadline)
            {
                break;
            }
            if self
                .config
                .max_models
                .is_some_and(|cap| evaluated >= cap)
            {
                break;
            }

            let scored = self.expand_beam(manager, &beam, kind, statistic, direction);
            if scored.is_empty() {
                break;
            }
            levels_run = level;

            // merge, dedup by name, keep first-seen levels
            let mut level_candidates: BTreeMap<String, (Arc<Model>, f64)> = BTreeMap::new();
            for (model, name, value) in scored {
                evaluated += 1;
                level_candidates.entry(name).or_insert((model, value));
            }

            let mut ordered: Vec<(&String, &(Arc<Model>, f64))> = level_candidates.iter().collect();
            sort_ranked(&mut ordered, statistic);

            beam = ordered
                .iter()
                .take(self.config.width)
                .map(|(_, (model, _))| Arc::clone(model))
                .collect();

            for (name, (model, value)) in &level_candidates {
                ranked
                    .entry(name.clone())
                    .or_insert_with(|| SearchCandidate {
                        model: Arc::clone(model),
                        print_name: name.clone(),
                        statistic: *value,
                        level,
                    });
            }

            let (best_name, best_statistic) = ordered
                .first()
                .map(|(name, (_, value))| ((*name).clone(), *value))
                .expect("non-empty level");
            info!(
                "Level {:<3} | {} models | best {} = {:.4} ({})",
                level,
                level_candidates.len(),
                statistic.name(),
                best_statistic,
                best_name
            );
            self.emit(SearchEvent::Level {
                current_level: level,
                total_levels: self.config.max_levels,
                models_evaluated: evaluated,
                best_name,
                best_statistic,
            });
        }

        let mut results: Vec<SearchCandidate> = ranked.into_values().collect();
        results.sort_by(|a, b| {
            let ordering = if statistic.lower_is_better() {
                a.statistic.total_cmp(&b.statistic)
            } else {
                b.statistic.total_cmp(&a.statistic)
            };
            ordering.then_with(|| a.print_name.cmp(&b.print_name))
        });

        let (best_name, best_statistic) = results
            .first()
            .map(|c| (c.print_name.clone(), c.statistic))
            .unwrap_or_default();
        self.emit(SearchEvent::Complete {
            levels_run,
            models_evaluated: evaluated,
            best_name,
            best_statistic,
        });
        results
    }

    /// Generate and score the neighbors of every beam model. One task per
    /// seed; the worker pool gets isolated managers.
    fn expand_beam(
        &self,
        manager: &mut VbManager,
        beam: &[Arc<Model>],
        kind: NeighborKind,
        statistic: Statistic,
        direction: reca_core::manager::Direction,
    ) -> Vec<(Arc<Model>, String, f64)> {
        #[cfg(feature = "rayon")]
        if matches!(self.config.executor, Executor::WorkerPool) {
            let jobs: Vec<_> = beam
                .iter()
                .map(|seed| {
                    let mut worker = manager.fork();
                    let seed = Arc::clone(seed);
                    move || {
                        let generator = kind.generator();
                        let mut scored = Vec::new();
                        for candidate in
                            generator.neighbors(worker.variable_list(), &seed, direction)
                        {
                            let name = candidate.print_name(worker.variable_list());
                            let value = statistic.evaluate(&mut worker, &candidate);
                            scored.push((Arc::new(candidate), name, value));
                        }
                        scored
                    }
                })
                .collect();
            return self
                .config
                .executor
                .execute_batch(jobs)
                .into_iter()
                .flatten()
                .collect();
        }

        let generator = kind.generator();
        let mut scored = Vec::new();
        for seed in beam {
            for candidate in generator.neighbors(manager.variable_list(), seed, direction) {
                let model = manager.intern_model(candidate);
                let name = model.print_name(manager.variable_list());
                let value = statistic.evaluate(manager, &model);
                scored.push((model, name, value));
            }
        }
        scored
    }

    fn emit(&mut self, event: SearchEvent) {
        for handler in &mut self.handlers {
            handler.handle(&event);
        }
    }
}

fn sort_ranked(ordered: &mut [(&String, &(Arc<Model>, f64))], statistic: Statistic) {
    ordered.sort_by(|a, b| {
        let ordering = if statistic.lower_is_better() {
            a.1.1.total_cmp(&b.1.1)
        } else {
            b.1.1.total_cmp(&a.1.1)
        };
        ordering.then_with(|| a.0.cmp(b.0))
    });
}

/// One-level neighbor expansion in the manager's current direction, for
/// callers that drive the lattice themselves.
pub trait SearchExt {
    fn search_one_level(&mut self, model: &Model) -> Vec<Model>;
}

impl SearchExt for VbManager {
    fn search_one_level(&mut self, model: &Model) -> Vec<Model> {
        let vars = Arc::clone(self.variable_list());
        crate::neighbors::Loopless.neighbors(&vars, model, self.direction())
    }
}
