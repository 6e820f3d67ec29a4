//! Iterative proportional fitting: the maximum-entropy distribution whose
//! marginals match the input's projections onto each constraint relation.

use crate::key::{Key, StateIter};
use crate::relation::Relation;
use crate::table::ContingencyTable;
use crate::variable::VariableList;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const ZERO_EPS: f64 = 1e-300;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IpfConfig {
    pub max_iterations: usize,
    /// Convergence threshold on the largest absolute marginal error after a
    /// full sweep, in probability units.
    pub threshold: f64,
    /// Start from the input table instead of the uniform distribution. Both
    /// converge to the same fit on consistent constraints; the uniform seed
    /// also spreads variables no constraint covers evenly.
    pub seed_with_input: bool,
    pub record_iteration_times: bool,
}

impl Default for IpfConfig {
    fn default() -> Self {
        IpfConfig {
            max_iterations: 266,
            threshold: 1e-9,
            seed_with_input: false,
            record_iteration_times: false,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IpfResult {
    pub fit_table: ContingencyTable,
    pub iterations: usize,
    pub converged: bool,
    pub error: f64,
    pub error_history: Vec<f64>,
    pub iteration_times: Option<Vec<Duration>>,
}

pub struct Ipf {
    config: IpfConfig,
}

impl Ipf {
    pub fn new(config: IpfConfig) -> Self {
        Ipf { config }
    }

    pub fn config(&self) -> &IpfConfig {
        &self.config
    }

    /// Fit `input`'s marginals over `relations`, sweeping the constraints in
    /// their given order until the largest marginal error drops below the
    /// threshold or the iteration budget runs out. A best-effort table is
    /// returned either way, with `converged` telling them apart.
    ///
    /// `cancel` is polled between sweeps.
    pub fn fit(
        &self,
        input: &ContingencyTable,
        vars: &VariableList,
        relations: &[Relation],
        cancel: Option<&AtomicBool>,
    ) -> IpfResult {
        let targets: Vec<ContingencyTable> = relations
            .iter()
            .map(|r| input.project(vars, r))
            .collect();
        let masks: Vec<Key> = relations.iter().map(|r| r.build_mask(vars)).collect();

        let mut fit = if self.config.seed_with_input {
            input.clone()
        } else {
            uniform_table(vars)
        };

        let mut error = f64::INFINITY;
        let mut error_history = Vec::new();
        let mut iteration_times = self
            .config
            .record_iteration_times
            .then(Vec::new);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            let started = Instant::now();
            iterations += 1;

            for ((relation, target), mask) in relations.iter().zip(&targets).zip(&masks) {
                let current = fit.project(vars, relation);
                fit.map_values(|key, value| {
                    let slot = key.apply_mask(mask);
                    let denominator = current.value(&slot);
                    if denominator.abs() > ZERO_EPS {
                        value * target.value(&slot) / denominator
                    } else {
                        0.0
                    }
                });
            }

            error = relations
                .iter()
                .zip(&targets)
                .map(|(relation, target)| target.max_abs_difference(&fit.project(vars, relation)))
                .fold(0.0f64, f64::max);
            error_history.push(error);
            if let Some(times) = iteration_times.as_mut() {
                times.push(started.elapsed());
            }

            if error < self.config.threshold {
                converged = true;
                break;
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break;
            }
        }

        IpfResult {
            fit_table: fit,
            iterations,
            converged,
            error,
            error_history,
            iteration_times,
        }
    }
}

/// The uniform distribution over the full state space.
fn uniform_table(vars: &VariableList) -> ContingencyTable {
    let states = vars.state_space() as f64;
    let mut table = ContingencyTable::with_capacity(vars.key_size(), states as usize);
    for key in StateIter::new(vars) {
        table.add(key, 1.0 / states);
    }
    table
}
