use crate::infer::{BpConfig, Ipf, IpfConfig, joint_table, propagate};
use crate::junction::build_junction_tree;
use crate::model::{Model, model_df};
use crate::relation::Relation;
use crate::stats::{chi_squared_p_value, entropy, likelihood_ratio};
use crate::table::ContingencyTable;
use crate::types::VariableIndex;
use crate::variable::VariableList;
use hashbrown::HashMap;
use reca_error::RecaResult;
use std::sync::Arc;

/// Which way the lattice search moves from its seed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Summary statistics of one fitted model.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitResult {
    pub model_name: String,
    pub has_loops: bool,
    /// Entropy of the fitted distribution, bits.
    pub h: f64,
    /// Transmission: `h - h(data)`, bits.
    pub t: f64,
    pub lr: f64,
    pub df: i64,
    /// `df(top) - df(model)`.
    pub ddf: i64,
    pub aic: f64,
    pub bic: f64,
    /// Upper-tail p-value of `lr` with `ddf` degrees of freedom.
    pub alpha: f64,
    pub ipf_iterations: Option<usize>,
    pub converged: Option<bool>,
}

/// Outcome of a best-effort reference-model validation.
#[derive(Clone, Debug)]
pub struct ModelValidation {
    pub valid: bool,
    pub error: Option<String>,
    pub model: Option<Arc<Model>>,
}

#[derive(Clone)]
struct FitEntry {
    table: Arc<ContingencyTable>,
    ipf_iterations: Option<usize>,
    ipf_converged: Option<bool>,
}

/// The variable-based manager: owns the normalized input distribution and
/// the read-side caches every fit and search step goes through.
///
/// Caches are build-up only and keyed canonically (comma-joined sorted
/// indices for relations, print names for models), so any two spellings of
/// the same structure share one entry. A manager is single-owner-mutable;
/// parallel search gives each worker its own [VbManager::fork] over the
/// shared `(variable list, input)` pair, which keeps results deterministic
/// without any locking.
pub struct VbManager {
    vars: Arc<VariableList>,
    input: Arc<ContingencyTable>,
    sample_size: f64,
    h_data: f64,
    direction: Direction,
    ipf_config: IpfConfig,
    relations: HashMap<String, Arc<Relation>>,
    projections: HashMap<String, Arc<ContingencyTable>>,
    models: HashMap<String, Arc<Model>>,
    fits: HashMap<String, FitEntry>,
    h_cache: HashMap<String, f64>,
}

impl VbManager {
    /// Build a manager over a raw frequency table. The table is sorted,
    /// collapsed and normalized; its original total becomes the sample
    /// size.
    pub fn new(vars: Arc<VariableList>, counts: &ContingencyTable) -> Self {
        let mut input = counts.clone();
        input.sort();
        input.sum_into();
        let sample_size = input.sum();
        input.normalize();
        let h_data = entropy(&input);

        VbManager {
            vars,
            input: Arc::new(input),
            sample_size,
            h_data,
            direction: Direction::default(),
            ipf_config: IpfConfig::default(),
            relations: HashMap::new(),
            projections: HashMap::new(),
            models: HashMap::new(),
            fits: HashMap::new(),
            h_cache: HashMap::new(),
        }
    }

    /// A cache-empty manager over the same shared input, for worker tasks.
    pub fn fork(&self) -> VbManager {
        VbManager {
            vars: Arc::clone(&self.vars),
            input: Arc::clone(&self.input),
            sample_size: self.sample_size,
            h_data: self.h_data,
            direction: self.direction,
            ipf_config: self.ipf_config.clone(),
            relations: HashMap::new(),
            projections: HashMap::new(),
            models: HashMap::new(),
            fits: HashMap::new(),
            h_cache: HashMap::new(),
        }
    }

    pub fn variable_list(&self) -> &Arc<VariableList> {
        &self.vars
    }

    /// The normalized input distribution.
    pub fn input_table(&self) -> &Arc<ContingencyTable> {
        &self.input
    }

    pub fn sample_size(&self) -> f64 {
        self.sample_size
    }

    /// Entropy of the input distribution (the saturated reference), bits.
    pub fn data_h(&self) -> f64 {
        self.h_data
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn ipf_config(&self) -> &IpfConfig {
        &self.ipf_config
    }

    pub fn set_ipf_config(&mut self, config: IpfConfig) {
        self.ipf_config = config;
    }

    /// Canonical relation over `indices`, created on first use.
    pub fn get_relation(&mut self, indices: &[VariableIndex]) -> Arc<Relation> {
        let relation = Relation::new(indices.to_vec());
        let key = relation.cache_key();
        Arc::clone(
            self.relations
                .entry(key)
                .or_insert_with(|| Arc::new(relation)),
        )
    }

    /// Projection of the input onto `relation`, computed once and attached
    /// to the relation cache.
    pub fn projection(&mut self, relation: &Relation) -> Arc<ContingencyTable> {
        let key = relation.cache_key();
        if let Some(table) = self.projections.get(&key) {
            return Arc::clone(table);
        }
        let table = Arc::new(self.input.project(&self.vars, relation));
        self.relations
            .entry(key.clone())
            .or_insert_with(|| Arc::new(relation.clone()));
        self.projections.insert(key, Arc::clone(&table));
        table
    }

    /// Parse a model spec against the variable list. Empty and
    /// whitespace-only specs mean the default reference model for the
    /// current direction: the bottom when ascending, the top when
    /// descending.
    pub fn make_model(&mut self, spec: &str) -> RecaResult<Arc<Model>> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Ok(match self.direction {
                Direction::Ascending => self.bottom_ref_model(),
                Direction::Descending => self.top_ref_model(),
            });
        }
        let model = Model::parse(trimmed, &self.vars)?;
        Ok(self.intern_model(model))
    }

    pub fn top_ref_model(&mut self) -> Arc<Model> {
        let model = Model::top_reference(&self.vars);
        self.intern_model(model)
    }

    pub fn bottom_ref_model(&mut self) -> Arc<Model> {
        let model = Model::bottom_reference(&self.vars);
        self.intern_model(model)
    }

    /// Cache a model under its print name.
    pub fn intern_model(&mut self, model: Model) -> Arc<Model> {
        let name = model.print_name(&self.vars);
        Arc::clone(self.models.entry(name).or_insert_with(|| Arc::new(model)))
    }

    /// Best-effort validation of a reference-model spec, collecting every
    /// offending token instead of stopping at the first.
    pub fn validate_reference_model(&mut self, spec: &str) -> ModelValidation {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            let model = match self.direction {
                Direction::Ascending => self.bottom_ref_model(),
                Direction::Descending => self.top_ref_model(),
            };
            return ModelValidation {
                valid: true,
                error: None,
                model: Some(model),
            };
        }

        let mut problems = Vec::new();
        for group in trimmed.split(':') {
            let group = group.trim();
            if group.is_empty() {
                problems.push("empty relation group".to_string());
                continue;
            }
            for ch in group.chars() {
                if self.vars.by_abbrev(&ch.to_string()).is_none() {
                    problems.push(format!("unknown abbreviation '{}'", ch));
                }
            }
        }

        if problems.is_empty() {
            match self.make_model(trimmed) {
                Ok(model) => ModelValidation {
                    valid: true,
                    error: None,
                    model: Some(model),
                },
                Err(e) => ModelValidation {
                    valid: false,
                    error: Some(e.to_string()),
                    model: None,
                },
            }
        } else {
            ModelValidation {
                valid: false,
                error: Some(problems.join("; ")),
                model: None,
            }
        }
    }

    /// Entropy of the model's maximum-entropy fit, bits.
    ///
    /// Decomposable models use the junction-tree closed form
    /// `sum H(clique) - sum H(separator)` over cached projections, plus one
    /// uniform contribution of `log2(c)` per uncovered variable; models
    /// with loops are fitted by IPF first. Fits of models that do not cover
    /// every variable spread the uncovered axes uniformly on both paths, so
    /// the two entropies agree wherever both apply.
    pub fn compute_h(&mut self, model: &Model) -> f64 {
        let name = model.print_name(&self.vars);
        if let Some(&h) = self.h_cache.get(&name) {
            return h;
        }

        let h = if model.is_empty() {
            0.0
        } else {
            let build = build_junction_tree(model, &self.vars);
            if build.valid {
                let tree = build.tree.expect("valid build carries a tree");
                let mut h = 0.0;
                for clique in tree.cliques().to_vec() {
                    let projected = self.projection(&clique);
                    h += entropy(&projected);
                }
                for edge in tree.edges().to_vec() {
                    let projected = self.projection(&edge.separator);
                    h -= entropy(&projected);
                }
                h + self.uncovered_bits(model)
            } else {
                let entry = self.fit_entry(model);
                entropy(&entry.table)
            }
        };
        self.h_cache.insert(name, h);
        h
    }

    /// Model degrees of freedom by inclusion-exclusion.
    pub fn compute_df(&self, model: &Model) -> i64 {
        model_df(model, &self.vars)
    }

    /// `df(top) - df(model)`.
    pub fn compute_ddf(&mut self, model: &Model) -> i64 {
        let top = self.top_ref_model();
        self.compute_df(&top) - self.compute_df(model)
    }

    pub fn compute_lr(&mut self, model: &Model) -> f64 {
        let h = self.compute_h(model);
        likelihood_ratio(self.sample_size, h, self.h_data)
    }

    pub fn compute_aic(&mut self, model: &Model) -> f64 {
        crate::stats::aic(self.compute_lr(model), self.compute_ddf(model))
    }

    pub fn compute_bic(&mut self, model: &Model) -> f64 {
        crate::stats::bic(
            self.compute_lr(model),
            self.compute_ddf(model),
            self.sample_size,
        )
    }

    /// The fitted distribution over the full state space.
    pub fn make_fit_table(&mut self, model: &Model) -> Arc<ContingencyTable> {
        Arc::clone(&self.fit_entry(model).table)
    }

    /// Cell-wise `input - fit` over the union of populated cells.
    pub fn compute_residuals(&mut self, model: &Model) -> ContingencyTable {
        let fit = self.make_fit_table(model);
        self.input.subtract(&fit)
    }

    /// Fit a model and assemble its full statistic summary.
    pub fn fit_model(&mut self, model: &Model) -> FitResult {
        let name = model.print_name(&self.vars);
        let has_loops = model.has_loops(&self.vars);
        let h = self.compute_h(model);
        let t = h - self.h_data;
        let lr = likelihood_ratio(self.sample_size, h, self.h_data);
        let df = self.compute_df(model);
        let ddf = self.compute_ddf(model);
        let alpha = if ddf > 0 {
            chi_squared_p_value(lr, ddf as f64)
        } else {
            1.0
        };

        let (ipf_iterations, converged) = if has_loops {
            let entry = self.fit_entry(model);
            (entry.ipf_iterations, entry.ipf_converged)
        } else {
            (None, None)
        };

        FitResult {
            model_name: name,
            has_loops,
            h,
            t,
            lr,
            df,
            ddf,
            aic: crate::stats::aic(lr, ddf),
            bic: crate::stats::bic(lr, ddf, self.sample_size),
            alpha,
            ipf_iterations,
            converged,
        }
    }

    fn uncovered_bits(&self, model: &Model) -> f64 {
        let covered = model.covered_vars();
        self.vars
            .indices()
            .filter(|v| !covered.contains(*v))
            .map(|v| (self.vars.var(v).cardinality().get() as f64).log2())
            .sum()
    }

    fn fit_entry(&mut self, model: &Model) -> FitEntry {
        let name = model.print_name(&self.vars);
        if let Some(entry) = self.fits.get(&name) {
            return entry.clone();
        }

        let build = build_junction_tree(model, &self.vars);
        let entry = if build.valid && !model.is_empty() {
            let tree = build.tree.expect("valid build carries a tree");
            let result = propagate(&self.input, &self.vars, &tree, BpConfig::default());
            let joint = joint_table(&result, &tree, &self.vars);
            FitEntry {
                table: Arc::new(joint),
                ipf_iterations: None,
                ipf_converged: None,
            }
        } else {
            let ipf = Ipf::new(self.ipf_config.clone());
            let result = ipf.fit(&self.input, &self.vars, model.relations(), None);
            FitEntry {
                table: Arc::new(result.fit_table),
                ipf_iterations: Some(result.iterations),
                ipf_converged: Some(result.converged),
            }
        };
        self.fits.insert(name, entry.clone());
        entry
    }
}
