use reca_core::manager::VbManager;
use reca_core::model::Model;

/// The score a level search ranks candidates by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Statistic {
    #[default]
    Aic,
    Bic,
    DeltaDf,
}

impl Statistic {
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Aic => "aic",
            Statistic::Bic => "bic",
            Statistic::DeltaDf => "ddf",
        }
    }

    /// True when lower values rank first. Information criteria are
    /// minimized; ΔDF is maximized.
    pub fn lower_is_better(&self) -> bool {
        matches!(self, Statistic::Aic | Statistic::Bic)
    }

    pub fn evaluate(&self, manager: &mut VbManager, model: &Model) -> f64 {
        match self {
            Statistic::Aic => manager.compute_aic(model),
            Statistic::Bic => manager.compute_bic(model),
            Statistic::DeltaDf => manager.compute_ddf(model) as f64,
        }
    }
}
