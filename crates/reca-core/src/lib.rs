pub mod executor;
pub mod infer;
pub mod junction;
pub mod key;
pub mod manager;
pub mod model;
pub mod relation;
pub mod stats;
pub mod table;
pub mod types;
pub mod variable;

pub use executor::Executor;
pub use infer::{BpConfig, BpResult, Ipf, IpfConfig, IpfResult, joint_table, marginal_of, propagate};
pub use junction::{JunctionTree, JunctionTreeBuild, TreeEdge, build_junction_tree};
pub use key::{Key, StateIter};
pub use manager::{Direction, FitResult, ModelValidation, VbManager};
pub use model::{Model, model_df, simplify_relations};
pub use relation::Relation;
pub use table::ContingencyTable;
pub use types::{BitShift, Cardinality, KeySegment, SEGMENT_BITS, SegmentIndex, VariableIndex};
pub use variable::{Variable, VariableList};

pub mod prelude {
    pub use super::executor::Executor;
    pub use super::infer::{BpConfig, Ipf, IpfConfig, IpfResult};
    pub use super::junction::build_junction_tree;
    pub use super::key::Key;
    pub use super::manager::{Direction, FitResult, VbManager};
    pub use super::model::Model;
    pub use super::relation::Relation;
    pub use super::stats::{aic, bic, entropy, likelihood_ratio};
    pub use super::table::ContingencyTable;
    pub use super::types::VariableIndex;
    pub use super::variable::{Variable, VariableList};
}
