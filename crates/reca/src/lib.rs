//! Reconstructability analysis of discrete multivariate data.
//!
//! Given a contingency table over categorical variables, `reca` fits and
//! scores structural models — hypergraphs of variable subsets whose
//! marginals constrain a factorized distribution — and searches the model
//! lattice for the sparse decompositions that explain the data best under
//! an information-criterion penalty.
//!
//! ```rust
//! use reca::prelude::*;
//! use std::sync::Arc;
//!
//! let mut vars = VariableList::new();
//! vars.register("rain", "r", 2, false).unwrap();
//! vars.register("sprinkler", "s", 2, false).unwrap();
//! vars.register("wet", "w", 2, true).unwrap();
//!
//! let vars = Arc::new(vars);
//! let counts = ContingencyTable::from_rows(
//!     &vars,
//!     [
//!         (&[0usize, 0, 0][..], 40.0),
//!         (&[0, 1, 1][..], 22.0),
//!         (&[1, 0, 1][..], 27.0),
//!         (&[1, 1, 1][..], 11.0),
//!     ],
//! );
//!
//! let mut manager = VbManager::new(vars, &counts);
//! let model = manager.make_model("RW:SW").unwrap();
//! let fit = manager.fit_model(&model);
//! assert!(fit.h >= manager.data_h());
//! ```

pub use reca_core::*;
pub use reca_error::{ErrorCode, RecaError, RecaResult, ensure, reca_bail, reca_err};
pub use reca_search::{
    Disjoint, EventHandler, Full, Lattice, LatticeEntry, LevelSearch, Limit, Loopless,
    NeighborKind, Neighborhood, SearchCandidate, SearchConfig, SearchEvent, SearchExt, Statistic,
    init_logging,
};

pub mod prelude {
    pub use reca_core::prelude::*;
    pub use reca_error::{RecaError, RecaResult};
    pub use reca_search::{
        Lattice, LevelSearch, Limit, NeighborKind, SearchCandidate, SearchConfig, SearchEvent,
        SearchExt, Statistic,
    };
}
