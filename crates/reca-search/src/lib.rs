mod events;
mod lattice;
mod limit;
mod neighbors;
mod search;
mod statistic;

pub use events::{EventHandler, SearchEvent};
pub use lattice::{Lattice, LatticeEntry};
pub use limit::Limit;
pub use neighbors::{Disjoint, Full, Loopless, NeighborKind, Neighborhood};
pub use search::{LevelSearch, SearchCandidate, SearchConfig, SearchExt};
pub use statistic::Statistic;

pub use reca_core::*;
pub use reca_error::{RecaError, ensure, reca_err};

pub fn init_logging() {
    pub use std::sync::Once;
    static INIT_LOGGING: Once = Once::new();

    INIT_LOGGING.call_once(|| {
        use tracing_subscriber::fmt::format::FmtSpan;
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                    .with_target(false)
                    .with_level(true)
                    .compact(),
            )
            .init();
    });
}
