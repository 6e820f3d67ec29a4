#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// How batches of independent search work run: inline on the calling
/// thread, or spread across the rayon worker pool.
#[derive(Clone, Debug, Default)]
pub enum Executor {
    #[default]
    Serial,
    #[cfg(feature = "rayon")]
    WorkerPool,
}

impl Executor {
    pub fn num_workers(&self) -> usize {
        match self {
            Executor::Serial => 1,
            #[cfg(feature = "rayon")]
            Executor::WorkerPool => rayon::current_num_threads(),
        }
    }

    /// Run every closure and collect results in input order.
    pub fn execute_batch<F, R>(&self, batch: Vec<F>) -> Vec<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self {
            Executor::Serial => batch.into_iter().map(|job| job()).collect(),
            #[cfg(feature = "rayon")]
            Executor::WorkerPool => batch.into_par_iter().map(|job| job()).collect(),
        }
    }
}
