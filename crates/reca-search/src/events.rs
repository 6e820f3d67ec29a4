/// Progress notifications emitted synchronously from the search driver.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SearchEvent {
    Started {
        total_levels: usize,
        statistic_name: &'static str,
    },
    Level {
        current_level: usize,
        total_levels: usize,
        models_evaluated: usize,
        best_name: String,
        best_statistic: f64,
    },
    Complete {
        levels_run: usize,
        models_evaluated: usize,
        best_name: String,
        best_statistic: f64,
    },
}

pub trait EventHandler: Send {
    fn handle(&mut self, event: &SearchEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&SearchEvent) + Send,
{
    fn handle(&mut self, event: &SearchEvent) {
        (self)(event)
    }
}
