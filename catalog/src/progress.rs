//! Per-variable progress reporting for detail fetches.
//!
//! The detail-fetch pipeline calls a [`SeriesProgress`] once for every variable as its
//! value fetch settles, in completion order.

use crate::{error::VariableError, variable::Variable};

pub trait SeriesProgress: Send + Sync {
    /// The values request succeeded. The variable may still carry
    /// [`VariableError::NoValuesReturned`] if the series came back empty.
    fn variable_fetched(&self, result_id: &str, variable: &Variable) {
        let _ = (result_id, variable);
    }

    /// The values request failed; `error` is also recorded on the variable.
    fn variable_failed(&self, result_id: &str, variable: &Variable, error: &VariableError) {
        let _ = (result_id, variable, error);
    }
}

/// Ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl SeriesProgress for SilentReporter {}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SeriesProgress for TracingReporter {
    fn variable_fetched(&self, result_id: &str, variable: &Variable) {
        tracing::info!(
            "[{}] {} ({}): {} value(s), most recent {:?}",
            result_id,
            variable.name(),
            variable.id(),
            variable.values().len(),
            variable.most_recent_value()
        );
    }

    fn variable_failed(&self, result_id: &str, variable: &Variable, error: &VariableError) {
        tracing::error!("[{}] {} ({}) failed: {}", result_id, variable.name(), variable.id(), error);
    }
}

/// A pair of closures, one per outcome.
pub struct Callbacks<D, F> {
    pub on_each_done: D,
    pub on_each_fail: F,
}

impl<D, F> SeriesProgress for Callbacks<D, F>
where
    D: Fn(&Variable) + Send + Sync,
    F: Fn(&Variable, &VariableError) + Send + Sync,
{
    fn variable_fetched(&self, _result_id: &str, variable: &Variable) {
        (self.on_each_done)(variable)
    }

    fn variable_failed(&self, _result_id: &str, variable: &Variable, error: &VariableError) {
        (self.on_each_fail)(variable, error)
    }
}
