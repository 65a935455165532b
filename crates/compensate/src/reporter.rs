use std::fmt::Display;

use tracing::error;

use crate::error::CompensationError;

/// Sink for compensation failures encountered during rollback.
///
/// Implemented for any `Fn(&CompensationError<E>)`, so a closure can be
/// passed wherever a reporter is expected.
pub trait RollbackReporter<E>: Send + Sync {
    /// Called once for each compensation failure routed to this reporter.
    fn report(&self, failure: &CompensationError<E>);
}

impl<E, F> RollbackReporter<E> for F
where
    F: Fn(&CompensationError<E>) + Send + Sync,
{
    fn report(&self, failure: &CompensationError<E>) {
        self(failure);
    }
}

/// Default reporter: emits each failure as a `tracing` error event.
///
/// Used under the continue policy when no reporter has been configured, so
/// suppressed failures are never silently lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl<E: Display> RollbackReporter<E> for LogReporter {
    fn report(&self, failure: &CompensationError<E>) {
        error!(
            index = failure.index,
            error = %failure.error,
            "rollback error"
        );
    }
}
