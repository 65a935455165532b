use std::fmt::{self, Display};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::CompensationError;
use crate::reporter::{LogReporter, RollbackReporter};

/// What happens to the work function when the deadline wins the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnTimeout {
    /// Keep the work running as a detached task and ignore its result.
    #[default]
    Detach,
    /// Drop the work future, cancelling it at its next suspension point.
    Cancel,
}

/// Policy for a single transaction run.
///
/// | setting | default |
/// |---|---|
/// | `timeout` | none |
/// | `maintain_rollback_order` | `true` |
/// | `abort_rollback` | `true` |
/// | `reporter` | none |
/// | `fallback_reporter` | [`LogReporter`] |
/// | `on_timeout` | [`OnTimeout::Detach`] |
pub struct TransactionOptions<E> {
    timeout: Option<Duration>,
    maintain_rollback_order: bool,
    abort_rollback: bool,
    reporter: Option<Arc<dyn RollbackReporter<E>>>,
    fallback_reporter: Arc<dyn RollbackReporter<E>>,
    on_timeout: OnTimeout,
}

impl<E: Display> Default for TransactionOptions<E> {
    fn default() -> Self {
        Self {
            timeout: None,
            maintain_rollback_order: true,
            abort_rollback: true,
            reporter: None,
            fallback_reporter: Arc::new(LogReporter),
            on_timeout: OnTimeout::default(),
        }
    }
}

impl<E> Clone for TransactionOptions<E> {
    fn clone(&self) -> Self {
        Self {
            timeout: self.timeout,
            maintain_rollback_order: self.maintain_rollback_order,
            abort_rollback: self.abort_rollback,
            reporter: self.reporter.clone(),
            fallback_reporter: self.fallback_reporter.clone(),
            on_timeout: self.on_timeout,
        }
    }
}

impl<E> fmt::Debug for TransactionOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionOptions")
            .field("timeout", &self.timeout)
            .field("maintain_rollback_order", &self.maintain_rollback_order)
            .field("abort_rollback", &self.abort_rollback)
            .field("reporter", &self.reporter.is_some())
            .field("on_timeout", &self.on_timeout)
            .finish_non_exhaustive()
    }
}

impl<E: Display> TransactionOptions<E> {
    /// Options with every setting at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E> TransactionOptions<E> {
    /// The deadline for the forward phase, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether compensations run one at a time in reverse registration order.
    #[must_use]
    pub fn maintain_rollback_order(&self) -> bool {
        self.maintain_rollback_order
    }

    /// Whether the first compensation failure stops the rollback.
    #[must_use]
    pub fn abort_rollback(&self) -> bool {
        self.abort_rollback
    }

    /// What happens to the work when the deadline elapses.
    #[must_use]
    pub fn on_timeout(&self) -> OnTimeout {
        self.on_timeout
    }

    /// Whether a reporter was configured with [`with_reporter`](Self::with_reporter).
    #[must_use]
    pub fn has_reporter(&self) -> bool {
        self.reporter.is_some()
    }

    /// Fail the forward phase with a timeout error once `timeout` elapses.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Remove any deadline. No timer is created.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// `true` drains compensations one at a time in reverse registration
    /// order. `false` starts them all at once and waits for every one.
    #[must_use]
    pub fn with_maintain_rollback_order(mut self, maintain: bool) -> Self {
        self.maintain_rollback_order = maintain;
        self
    }

    /// `true` stops at the first compensation failure and returns it in place
    /// of the forward error. `false` runs every compensation, reports each
    /// failure and returns the forward error.
    #[must_use]
    pub fn with_abort_rollback(mut self, abort: bool) -> Self {
        self.abort_rollback = abort;
        self
    }

    /// Receives every compensation failure encountered during rollback.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl RollbackReporter<E> + 'static) -> Self {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Replaces the sink used under the continue policy when no reporter is
    /// configured.
    #[must_use]
    pub fn with_fallback_reporter(mut self, reporter: impl RollbackReporter<E> + 'static) -> Self {
        self.fallback_reporter = Arc::new(reporter);
        self
    }

    /// Chooses whether expired work is detached or cancelled.
    #[must_use]
    pub fn with_on_timeout(mut self, on_timeout: OnTimeout) -> Self {
        self.on_timeout = on_timeout;
        self
    }

    /// Reports a failure that is about to abort the rollback. Only an
    /// explicitly configured reporter sees it, since the failure itself
    /// becomes the transaction's error.
    pub(crate) fn report_abort(&self, failure: &CompensationError<E>) {
        if let Some(reporter) = &self.reporter {
            reporter.report(failure);
        }
    }

    /// Reports a failure that will be suppressed from the returned error.
    pub(crate) fn report_suppressed(&self, failure: &CompensationError<E>) {
        match &self.reporter {
            Some(reporter) => reporter.report(failure),
            None => self.fallback_reporter.report(failure),
        }
    }
}
