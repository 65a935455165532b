use std::time::Duration;

use thiserror::Error;

/// Error returned by a compensation during rollback.
#[derive(Debug, Error)]
#[error("compensation #{index} failed: {error}")]
pub struct CompensationError<E> {
    /// Registration index of the compensation that failed.
    pub index: usize,
    /// The underlying error.
    #[source]
    pub error: E,
}

/// The single error a failed transaction resolves to.
///
/// Callers only ever see one error per transaction. Under the abort policy a
/// failing compensation replaces the forward error, so the result alone does
/// not say whether every compensation ran. Use
/// [`Transaction::run_with_audit`](crate::Transaction::run_with_audit) when
/// that matters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransactionError<E> {
    /// The work function or a forward action failed.
    #[error("{0}")]
    Forward(E),

    /// The deadline elapsed before the work function completed.
    ///
    /// The message reports the deadline in whole milliseconds, rounded up.
    #[error("Transaction timed out after {}ms", .timeout.as_nanos().div_ceil(1_000_000))]
    TimedOut {
        /// The configured deadline.
        timeout: Duration,
    },

    /// A compensation failed while rolling back under the abort policy.
    #[error("{error}")]
    Compensation {
        /// Registration index of the compensation that failed.
        index: usize,
        /// The error returned by the compensation.
        error: E,
    },

    /// The detached work task was torn down before it produced a result.
    #[error("transaction work was aborted before completing")]
    Aborted,
}

impl<E> TransactionError<E> {
    /// Returns `true` if the transaction failed because of its deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Returns `true` if a compensation error replaced the forward error.
    #[must_use]
    pub fn is_compensation(&self) -> bool {
        matches!(self, Self::Compensation { .. })
    }

    /// Consumes the error, returning the caller's error value if there is one.
    #[must_use]
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Forward(error) | Self::Compensation { error, .. } => Some(error),
            Self::TimedOut { .. } | Self::Aborted => None,
        }
    }
}

impl<E> From<CompensationError<E>> for TransactionError<E> {
    fn from(failure: CompensationError<E>) -> Self {
        Self::Compensation {
            index: failure.index,
            error: failure.error,
        }
    }
}
