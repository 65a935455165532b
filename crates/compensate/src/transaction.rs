use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::audit::TransactionAudit;
use crate::error::{CompensationError, TransactionError};
use crate::handle::Tx;
use crate::log::{Compensation, CompensationLog, SharedLog, lock};
use crate::options::{OnTimeout, TransactionOptions};

/// Runs work functions with all-or-nothing semantics over compensations.
///
/// The work function receives a [`Tx`] handle and registers each forward
/// action together with its compensation. If the work fails or misses its
/// deadline, the compensations registered so far are drained according to
/// the configured [`TransactionOptions`] and a single error is returned.
///
/// A `Transaction` holds only its options. Each [`run`](Self::run) gets a
/// fresh compensation log, so concurrent runs share no state.
///
/// The work future must be `Send + 'static` because, under the default
/// [`OnTimeout::Detach`] policy, a deadline runs it as a tokio task. A tokio
/// runtime with the time driver enabled is required whenever a timeout is set.
#[derive(Debug)]
pub struct Transaction<E> {
    options: TransactionOptions<E>,
}

impl<E> Default for Transaction<E>
where
    E: Display + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Transaction<E>
where
    E: Display + Send + 'static,
{
    /// A transaction with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(TransactionOptions::new())
    }

    /// A transaction that runs every work function under `options`.
    #[must_use]
    pub fn with_options(options: TransactionOptions<E>) -> Self {
        Self { options }
    }

    /// The options each run uses.
    #[must_use]
    pub fn options(&self) -> &TransactionOptions<E> {
        &self.options
    }

    /// Run `work`, returning its result on success.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::Forward` or `TransactionError::TimedOut` when
    /// the work fails and rollback does not abort, and
    /// `TransactionError::Compensation` when a compensation fails under the
    /// abort policy.
    pub async fn run<T, W, Fut>(&self, work: W) -> Result<T, TransactionError<E>>
    where
        W: FnOnce(Tx<E>) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
    {
        let (result, _audit) = self.execute_internal(work).await;
        result
    }

    /// Run `work` and return both the result and an audit log of every
    /// registered compensation.
    pub async fn run_with_audit<T, W, Fut>(
        &self,
        work: W,
    ) -> (Result<T, TransactionError<E>>, TransactionAudit)
    where
        W: FnOnce(Tx<E>) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
    {
        self.execute_internal(work).await
    }

    async fn execute_internal<T, W, Fut>(
        &self,
        work: W,
    ) -> (Result<T, TransactionError<E>>, TransactionAudit)
    where
        W: FnOnce(Tx<E>) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
    {
        let log: SharedLog<E> = Arc::new(Mutex::new(CompensationLog::new()));
        let tx = Tx::new(log.clone());

        let outcome = self.forward(work(tx)).await;

        let compensations = lock(&log).seal();
        let mut audit = TransactionAudit::from_registrations(
            compensations
                .iter()
                .map(|c| (c.index(), c.registered_at())),
        );

        match outcome {
            Ok(value) => {
                debug!(registered = compensations.len(), "transaction committed");
                (Ok(value), audit)
            }
            Err(forward_error) => {
                audit.record_failure(forward_error.is_timeout());
                debug!(
                    error = %forward_error,
                    registered = compensations.len(),
                    ordered = self.options.maintain_rollback_order(),
                    abort = self.options.abort_rollback(),
                    "transaction failed, rolling back"
                );
                let error = self
                    .roll_back(compensations, forward_error, &mut audit)
                    .await;
                (Err(error), audit)
            }
        }
    }

    async fn forward<T, Fut>(&self, work: Fut) -> Result<T, TransactionError<E>>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
    {
        let Some(timeout) = self.options.timeout() else {
            return work.await.map_err(TransactionError::Forward);
        };

        match self.options.on_timeout() {
            OnTimeout::Cancel => match tokio::time::timeout(timeout, work).await {
                Ok(result) => result.map_err(TransactionError::Forward),
                Err(_) => {
                    debug!(timeout_ms = timeout.as_millis(), "deadline elapsed, cancelling work");
                    Err(TransactionError::TimedOut { timeout })
                }
            },
            OnTimeout::Detach => {
                let handle = tokio::spawn(work);
                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(result)) => result.map_err(TransactionError::Forward),
                    Ok(Err(join_error)) => {
                        if join_error.is_panic() {
                            std::panic::resume_unwind(join_error.into_panic());
                        }
                        Err(TransactionError::Aborted)
                    }
                    Err(_) => {
                        debug!(
                            timeout_ms = timeout.as_millis(),
                            "deadline elapsed, detaching work"
                        );
                        Err(TransactionError::TimedOut { timeout })
                    }
                }
            }
        }
    }

    async fn roll_back(
        &self,
        compensations: Vec<Compensation<E>>,
        forward_error: TransactionError<E>,
        audit: &mut TransactionAudit,
    ) -> TransactionError<E> {
        let drained = if self.options.maintain_rollback_order() {
            self.drain_ordered(compensations, audit).await
        } else {
            self.drain_unordered(compensations, audit).await
        };

        match drained {
            Ok(()) => forward_error,
            Err(failure) => {
                debug!(
                    index = failure.index,
                    discarded = %forward_error,
                    "rollback aborted by compensation failure"
                );
                failure.into()
            }
        }
    }

    /// Reverse registration order, one at a time.
    async fn drain_ordered(
        &self,
        mut compensation_stack: Vec<Compensation<E>>,
        audit: &mut TransactionAudit,
    ) -> Result<(), CompensationError<E>> {
        while let Some(compensation) = compensation_stack.pop() {
            let index = compensation.index();
            let result = compensation.invoke().await;
            let finished_at = Instant::now();
            match result {
                Ok(()) => {
                    debug!(index, "compensated");
                    audit.record_compensated(index, finished_at);
                }
                Err(error) => {
                    audit.record_compensation_failed(index, finished_at);
                    let failure = CompensationError { index, error };
                    if self.options.abort_rollback() {
                        self.options.report_abort(&failure);
                        for skipped in &compensation_stack {
                            audit.record_skipped(skipped.index());
                        }
                        return Err(failure);
                    }
                    self.options.report_suppressed(&failure);
                }
            }
        }
        Ok(())
    }

    /// Dispatch all in registration order, then wait for every one.
    async fn drain_unordered(
        &self,
        compensations: Vec<Compensation<E>>,
        audit: &mut TransactionAudit,
    ) -> Result<(), CompensationError<E>> {
        let (indices, pending): (Vec<usize>, Vec<_>) = compensations
            .into_iter()
            .map(|c| {
                let index = c.index();
                (index, c.invoke().map(|result| (result, Instant::now())))
            })
            .unzip();

        let results = join_all(pending).await;

        let mut first_failure = None;
        for (index, (result, finished_at)) in indices.into_iter().zip(results) {
            let error = match result {
                Ok(()) => {
                    debug!(index, "compensated");
                    audit.record_compensated(index, finished_at);
                    continue;
                }
                Err(error) => error,
            };
            audit.record_compensation_failed(index, finished_at);
            let failure = CompensationError { index, error };

            if !self.options.abort_rollback() {
                self.options.report_suppressed(&failure);
            } else if first_failure.is_none() {
                self.options.report_abort(&failure);
                first_failure = Some(failure);
            } else {
                warn!(
                    index,
                    error = %failure.error,
                    "compensation failed after rollback was already aborted"
                );
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}

/// Run `work` with default options.
///
/// # Errors
///
/// See [`Transaction::run`].
pub async fn transaction<T, E, W, Fut>(work: W) -> Result<T, TransactionError<E>>
where
    E: Display + Send + 'static,
    W: FnOnce(Tx<E>) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
{
    Transaction::new().run(work).await
}
