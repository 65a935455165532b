use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future;
use tracing::{debug, warn};

use crate::log::{SharedLog, UndoFn, lock};

/// Registration handle passed to a transaction's work function.
///
/// Each call records a compensation and then runs the paired forward action.
/// The compensation is recorded first, so it stays eligible for rollback even
/// when the forward action fails.
///
/// Clones share the same compensation log. A clone that outlives its
/// transaction (for example inside a detached, timed-out task) still runs
/// forward actions, but its compensations are discarded.
pub struct Tx<E> {
    log: SharedLog<E>,
}

impl<E> Clone for Tx<E> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
        }
    }
}

impl<E> fmt::Debug for Tx<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("registered", &lock(&self.log).len())
            .finish()
    }
}

impl<E> Tx<E>
where
    E: Send + 'static,
{
    pub(crate) fn new(log: SharedLog<E>) -> Self {
        Self { log }
    }

    /// Registers an asynchronous compensation and runs `forward`.
    ///
    /// Returns exactly what `forward` returns. When `forward` is async the
    /// caller awaits the returned future; errors are neither inspected nor
    /// transformed.
    ///
    /// ```
    /// # async fn demo() -> Result<(), compensate::TransactionError<std::io::Error>> {
    /// let total = compensate::transaction(|tx| async move {
    ///     let id = tx
    ///         .register(
    ///             || async { Ok::<_, std::io::Error>(7) },
    ///             || async { Ok(()) },
    ///         )
    ///         .await?;
    ///     Ok::<_, std::io::Error>(id * 6)
    /// })
    /// .await?;
    /// assert_eq!(total, 42);
    /// # Ok(())
    /// # }
    /// ```
    pub fn register<R, F, C, Fut>(&self, forward: F, rollback: C) -> R
    where
        F: FnOnce() -> R,
        C: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.record(Box::new(move || rollback().boxed()));
        forward()
    }

    /// Registers a synchronous compensation and runs `forward`.
    ///
    /// The compensation body runs as soon as the rollback drain invokes it.
    pub fn register_sync<R, F, C>(&self, forward: F, rollback: C) -> R
    where
        F: FnOnce() -> R,
        C: FnOnce() -> Result<(), E> + Send + 'static,
    {
        self.record(Box::new(move || future::ready(rollback()).boxed()));
        forward()
    }

    fn record(&self, undo: UndoFn<E>) {
        let index = lock(&self.log).push(undo);
        match index {
            Some(index) => debug!(index, "registered compensation"),
            None => warn!("transaction already finished, discarding late compensation"),
        }
    }
}
