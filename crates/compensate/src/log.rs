use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::future::BoxFuture;

pub(crate) type UndoFn<E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), E>> + Send>;

/// A registered undo action, waiting to be drained.
pub(crate) struct Compensation<E> {
    index: usize,
    registered_at: Instant,
    undo: UndoFn<E>,
}

impl<E> Compensation<E> {
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Starts the compensation. Synchronous compensations have already run
    /// by the time this returns.
    pub(crate) fn invoke(self) -> BoxFuture<'static, Result<(), E>> {
        (self.undo)()
    }
}

/// Append-only list of compensations for a single transaction.
///
/// Once sealed, the entries have been handed to the rollback drain and no
/// further compensations are accepted.
pub(crate) struct CompensationLog<E> {
    entries: Vec<Compensation<E>>,
    sealed: bool,
}

impl<E> CompensationLog<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            sealed: false,
        }
    }

    /// Appends a compensation at the tail, returning its registration index,
    /// or `None` if the log is sealed.
    pub(crate) fn push(&mut self, undo: UndoFn<E>) -> Option<usize> {
        if self.sealed {
            return None;
        }
        let index = self.entries.len();
        self.entries.push(Compensation {
            index,
            registered_at: Instant::now(),
            undo,
        });
        Some(index)
    }

    /// Seals the log and takes its entries in registration order.
    pub(crate) fn seal(&mut self) -> Vec<Compensation<E>> {
        self.sealed = true;
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) type SharedLog<E> = Arc<Mutex<CompensationLog<E>>>;

/// Locks the log, recovering it if a forward action panicked mid-registration.
pub(crate) fn lock<E>(log: &Mutex<CompensationLog<E>>) -> MutexGuard<'_, CompensationLog<E>> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}
