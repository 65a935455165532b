#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use compensate::CompensationError;
use futures::FutureExt;
use futures::future::BoxFuture;

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct TestError(pub String);

impl TestError {
    pub fn new(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Shared record of which actions ran, in the order they ran.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().expect("journal lock").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    /// Synchronous compensation that records `entry` and succeeds.
    pub fn undo(
        &self,
        entry: &str,
    ) -> impl FnOnce() -> Result<(), TestError> + Send + 'static + use<> {
        let journal = self.clone();
        let entry = entry.to_string();
        move || {
            journal.push(entry);
            Ok(())
        }
    }

    /// Synchronous compensation that records `entry` and fails with `message`.
    pub fn failing_undo(
        &self,
        entry: &str,
        message: &str,
    ) -> impl FnOnce() -> Result<(), TestError> + Send + 'static + use<> {
        let journal = self.clone();
        let entry = entry.to_string();
        let message = message.to_string();
        move || {
            journal.push(entry);
            Err(TestError(message))
        }
    }

    /// Asynchronous compensation that records `start:` and `end:` around a sleep.
    pub fn slow_undo(
        &self,
        entry: &str,
        delay: Duration,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<(), TestError>> + Send + 'static + use<>
    {
        self.slow(entry, delay, None)
    }

    /// Like `slow_undo`, but fails with `message` after the sleep.
    pub fn slow_failing_undo(
        &self,
        entry: &str,
        delay: Duration,
        message: &str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<(), TestError>> + Send + 'static + use<>
    {
        self.slow(entry, delay, Some(message.to_string()))
    }

    fn slow(
        &self,
        entry: &str,
        delay: Duration,
        failure: Option<String>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<(), TestError>> + Send + 'static + use<>
    {
        let journal = self.clone();
        let entry = entry.to_string();
        move || {
            async move {
                journal.push(format!("start:{entry}"));
                tokio::time::sleep(delay).await;
                journal.push(format!("end:{entry}"));
                match failure {
                    Some(message) => Err(TestError(message)),
                    None => Ok(()),
                }
            }
            .boxed()
        }
    }
}

/// Counts calls; usable as a rollback reporter.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reporter(
        &self,
    ) -> impl Fn(&CompensationError<TestError>) + Send + Sync + 'static + use<> {
        let counter = self.0.clone();
        move |_: &CompensationError<TestError>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Reporter that collects `(index, message)` pairs.
#[derive(Clone, Default)]
pub struct CollectingReporter(Arc<Mutex<Vec<(usize, String)>>>);

impl CollectingReporter {
    pub fn reports(&self) -> Vec<(usize, String)> {
        self.0.lock().expect("reporter lock").clone()
    }

    pub fn reporter(
        &self,
    ) -> impl Fn(&CompensationError<TestError>) + Send + Sync + 'static + use<> {
        let reports = self.0.clone();
        move |failure: &CompensationError<TestError>| {
            reports
                .lock()
                .expect("reporter lock")
                .push((failure.index, failure.error.0.clone()));
        }
    }
}
