use std::fmt::Display;
use std::time::Duration;

use serde::Deserialize;

use crate::options::{OnTimeout, TransactionOptions};

/// Rollback policy as it appears in a configuration file.
///
/// ```toml
/// timeout-ms = 5000
/// maintain-rollback-order = true
/// abort-rollback = false
/// on-timeout = "cancel"
/// ```
///
/// Every key is optional and falls back to the [`TransactionOptions`]
/// default. Reporters cannot be configured here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct TransactionConfig {
    /// Deadline in milliseconds. Absent means no deadline.
    pub timeout_ms: Option<u64>,
    /// Run compensations sequentially in reverse order.
    pub maintain_rollback_order: bool,
    /// Stop the rollback at the first compensation failure.
    pub abort_rollback: bool,
    /// `"detach"` or `"cancel"`.
    pub on_timeout: OnTimeout,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            maintain_rollback_order: true,
            abort_rollback: true,
            on_timeout: OnTimeout::default(),
        }
    }
}

impl TransactionConfig {
    /// Builds options from default reporters and this configuration.
    #[must_use]
    pub fn into_options<E: Display>(self) -> TransactionOptions<E> {
        self.apply_to(TransactionOptions::new())
    }

    /// Overrides the policy fields of `options`, keeping its reporters.
    #[must_use]
    pub fn apply_to<E>(self, options: TransactionOptions<E>) -> TransactionOptions<E> {
        let options = match self.timeout_ms {
            Some(ms) => options.with_timeout(Duration::from_millis(ms)),
            None => options.without_timeout(),
        };
        options
            .with_maintain_rollback_order(self.maintain_rollback_order)
            .with_abort_rollback(self.abort_rollback)
            .with_on_timeout(self.on_timeout)
    }
}
