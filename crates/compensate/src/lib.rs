//! Compensating-action transactions.
//!
//! A transaction runs a work function that registers forward actions together
//! with compensations that undo them. If the work fails, or misses its
//! deadline, the compensations registered so far are run to undo the
//! observable side effects, giving all-or-nothing behavior over operations
//! that are not transactional themselves.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use compensate::{Transaction, TransactionError, TransactionOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let files = Arc::new(Mutex::new(vec!["a.txt".to_string()]));
//! let handle = files.clone();
//!
//! let txn = Transaction::with_options(TransactionOptions::new().with_abort_rollback(false));
//! let result: Result<(), TransactionError<String>> = txn
//!     .run(|tx| async move {
//!         let created = handle.clone();
//!         tx.register_sync(
//!             || handle.lock().unwrap().push("b.txt".to_string()),
//!             move || {
//!                 created.lock().unwrap().retain(|f| f != "b.txt");
//!                 Ok(())
//!             },
//!         );
//!         Err("upload failed".to_string())
//!     })
//!     .await;
//!
//! assert_eq!(result.unwrap_err().to_string(), "upload failed");
//! assert_eq!(*files.lock().unwrap(), vec!["a.txt".to_string()]);
//! # }
//! ```

mod audit;
mod config;
mod error;
mod handle;
mod log;
mod options;
mod reporter;
mod transaction;

pub use audit::{CompensationRecord, CompensationStatus, TransactionAudit, TransactionOutcome};
pub use config::TransactionConfig;
pub use error::{CompensationError, TransactionError};
pub use handle::Tx;
pub use options::{OnTimeout, TransactionOptions};
pub use reporter::{LogReporter, RollbackReporter};
pub use transaction::{Transaction, transaction};
