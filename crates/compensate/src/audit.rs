use std::time::Instant;

/// What happened to a registered compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompensationStatus {
    /// Registered, and the transaction never needed it.
    Registered,
    /// Ran successfully during rollback.
    Compensated,
    /// Ran during rollback and returned an error.
    CompensationFailed,
    /// Never ran because an earlier compensation failure aborted the rollback.
    Skipped,
}

/// How the forward phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum TransactionOutcome {
    /// The work function returned successfully.
    #[default]
    Committed,
    /// The work function or one of its forward actions failed.
    Failed,
    /// The deadline elapsed before the work function completed.
    TimedOut,
}

/// Record of one compensation across the life of a transaction.
#[derive(Debug)]
pub struct CompensationRecord {
    /// Registration index, starting at zero.
    pub index: usize,
    /// Final status of the compensation.
    pub status: CompensationStatus,
    /// When the compensation was registered.
    pub registered_at: Instant,
    /// When the compensation finished running, if it ran.
    pub completed_at: Option<Instant>,
}

/// Audit log of a single transaction run.
#[derive(Debug, Default)]
pub struct TransactionAudit {
    outcome: TransactionOutcome,
    records: Vec<CompensationRecord>,
}

impl TransactionAudit {
    /// Starts an audit with one `Registered` record per registration.
    pub(crate) fn from_registrations(
        registrations: impl IntoIterator<Item = (usize, Instant)>,
    ) -> Self {
        let records = registrations
            .into_iter()
            .map(|(index, registered_at)| CompensationRecord {
                index,
                status: CompensationStatus::Registered,
                registered_at,
                completed_at: None,
            })
            .collect();
        Self {
            outcome: TransactionOutcome::Committed,
            records,
        }
    }

    pub(crate) fn record_failure(&mut self, timed_out: bool) {
        self.outcome = if timed_out {
            TransactionOutcome::TimedOut
        } else {
            TransactionOutcome::Failed
        };
    }

    pub(crate) fn record_compensated(&mut self, index: usize, at: Instant) {
        self.finish_at(index, CompensationStatus::Compensated, at);
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize, at: Instant) {
        self.finish_at(index, CompensationStatus::CompensationFailed, at);
    }

    pub(crate) fn record_skipped(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = CompensationStatus::Skipped;
        }
    }

    fn finish_at(&mut self, index: usize, status: CompensationStatus, at: Instant) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = status;
            record.completed_at = Some(at);
        }
    }

    /// How the forward phase ended.
    #[must_use]
    pub fn outcome(&self) -> TransactionOutcome {
        self.outcome
    }

    /// Records in registration order.
    #[must_use]
    pub fn records(&self) -> &[CompensationRecord] {
        &self.records
    }

    /// Number of records with the given status.
    #[must_use]
    pub fn count(&self, status: CompensationStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// One line for the outcome, then one line per compensation.
    #[must_use]
    pub fn summary(&self) -> String {
        let outcome = match self.outcome {
            TransactionOutcome::Committed => "committed",
            TransactionOutcome::Failed => "failed",
            TransactionOutcome::TimedOut => "timed out",
        };
        let mut lines = vec![format!("transaction {outcome}")];
        for record in &self.records {
            let status = match record.status {
                CompensationStatus::Registered => "✓",
                CompensationStatus::Compensated => "↩",
                CompensationStatus::CompensationFailed => "⚠",
                CompensationStatus::Skipped => "-",
            };
            lines.push(format!("{status} compensation #{}", record.index));
        }
        lines.join("\n")
    }
}
