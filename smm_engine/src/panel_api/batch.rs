use std::fmt::Display;

use serde::Serialize;

/// One item of a batch that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: i64,
    pub message: String,
}

/// The aggregate result of a batch reconciliation run. One failing item never aborts the batch; it is counted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    /// Items that were checked without error, whether or not anything changed
    pub succeeded: usize,
    /// Items whose status actually changed
    pub updated: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn record_success(&mut self, updated: bool) {
        self.total += 1;
        self.succeeded += 1;
        if updated {
            self.updated += 1;
        }
    }

    pub fn record_failure<S: Into<String>>(&mut self, id: i64, message: S) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(BatchFailure { id, message: message.into() });
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} succeeded, {} updated, {} failed", self.succeeded, self.total, self.updated, self.failed)
    }
}
