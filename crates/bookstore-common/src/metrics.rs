//! Store operation metrics
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding binary installs a recorder.
#![allow(clippy::must_use_candidate)]

use std::time::Instant;

use metrics::{counter, histogram};

/// Record a completed store operation
pub fn record_store_operation(operation: &'static str, duration_secs: f64) {
    counter!("bookstore_store_operations_total", "operation" => operation).increment(1);
    histogram!("bookstore_store_operation_duration_seconds", "operation" => operation)
        .record(duration_secs);
}

/// Record a failed store operation
pub fn record_store_error(operation: &'static str) {
    counter!("bookstore_store_operation_errors_total", "operation" => operation).increment(1);
}

/// Timer that records a store operation when finished
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Finish the timer, recording success or failure of `result`
    pub fn finish<T, E>(self, result: &std::result::Result<T, E>) {
        match result {
            Ok(_) => record_store_operation(self.operation, self.start.elapsed().as_secs_f64()),
            Err(_) => record_store_error(self.operation),
        }
    }
}
