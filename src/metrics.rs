//! Observability metrics for bridge operations
//!
//! Each handle keeps the metrics of its most recent operation. Collecting
//! them never changes control flow or the error a call returns.

use crate::error::Operation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource usage of one bridge call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMetrics {
    /// Operation the metrics describe
    pub operation: Operation,

    /// Wall-clock time of the call in microseconds
    pub duration_micros: u64,

    /// Number of scratch buffers allocated by the call
    pub scratch_allocations: usize,

    /// Total scratch bytes allocated by the call
    pub scratch_bytes: usize,

    /// Bytes of randomness drawn (0 for operations that need none)
    pub random_bytes: usize,

    /// Whether the call returned Ok
    pub succeeded: bool,
}

impl OperationMetrics {
    /// Create empty metrics for `operation`
    pub fn new(operation: Operation) -> Self {
        OperationMetrics {
            operation,
            duration_micros: 0,
            scratch_allocations: 0,
            scratch_bytes: 0,
            random_bytes: 0,
            succeeded: false,
        }
    }

    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_scratch(mut self, allocations: usize, bytes: usize) -> Self {
        self.scratch_allocations = allocations;
        self.scratch_bytes = bytes;
        self
    }

    pub fn with_random(mut self, bytes: usize) -> Self {
        self.random_bytes = bytes;
        self
    }

    pub fn with_outcome(mut self, succeeded: bool) -> Self {
        self.succeeded = succeeded;
        self
    }
}
