//! Caller-facing handles over engine contexts.
//!
//! [`PkEncryption`] and [`PkDecryption`] each own exactly one context. They
//! are neither `Clone` nor `Copy`, mutating operations take `&mut self`, and
//! releasing a handle leaves it permanently invalid. Dropping a live handle
//! releases it.

pub mod decryption;
pub mod encryption;

pub use decryption::PkDecryption;
pub use encryption::PkEncryption;

use crate::error::Result;
use crate::metrics::OperationMetrics;
use crate::scratch::ScratchArena;
use std::time::Instant;
use tracing::debug;

/// Run one bridge call inside `arena`, recording its metrics in `slot`.
pub(crate) fn metered<'a, T>(
    arena: &ScratchArena<'a>,
    slot: &mut Option<OperationMetrics>,
    call: impl FnOnce(&ScratchArena<'a>) -> Result<T>,
) -> Result<T> {
    let start = Instant::now();
    let result = call(arena);
    let metrics = arena.metrics(start.elapsed(), result.is_ok());

    debug!(
        operation = %metrics.operation,
        duration_micros = metrics.duration_micros,
        scratch_allocations = metrics.scratch_allocations,
        scratch_bytes = metrics.scratch_bytes,
        succeeded = metrics.succeeded,
        "bridge call finished"
    );
    *slot = Some(metrics);
    result
}
