//! FFI error codes and the per-thread last error message.

use crate::error::BridgeError;
use std::cell::RefCell;

/// C-compatible error codes for the FFI boundary
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkbridgeError {
    /// Operation succeeded
    Ok = 0,
    /// Invalid input provided (empty key, empty message field, size limit)
    InvalidInput = 1,
    /// Null pointer provided
    NullPointer = 2,
    /// Output buffer too small; the required size was written back
    BufferTooSmall = 3,
    /// Invalid, freed or released handle
    InvalidHandle = 4,
    /// Operation not allowed in the handle's current state
    InvalidState = 5,
    /// Scratch allocation failed
    AllocationFailed = 6,
    /// Randomness source failed
    RandomFailure = 7,
    /// The engine rejected the operation; see `pkbridge_last_error_message`
    EngineFailure = 8,
    /// A panic was caught at the boundary
    Internal = 9,
}

impl From<&BridgeError> for PkbridgeError {
    fn from(e: &BridgeError) -> Self {
        match e {
            BridgeError::Allocation { .. } => PkbridgeError::AllocationFailed,
            BridgeError::InvalidHandle => PkbridgeError::InvalidHandle,
            BridgeError::InvalidState { .. } => PkbridgeError::InvalidState,
            BridgeError::InvalidInput(_) => PkbridgeError::InvalidInput,
            BridgeError::RandomSource(_) => PkbridgeError::RandomFailure,
            BridgeError::Engine { .. } => PkbridgeError::EngineFailure,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Remember `message` as the calling thread's last error.
pub(crate) fn set_last_error(message: impl Into<String>) {
    let message = message.into();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// Record a bridge error and return its code.
pub(crate) fn fail(e: &BridgeError) -> PkbridgeError {
    set_last_error(e.to_string());
    PkbridgeError::from(e)
}

pub(crate) fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}
