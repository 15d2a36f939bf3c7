//! Error taxonomy and engine error translation.
//!
//! The engine signals failure with a sentinel return value ([`ENGINE_ERROR`])
//! and keeps a human-readable description in the context it failed on. This
//! module turns that pair into a [`BridgeError`] so callers never see raw
//! sentinel codes.

use crate::engine::ENGINE_ERROR;
use crate::lifecycle::ContextState;
use crate::scratch::BufferKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::error;

/// Bridge operations, used to label errors, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateEncryption,
    CreateDecryption,
    SetRecipientKey,
    Encrypt,
    Decrypt,
    GenerateKey,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateEncryption => "create_encryption",
            Operation::CreateDecryption => "create_decryption",
            Operation::SetRecipientKey => "set_recipient_key",
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
            Operation::GenerateKey => "generate_key",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by every bridge operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Scratch memory could not be obtained. Fatal to the current call only.
    #[error("Scratch allocation failed: {requested} bytes for {kind} buffer")]
    Allocation { kind: BufferKind, requested: usize },

    /// The handle was never created or has already been released.
    #[error("Invalid handle: context is not live")]
    InvalidHandle,

    /// The context is live but not in a state that permits the operation.
    #[error("Invalid state for {operation}: context is {state}")]
    InvalidState {
        operation: Operation,
        state: ContextState,
    },

    /// A required input was missing, empty or over the configured limits.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The platform randomness source failed.
    #[error("Random source failure: {0}")]
    RandomSource(String),

    /// The engine signaled failure; `message` is the engine's own diagnostic.
    #[error("{operation} failed: {message}")]
    Engine { operation: Operation, message: String },
}

impl BridgeError {
    /// True for failures reported by the engine itself.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, BridgeError::Engine { .. })
    }

    /// The engine diagnostic, if this error came from the engine.
    pub fn engine_message(&self) -> Option<&str> {
        match self {
            BridgeError::Engine { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Engine text used when the engine fails without describing why.
const UNKNOWN_ENGINE_ERROR: &str = "UNKNOWN_ERROR";

/// Translate an engine return value.
///
/// Values other than [`ENGINE_ERROR`] pass through unchanged. On the sentinel,
/// `last_error` is consulted once for the engine's description.
pub(crate) fn check_engine<F>(ret: usize, operation: Operation, last_error: F) -> Result<usize>
where
    F: FnOnce() -> String,
{
    if ret != ENGINE_ERROR {
        return Ok(ret);
    }

    let mut message = last_error();
    if message.is_empty() {
        message = UNKNOWN_ENGINE_ERROR.to_string();
    }
    error!(%operation, %message, "engine operation failed");
    Err(BridgeError::Engine { operation, message })
}

/// Validate a length returned by an engine size query.
///
/// Size queries have no last-error to consult; a sentinel here means the
/// input length is outside what the engine can represent.
pub(crate) fn check_size(len: usize, what: &str, input_len: usize) -> Result<usize> {
    if len == ENGINE_ERROR {
        return Err(BridgeError::InvalidInput(format!(
            "{what} undefined for input of {input_len} bytes"
        )));
    }
    Ok(len)
}
