//! Typed results returned by bridge operations.
//!
//! Results are plain records returned by value: the caller decomposes them,
//! nothing is written back into caller-owned objects.

use crate::error::{BridgeError, Operation, Result};
use crate::scratch::ScratchBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output of `encrypt`, input of `decrypt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Engine ciphertext bytes
    pub ciphertext: Vec<u8>,
    /// Engine MAC, textual
    pub mac: String,
    /// Per-message ephemeral public key, textual
    pub ephemeral_key: String,
}

impl EncryptedMessage {
    pub fn new(
        ciphertext: impl Into<Vec<u8>>,
        mac: impl Into<String>,
        ephemeral_key: impl Into<String>,
    ) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            mac: mac.into(),
            ephemeral_key: ephemeral_key.into(),
        }
    }

    /// Check that every field decrypt needs is present.
    ///
    /// An empty field is a caller error, reported before any engine call.
    pub fn validate(&self) -> Result<()> {
        if self.ciphertext.is_empty() {
            return Err(BridgeError::InvalidInput("no ciphertext".into()));
        }
        if self.mac.is_empty() {
            return Err(BridgeError::InvalidInput("no MAC".into()));
        }
        if self.ephemeral_key.is_empty() {
            return Err(BridgeError::InvalidInput("no ephemeral key".into()));
        }
        Ok(())
    }

    /// Build the message from the scratch buffers of a successful encrypt.
    pub(crate) fn from_scratch(
        ciphertext: &[u8],
        mac: &ScratchBuffer<'_>,
        ephemeral_key: &ScratchBuffer<'_>,
    ) -> Result<Self> {
        Ok(Self {
            ciphertext: ciphertext.to_vec(),
            mac: engine_text(mac, Operation::Encrypt, "MAC")?,
            ephemeral_key: engine_text(ephemeral_key, Operation::Encrypt, "ephemeral key")?,
        })
    }
}

/// Read a textual engine output into an owned string.
fn engine_text(buffer: &ScratchBuffer<'_>, operation: Operation, field: &str) -> Result<String> {
    buffer
        .text()
        .map(str::to_owned)
        .map_err(|_| BridgeError::Engine {
            operation,
            message: format!("engine produced a non-UTF-8 {field}"),
        })
}

/// Public half of a generated key pair.
///
/// The private half stays inside the decryption context.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub(crate) fn from_scratch(buffer: &ScratchBuffer<'_>, length: usize) -> Self {
        PublicKey(buffer.payload()[..length].to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The key as text, when the engine encodes keys textually.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => f.debug_tuple("PublicKey").field(&text).finish(),
            None => f.debug_tuple("PublicKey").field(&self.0).finish(),
        }
    }
}
