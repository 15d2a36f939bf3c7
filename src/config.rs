//! Bridge configuration.
//!
//! Limits are checked before any scratch memory is allocated. Defaults are
//! sized for message payloads, not bulk data.

use serde::{Deserialize, Serialize};

/// Largest single scratch allocation (64MB)
pub const DEFAULT_MAX_SCRATCH_ALLOCATION: usize = 64 * 1024 * 1024;

/// Largest plaintext accepted by encrypt (16MB)
pub const DEFAULT_MAX_PLAINTEXT_LENGTH: usize = 16 * 1024 * 1024;

/// Largest ciphertext accepted by decrypt (base64 expansion of the plaintext limit, rounded up)
pub const DEFAULT_MAX_CIPHERTEXT_LENGTH: usize = 24 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Ceiling for any one scratch buffer, in bytes
    pub max_scratch_allocation: usize,
    /// Ceiling for plaintext handed to encrypt, in bytes
    pub max_plaintext_length: usize,
    /// Ceiling for ciphertext handed to decrypt, in bytes
    pub max_ciphertext_length: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_scratch_allocation: DEFAULT_MAX_SCRATCH_ALLOCATION,
            max_plaintext_length: DEFAULT_MAX_PLAINTEXT_LENGTH,
            max_ciphertext_length: DEFAULT_MAX_CIPHERTEXT_LENGTH,
        }
    }
}

impl BridgeConfig {
    pub fn with_max_scratch_allocation(mut self, bytes: usize) -> Self {
        self.max_scratch_allocation = bytes;
        self
    }

    pub fn with_max_plaintext_length(mut self, bytes: usize) -> Self {
        self.max_plaintext_length = bytes;
        self
    }

    pub fn with_max_ciphertext_length(mut self, bytes: usize) -> Self {
        self.max_ciphertext_length = bytes;
        self
    }
}
