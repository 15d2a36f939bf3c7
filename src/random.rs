//! Secure randomness for engine calls.

use crate::error::{BridgeError, Result};
use ring::rand::{SecureRandom, SystemRandom};

/// A cryptographic-quality randomness source.
///
/// `fill` either fills all of `dest` or fails; a partial fill must be
/// reported as an error.
pub trait RandomSource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// The operating system CSPRNG via `ring`
#[derive(Debug)]
pub struct SystemRandomSource {
    rng: SystemRandom,
}

impl SystemRandomSource {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandomSource {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        self.rng
            .fill(dest)
            .map_err(|_| BridgeError::RandomSource("system random source unavailable".into()))
    }
}
