use super::metered;
use crate::engine::{PkEngine, SoftwareEngine};
use crate::error::{BridgeError, Operation, Result, check_size};
use crate::lifecycle::{Bridge, ContextState, NativeContext};
use crate::marshal;
use crate::message::{EncryptedMessage, PublicKey};
use crate::metrics::OperationMetrics;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Handle to one decryption context.
///
/// Lifecycle: `Created` -> `generate_key` -> `KeyGenerated`. The private key
/// never leaves the context; only the public half is returned.
///
/// If key generation fails inside the engine or the randomness source, the
/// context is released and the handle becomes invalid. A scratch allocation
/// failure happens before the engine runs and leaves the handle usable.
pub struct PkDecryption<E: PkEngine = SoftwareEngine> {
    bridge: Arc<Bridge<E>>,
    context: Option<NativeContext>,
    public_key: Option<PublicKey>,
    last_metrics: Option<OperationMetrics>,
}

impl<E: PkEngine> PkDecryption<E> {
    pub(crate) fn from_parts(bridge: Arc<Bridge<E>>, context: NativeContext) -> Self {
        Self {
            bridge,
            context: Some(context),
            public_key: None,
            last_metrics: None,
        }
    }

    pub fn state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|context| context.state)
    }

    pub fn is_live(&self) -> bool {
        self.context.is_some()
    }

    /// Public key produced by `generate_key`, if any.
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    pub fn last_metrics(&self) -> Option<&OperationMetrics> {
        self.last_metrics.as_ref()
    }

    /// Generate the context's key pair and return the public key.
    pub fn generate_key(&mut self) -> Result<PublicKey> {
        let context = self.context.as_mut().ok_or(BridgeError::InvalidHandle)?;
        context.require(Operation::GenerateKey, ContextState::Created)?;
        let context_id = context.id();
        let bridge = &self.bridge;

        let arena = bridge.arena(Operation::GenerateKey);
        let result = metered(&arena, &mut self.last_metrics, |arena| {
            marshal::generate_key(bridge.engine(), arena, bridge.random(), &mut context.block)
        });
        drop(arena);

        match result {
            Ok(public_key) => {
                context.state = ContextState::KeyGenerated;
                self.public_key = Some(public_key.clone());
                debug!(context_id, "key pair generated");
                Ok(public_key)
            }
            Err(e @ BridgeError::Allocation { .. }) => Err(e),
            Err(e) => {
                error!(context_id, error = %e, "key generation failed, releasing context");
                if let Some(context) = self.context.take() {
                    self.bridge.release_context(context);
                }
                Err(e)
            }
        }
    }

    /// Decrypt a message addressed to this context's public key.
    ///
    /// Allowed in any live state; without a generated key the engine itself
    /// reports the failure.
    pub fn decrypt(&mut self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        let context = self.context.as_mut().ok_or(BridgeError::InvalidHandle)?;
        let bridge = &self.bridge;

        let arena = bridge.arena(Operation::Decrypt);
        metered(&arena, &mut self.last_metrics, |arena| {
            marshal::decrypt(
                bridge.engine(),
                arena,
                bridge.config(),
                &mut context.block,
                message,
            )
        })
    }

    /// Upper bound on plaintext length for `ciphertext_length` bytes.
    pub fn max_plaintext_length(&self, ciphertext_length: usize) -> Result<usize> {
        let context = self.context.as_ref().ok_or(BridgeError::InvalidHandle)?;
        check_size(
            self.bridge
                .engine()
                .max_plaintext_length(&context.block, ciphertext_length),
            "plaintext length bound",
            ciphertext_length,
        )
    }

    pub fn key_length(&self) -> usize {
        self.bridge.key_length()
    }

    /// Clear and free the context. Idempotent.
    pub fn release(&mut self) {
        self.public_key = None;
        match self.context.take() {
            Some(context) => self.bridge.release_context(context),
            None => warn!("release called on a decryption handle that is already released"),
        }
    }
}

impl<E: PkEngine> Drop for PkDecryption<E> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.bridge.release_context(context);
        }
    }
}

impl<E: PkEngine> fmt::Debug for PkDecryption<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PkDecryption");
        match &self.context {
            Some(context) => debug
                .field("context_id", &context.id())
                .field("kind", &context.kind())
                .field("state", &context.state)
                .field("public_key", &self.public_key),
            None => debug.field("state", &"released"),
        };
        debug.finish()
    }
}
