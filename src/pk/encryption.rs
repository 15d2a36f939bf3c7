use super::metered;
use crate::engine::{PkEngine, SoftwareEngine};
use crate::error::{BridgeError, Operation, Result, check_size};
use crate::lifecycle::{Bridge, ContextState, NativeContext};
use crate::marshal;
use crate::message::EncryptedMessage;
use crate::metrics::OperationMetrics;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handle to one encryption context.
///
/// Lifecycle: `Created` -> `set_recipient_key` -> `KeyConfigured`. Encrypt is
/// only accepted once a recipient key is installed; a second
/// `set_recipient_key` replaces the key.
pub struct PkEncryption<E: PkEngine = SoftwareEngine> {
    bridge: Arc<Bridge<E>>,
    context: Option<NativeContext>,
    last_metrics: Option<OperationMetrics>,
}

impl<E: PkEngine> PkEncryption<E> {
    pub(crate) fn from_parts(bridge: Arc<Bridge<E>>, context: NativeContext) -> Self {
        Self {
            bridge,
            context: Some(context),
            last_metrics: None,
        }
    }

    /// Current state, or `None` once released.
    pub fn state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|context| context.state)
    }

    pub fn is_live(&self) -> bool {
        self.context.is_some()
    }

    /// Metrics of the most recent call made through this handle.
    pub fn last_metrics(&self) -> Option<&OperationMetrics> {
        self.last_metrics.as_ref()
    }

    /// Install the recipient's public key.
    ///
    /// On failure the context keeps its previous state and key.
    pub fn set_recipient_key(&mut self, key: impl AsRef<[u8]>) -> Result<()> {
        let context = self.context.as_mut().ok_or(BridgeError::InvalidHandle)?;
        let bridge = &self.bridge;

        let arena = bridge.arena(Operation::SetRecipientKey);
        metered(&arena, &mut self.last_metrics, |arena| {
            marshal::set_recipient_key(bridge.engine(), arena, &mut context.block, key.as_ref())
        })?;

        context.state = ContextState::KeyConfigured;
        debug!(context_id = context.id(), "recipient key installed");
        Ok(())
    }

    /// Encrypt `plaintext` to the installed recipient key.
    pub fn encrypt(&mut self, plaintext: impl AsRef<[u8]>) -> Result<EncryptedMessage> {
        let context = self.context.as_mut().ok_or(BridgeError::InvalidHandle)?;
        context.require(Operation::Encrypt, ContextState::KeyConfigured)?;
        let bridge = &self.bridge;

        let arena = bridge.arena(Operation::Encrypt);
        metered(&arena, &mut self.last_metrics, |arena| {
            marshal::encrypt(
                bridge.engine(),
                arena,
                bridge.random(),
                bridge.config(),
                &mut context.block,
                plaintext.as_ref(),
            )
        })
    }

    /// Ciphertext length the engine produces for `plaintext_length` bytes.
    pub fn ciphertext_length(&self, plaintext_length: usize) -> Result<usize> {
        let context = self.context.as_ref().ok_or(BridgeError::InvalidHandle)?;
        check_size(
            self.bridge
                .engine()
                .ciphertext_length(&context.block, plaintext_length),
            "ciphertext length",
            plaintext_length,
        )
    }

    /// Textual MAC length, terminator excluded.
    pub fn mac_length(&self) -> Result<usize> {
        let context = self.context.as_ref().ok_or(BridgeError::InvalidHandle)?;
        Ok(self.bridge.engine().mac_length(&context.block))
    }

    /// Textual ephemeral key length, terminator excluded.
    pub fn key_length(&self) -> usize {
        self.bridge.key_length()
    }

    /// Clear and free the context.
    ///
    /// Idempotent: releasing an already released handle only logs a warning.
    pub fn release(&mut self) {
        match self.context.take() {
            Some(context) => self.bridge.release_context(context),
            None => warn!("release called on an encryption handle that is already released"),
        }
    }
}

impl<E: PkEngine> Drop for PkEncryption<E> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.bridge.release_context(context);
        }
    }
}

impl<E: PkEngine> fmt::Debug for PkEncryption<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PkEncryption");
        match &self.context {
            Some(context) => debug
                .field("context_id", &context.id())
                .field("kind", &context.kind())
                .field("state", &context.state),
            None => debug.field("state", &"released"),
        };
        debug.finish()
    }
}
