//! Context lifecycle.
//!
//! A [`Bridge`] bundles an engine with the allocator, randomness source and
//! limits every call uses, and creates contexts. A [`NativeContext`] is one
//! engine-sized block plus the state machine guarding it:
//!
//! ```text
//! Uninitialized -> Created -> KeyConfigured (encryption)
//!                          -> KeyGenerated  (decryption)
//!               any state  -> Released (terminal)
//! ```
//!
//! `Uninitialized` and `Released` have no block: a handle that is not live
//! holds no context at all, so nothing can be freed twice.

use crate::config::BridgeConfig;
use crate::engine::{PkEngine, SoftwareEngine};
use crate::error::{BridgeError, Operation, Result};
use crate::pk::{PkDecryption, PkEncryption};
use crate::random::{RandomSource, SystemRandomSource};
use crate::scratch::{BufferKind, ScratchAllocator, ScratchArena, SystemAllocator};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use zeroize::Zeroize;

/// Process-wide context id source, used for log correlation only
static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Encryption,
    Decryption,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Encryption => "encryption",
            ContextKind::Decryption => "decryption",
        }
    }

    fn create_operation(&self) -> Operation {
        match self {
            ContextKind::Encryption => Operation::CreateEncryption,
            ContextKind::Decryption => Operation::CreateDecryption,
        }
    }
}

/// State of a live context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    Created,
    /// Encryption context with a recipient key installed
    KeyConfigured,
    /// Decryption context with a generated key pair
    KeyGenerated,
}

impl ContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextState::Created => "created",
            ContextState::KeyConfigured => "key_configured",
            ContextState::KeyGenerated => "key_generated",
        }
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An initialized engine context block
pub(crate) struct NativeContext {
    id: u64,
    kind: ContextKind,
    pub(crate) state: ContextState,
    pub(crate) block: Vec<u8>,
}

impl NativeContext {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Fail with `InvalidState` unless the context is in `expected`.
    pub(crate) fn require(&self, operation: Operation, expected: ContextState) -> Result<()> {
        if self.state != expected {
            return Err(BridgeError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for NativeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeContext")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("size", &self.block.len())
            .finish()
    }
}

/// Engine plus the collaborators every bridge call needs.
///
/// Shared through `Arc`; handles created from one bridge are independent of
/// each other and may live on different threads.
pub struct Bridge<E: PkEngine = SoftwareEngine> {
    engine: E,
    allocator: Arc<dyn ScratchAllocator>,
    random: Arc<dyn RandomSource>,
    config: BridgeConfig,
}

impl Bridge<SoftwareEngine> {
    /// Software engine, system allocator and OS randomness with default limits.
    pub fn new() -> Arc<Self> {
        Self::builder(SoftwareEngine::new()).build()
    }
}

impl<E: PkEngine> Bridge<E> {
    pub fn builder(engine: E) -> BridgeBuilder<E> {
        BridgeBuilder {
            engine,
            allocator: None,
            random: None,
            config: BridgeConfig::default(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub(crate) fn random(&self) -> &dyn RandomSource {
        &*self.random
    }

    /// Encoded public/ephemeral key length declared by the engine.
    pub fn key_length(&self) -> usize {
        self.engine.key_length()
    }

    /// Create an encryption context in state `Created`.
    pub fn create_encryption(self: &Arc<Self>) -> Result<PkEncryption<E>> {
        let context = self.create_context(ContextKind::Encryption)?;
        Ok(PkEncryption::from_parts(Arc::clone(self), context))
    }

    /// Create a decryption context in state `Created`.
    pub fn create_decryption(self: &Arc<Self>) -> Result<PkDecryption<E>> {
        let context = self.create_context(ContextKind::Decryption)?;
        Ok(PkDecryption::from_parts(Arc::clone(self), context))
    }

    /// Scratch arena for one call.
    pub(crate) fn arena(&self, operation: Operation) -> ScratchArena<'_> {
        ScratchArena::new(operation, &*self.allocator)
    }

    fn create_context(&self, kind: ContextKind) -> Result<NativeContext> {
        let size = match kind {
            ContextKind::Encryption => self.engine.encryption_size(),
            ContextKind::Decryption => self.engine.decryption_size(),
        };

        let mut block = self
            .allocator
            .allocate(BufferKind::Context, size)
            .inspect_err(|e| {
                debug!(operation = %kind.create_operation(), size, error = %e, "context allocation failed");
            })?;

        match kind {
            ContextKind::Encryption => self.engine.init_encryption(&mut block),
            ContextKind::Decryption => self.engine.init_decryption(&mut block),
        }

        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(context_id = id, kind = kind.as_str(), size, "context created");

        Ok(NativeContext {
            id,
            kind,
            state: ContextState::Created,
            block,
        })
    }

    /// Clear, scrub and free a context block.
    pub(crate) fn release_context(&self, mut context: NativeContext) {
        match context.kind {
            ContextKind::Encryption => self.engine.clear_encryption(&mut context.block),
            ContextKind::Decryption => self.engine.clear_decryption(&mut context.block),
        }
        context.block.as_mut_slice().zeroize();

        debug!(
            context_id = context.id,
            kind = context.kind.as_str(),
            "context released"
        );
        self.allocator
            .release(BufferKind::Context, std::mem::take(&mut context.block));
    }
}

impl<E: PkEngine + fmt::Debug> fmt::Debug for Bridge<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Bridge`]
pub struct BridgeBuilder<E: PkEngine> {
    engine: E,
    allocator: Option<Arc<dyn ScratchAllocator>>,
    random: Option<Arc<dyn RandomSource>>,
    config: BridgeConfig,
}

impl<E: PkEngine> BridgeBuilder<E> {
    /// Use a custom scratch allocator instead of [`SystemAllocator`].
    pub fn allocator(mut self, allocator: Arc<dyn ScratchAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Use a custom randomness source instead of [`SystemRandomSource`].
    pub fn random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Arc<Bridge<E>> {
        let max_allocation = self.config.max_scratch_allocation;
        Arc::new(Bridge {
            engine: self.engine,
            allocator: self
                .allocator
                .unwrap_or_else(|| Arc::new(SystemAllocator::new(max_allocation)) as Arc<dyn ScratchAllocator>),
            random: self
                .random
                .unwrap_or_else(|| Arc::new(SystemRandomSource::new()) as Arc<dyn RandomSource>),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_context_uses_engine_size() {
        let bridge = Bridge::new();
        let encryption = bridge.create_context(ContextKind::Encryption).unwrap();
        assert_eq!(encryption.block.len(), bridge.engine().encryption_size());
        assert_eq!(encryption.state, ContextState::Created);

        let decryption = bridge.create_context(ContextKind::Decryption).unwrap();
        assert_eq!(decryption.block.len(), bridge.engine().decryption_size());
        assert_ne!(encryption.id(), decryption.id());

        bridge.release_context(encryption);
        bridge.release_context(decryption);
    }

    #[test]
    fn test_create_context_allocation_failure() {
        let bridge = Bridge::builder(SoftwareEngine::new())
            .config(BridgeConfig::default().with_max_scratch_allocation(8))
            .build();

        let err = bridge.create_context(ContextKind::Decryption).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Allocation {
                kind: BufferKind::Context,
                ..
            }
        ));
    }

    #[test]
    fn test_require_state() {
        let bridge = Bridge::new();
        let context = bridge.create_context(ContextKind::Encryption).unwrap();
        assert!(context.require(Operation::SetRecipientKey, ContextState::Created).is_ok());
        assert_eq!(
            context.require(Operation::Encrypt, ContextState::KeyConfigured),
            Err(BridgeError::InvalidState {
                operation: Operation::Encrypt,
                state: ContextState::Created
            })
        );
        bridge.release_context(context);
    }

    #[test]
    fn test_state_strings() {
        assert_eq!(ContextState::KeyConfigured.to_string(), "key_configured");
        assert_eq!(ContextKind::Decryption.as_str(), "decryption");
    }
}
