//! Scratch buffers for engine calls.
//!
//! Every buffer handed to the engine is allocated through a [`ScratchArena`]
//! owned by exactly one bridge call. Buffers are RAII guards: whichever step
//! of a call fails, everything allocated so far is released exactly once when
//! the guards go out of scope.
//!
//! Secret-bearing buffers (see [`BufferKind::is_sensitive`]) are overwritten
//! with zeroes before the allocator gets them back. Randomness is never
//! returned to the allocator with its contents intact.

use crate::config::DEFAULT_MAX_SCRATCH_ALLOCATION;
use crate::error::{BridgeError, Operation, Result};
use crate::metrics::OperationMetrics;
use crate::random::RandomSource;
use std::cell::Cell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroize;

/// What a scratch buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Engine context block
    Context,
    /// Caller input copied in (plaintext to encrypt, MAC, ephemeral key)
    Input,
    /// Recipient key copied in
    Key,
    /// Decrypted output
    Plaintext,
    /// Encrypted output, or the working copy handed to decrypt
    Ciphertext,
    Mac,
    EphemeralKey,
    PublicKey,
    /// Randomness consumed by exactly one engine call
    Random,
}

impl BufferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferKind::Context => "context",
            BufferKind::Input => "input",
            BufferKind::Key => "key",
            BufferKind::Plaintext => "plaintext",
            BufferKind::Ciphertext => "ciphertext",
            BufferKind::Mac => "mac",
            BufferKind::EphemeralKey => "ephemeral_key",
            BufferKind::PublicKey => "public_key",
            BufferKind::Random => "random",
        }
    }

    /// Buffers zeroized before release.
    pub fn is_sensitive(&self) -> bool {
        matches!(
            self,
            BufferKind::Context
                | BufferKind::Input
                | BufferKind::Key
                | BufferKind::Plaintext
                | BufferKind::Random
        )
    }
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of scratch memory.
///
/// `allocate` must return a zero-filled buffer of exactly `len` bytes.
/// `release` receives every buffer back exactly once; sensitive buffers
/// arrive already zeroed.
pub trait ScratchAllocator: Send + Sync {
    fn allocate(&self, kind: BufferKind, len: usize) -> Result<Vec<u8>>;

    fn release(&self, kind: BufferKind, buffer: Vec<u8>) {
        let _ = kind;
        drop(buffer);
    }
}

/// Heap allocator with fallible reservation and a per-allocation ceiling
#[derive(Debug, Clone)]
pub struct SystemAllocator {
    max_allocation: usize,
}

impl SystemAllocator {
    pub fn new(max_allocation: usize) -> Self {
        Self { max_allocation }
    }

    pub fn max_allocation(&self) -> usize {
        self.max_allocation
    }
}

impl Default for SystemAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SCRATCH_ALLOCATION)
    }
}

impl ScratchAllocator for SystemAllocator {
    fn allocate(&self, kind: BufferKind, len: usize) -> Result<Vec<u8>> {
        if len > self.max_allocation {
            warn!(%kind, len, limit = self.max_allocation, "scratch allocation over limit");
            return Err(BridgeError::Allocation {
                kind,
                requested: len,
            });
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| BridgeError::Allocation {
                kind,
                requested: len,
            })?;
        buffer.resize(len, 0);
        Ok(buffer)
    }
}

/// A scratch buffer on loan from an arena.
///
/// Textual buffers carry one extra trailing NUL byte that the engine never
/// writes; [`ScratchBuffer::payload_mut`] excludes it.
pub struct ScratchBuffer<'a> {
    kind: BufferKind,
    data: Vec<u8>,
    terminated: bool,
    allocator: &'a dyn ScratchAllocator,
}

impl ScratchBuffer<'_> {
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Length visible to the engine (terminator excluded).
    pub fn payload_len(&self) -> usize {
        self.data.len() - usize::from(self.terminated)
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.payload_len()]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.payload_len();
        &mut self.data[..len]
    }

    /// Read a textual buffer up to its first NUL.
    pub fn text(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        let payload = self.payload();
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        std::str::from_utf8(&payload[..end])
    }
}

impl Deref for ScratchBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for ScratchBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for ScratchBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents are never printed.
        f.debug_struct("ScratchBuffer")
            .field("kind", &self.kind)
            .field("len", &self.data.len())
            .field("terminated", &self.terminated)
            .finish()
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        if self.kind.is_sensitive() {
            // Zero in place, keeping the length so the allocator gets the
            // whole region back.
            self.data.as_mut_slice().zeroize();
        }
        self.allocator
            .release(self.kind, std::mem::take(&mut self.data));
    }
}

/// Per-call owner of scratch allocations
pub struct ScratchArena<'a> {
    operation: Operation,
    allocator: &'a dyn ScratchAllocator,
    allocations: Cell<usize>,
    bytes: Cell<usize>,
    random_bytes: Cell<usize>,
}

impl<'a> ScratchArena<'a> {
    pub fn new(operation: Operation, allocator: &'a dyn ScratchAllocator) -> Self {
        Self {
            operation,
            allocator,
            allocations: Cell::new(0),
            bytes: Cell::new(0),
            random_bytes: Cell::new(0),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Allocate a zero-filled buffer of exactly `len` bytes.
    pub fn alloc(&self, kind: BufferKind, len: usize) -> Result<ScratchBuffer<'a>> {
        self.alloc_inner(kind, len, false)
    }

    /// Allocate a textual buffer: `len` payload bytes plus a NUL terminator.
    pub fn alloc_text(&self, kind: BufferKind, len: usize) -> Result<ScratchBuffer<'a>> {
        let total = len.checked_add(1).ok_or(BridgeError::Allocation {
            kind,
            requested: len,
        })?;
        self.alloc_inner(kind, total, true)
    }

    /// Copy caller bytes into a new buffer the engine may own for the call.
    pub fn copy_in(&self, kind: BufferKind, bytes: &[u8]) -> Result<ScratchBuffer<'a>> {
        let mut buffer = self.alloc(kind, bytes.len())?;
        buffer.copy_from_slice(bytes);
        Ok(buffer)
    }

    /// Allocate and fill a randomness buffer for one engine call.
    ///
    /// If the source fails the buffer is zeroed and released before the
    /// error is returned.
    pub fn random(&self, len: usize, source: &dyn RandomSource) -> Result<ScratchBuffer<'a>> {
        let mut buffer = self.alloc(BufferKind::Random, len)?;
        source.fill(&mut buffer)?;
        self.random_bytes.set(self.random_bytes.get() + len);
        Ok(buffer)
    }

    fn alloc_inner(&self, kind: BufferKind, len: usize, terminated: bool) -> Result<ScratchBuffer<'a>> {
        let data = self.allocator.allocate(kind, len).inspect_err(|_| {
            debug!(operation = %self.operation, %kind, len, "scratch allocation failed");
        })?;
        debug_assert_eq!(data.len(), len);

        self.allocations.set(self.allocations.get() + 1);
        self.bytes.set(self.bytes.get() + len);

        Ok(ScratchBuffer {
            kind,
            data,
            terminated,
            allocator: self.allocator,
        })
    }

    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    pub fn bytes(&self) -> usize {
        self.bytes.get()
    }

    /// Snapshot of this call's resource usage.
    pub fn metrics(&self, elapsed: Duration, succeeded: bool) -> OperationMetrics {
        OperationMetrics::new(self.operation)
            .with_duration(elapsed)
            .with_scratch(self.allocations.get(), self.bytes.get())
            .with_random(self.random_bytes.get())
            .with_outcome(succeeded)
    }
}
