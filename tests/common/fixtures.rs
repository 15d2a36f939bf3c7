//! Test fixtures for pkbridge-core tests.
//!
//! Besides plain test data, this module provides collaborators that observe
//! or sabotage the bridge:
//! - [`InstrumentedAllocator`] records every allocation and release and
//!   whether the released memory was scrubbed
//! - [`FailingAllocator`] fails a chosen allocation
//! - [`FailingRandomSource`] never produces randomness
//! - [`CountingEngine`] counts engine calls while delegating to a real engine

use pkbridge_core::{
    Bridge, BridgeError, BufferKind, PkEngine, RandomSource, Result, ScratchAllocator,
    SoftwareEngine, SystemRandomSource,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Common Test Data
// ============================================================================

/// Empty data - boundary case for encrypt
pub const EMPTY_DATA: &[u8] = b"";

/// The canonical example message
pub const HELLO: &[u8] = b"hello";

/// Small data - typical short string
pub const SMALL_DATA: &[u8] = b"hello world";

/// Unicode data - validates arbitrary byte payloads
pub const UNICODE_DATA: &[u8] = "Hello 世界 🚀 Rust".as_bytes();

/// Generate deterministic data of `size` bytes (filled with pattern byte)
pub fn generate_data(size: usize, pattern: u8) -> Vec<u8> {
    vec![pattern; size]
}

// ============================================================================
// Instrumented Allocator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocEvent {
    Allocate { kind: BufferKind, len: usize },
    Release { kind: BufferKind, len: usize, scrubbed: bool },
}

/// Allocator that records every allocation and release
#[derive(Default)]
pub struct InstrumentedAllocator {
    events: Mutex<Vec<AllocEvent>>,
}

impl InstrumentedAllocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<AllocEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn allocations(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, AllocEvent::Allocate { .. }))
            .count()
    }

    pub fn releases(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, AllocEvent::Release { .. }))
            .count()
    }

    /// Allocations not yet released
    pub fn outstanding(&self) -> usize {
        self.allocations() - self.releases()
    }

    /// Releases of buffers of `kind`, as (len, scrubbed)
    pub fn released(&self, kind: BufferKind) -> Vec<(usize, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AllocEvent::Release {
                    kind: k,
                    len,
                    scrubbed,
                } if k == kind => Some((len, scrubbed)),
                _ => None,
            })
            .collect()
    }

    /// Requested lengths of allocations of `kind`
    pub fn allocated(&self, kind: BufferKind) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AllocEvent::Allocate { kind: k, len } if k == kind => Some(len),
                _ => None,
            })
            .collect()
    }
}

impl ScratchAllocator for InstrumentedAllocator {
    fn allocate(&self, kind: BufferKind, len: usize) -> Result<Vec<u8>> {
        self.events
            .lock()
            .unwrap()
            .push(AllocEvent::Allocate { kind, len });
        Ok(vec![0u8; len])
    }

    fn release(&self, kind: BufferKind, buffer: Vec<u8>) {
        let scrubbed = buffer.iter().all(|&b| b == 0);
        self.events.lock().unwrap().push(AllocEvent::Release {
            kind,
            len: buffer.len(),
            scrubbed,
        });
    }
}

// ============================================================================
// Failing Collaborators
// ============================================================================

/// Allocator that fails its `fail_at`-th allocation (0-based) and counts
/// outstanding buffers
pub struct FailingAllocator {
    fail_at: usize,
    allocated: AtomicUsize,
    released: AtomicUsize,
}

impl FailingAllocator {
    pub fn new(fail_at: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_at,
            allocated: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        })
    }

    /// Reset the call counter so the next allocations count from zero
    pub fn rearm(&self) {
        self.allocated.store(0, Ordering::SeqCst);
        self.released.store(0, Ordering::SeqCst);
    }

    pub fn outstanding(&self) -> usize {
        let allocated = self.allocated.load(Ordering::SeqCst);
        let released = self.released.load(Ordering::SeqCst);
        allocated.saturating_sub(released)
    }
}

impl ScratchAllocator for FailingAllocator {
    fn allocate(&self, kind: BufferKind, len: usize) -> Result<Vec<u8>> {
        let index = self.allocated.load(Ordering::SeqCst);
        if index == self.fail_at {
            // Failed attempts are not outstanding
            self.allocated.store(index + 1, Ordering::SeqCst);
            self.released.fetch_add(1, Ordering::SeqCst);
            return Err(BridgeError::Allocation {
                kind,
                requested: len,
            });
        }
        self.allocated.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0u8; len])
    }

    fn release(&self, _kind: BufferKind, _buffer: Vec<u8>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Randomness source that always fails
pub struct FailingRandomSource;

impl RandomSource for FailingRandomSource {
    fn fill(&self, _dest: &mut [u8]) -> Result<()> {
        Err(BridgeError::RandomSource("entropy unavailable".into()))
    }
}

/// Randomness source that can be switched off mid-test
pub struct ToggleRandomSource {
    enabled: AtomicBool,
    inner: SystemRandomSource,
}

impl ToggleRandomSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            enabled: AtomicBool::new(true),
            inner: SystemRandomSource::new(),
        })
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl RandomSource for ToggleRandomSource {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        if !self.enabled.load(Ordering::SeqCst) {
            return Err(BridgeError::RandomSource("source disabled".into()));
        }
        self.inner.fill(dest)
    }
}

// ============================================================================
// Counting Engine
// ============================================================================

/// Engine call counters
#[derive(Debug, Default)]
pub struct EngineCalls {
    pub set_recipient_key: AtomicUsize,
    pub encrypt: AtomicUsize,
    pub generate_key: AtomicUsize,
    pub decrypt: AtomicUsize,
    pub clear: AtomicUsize,
}

impl EngineCalls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Delegates to [`SoftwareEngine`] and counts the calls that do work
#[derive(Debug, Default)]
pub struct CountingEngine {
    inner: SoftwareEngine,
    pub calls: Arc<EngineCalls>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

impl PkEngine for CountingEngine {
    fn encryption_size(&self) -> usize {
        self.inner.encryption_size()
    }

    fn init_encryption(&self, context: &mut [u8]) {
        self.inner.init_encryption(context)
    }

    fn clear_encryption(&self, context: &mut [u8]) {
        bump(&self.calls.clear);
        self.inner.clear_encryption(context)
    }

    fn encryption_last_error(&self, context: &[u8]) -> String {
        self.inner.encryption_last_error(context)
    }

    fn set_recipient_key(&self, context: &mut [u8], key: &[u8]) -> usize {
        bump(&self.calls.set_recipient_key);
        self.inner.set_recipient_key(context, key)
    }

    fn ciphertext_length(&self, context: &[u8], plaintext_length: usize) -> usize {
        self.inner.ciphertext_length(context, plaintext_length)
    }

    fn mac_length(&self, context: &[u8]) -> usize {
        self.inner.mac_length(context)
    }

    fn encrypt_random_length(&self, context: &[u8]) -> usize {
        self.inner.encrypt_random_length(context)
    }

    fn encrypt(
        &self,
        context: &mut [u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
        mac: &mut [u8],
        ephemeral_key: &mut [u8],
        random: &[u8],
    ) -> usize {
        bump(&self.calls.encrypt);
        self.inner
            .encrypt(context, plaintext, ciphertext, mac, ephemeral_key, random)
    }

    fn key_length(&self) -> usize {
        self.inner.key_length()
    }

    fn decryption_size(&self) -> usize {
        self.inner.decryption_size()
    }

    fn init_decryption(&self, context: &mut [u8]) {
        self.inner.init_decryption(context)
    }

    fn clear_decryption(&self, context: &mut [u8]) {
        bump(&self.calls.clear);
        self.inner.clear_decryption(context)
    }

    fn decryption_last_error(&self, context: &[u8]) -> String {
        self.inner.decryption_last_error(context)
    }

    fn generate_key_random_length(&self) -> usize {
        self.inner.generate_key_random_length()
    }

    fn generate_key(&self, context: &mut [u8], public_key: &mut [u8], random: &[u8]) -> usize {
        bump(&self.calls.generate_key);
        self.inner.generate_key(context, public_key, random)
    }

    fn max_plaintext_length(&self, context: &[u8], ciphertext_length: usize) -> usize {
        self.inner.max_plaintext_length(context, ciphertext_length)
    }

    fn decrypt(
        &self,
        context: &mut [u8],
        ephemeral_key: &[u8],
        mac: &[u8],
        ciphertext: &mut [u8],
        plaintext: &mut [u8],
    ) -> usize {
        bump(&self.calls.decrypt);
        self.inner
            .decrypt(context, ephemeral_key, mac, ciphertext, plaintext)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Bridge over the software engine using `allocator`
pub fn bridge_with_allocator(allocator: Arc<dyn ScratchAllocator>) -> Arc<Bridge> {
    Bridge::builder(SoftwareEngine::new())
        .allocator(allocator)
        .build()
}

/// Bridge over a [`CountingEngine`], returning its call counters
pub fn counting_bridge() -> (Arc<Bridge<CountingEngine>>, Arc<EngineCalls>) {
    let engine = CountingEngine::new();
    let calls = Arc::clone(&engine.calls);
    (Bridge::builder(engine).build(), calls)
}
