//! # pkbridge-core
//!
//! A safe bridge over an opaque public-key encryption engine.
//!
//! The engine speaks in raw context blocks, caller-sized buffers and a
//! sentinel return value. This crate wraps it in owned handles, typed
//! results and `Result` errors, and makes sure every scratch buffer holding
//! plaintext, keys or randomness is scrubbed before it is released.
//!
//! ## Features
//!
//! | Feature | Description | Default |
//! |:--------|:------------|:-------:|
//! | `ffi` | C ABI (`pkbridge_*`) and header generation | No |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pkbridge_core::Bridge;
//!
//! let bridge = Bridge::new();
//!
//! // Recipient: generate a key pair, publish the public key
//! let mut decryption = bridge.create_decryption().unwrap();
//! let public_key = decryption.generate_key().unwrap();
//!
//! // Sender: encrypt to that key
//! let mut encryption = bridge.create_encryption().unwrap();
//! encryption.set_recipient_key(&public_key).unwrap();
//! let message = encryption.encrypt(b"hello").unwrap();
//!
//! // Recipient: decrypt
//! let plaintext = decryption.decrypt(&message).unwrap();
//! assert_eq!(plaintext, b"hello");
//! ```
//!
//! ## Custom Collaborators
//!
//! ```rust,ignore
//! use pkbridge_core::{Bridge, BridgeConfig, SoftwareEngine};
//!
//! let bridge = Bridge::builder(SoftwareEngine::new())
//!     .allocator(my_locked_allocator)
//!     .random_source(my_hsm_random)
//!     .config(BridgeConfig::default().with_max_plaintext_length(1 << 20))
//!     .build();
//! ```
//!
//! ## Security Properties
//!
//! - **Scrubbing**: context blocks and sensitive scratch buffers are zeroized
//!   on every exit path, including early error returns
//! - **Single-use randomness**: each encrypt/generate call draws fresh bytes
//!   from the randomness source and wipes them right after the engine call
//! - **No aliasing**: the engine only sees bridge-owned copies of caller data
//! - **Unique ownership**: handles are not `Clone`; release is idempotent

// Ambient: configuration, errors, observability
pub mod config;
pub mod error;
pub mod metrics;
pub use config::BridgeConfig;
pub use error::{BridgeError, Operation, Result};
pub use metrics::OperationMetrics;

// Engine contract and the bundled software engine
pub mod engine;
pub use engine::{ENGINE_ERROR, PkEngine, SoftwareEngine};

// Scratch memory and randomness
pub mod random;
pub mod scratch;
pub use random::{RandomSource, SystemRandomSource};
pub use scratch::{BufferKind, ScratchAllocator, SystemAllocator};

// Lifecycle, marshaling and results
pub mod lifecycle;
mod marshal;
pub mod message;
pub mod pk;
pub use lifecycle::{Bridge, BridgeBuilder, ContextKind, ContextState};
pub use message::{EncryptedMessage, PublicKey};
pub use pk::{PkDecryption, PkEncryption};

// C FFI layer (feature-gated)
#[cfg(feature = "ffi")]
pub mod ffi;
#[cfg(feature = "ffi")]
pub use ffi::PkbridgeError;
