//! C FFI layer for pkbridge-core
//!
//! Exposes the encryption and decryption handles through opaque pointers.
//! All functions use `#[repr(C)]` types and panic-safe wrappers.

pub mod error;
pub mod handles;
pub mod pk;

pub use error::PkbridgeError;
pub use handles::*;

// Re-export FFI functions for C clients
pub use pk::{
    pkbridge_decrypt, pkbridge_decryption_free, pkbridge_decryption_new, pkbridge_encrypt,
    pkbridge_encryption_free, pkbridge_encryption_new, pkbridge_encryption_set_recipient_key,
    pkbridge_generate_key, pkbridge_key_length, pkbridge_last_error_message,
    pkbridge_max_plaintext_length,
};
