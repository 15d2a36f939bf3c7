//! The engine operation contract.
//!
//! The bridge treats the cryptographic engine as opaque. It only ever:
//! - asks the engine how large a context or buffer must be,
//! - hands it zero-filled blocks and scratch buffers of exactly that size,
//! - reads [`ENGINE_ERROR`] as failure and fetches the context's last error.
//!
//! Contexts are plain byte blocks of `encryption_size()` / `decryption_size()`
//! bytes. Their layout belongs to the engine.

pub mod software;

pub use software::SoftwareEngine;

/// Sentinel return value signaling engine failure.
pub const ENGINE_ERROR: usize = usize::MAX;

/// A public-key encryption engine.
///
/// Operations that can fail return [`ENGINE_ERROR`] and record a description
/// retrievable through the matching `*_last_error` accessor. Size queries
/// return [`ENGINE_ERROR`] only when the input length is unrepresentable.
pub trait PkEngine: Send + Sync {
    // ------------------------------------------------------------------
    // Encryption contexts
    // ------------------------------------------------------------------

    /// Bytes needed for an encryption context block.
    fn encryption_size(&self) -> usize;

    /// Initialize a fresh, zero-filled encryption block.
    fn init_encryption(&self, context: &mut [u8]);

    /// Wipe all key material held by an encryption block.
    fn clear_encryption(&self, context: &mut [u8]);

    /// Description of the last failure on this encryption block.
    fn encryption_last_error(&self, context: &[u8]) -> String;

    /// Install the recipient's public key.
    fn set_recipient_key(&self, context: &mut [u8], key: &[u8]) -> usize;

    /// Ciphertext length for a plaintext of `plaintext_length` bytes.
    fn ciphertext_length(&self, context: &[u8], plaintext_length: usize) -> usize;

    /// MAC length in bytes (textual, terminator excluded).
    fn mac_length(&self, context: &[u8]) -> usize;

    /// Random bytes consumed by one `encrypt` call.
    fn encrypt_random_length(&self, context: &[u8]) -> usize;

    /// Encrypt `plaintext` to the configured recipient.
    ///
    /// Returns the number of ciphertext bytes written.
    fn encrypt(
        &self,
        context: &mut [u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
        mac: &mut [u8],
        ephemeral_key: &mut [u8],
        random: &[u8],
    ) -> usize;

    /// Length of an encoded public or ephemeral key.
    fn key_length(&self) -> usize;

    // ------------------------------------------------------------------
    // Decryption contexts
    // ------------------------------------------------------------------

    /// Bytes needed for a decryption context block.
    fn decryption_size(&self) -> usize;

    fn init_decryption(&self, context: &mut [u8]);

    fn clear_decryption(&self, context: &mut [u8]);

    fn decryption_last_error(&self, context: &[u8]) -> String;

    /// Random bytes consumed by one `generate_key` call.
    fn generate_key_random_length(&self) -> usize;

    /// Generate the context's key pair and write the encoded public key.
    fn generate_key(&self, context: &mut [u8], public_key: &mut [u8], random: &[u8]) -> usize;

    /// Upper bound on plaintext length for `ciphertext_length` input bytes.
    fn max_plaintext_length(&self, context: &[u8], ciphertext_length: usize) -> usize;

    /// Decrypt into `plaintext`, returning the true plaintext length.
    ///
    /// `ciphertext` may be modified in place.
    fn decrypt(
        &self,
        context: &mut [u8],
        ephemeral_key: &[u8],
        mac: &[u8],
        ciphertext: &mut [u8],
        plaintext: &mut [u8],
    ) -> usize;
}
