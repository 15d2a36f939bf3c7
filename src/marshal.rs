//! Buffer marshaling between caller-owned values and engine scratch buffers.
//!
//! Every buffer is sized from an engine size query for the live context and
//! the actual input length. Caller memory is copied into scratch buffers
//! before the engine runs, and outputs are copied back into owned values
//! after it returns, so the engine never observes memory it does not own.
//!
//! All buffers of one call come from one [`ScratchArena`]. Each is an RAII
//! guard, so an early `?` return releases everything allocated so far.

use crate::config::BridgeConfig;
use crate::engine::PkEngine;
use crate::error::{BridgeError, Operation, Result, check_engine, check_size};
use crate::message::{EncryptedMessage, PublicKey};
use crate::random::RandomSource;
use crate::scratch::{BufferKind, ScratchArena};
use tracing::{debug, warn};

/// Install a recipient key in an encryption context.
pub(crate) fn set_recipient_key<E: PkEngine>(
    engine: &E,
    arena: &ScratchArena<'_>,
    context: &mut [u8],
    key: &[u8],
) -> Result<()> {
    if key.is_empty() {
        return Err(BridgeError::InvalidInput("invalid key: empty".into()));
    }

    let key_buffer = arena.copy_in(BufferKind::Key, key)?;
    let ret = engine.set_recipient_key(context, &key_buffer);
    check_engine(ret, Operation::SetRecipientKey, || {
        engine.encryption_last_error(context)
    })?;
    Ok(())
}

/// Encrypt `plaintext` with a configured encryption context.
pub(crate) fn encrypt<E: PkEngine>(
    engine: &E,
    arena: &ScratchArena<'_>,
    random: &dyn RandomSource,
    config: &BridgeConfig,
    context: &mut [u8],
    plaintext: &[u8],
) -> Result<EncryptedMessage> {
    if plaintext.len() > config.max_plaintext_length {
        return Err(BridgeError::InvalidInput(format!(
            "plaintext of {} bytes exceeds limit of {}",
            plaintext.len(),
            config.max_plaintext_length
        )));
    }

    let ciphertext_length = check_size(
        engine.ciphertext_length(context, plaintext.len()),
        "ciphertext length",
        plaintext.len(),
    )?;
    let mac_length = engine.mac_length(context);
    let ephemeral_length = engine.key_length();
    let random_length = engine.encrypt_random_length(context);
    debug!(
        plaintext_length = plaintext.len(),
        ciphertext_length, mac_length, ephemeral_length, random_length, "encrypt buffer sizes"
    );

    let input = arena.copy_in(BufferKind::Input, plaintext)?;
    let mut ciphertext = arena.alloc(BufferKind::Ciphertext, ciphertext_length)?;
    let mut mac = arena.alloc_text(BufferKind::Mac, mac_length)?;
    let mut ephemeral_key = arena.alloc_text(BufferKind::EphemeralKey, ephemeral_length)?;
    let random_buffer = arena.random(random_length, random)?;

    let ret = engine.encrypt(
        context,
        &input,
        &mut ciphertext,
        mac.payload_mut(),
        ephemeral_key.payload_mut(),
        &random_buffer,
    );
    // Single use: scrubbed and released before the result is inspected.
    drop(random_buffer);

    let written = check_engine(ret, Operation::Encrypt, || {
        engine.encryption_last_error(context)
    })?;
    if written != ciphertext_length {
        warn!(written, ciphertext_length, "engine ciphertext length differs from its size query");
        return Err(BridgeError::Engine {
            operation: Operation::Encrypt,
            message: format!(
                "engine wrote {written} ciphertext bytes, {ciphertext_length} declared"
            ),
        });
    }

    EncryptedMessage::from_scratch(&ciphertext, &mac, &ephemeral_key)
}

/// Decrypt `message` with a decryption context.
pub(crate) fn decrypt<E: PkEngine>(
    engine: &E,
    arena: &ScratchArena<'_>,
    config: &BridgeConfig,
    context: &mut [u8],
    message: &EncryptedMessage,
) -> Result<Vec<u8>> {
    message.validate()?;
    if message.ciphertext.len() > config.max_ciphertext_length {
        return Err(BridgeError::InvalidInput(format!(
            "ciphertext of {} bytes exceeds limit of {}",
            message.ciphertext.len(),
            config.max_ciphertext_length
        )));
    }

    let ciphertext_length = message.ciphertext.len();
    let max_plaintext_length = check_size(
        engine.max_plaintext_length(context, ciphertext_length),
        "plaintext length bound",
        ciphertext_length,
    )?;
    debug!(ciphertext_length, max_plaintext_length, "decrypt buffer sizes");

    let mut plaintext = arena.alloc(BufferKind::Plaintext, max_plaintext_length)?;
    // The engine may decrypt in place; the caller's ciphertext stays untouched.
    let mut ciphertext = arena.copy_in(BufferKind::Ciphertext, &message.ciphertext)?;
    let mac = arena.copy_in(BufferKind::Mac, message.mac.as_bytes())?;
    let ephemeral_key = arena.copy_in(BufferKind::EphemeralKey, message.ephemeral_key.as_bytes())?;

    let ret = engine.decrypt(context, &ephemeral_key, &mac, &mut ciphertext, &mut plaintext);
    let length = check_engine(ret, Operation::Decrypt, || {
        engine.decryption_last_error(context)
    })?;

    if length > max_plaintext_length {
        return Err(BridgeError::Engine {
            operation: Operation::Decrypt,
            message: format!(
                "engine reported {length} plaintext bytes for a {max_plaintext_length} byte buffer"
            ),
        });
    }

    debug!(plaintext_length = length, "decrypt succeeded");
    Ok(plaintext[..length].to_vec())
}

/// Generate the key pair of a decryption context.
pub(crate) fn generate_key<E: PkEngine>(
    engine: &E,
    arena: &ScratchArena<'_>,
    random: &dyn RandomSource,
    context: &mut [u8],
) -> Result<PublicKey> {
    let random_length = engine.generate_key_random_length();
    let public_key_length = engine.key_length();
    debug!(random_length, public_key_length, "generate key buffer sizes");

    let mut public_key = arena.alloc(BufferKind::PublicKey, public_key_length)?;
    let random_buffer = arena.random(random_length, random)?;

    let ret = engine.generate_key(context, public_key.payload_mut(), &random_buffer);
    drop(random_buffer);

    check_engine(ret, Operation::GenerateKey, || {
        engine.decryption_last_error(context)
    })?;

    Ok(PublicKey::from_scratch(&public_key, public_key_length))
}
