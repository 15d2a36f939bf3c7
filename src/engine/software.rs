//! Software public-key engine.
//!
//! Composes library primitives into an ECIES-style scheme:
//!
//! - X25519 (`x25519-dalek`) between a per-message ephemeral key and the
//!   recipient key,
//! - HKDF-SHA256 over the shared secret into a 256-bit key and 96-bit nonce,
//! - AES-256-GCM (`ring`) with the ephemeral public key as AAD; the 16-byte
//!   tag is the MAC.
//!
//! Keys, MACs and ciphertexts are unpadded standard base64 text, so MAC and
//! ephemeral key are textual outputs and ciphertext length is a function of
//! plaintext length.
//!
//! # Layouts
//!
//! ```text
//! encryption context: [last_error(1)][has_key(1)][recipient_public(32)]
//! decryption context: [last_error(1)][has_key(1)][private(32)][public(32)]
//! sealed body:        [version(1)][plaintext(n)]
//! ```
//!
//! The version byte is sealed with the plaintext, so the ciphertext of an
//! empty plaintext is still non-empty.

use crate::engine::{ENGINE_ERROR, PkEngine};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::{DecodeSliceError, Engine as _};
use hkdf::Hkdf;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

/// Raw X25519 key length
const CURVE25519_KEY_LENGTH: usize = 32;

/// AES-GCM tag length, the raw MAC
const MAC_RAW_LENGTH: usize = 16;

/// AES-256 key length
const AES_KEY_LENGTH: usize = 32;

/// HKDF info string binding derived keys to this scheme
const MESSAGE_KEYS_INFO: &[u8] = b"PKBRIDGE_MESSAGE_KEYS_V1";

/// Leading byte of every sealed body
const MESSAGE_VERSION: u8 = 1;

/// Scratch space large enough to base64-decode any key or MAC
const DECODE_SCRATCH: usize = 48;

const ERROR_OFFSET: usize = 0;
const HAS_KEY_OFFSET: usize = 1;
const KEY_OFFSET: usize = 2;

const ENCRYPTION_SIZE: usize = KEY_OFFSET + CURVE25519_KEY_LENGTH;
const DECRYPTION_SIZE: usize = KEY_OFFSET + 2 * CURVE25519_KEY_LENGTH;

/// Failure codes kept in a context's first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SoftwareError {
    Success = 0,
    NotEnoughRandom = 1,
    OutputBufferTooSmall = 2,
    InputBufferTooSmall = 3,
    InvalidBase64 = 4,
    BadMessageKey = 5,
    BadMessageMac = 6,
    MissingKey = 7,
    BadContext = 8,
    KeyDerivationFailed = 9,
    BadKeyLength = 10,
    BadMessageVersion = 11,
}

impl SoftwareError {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoftwareError::Success => "SUCCESS",
            SoftwareError::NotEnoughRandom => "NOT_ENOUGH_RANDOM",
            SoftwareError::OutputBufferTooSmall => "OUTPUT_BUFFER_TOO_SMALL",
            SoftwareError::InputBufferTooSmall => "INPUT_BUFFER_TOO_SMALL",
            SoftwareError::InvalidBase64 => "INVALID_BASE64",
            SoftwareError::BadMessageKey => "BAD_MESSAGE_KEY",
            SoftwareError::BadMessageMac => "BAD_MESSAGE_MAC",
            SoftwareError::MissingKey => "MISSING_KEY",
            SoftwareError::BadContext => "BAD_CONTEXT",
            SoftwareError::KeyDerivationFailed => "KEY_DERIVATION_FAILED",
            SoftwareError::BadKeyLength => "BAD_KEY_LENGTH",
            SoftwareError::BadMessageVersion => "BAD_MESSAGE_VERSION",
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => SoftwareError::Success,
            1 => SoftwareError::NotEnoughRandom,
            2 => SoftwareError::OutputBufferTooSmall,
            3 => SoftwareError::InputBufferTooSmall,
            4 => SoftwareError::InvalidBase64,
            5 => SoftwareError::BadMessageKey,
            6 => SoftwareError::BadMessageMac,
            7 => SoftwareError::MissingKey,
            9 => SoftwareError::KeyDerivationFailed,
            10 => SoftwareError::BadKeyLength,
            11 => SoftwareError::BadMessageVersion,
            _ => SoftwareError::BadContext,
        }
    }
}

type EngineResult<T> = Result<T, SoftwareError>;

/// X25519 + HKDF-SHA256 + AES-256-GCM engine
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareEngine;

impl SoftwareEngine {
    pub fn new() -> Self {
        SoftwareEngine
    }

    /// Record `result` in the context and map it to a return value.
    fn finish(context: &mut [u8], result: EngineResult<usize>) -> usize {
        let code = match result {
            Ok(_) => SoftwareError::Success,
            Err(e) => e,
        };
        if let Some(slot) = context.get_mut(ERROR_OFFSET) {
            *slot = code as u8;
        }
        result.unwrap_or(ENGINE_ERROR)
    }

    fn last_error(context: &[u8], size: usize) -> String {
        if context.len() != size {
            return SoftwareError::BadContext.as_str().to_string();
        }
        SoftwareError::from_code(context[ERROR_OFFSET])
            .as_str()
            .to_string()
    }

    fn encrypt_inner(
        context: &[u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
        mac: &mut [u8],
        ephemeral_key: &mut [u8],
        random: &[u8],
    ) -> EngineResult<usize> {
        if context.len() != ENCRYPTION_SIZE {
            return Err(SoftwareError::BadContext);
        }
        if context[HAS_KEY_OFFSET] == 0 {
            return Err(SoftwareError::MissingKey);
        }
        if random.len() < CURVE25519_KEY_LENGTH {
            return Err(SoftwareError::NotEnoughRandom);
        }

        let ciphertext_length =
            sealed_length(plaintext.len()).ok_or(SoftwareError::InputBufferTooSmall)?;
        if ciphertext.len() < ciphertext_length
            || mac.len() < encoded_length(MAC_RAW_LENGTH)
            || ephemeral_key.len() < encoded_length(CURVE25519_KEY_LENGTH)
        {
            return Err(SoftwareError::OutputBufferTooSmall);
        }

        let recipient = PublicKey::from(read_key(context, KEY_OFFSET));
        let ephemeral_secret = StaticSecret::from(read_key(random, 0));
        let ephemeral_public = PublicKey::from(&ephemeral_secret);
        let shared = ephemeral_secret.diffie_hellman(&recipient);

        let (key, nonce) = message_keys(shared.as_bytes())?;

        let mut sealed = Zeroizing::new(Vec::with_capacity(plaintext.len() + 1));
        sealed.push(MESSAGE_VERSION);
        sealed.extend_from_slice(plaintext);
        let tag = key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::from(ephemeral_public.as_bytes()),
                &mut sealed,
            )
            .map_err(|_| SoftwareError::InputBufferTooSmall)?;

        let written = encode_into(&sealed, ciphertext)?;
        encode_into(tag.as_ref(), mac)?;
        encode_into(ephemeral_public.as_bytes(), ephemeral_key)?;

        Ok(written)
    }

    fn generate_key_inner(
        context: &mut [u8],
        public_key: &mut [u8],
        random: &[u8],
    ) -> EngineResult<usize> {
        if context.len() != DECRYPTION_SIZE {
            return Err(SoftwareError::BadContext);
        }
        if random.len() < CURVE25519_KEY_LENGTH {
            return Err(SoftwareError::NotEnoughRandom);
        }
        let key_length = encoded_length(CURVE25519_KEY_LENGTH);
        if public_key.len() < key_length {
            return Err(SoftwareError::OutputBufferTooSmall);
        }

        let mut private = read_key(random, 0);
        let secret = StaticSecret::from(private);
        let public = PublicKey::from(&secret);

        let private_range = KEY_OFFSET..KEY_OFFSET + CURVE25519_KEY_LENGTH;
        let public_range = private_range.end..private_range.end + CURVE25519_KEY_LENGTH;
        context[private_range].copy_from_slice(&private);
        context[public_range].copy_from_slice(public.as_bytes());
        context[HAS_KEY_OFFSET] = 1;
        private.zeroize();

        encode_into(public.as_bytes(), public_key)
    }

    fn decrypt_inner(
        context: &[u8],
        ephemeral_key: &[u8],
        mac: &[u8],
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> EngineResult<usize> {
        if context.len() != DECRYPTION_SIZE {
            return Err(SoftwareError::BadContext);
        }
        if context[HAS_KEY_OFFSET] == 0 {
            return Err(SoftwareError::MissingKey);
        }

        let ephemeral: [u8; CURVE25519_KEY_LENGTH] = decode_exact(ephemeral_key)
            .ok_or(SoftwareError::BadMessageKey)??;
        let tag: [u8; MAC_RAW_LENGTH] = decode_exact(mac).ok_or(SoftwareError::BadMessageMac)??;

        let mut sealed = Zeroizing::new(vec![
            0u8;
            base64::decoded_len_estimate(ciphertext.len())
                + MAC_RAW_LENGTH
        ]);
        let body_length = STANDARD_NO_PAD
            .decode_slice(ciphertext, &mut sealed[..])
            .map_err(decode_error)?;
        if body_length == 0 {
            return Err(SoftwareError::InputBufferTooSmall);
        }
        if plaintext.len() < body_length - 1 {
            return Err(SoftwareError::OutputBufferTooSmall);
        }
        sealed.truncate(body_length);
        sealed.extend_from_slice(&tag);

        let secret = StaticSecret::from(read_key(context, KEY_OFFSET));
        let shared = secret.diffie_hellman(&PublicKey::from(ephemeral));
        let (key, nonce) = message_keys(shared.as_bytes())?;

        let opened = key
            .open_in_place(
                Nonce::assume_unique_for_key(nonce),
                Aad::from(&ephemeral),
                &mut sealed,
            )
            .map_err(|_| SoftwareError::BadMessageMac)?;

        let (version, body) = opened
            .split_first()
            .ok_or(SoftwareError::InputBufferTooSmall)?;
        if *version != MESSAGE_VERSION {
            return Err(SoftwareError::BadMessageVersion);
        }
        plaintext[..body.len()].copy_from_slice(body);
        Ok(body.len())
    }
}

impl PkEngine for SoftwareEngine {
    fn encryption_size(&self) -> usize {
        ENCRYPTION_SIZE
    }

    fn init_encryption(&self, context: &mut [u8]) {
        context.fill(0);
    }

    fn clear_encryption(&self, context: &mut [u8]) {
        context.zeroize();
    }

    fn encryption_last_error(&self, context: &[u8]) -> String {
        Self::last_error(context, ENCRYPTION_SIZE)
    }

    fn set_recipient_key(&self, context: &mut [u8], key: &[u8]) -> usize {
        let result = if context.len() != ENCRYPTION_SIZE {
            Err(SoftwareError::BadContext)
        } else if key.len() < self.key_length() {
            Err(SoftwareError::InputBufferTooSmall)
        } else if key.len() > self.key_length() {
            Err(SoftwareError::BadKeyLength)
        } else {
            decode_exact::<CURVE25519_KEY_LENGTH>(key)
                .ok_or(SoftwareError::InvalidBase64)
                .and_then(|decoded| decoded)
                .map(|recipient| {
                    context[KEY_OFFSET..].copy_from_slice(&recipient);
                    context[HAS_KEY_OFFSET] = 1;
                    0
                })
        };
        Self::finish(context, result)
    }

    fn ciphertext_length(&self, _context: &[u8], plaintext_length: usize) -> usize {
        sealed_length(plaintext_length).unwrap_or(ENGINE_ERROR)
    }

    fn mac_length(&self, _context: &[u8]) -> usize {
        encoded_length(MAC_RAW_LENGTH)
    }

    fn encrypt_random_length(&self, _context: &[u8]) -> usize {
        CURVE25519_KEY_LENGTH
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
        let result = Self::encrypt_inner(context, plaintext, ciphertext, mac, ephemeral_key, random);
        Self::finish(context, result)
    }

    fn key_length(&self) -> usize {
        encoded_length(CURVE25519_KEY_LENGTH)
    }

    fn decryption_size(&self) -> usize {
        DECRYPTION_SIZE
    }

    fn init_decryption(&self, context: &mut [u8]) {
        context.fill(0);
    }

    fn clear_decryption(&self, context: &mut [u8]) {
        context.zeroize();
    }

    fn decryption_last_error(&self, context: &[u8]) -> String {
        Self::last_error(context, DECRYPTION_SIZE)
    }

    fn generate_key_random_length(&self) -> usize {
        CURVE25519_KEY_LENGTH
    }

    fn generate_key(&self, context: &mut [u8], public_key: &mut [u8], random: &[u8]) -> usize {
        let result = Self::generate_key_inner(context, public_key, random);
        Self::finish(context, result)
    }

    fn max_plaintext_length(&self, _context: &[u8], ciphertext_length: usize) -> usize {
        base64::decoded_len_estimate(ciphertext_length).saturating_sub(1)
    }

    fn decrypt(
        &self,
        context: &mut [u8],
        ephemeral_key: &[u8],
        mac: &[u8],
        ciphertext: &mut [u8],
        plaintext: &mut [u8],
    ) -> usize {
        let result = Self::decrypt_inner(context, ephemeral_key, mac, ciphertext, plaintext);
        Self::finish(context, result)
    }
}

/// Unpadded base64 length of `raw` bytes; only called on small constants.
fn encoded_length(raw: usize) -> usize {
    base64::encoded_len(raw, false).unwrap_or(ENGINE_ERROR)
}

/// Encoded length of a sealed body holding `plaintext_length` bytes.
fn sealed_length(plaintext_length: usize) -> Option<usize> {
    plaintext_length
        .checked_add(1)
        .and_then(|body| base64::encoded_len(body, false))
}

fn read_key(source: &[u8], offset: usize) -> [u8; CURVE25519_KEY_LENGTH] {
    let mut key = [0u8; CURVE25519_KEY_LENGTH];
    key.copy_from_slice(&source[offset..offset + CURVE25519_KEY_LENGTH]);
    key
}

fn encode_into(raw: &[u8], output: &mut [u8]) -> EngineResult<usize> {
    STANDARD_NO_PAD
        .encode_slice(raw, output)
        .map_err(|_| SoftwareError::OutputBufferTooSmall)
}

fn decode_error(e: DecodeSliceError) -> SoftwareError {
    match e {
        DecodeSliceError::OutputSliceTooSmall => SoftwareError::OutputBufferTooSmall,
        DecodeSliceError::DecodeError(_) => SoftwareError::InvalidBase64,
    }
}

/// Decode base64 text that must yield exactly `N` bytes.
///
/// Outer `None` means the text decoded to the wrong length; the inner error
/// means the text was not base64 at all.
fn decode_exact<const N: usize>(encoded: &[u8]) -> Option<EngineResult<[u8; N]>> {
    let mut scratch = Zeroizing::new([0u8; DECODE_SCRATCH]);
    if base64::decoded_len_estimate(encoded.len()) > DECODE_SCRATCH {
        return None;
    }
    let written = match STANDARD_NO_PAD.decode_slice(encoded, &mut scratch[..]) {
        Ok(written) => written,
        Err(e) => return Some(Err(decode_error(e))),
    };
    if written != N {
        return None;
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&scratch[..N]);
    Some(Ok(out))
}

/// HKDF-SHA256 of the shared secret into an AES-256-GCM key and nonce.
fn message_keys(shared_secret: &[u8]) -> EngineResult<(LessSafeKey, [u8; NONCE_LEN])> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = Zeroizing::new([0u8; AES_KEY_LENGTH + NONCE_LEN]);
    hkdf.expand(MESSAGE_KEYS_INFO, &mut okm[..])
        .map_err(|_| SoftwareError::KeyDerivationFailed)?;

    let unbound = UnboundKey::new(&AES_256_GCM, &okm[..AES_KEY_LENGTH])
        .map_err(|_| SoftwareError::KeyDerivationFailed)?;
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&okm[AES_KEY_LENGTH..]);

    Ok((LessSafeKey::new(unbound), nonce))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANDOM_A: [u8; 32] = [0x11; 32];
    const RANDOM_B: [u8; 32] = [0x22; 32];

    fn decryption_with_key(engine: &SoftwareEngine) -> (Vec<u8>, Vec<u8>) {
        let mut context = vec![0u8; engine.decryption_size()];
        engine.init_decryption(&mut context);
        let mut public_key = vec![0u8; engine.key_length()];
        let ret = engine.generate_key(&mut context, &mut public_key, &RANDOM_A);
        assert_eq!(ret, engine.key_length());
        (context, public_key)
    }

    fn encryption_to(engine: &SoftwareEngine, public_key: &[u8]) -> Vec<u8> {
        let mut context = vec![0u8; engine.encryption_size()];
        engine.init_encryption(&mut context);
        assert_ne!(engine.set_recipient_key(&mut context, public_key), ENGINE_ERROR);
        context
    }

    struct Sealed {
        ciphertext: Vec<u8>,
        mac: Vec<u8>,
        ephemeral: Vec<u8>,
    }

    fn seal(engine: &SoftwareEngine, context: &mut [u8], plaintext: &[u8]) -> Sealed {
        let mut ciphertext = vec![0u8; engine.ciphertext_length(context, plaintext.len())];
        let mut mac = vec![0u8; engine.mac_length(context)];
        let mut ephemeral = vec![0u8; engine.key_length()];
        let ret = engine.encrypt(
            context,
            plaintext,
            &mut ciphertext,
            &mut mac,
            &mut ephemeral,
            &RANDOM_B,
        );
        assert_eq!(ret, ciphertext.len());
        Sealed {
            ciphertext,
            mac,
            ephemeral,
        }
    }

    #[test]
    fn test_sizes() {
        let engine = SoftwareEngine::new();
        assert_eq!(engine.key_length(), 43);
        assert_eq!(engine.mac_length(&[]), 22);
        assert_eq!(engine.encryption_size(), 34);
        assert_eq!(engine.decryption_size(), 66);
        // version byte + 5 bytes of plaintext
        assert_eq!(engine.ciphertext_length(&[], 5), 8);
        assert!(engine.max_plaintext_length(&[], 8) >= 5);
        assert_eq!(engine.ciphertext_length(&[], 0), 2);
        assert_eq!(engine.max_plaintext_length(&[], 0), 0);
    }

    #[test]
    fn test_roundtrip() {
        let engine = SoftwareEngine::new();
        let (mut decryption, public_key) = decryption_with_key(&engine);
        let mut encryption = encryption_to(&engine, &public_key);

        let mut sealed = seal(&engine, &mut encryption, b"hello");

        let mut plaintext = vec![0u8; engine.max_plaintext_length(&decryption, sealed.ciphertext.len())];
        let length = engine.decrypt(
            &mut decryption,
            &sealed.ephemeral,
            &sealed.mac,
            &mut sealed.ciphertext,
            &mut plaintext,
        );
        assert_eq!(length, 5);
        assert_eq!(&plaintext[..length], b"hello");
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let engine = SoftwareEngine::new();
        let (mut decryption, public_key) = decryption_with_key(&engine);
        let mut encryption = encryption_to(&engine, &public_key);

        let mut sealed = seal(&engine, &mut encryption, b"");
        assert!(!sealed.ciphertext.is_empty());

        let mut plaintext = vec![0u8; engine.max_plaintext_length(&decryption, sealed.ciphertext.len())];
        let length = engine.decrypt(
            &mut decryption,
            &sealed.ephemeral,
            &sealed.mac,
            &mut sealed.ciphertext,
            &mut plaintext,
        );
        assert_eq!(length, 0);
    }

    #[test]
    fn test_tampered_mac_rejected() {
        let engine = SoftwareEngine::new();
        let (mut decryption, public_key) = decryption_with_key(&engine);
        let mut encryption = encryption_to(&engine, &public_key);
        let mut sealed = seal(&engine, &mut encryption, b"attack at dawn");

        sealed.mac[0] = if sealed.mac[0] == b'A' { b'B' } else { b'A' };

        let mut plaintext = vec![0u8; 64];
        let ret = engine.decrypt(
            &mut decryption,
            &sealed.ephemeral,
            &sealed.mac,
            &mut sealed.ciphertext,
            &mut plaintext,
        );
        assert_eq!(ret, ENGINE_ERROR);
        assert_eq!(engine.decryption_last_error(&decryption), "BAD_MESSAGE_MAC");
    }

    #[test]
    fn test_encrypt_without_key() {
        let engine = SoftwareEngine::new();
        let mut context = vec![0u8; engine.encryption_size()];
        engine.init_encryption(&mut context);

        let mut out = vec![0u8; 64];
        let mut mac = vec![0u8; 22];
        let mut ephemeral = vec![0u8; 43];
        let ret = engine.encrypt(&mut context, b"x", &mut out, &mut mac, &mut ephemeral, &RANDOM_B);
        assert_eq!(ret, ENGINE_ERROR);
        assert_eq!(engine.encryption_last_error(&context), "MISSING_KEY");
    }

    #[test]
    fn test_not_enough_random() {
        let engine = SoftwareEngine::new();
        let mut context = vec![0u8; engine.decryption_size()];
        let mut public_key = vec![0u8; engine.key_length()];
        let ret = engine.generate_key(&mut context, &mut public_key, &[0u8; 8]);
        assert_eq!(ret, ENGINE_ERROR);
        assert_eq!(engine.decryption_last_error(&context), "NOT_ENOUGH_RANDOM");
    }

    #[test]
    fn test_short_recipient_key() {
        let engine = SoftwareEngine::new();
        let mut context = vec![0u8; engine.encryption_size()];
        assert_eq!(engine.set_recipient_key(&mut context, b"short"), ENGINE_ERROR);
        assert_eq!(engine.encryption_last_error(&context), "INPUT_BUFFER_TOO_SMALL");
    }

    #[test]
    fn test_long_recipient_key() {
        let engine = SoftwareEngine::new();
        let (_, public_key) = decryption_with_key(&engine);
        let mut context = vec![0u8; engine.encryption_size()];

        let mut long_key = public_key.clone();
        long_key.extend_from_slice(b"AAAA");
        assert_eq!(engine.set_recipient_key(&mut context, &long_key), ENGINE_ERROR);
        assert_eq!(engine.encryption_last_error(&context), "BAD_KEY_LENGTH");
        assert_eq!(context[HAS_KEY_OFFSET], 0);
    }

    #[test]
    fn test_invalid_base64_recipient_key() {
        let engine = SoftwareEngine::new();
        let mut context = vec![0u8; engine.encryption_size()];
        let key = [b'!'; 43];
        assert_eq!(engine.set_recipient_key(&mut context, &key), ENGINE_ERROR);
        assert_eq!(engine.encryption_last_error(&context), "INVALID_BASE64");
    }

    #[test]
    fn test_success_resets_last_error() {
        let engine = SoftwareEngine::new();
        let (_, public_key) = decryption_with_key(&engine);
        let mut context = vec![0u8; engine.encryption_size()];
        assert_eq!(engine.set_recipient_key(&mut context, b"short"), ENGINE_ERROR);
        assert_ne!(engine.set_recipient_key(&mut context, &public_key), ENGINE_ERROR);
        assert_eq!(engine.encryption_last_error(&context), "SUCCESS");
    }

    #[test]
    fn test_clear_wipes_private_key() {
        let engine = SoftwareEngine::new();
        let (mut context, _) = decryption_with_key(&engine);
        assert!(context.iter().any(|&b| b != 0));
        engine.clear_decryption(&mut context);
        assert!(context.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bad_context_size() {
        let engine = SoftwareEngine::new();
        let mut context = vec![0u8; 3];
        let mut public_key = vec![0u8; 43];
        assert_eq!(engine.generate_key(&mut context, &mut public_key, &RANDOM_A), ENGINE_ERROR);
        assert_eq!(engine.decryption_last_error(&context), "BAD_CONTEXT");
    }
}
