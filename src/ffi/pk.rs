//! C FFI wrappers for the encryption and decryption handles.
//!
//! Every function:
//! - catches panics so nothing unwinds across the boundary
//! - checks pointers before use (a null pointer with a zero length is an empty input)
//! - reports failures as [`PkbridgeError`] codes with the message readable
//!   through `pkbridge_last_error_message`
//!
//! Outputs use the in/out length protocol: on input `*len` is the buffer
//! capacity, on output the number of bytes written. When the buffer is too
//! small the required size is written back and `BufferTooSmall` returned.
//! Textual outputs (MAC, keys) are written without a NUL terminator.
//!
//! All handles share one process-wide [`Bridge`] with the software engine,
//! the system allocator and OS randomness.

use crate::error::{BridgeError, Operation};
use crate::ffi::error::{PkbridgeError, fail, last_error, set_last_error};
use crate::ffi::handles::{PkbridgeDecryption, PkbridgeEncryption};
use crate::lifecycle::{Bridge, ContextState};
use crate::message::EncryptedMessage;
use std::panic::{UnwindSafe, catch_unwind};
use std::sync::{Arc, LazyLock};
use std::{ptr, slice};
use zeroize::Zeroizing;

static BRIDGE: LazyLock<Arc<Bridge>> = LazyLock::new(Bridge::new);

/// Run `call`, turning a panic into `PkbridgeError::Internal`.
fn guarded(call: impl FnOnce() -> PkbridgeError + UnwindSafe) -> PkbridgeError {
    catch_unwind(call).unwrap_or_else(|_| {
        set_last_error("panic caught at FFI boundary");
        PkbridgeError::Internal
    })
}

/// Borrow a caller input.
///
/// # Safety
/// `data` must point to `len` readable bytes when non-null.
unsafe fn input<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() {
        return (len == 0).then_some(&[][..]);
    }
    // SAFETY: non-null, caller guarantees `len` readable bytes
    Some(unsafe { slice::from_raw_parts(data, len) })
}

/// Copy `bytes` into a caller buffer with the in/out length protocol.
///
/// # Safety
/// `out_len` must be valid; `out` must have `*out_len` writable bytes.
unsafe fn write_out(bytes: &[u8], out: *mut u8, out_len: *mut usize) -> PkbridgeError {
    // SAFETY: caller checked out_len is non-null
    let available = unsafe { *out_len };
    unsafe { *out_len = bytes.len() };
    if bytes.len() > available {
        set_last_error(format!(
            "output buffer of {available} bytes, {} required",
            bytes.len()
        ));
        return PkbridgeError::BufferTooSmall;
    }
    // SAFETY: out holds at least `available >= bytes.len()` bytes
    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), out, bytes.len()) };
    PkbridgeError::Ok
}

unsafe fn set_error_out(error_out: *mut PkbridgeError, code: PkbridgeError) {
    if !error_out.is_null() {
        // SAFETY: non-null, caller provides a writable slot
        unsafe { *error_out = code };
    }
}

/// Encoded key length (public and ephemeral keys), terminator excluded.
#[unsafe(no_mangle)]
pub extern "C" fn pkbridge_key_length() -> usize {
    catch_unwind(|| BRIDGE.key_length()).unwrap_or(0)
}

/// Create an encryption handle.
///
/// # Returns
/// Handle pointer, or null on failure with the code in `error_out` (may be null).
///
/// # Safety
/// - Free the handle with `pkbridge_encryption_free`
/// - Function is panic-safe and will never unwind across FFI boundary
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_encryption_new(
    error_out: *mut PkbridgeError,
) -> *mut PkbridgeEncryption {
    let result = catch_unwind(|| match BRIDGE.create_encryption() {
        Ok(encryption) => (PkbridgeEncryption::into_opaque_ptr(encryption), PkbridgeError::Ok),
        Err(e) => (ptr::null_mut(), fail(&e)),
    });
    let (handle, code) = result.unwrap_or_else(|_| {
        set_last_error("panic caught at FFI boundary");
        (ptr::null_mut(), PkbridgeError::Internal)
    });
    unsafe { set_error_out(error_out, code) };
    handle
}

/// Release and free an encryption handle. Null, freed or unknown handles are ignored.
///
/// # Safety
/// `handle` must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_encryption_free(handle: *mut PkbridgeEncryption) {
    let _ = catch_unwind(|| {
        // SAFETY: from_opaque_ptr rejects anything not registered
        drop(unsafe { PkbridgeEncryption::from_opaque_ptr(handle) });
    });
}

/// Install the recipient's public key.
///
/// # Returns
/// - `Ok` on success
/// - `NullPointer` if `key` is null with a non-zero length
/// - `InvalidHandle` for a freed or unknown handle
/// - `InvalidInput` for an empty key
/// - `EngineFailure` if the engine rejects the key
///
/// # Safety
/// `key` must point to `key_len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_encryption_set_recipient_key(
    handle: *mut PkbridgeEncryption,
    key: *const u8,
    key_len: usize,
) -> PkbridgeError {
    guarded(|| {
        let Some(key) = (unsafe { input(key, key_len) }) else {
            return PkbridgeError::NullPointer;
        };
        let Some(encryption) = (unsafe { PkbridgeEncryption::as_mut(handle) }) else {
            return PkbridgeError::InvalidHandle;
        };

        match encryption.set_recipient_key(key) {
            Ok(()) => PkbridgeError::Ok,
            Err(e) => fail(&e),
        }
    })
}

/// Encrypt `plaintext` to the installed recipient key.
///
/// Buffer capacities are checked before any encryption happens: if any of
/// the three outputs is too small, all three lengths receive their required
/// sizes and `BufferTooSmall` is returned.
///
/// # Returns
/// - `Ok` on success
/// - `NullPointer` if an output or length pointer is null
/// - `InvalidHandle` / `InvalidState` for a released or keyless handle
/// - `BufferTooSmall` with the required sizes written back
/// - `RandomFailure`, `AllocationFailed` or `EngineFailure` from the call
///
/// # Safety
/// Every pointer must be valid for its stated length.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_encrypt(
    handle: *mut PkbridgeEncryption,
    plaintext: *const u8,
    plaintext_len: usize,
    ciphertext: *mut u8,
    ciphertext_len: *mut usize,
    mac: *mut u8,
    mac_len: *mut usize,
    ephemeral_key: *mut u8,
    ephemeral_key_len: *mut usize,
) -> PkbridgeError {
    guarded(|| {
        let Some(plaintext) = (unsafe { input(plaintext, plaintext_len) }) else {
            return PkbridgeError::NullPointer;
        };
        if ciphertext.is_null()
            || ciphertext_len.is_null()
            || mac.is_null()
            || mac_len.is_null()
            || ephemeral_key.is_null()
            || ephemeral_key_len.is_null()
        {
            return PkbridgeError::NullPointer;
        }
        let Some(encryption) = (unsafe { PkbridgeEncryption::as_mut(handle) }) else {
            return PkbridgeError::InvalidHandle;
        };
        if let Some(state @ ContextState::Created) = encryption.state() {
            return fail(&BridgeError::InvalidState {
                operation: Operation::Encrypt,
                state,
            });
        }

        let required = encryption
            .ciphertext_length(plaintext.len())
            .and_then(|ct| Ok((ct, encryption.mac_length()?, encryption.key_length())));
        let (ct_required, mac_required, key_required) = match required {
            Ok(sizes) => sizes,
            Err(e) => return fail(&e),
        };

        // SAFETY: length pointers checked non-null above
        let too_small = unsafe {
            *ciphertext_len < ct_required
                || *mac_len < mac_required
                || *ephemeral_key_len < key_required
        };
        if too_small {
            unsafe {
                *ciphertext_len = ct_required;
                *mac_len = mac_required;
                *ephemeral_key_len = key_required;
            }
            set_last_error("encrypt output buffers too small");
            return PkbridgeError::BufferTooSmall;
        }

        let message = match encryption.encrypt(plaintext) {
            Ok(message) => message,
            Err(e) => return fail(&e),
        };

        // SAFETY: capacities verified above
        unsafe {
            for code in [
                write_out(&message.ciphertext, ciphertext, ciphertext_len),
                write_out(message.mac.as_bytes(), mac, mac_len),
                write_out(message.ephemeral_key.as_bytes(), ephemeral_key, ephemeral_key_len),
            ] {
                if code != PkbridgeError::Ok {
                    return code;
                }
            }
        }
        PkbridgeError::Ok
    })
}

/// Create a decryption handle.
///
/// # Safety
/// - Free the handle with `pkbridge_decryption_free`
/// - Function is panic-safe and will never unwind across FFI boundary
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_decryption_new(
    error_out: *mut PkbridgeError,
) -> *mut PkbridgeDecryption {
    let result = catch_unwind(|| match BRIDGE.create_decryption() {
        Ok(decryption) => (PkbridgeDecryption::into_opaque_ptr(decryption), PkbridgeError::Ok),
        Err(e) => (ptr::null_mut(), fail(&e)),
    });
    let (handle, code) = result.unwrap_or_else(|_| {
        set_last_error("panic caught at FFI boundary");
        (ptr::null_mut(), PkbridgeError::Internal)
    });
    unsafe { set_error_out(error_out, code) };
    handle
}

/// Release and free a decryption handle. Null, freed or unknown handles are ignored.
///
/// # Safety
/// `handle` must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_decryption_free(handle: *mut PkbridgeDecryption) {
    let _ = catch_unwind(|| {
        // SAFETY: from_opaque_ptr rejects anything not registered
        drop(unsafe { PkbridgeDecryption::from_opaque_ptr(handle) });
    });
}

/// Generate the handle's key pair and write the public key.
///
/// If the engine or the randomness source fails, the context is released:
/// later calls on this handle return `InvalidHandle`, and it must still be
/// freed with `pkbridge_decryption_free`.
///
/// # Safety
/// `public_key` must have `*public_key_len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_generate_key(
    handle: *mut PkbridgeDecryption,
    public_key: *mut u8,
    public_key_len: *mut usize,
) -> PkbridgeError {
    guarded(|| {
        if public_key.is_null() || public_key_len.is_null() {
            return PkbridgeError::NullPointer;
        }
        let Some(decryption) = (unsafe { PkbridgeDecryption::as_mut(handle) }) else {
            return PkbridgeError::InvalidHandle;
        };

        // SAFETY: public_key_len checked non-null
        let available = unsafe { *public_key_len };
        let required = decryption.key_length();
        if available < required {
            unsafe { *public_key_len = required };
            set_last_error(format!("public key buffer of {available} bytes, {required} required"));
            return PkbridgeError::BufferTooSmall;
        }

        match decryption.generate_key() {
            Ok(key) => unsafe { write_out(key.as_bytes(), public_key, public_key_len) },
            Err(e) => fail(&e),
        }
    })
}

/// Upper bound on the plaintext length for `ciphertext_len` ciphertext bytes.
///
/// # Safety
/// `max_len` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_max_plaintext_length(
    handle: *mut PkbridgeDecryption,
    ciphertext_len: usize,
    max_len: *mut usize,
) -> PkbridgeError {
    guarded(|| {
        if max_len.is_null() {
            return PkbridgeError::NullPointer;
        }
        let Some(decryption) = (unsafe { PkbridgeDecryption::as_mut(handle) }) else {
            return PkbridgeError::InvalidHandle;
        };
        match decryption.max_plaintext_length(ciphertext_len) {
            Ok(length) => {
                unsafe { *max_len = length };
                PkbridgeError::Ok
            }
            Err(e) => fail(&e),
        }
    })
}

/// Decrypt a message. `mac` and `ephemeral_key` are the textual values
/// produced by `pkbridge_encrypt`, without terminator.
///
/// # Returns
/// - `Ok` with the plaintext length in `*plaintext_len`
/// - `InvalidInput` for an empty field or non-UTF-8 text
/// - `BufferTooSmall` with the true plaintext length written back
/// - `EngineFailure` for a tampered or misaddressed message
///
/// # Safety
/// Every pointer must be valid for its stated length.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_decrypt(
    handle: *mut PkbridgeDecryption,
    ciphertext: *const u8,
    ciphertext_len: usize,
    mac: *const u8,
    mac_len: usize,
    ephemeral_key: *const u8,
    ephemeral_key_len: usize,
    plaintext: *mut u8,
    plaintext_len: *mut usize,
) -> PkbridgeError {
    guarded(|| {
        let inputs = unsafe {
            (
                input(ciphertext, ciphertext_len),
                input(mac, mac_len),
                input(ephemeral_key, ephemeral_key_len),
            )
        };
        let (Some(ciphertext), Some(mac), Some(ephemeral_key)) = inputs else {
            return PkbridgeError::NullPointer;
        };
        if plaintext.is_null() || plaintext_len.is_null() {
            return PkbridgeError::NullPointer;
        }
        let Some(decryption) = (unsafe { PkbridgeDecryption::as_mut(handle) }) else {
            return PkbridgeError::InvalidHandle;
        };

        let text = |bytes: &[u8], field: &str| {
            std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| BridgeError::InvalidInput(format!("{field} is not valid UTF-8")))
        };
        let message = match (text(mac, "MAC"), text(ephemeral_key, "ephemeral key")) {
            (Ok(mac), Ok(ephemeral_key)) => EncryptedMessage::new(ciphertext, mac, ephemeral_key),
            (Err(e), _) | (_, Err(e)) => return fail(&e),
        };

        match decryption.decrypt(&message) {
            Ok(output) => {
                let output = Zeroizing::new(output);
                unsafe { write_out(&output, plaintext, plaintext_len) }
            }
            Err(e) => fail(&e),
        }
    })
}

/// Copy the calling thread's last error message into `buffer`, NUL-terminated.
///
/// `*buffer_len` receives the message length including the terminator. With
/// no recorded error an empty string is written.
///
/// # Safety
/// `buffer` must have `*buffer_len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pkbridge_last_error_message(
    buffer: *mut u8,
    buffer_len: *mut usize,
) -> PkbridgeError {
    if buffer.is_null() || buffer_len.is_null() {
        return PkbridgeError::NullPointer;
    }
    let mut message = last_error().unwrap_or_default().into_bytes();
    message.retain(|&b| b != 0);
    message.push(0);

    // SAFETY: pointers checked above; not routed through write_out so a
    // too-small buffer does not overwrite the stored message
    let available = unsafe { *buffer_len };
    unsafe { *buffer_len = message.len() };
    if message.len() > available {
        return PkbridgeError::BufferTooSmall;
    }
    unsafe { ptr::copy_nonoverlapping(message.as_ptr(), buffer, message.len()) };
    PkbridgeError::Ok
}
