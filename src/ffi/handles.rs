//! Opaque FFI handle types for pkbridge-core
//!
//! Handles wrap a [`PkEncryption`] or [`PkDecryption`] behind a pointer C code
//! never dereferences. Every handle is tracked in a global registry, so:
//! - freeing a handle twice is detected and ignored
//! - using a freed handle returns `PkbridgeError::InvalidHandle`
//!
//! Registry membership is about the pointer. A handle whose context was
//! released inside Rust (for example after a failed key generation) stays
//! registered until freed; its operations report `InvalidHandle` through the
//! wrapper itself.

use crate::pk::{PkDecryption, PkEncryption};
use std::collections::HashSet;
use std::sync::{LazyLock, Mutex};

static ENCRYPTION_HANDLES: LazyLock<Mutex<HashSet<usize>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

static DECRYPTION_HANDLES: LazyLock<Mutex<HashSet<usize>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Generates an opaque FFI handle type with validity tracking.
///
/// This macro creates:
/// - A `#[repr(C)]` struct with zero-sized private field
/// - `into_opaque_ptr`: box the inner value and register the pointer
/// - `from_opaque_ptr`: unregister and unbox (returns `Option`)
/// - `is_valid`: check registration
/// - `as_mut`: mutably borrow the inner value (returns `Option`)
macro_rules! opaque_handle {
    (
        $(#[$meta:meta])*
        $handle:ident,
        $inner:ty,
        $registry:ident
    ) => {
        $(#[$meta])*
        #[repr(C)]
        pub struct $handle {
            _private: [u8; 0],
        }

        impl $handle {
            /// Box `inner` and register the resulting pointer.
            ///
            /// The pointer must eventually be passed to `from_opaque_ptr`.
            pub(crate) fn into_opaque_ptr(inner: $inner) -> *mut Self {
                let ptr = Box::into_raw(Box::new(inner)) as *mut Self;
                if let Ok(mut handles) = $registry.lock() {
                    handles.insert(ptr as usize);
                }
                ptr
            }

            /// Unregister and unbox a handle.
            ///
            /// Returns `None` for null, already freed or foreign pointers.
            ///
            /// # Safety
            /// If `Some` is returned the pointer is consumed and must not be used again.
            pub(crate) unsafe fn from_opaque_ptr(ptr: *mut Self) -> Option<$inner> {
                if ptr.is_null() {
                    return None;
                }
                let addr = ptr as usize;
                let registered = $registry
                    .lock()
                    .map(|mut handles| handles.remove(&addr))
                    .unwrap_or(false);
                if !registered {
                    return None;
                }
                // SAFETY: registered pointers come from into_opaque_ptr
                Some(unsafe { *Box::from_raw(ptr as *mut $inner) })
            }

            pub(crate) fn is_valid(ptr: *const Self) -> bool {
                if ptr.is_null() {
                    return false;
                }
                $registry
                    .lock()
                    .map(|handles| handles.contains(&(ptr as usize)))
                    .unwrap_or(false)
            }

            /// Mutably borrow the inner value.
            ///
            /// # Safety
            /// - Pointer must remain valid for the lifetime of the returned reference
            /// - No other reference to the same handle may exist
            pub(crate) unsafe fn as_mut<'a>(ptr: *mut Self) -> Option<&'a mut $inner> {
                if !Self::is_valid(ptr) {
                    return None;
                }
                // SAFETY: registered, so valid, aligned and owned by the caller's handle
                Some(unsafe { &mut *(ptr as *mut $inner) })
            }
        }
    };
}

opaque_handle!(
    /// Opaque handle for an encryption context
    ///
    /// # Safety
    /// - Create with `pkbridge_encryption_new`
    /// - Free with `pkbridge_encryption_free`
    /// - Never dereference from C code
    /// - Not thread-safe: one thread at a time per handle
    PkbridgeEncryption,
    PkEncryption,
    ENCRYPTION_HANDLES
);

opaque_handle!(
    /// Opaque handle for a decryption context
    ///
    /// # Safety
    /// - Create with `pkbridge_decryption_new`
    /// - Free with `pkbridge_decryption_free`
    /// - Never dereference from C code
    /// - Not thread-safe: one thread at a time per handle
    PkbridgeDecryption,
    PkDecryption,
    DECRYPTION_HANDLES
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Bridge;

    #[test]
    fn test_encryption_opaque_roundtrip() {
        let encryption = Bridge::new().create_encryption().unwrap();
        let ptr = PkbridgeEncryption::into_opaque_ptr(encryption);
        assert!(!ptr.is_null());
        assert!(PkbridgeEncryption::is_valid(ptr));

        unsafe {
            assert!(PkbridgeEncryption::as_mut(ptr).unwrap().is_live());
            assert!(PkbridgeEncryption::from_opaque_ptr(ptr).is_some());
        }
        assert!(!PkbridgeEncryption::is_valid(ptr));
    }

    #[test]
    fn test_decryption_double_free_detection() {
        let decryption = Bridge::new().create_decryption().unwrap();
        let ptr = PkbridgeDecryption::into_opaque_ptr(decryption);

        unsafe {
            assert!(PkbridgeDecryption::from_opaque_ptr(ptr).is_some());
            assert!(PkbridgeDecryption::from_opaque_ptr(ptr).is_none());
            assert!(PkbridgeDecryption::as_mut(ptr).is_none());
        }
    }

    #[test]
    fn test_null_handles() {
        let null_encryption: *mut PkbridgeEncryption = std::ptr::null_mut();
        let null_decryption: *mut PkbridgeDecryption = std::ptr::null_mut();
        assert!(!PkbridgeEncryption::is_valid(null_encryption));
        assert!(!PkbridgeDecryption::is_valid(null_decryption));

        unsafe {
            assert!(PkbridgeEncryption::from_opaque_ptr(null_encryption).is_none());
            assert!(PkbridgeDecryption::as_mut(null_decryption).is_none());
        }
    }

    #[test]
    fn test_registries_are_separate() {
        let encryption = Bridge::new().create_encryption().unwrap();
        let ptr = PkbridgeEncryption::into_opaque_ptr(encryption);

        // Same address, wrong handle type
        assert!(!PkbridgeDecryption::is_valid(ptr as *const PkbridgeDecryption));

        unsafe {
            let _ = PkbridgeEncryption::from_opaque_ptr(ptr);
        }
    }
}
