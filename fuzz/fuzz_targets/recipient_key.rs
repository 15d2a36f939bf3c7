#![no_main]

use libfuzzer_sys::fuzz_target;
use pkbridge_core::{Bridge, ContextState};
use std::sync::{Arc, LazyLock};

static BRIDGE: LazyLock<Arc<Bridge>> = LazyLock::new(Bridge::new);

fuzz_target!(|key: &[u8]| {
    // Attack: arbitrary bytes as a recipient public key
    // Validates: no panics, state only advances on success, encrypt agrees

    let mut encryption = BRIDGE.create_encryption().expect("context creation");

    match encryption.set_recipient_key(key) {
        Ok(()) => {
            assert_eq!(encryption.state(), Some(ContextState::KeyConfigured));
            let message = encryption
                .encrypt(b"fuzz")
                .expect("encrypt after accepted key");
            assert_eq!(message.ephemeral_key.len(), encryption.key_length());
        }
        Err(_) => {
            assert_eq!(encryption.state(), Some(ContextState::Created));
        }
    }
});
