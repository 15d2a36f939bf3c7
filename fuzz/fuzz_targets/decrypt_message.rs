#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pkbridge_core::{Bridge, EncryptedMessage};
use std::sync::{Arc, LazyLock};

static BRIDGE: LazyLock<Arc<Bridge>> = LazyLock::new(Bridge::new);

#[derive(Arbitrary, Debug)]
struct DecryptInput {
    ciphertext: Vec<u8>,
    mac: String,
    ephemeral_key: String,
    /// Decrypt with a generated key pair, or with a bare context
    with_key: bool,
}

fuzz_target!(|input: DecryptInput| {
    // Attack: arbitrary messages against a decryption context
    // Validates: no panics, failures are errors, context stays usable

    let mut decryption = BRIDGE.create_decryption().expect("context creation");
    if input.with_key {
        decryption.generate_key().expect("key generation");
    }

    let message = EncryptedMessage::new(input.ciphertext, input.mac, input.ephemeral_key);
    let validated = message.validate();

    match decryption.decrypt(&message) {
        Ok(plaintext) => {
            // Only a complete message can authenticate
            assert!(validated.is_ok(), "decrypt accepted an incomplete message");
            let bound = decryption
                .max_plaintext_length(message.ciphertext.len())
                .expect("bound for accepted ciphertext");
            assert!(plaintext.len() <= bound, "plaintext exceeds declared bound");
        }
        Err(_) => {
            // Any failure other than generate_key leaves the context live
            assert!(decryption.is_live(), "decrypt failure released the context");
        }
    }
});
