//! End-to-end encryption envelope for secret payload fields.
//!
//! Runs entirely on the client side of the trust boundary: the server only
//! ever stores and returns the opaque strings produced here. Each sensitive
//! field is encrypted independently with AES-256-GCM; the stored form is
//! `base64(ciphertext || tag || nonce)` with the 96-bit nonce trailing.
//!
//! The key is a single SHA-256 of the user's passphrase, used directly as
//! the 256-bit AES key. There is no salt and no key stretching — acceptable
//! for a local, low-throughput client tool, but a known hardening
//! opportunity if the threat model ever includes offline passphrase
//! guessing.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Key length in bytes (256 bits for AES-256)
pub const KEY_LENGTH: usize = 32;

/// Nonce length in bytes (96 bits for AES-GCM)
const NONCE_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authentication failed: wrong key or tampered ciphertext.
    #[error("could not decrypt: wrong encryption key or corrupted data")]
    DecryptionFailed,

    /// The stored string is not a valid envelope (bad base64, too short).
    #[error("malformed encrypted value: {0}")]
    Malformed(String),

    /// Cipher construction failed (key of wrong length).
    #[error("invalid encryption key: {0}")]
    Key(String),
}

/// Derive the symmetric key from a raw passphrase.
pub fn derive_key(passphrase: &str) -> [u8; KEY_LENGTH] {
    let digest = Sha256::digest(passphrase.as_bytes());
    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&digest);
    key
}

/// Encrypt one field value.
///
/// Returns `base64(ciphertext+tag || nonce)`. A fresh random nonce is drawn
/// per call, so encrypting the same plaintext twice yields different
/// envelopes.
pub fn encrypt(key: &[u8; KEY_LENGTH], plaintext: &[u8]) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Key(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut combined = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::Key("encryption failure".to_string()))?;
    combined.extend_from_slice(&nonce_bytes);

    Ok(BASE64.encode(&combined))
}

/// Decrypt one field value produced by [`encrypt`].
///
/// An authentication failure (wrong passphrase, flipped bit anywhere in the
/// envelope) surfaces as [`CryptoError::DecryptionFailed`], never as garbage
/// plaintext.
pub fn decrypt(key: &[u8; KEY_LENGTH], envelope: &str) -> Result<Vec<u8>, CryptoError> {
    let combined = BASE64
        .decode(envelope)
        .map_err(|e| CryptoError::Malformed(e.to_string()))?;

    if combined.len() < NONCE_LENGTH {
        return Err(CryptoError::Malformed("envelope too short".to_string()));
    }

    let (ciphertext, nonce_bytes) = combined.split_at(combined.len() - NONCE_LENGTH);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Key(e.to_string()))?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt a string field, returning the envelope string.
pub fn encrypt_str(key: &[u8; KEY_LENGTH], plaintext: &str) -> Result<String, CryptoError> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypt an envelope that is expected to hold UTF-8 text.
pub fn decrypt_str(key: &[u8; KEY_LENGTH], envelope: &str) -> Result<String, CryptoError> {
    let bytes = decrypt(key, envelope)?;
    String::from_utf8(bytes).map_err(|e| CryptoError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_LENGTH] {
        derive_key("correct horse battery staple")
    }

    #[test]
    fn derive_key_is_deterministic() {
        assert_eq!(derive_key("abc"), derive_key("abc"));
        assert_ne!(derive_key("abc"), derive_key("abd"));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"my-secret-password-12345";

        let envelope = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &envelope).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn roundtrip_empty_plaintext() {
        let key = test_key();

        let envelope = encrypt(&key, b"").unwrap();
        let decrypted = decrypt(&key, &envelope).unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn roundtrip_large_binary() {
        let key = test_key();
        let plaintext: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

        let envelope = encrypt(&key, &plaintext).unwrap();
        let decrypted = decrypt(&key, &envelope).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn roundtrip_unicode_text() {
        let key = test_key();
        let plaintext = "Hello, 世界! 🎉";

        let envelope = encrypt_str(&key, plaintext).unwrap();
        let decrypted = decrypt_str(&key, &envelope).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn nonces_differ_between_calls() {
        let key = test_key();

        let a = encrypt(&key, b"same-data").unwrap();
        let b = encrypt(&key, b"same-data").unwrap();

        assert_ne!(a, b);
        assert_eq!(decrypt(&key, &a).unwrap(), b"same-data");
        assert_eq!(decrypt(&key, &b).unwrap(), b"same-data");
    }

    #[test]
    fn wrong_key_fails() {
        let envelope = encrypt(&test_key(), b"secret").unwrap();

        let result = decrypt(&derive_key("not the passphrase"), &envelope);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn any_flipped_bit_is_detected() {
        let key = test_key();
        let envelope = encrypt(&key, b"tamper target").unwrap();
        let mut raw = BASE64.decode(&envelope).unwrap();

        // Flip one bit at every byte position: ciphertext, tag and nonce
        // must all be covered by authentication.
        for i in 0..raw.len() {
            raw[i] ^= 0x01;
            let tampered = BASE64.encode(&raw);
            assert!(
                matches!(decrypt(&key, &tampered), Err(CryptoError::DecryptionFailed)),
                "bit flip at byte {} was not detected",
                i
            );
            raw[i] ^= 0x01;
        }
    }

    #[test]
    fn malformed_envelope_is_not_decryption_failure() {
        let key = test_key();

        assert!(matches!(
            decrypt(&key, "!!! not base64 !!!"),
            Err(CryptoError::Malformed(_))
        ));
        assert!(matches!(
            decrypt(&key, &BASE64.encode([0u8; 5])),
            Err(CryptoError::Malformed(_))
        ));
    }
}
