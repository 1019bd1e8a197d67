// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Elliptic-curve integrated encryption over secp256k1.
//!
//! ## Envelope
//!
//! ```text
//! base64( ephemeral_pubkey[65] || nonce[12] || aes256gcm(ciphertext || tag) )
//! ```
//!
//! 1. A fresh ephemeral key pair is generated per call
//! 2. ECDH(ephemeral, recipient) yields the shared secret
//! 3. HKDF-SHA256(salt = ephemeral_pubkey, info = [`HKDF_INFO`]) derives the AES key
//! 4. AES-256-GCM seals the plaintext under a random nonce
//!
//! The sender only needs the recipient's public key, and two encryptions
//! of the same plaintext never produce the same envelope.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64ct::{Base64, Encoding};
use hkdf::Hkdf;
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::elliptic_curve::rand_core::{OsRng, RngCore};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{CryptoError, CryptoResult};

const HKDF_INFO: &[u8] = b"hufu-ecies-v1";
const EPHEMERAL_KEY_LEN: usize = 65;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

fn derive_cipher(shared_secret: &[u8], ephemeral_public: &[u8]) -> CryptoResult<Aes256Gcm> {
    let hk = Hkdf::<Sha256>::new(Some(ephemeral_public), shared_secret);
    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(HKDF_INFO, &mut key[..])
        .map_err(|e| CryptoError::Encryption(format!("key derivation failed: {e}")))?;
    Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))
}

/// Encrypt `plaintext` to `recipient`, returning the base64 envelope.
pub fn encrypt(recipient: &PublicKey, plaintext: &[u8]) -> CryptoResult<String> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_public = ephemeral.public_key().to_encoded_point(false);
    let shared = ephemeral.diffie_hellman(recipient);

    let cipher = derive_cipher(shared.raw_secret_bytes(), ephemeral_public.as_bytes())?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(&Nonce::from(nonce), plaintext)
        .map_err(|_| CryptoError::Encryption("AEAD seal failed".to_string()))?;

    let mut envelope = Vec::with_capacity(EPHEMERAL_KEY_LEN + NONCE_LEN + sealed.len());
    envelope.extend_from_slice(ephemeral_public.as_bytes());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&sealed);

    Ok(Base64::encode_string(&envelope))
}

/// Convenience wrapper for UTF-8 plaintexts.
pub fn encrypt_str(recipient: &PublicKey, plaintext: &str) -> CryptoResult<String> {
    encrypt(recipient, plaintext.as_bytes())
}

/// Open an envelope produced by [`encrypt`].
pub fn decrypt(secret: &SecretKey, envelope: &str) -> CryptoResult<Vec<u8>> {
    let raw = Base64::decode_vec(envelope.trim())
        .map_err(|e| CryptoError::MalformedCiphertext(format!("bad base64: {e}")))?;

    if raw.len() < EPHEMERAL_KEY_LEN + NONCE_LEN + TAG_LEN {
        return Err(CryptoError::MalformedCiphertext(format!(
            "envelope too short: {} bytes",
            raw.len()
        )));
    }

    let (ephemeral_bytes, rest) = raw.split_at(EPHEMERAL_KEY_LEN);
    let (nonce, sealed) = rest.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce
        .try_into()
        .map_err(|_| CryptoError::MalformedCiphertext("bad nonce length".to_string()))?;

    let ephemeral_public = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|_| CryptoError::MalformedCiphertext("bad ephemeral key".to_string()))?;

    let shared = diffie_hellman(secret.to_nonzero_scalar(), ephemeral_public.as_affine());
    let cipher = derive_cipher(shared.raw_secret_bytes(), ephemeral_bytes)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;

    cipher
        .decrypt(&Nonce::from(nonce), sealed)
        .map_err(|_| CryptoError::Decryption("authentication failed".to_string()))
}

/// Open an envelope whose plaintext is UTF-8.
pub fn decrypt_string(secret: &SecretKey, envelope: &str) -> CryptoResult<String> {
    let bytes = decrypt(secret, envelope)?;
    String::from_utf8(bytes)
        .map_err(|_| CryptoError::Decryption("plaintext is not UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (SecretKey, PublicKey) {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        (secret, public)
    }

    #[test]
    fn round_trip_recovers_plaintext() {
        let (secret, public) = keypair();
        let envelope = encrypt_str(&public, "wallet-42").unwrap();
        assert_eq!(decrypt_string(&secret, &envelope).unwrap(), "wallet-42");
    }

    #[test]
    fn encryption_is_randomised() {
        let (_, public) = keypair();
        let a = encrypt_str(&public, "10.00").unwrap();
        let b = encrypt_str(&public, "10.00").unwrap();
        assert_ne!(a, b, "same plaintext must not yield same ciphertext");
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let (_, public) = keypair();
        let (other_secret, _) = keypair();
        let envelope = encrypt_str(&public, "secret").unwrap();
        assert!(matches!(
            decrypt_string(&other_secret, &envelope),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn tampered_envelope_is_rejected() {
        let (secret, public) = keypair();
        let envelope = encrypt_str(&public, "amount").unwrap();
        let mut raw = Base64::decode_vec(&envelope).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = Base64::encode_string(&raw);
        assert!(decrypt(&secret, &tampered).is_err());
    }

    #[test]
    fn nonce_is_carried_after_the_ephemeral_key() {
        let (secret, public) = keypair();
        let envelope = encrypt_str(&public, "amount").unwrap();
        let mut raw = Base64::decode_vec(&envelope).unwrap();
        assert_eq!(raw.len(), EPHEMERAL_KEY_LEN + NONCE_LEN + TAG_LEN + "amount".len());

        raw[EPHEMERAL_KEY_LEN] ^= 0x01;
        assert!(matches!(
            decrypt(&secret, &Base64::encode_string(&raw)),
            Err(CryptoError::Decryption(_))
        ));
        raw[EPHEMERAL_KEY_LEN] ^= 0x01;
        assert_eq!(
            decrypt_string(&secret, &Base64::encode_string(&raw)).unwrap(),
            "amount"
        );
    }

    #[test]
    fn short_or_garbage_envelopes_are_malformed() {
        let (secret, _) = keypair();
        assert!(matches!(
            decrypt(&secret, "AAAA"),
            Err(CryptoError::MalformedCiphertext(_))
        ));
        assert!(matches!(
            decrypt(&secret, "!!not base64!!"),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let (secret, public) = keypair();
        let envelope = encrypt(&public, b"").unwrap();
        assert!(decrypt(&secret, &envelope).unwrap().is_empty());
    }
}
