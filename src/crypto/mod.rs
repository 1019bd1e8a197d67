// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Crypto Primitives
//!
//! Everything above this module treats these functions as opaque building
//! blocks:
//!
//! - `keys` - secp256k1 key pair generation and PEM / SEC1 codecs
//! - `ecies` - encrypt-to-public-key / decrypt-with-private-key
//! - `shamir` - M-of-N threshold secret sharing over GF(256)
//! - [`identity_hash`] - one-way SHA-256 content hash
//!
//! Private keys are stored as PKCS#8 PEM (the same layout the wallet key
//! files use) and public keys travel as hex-encoded uncompressed SEC1
//! points.

pub mod ecies;
pub mod keys;
pub mod shamir;

use sha2::{Digest, Sha256};

pub use ecies::{decrypt, decrypt_string, encrypt, encrypt_str};
pub use keys::{
    generate_keypair, public_key_from_hex, public_key_hex, secret_from_pem, secret_to_pem,
    GeneratedKeyPair,
};

/// Errors raised by the crypto primitives.
///
/// Messages never include key material or plaintext.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Hex-encoded SHA-256 digest of `data`.
///
/// Deterministic, so equal identities hash equal and can still be joined on.
pub fn identity_hash(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_hash_is_stable_sha256_hex() {
        let a = identity_hash("wallet-1");
        let b = identity_hash("wallet-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, identity_hash("wallet-2"));
    }

    #[test]
    fn identity_hash_matches_known_vector() {
        assert_eq!(
            identity_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
