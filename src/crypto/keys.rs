// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 key handling for wallets and jury custodians.

use k256::elliptic_curve::rand_core::OsRng;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use k256::{PublicKey, SecretKey};

use super::{CryptoError, CryptoResult};

/// Freshly generated key pair in its storage encoding.
pub struct GeneratedKeyPair {
    /// PKCS#8 PEM private key. Only ever written to the wallet key table.
    pub private_key_pem: String,
    /// Hex-encoded uncompressed SEC1 public key (65 bytes, `04` prefix).
    pub public_key: String,
}

impl std::fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Generate a random secp256k1 key pair.
pub fn generate_keypair() -> CryptoResult<GeneratedKeyPair> {
    let secret = SecretKey::random(&mut OsRng);
    let private_key_pem = secret_to_pem(&secret)?;
    let public_key = public_key_hex(&secret.public_key());

    Ok(GeneratedKeyPair {
        private_key_pem,
        public_key,
    })
}

/// Encode a secret key as PKCS#8 PEM.
pub fn secret_to_pem(secret: &SecretKey) -> CryptoResult<String> {
    let pem = secret
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidPrivateKey(format!("PEM encoding failed: {e}")))?;
    Ok(pem.to_string())
}

/// Parse a PEM private key.
///
/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and falls back to SEC1
/// (`BEGIN EC PRIVATE KEY`).
pub fn secret_from_pem(pem: &str) -> CryptoResult<SecretKey> {
    SecretKey::from_pkcs8_pem(pem)
        .or_else(|_| SecretKey::from_sec1_pem(pem))
        .map_err(|_| CryptoError::InvalidPrivateKey("unrecognised PEM key format".to_string()))
}

/// Hex-encode a public key as an uncompressed SEC1 point.
pub fn public_key_hex(public: &PublicKey) -> String {
    hex::encode(public.to_encoded_point(false).as_bytes())
}

/// Parse a hex-encoded SEC1 public key.
///
/// Accepts compressed (33 bytes), uncompressed (65 bytes) and the bare
/// 64-byte `x || y` form that omits the `04` tag.
pub fn public_key_from_hex(encoded: &str) -> CryptoResult<PublicKey> {
    let trimmed = encoded.trim().trim_start_matches("0x");
    let mut bytes =
        hex::decode(trimmed).map_err(|e| CryptoError::InvalidPublicKey(format!("bad hex: {e}")))?;

    if bytes.len() == 64 {
        bytes.insert(0, 0x04);
    }

    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| CryptoError::InvalidPublicKey("not a secp256k1 point".to_string()))
}
