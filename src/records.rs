// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Shadow Records
//!
//! Two derived views of every settled `Direct` transaction:
//!
//! - **Encrypted**: each field sealed separately to the payer's public key,
//!   so one field can be opened without the others.
//! - **Desensitized**: identities replaced by SHA-256 digests, amount and
//!   timestamp widened to `[v - δ, v + δ]`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use k256::{PublicKey, SecretKey};
use rust_decimal::Decimal;

use crate::crypto::{self, CryptoError, CryptoResult};
use crate::models::{
    AmountRange, DecryptedTransaction, DesensitizedTransaction, EncryptedTransaction, TimeRange,
    Transaction,
};

/// Half-width of the amount range (currency units).
pub const AMOUNT_DELTA: Decimal = Decimal::TEN;
/// Half-width of the time range (seconds).
pub const TIME_DELTA_SECS: i64 = 10;

/// Stateless encoder for shadow records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl RecordCodec {
    /// Seal each semantic field of `tx` to `recipient`.
    pub fn encode(
        &self,
        tx: &Transaction,
        recipient: &PublicKey,
    ) -> CryptoResult<EncryptedTransaction> {
        Ok(EncryptedTransaction {
            transaction_id: tx.id.clone(),
            owner_wallet_id: tx.from_wallet_id.clone(),
            encrypted_from_wallet_id: crypto::encrypt_str(recipient, &tx.from_wallet_id)?,
            encrypted_to_wallet_id: crypto::encrypt_str(recipient, &tx.to_wallet_id)?,
            encrypted_amount: crypto::encrypt_str(recipient, &tx.amount.to_string())?,
            encrypted_timestamp: crypto::encrypt_str(recipient, &tx.created_at.to_rfc3339())?,
            created_at: Utc::now(),
        })
    }

    /// Deterministic analytics view of `tx`.
    pub fn desensitize(&self, tx: &Transaction) -> DesensitizedTransaction {
        let at = tx.created_at.timestamp();
        DesensitizedTransaction {
            transaction_hash: crypto::identity_hash(&tx.id),
            sender_hash: crypto::identity_hash(&tx.from_wallet_id),
            receiver_hash: crypto::identity_hash(&tx.to_wallet_id),
            amount_range: AmountRange {
                min: tx.amount - AMOUNT_DELTA,
                max: tx.amount + AMOUNT_DELTA,
            },
            time_range: TimeRange {
                start: at - TIME_DELTA_SECS,
                end: at + TIME_DELTA_SECS,
            },
        }
    }

    /// Open every field of an encrypted record.
    pub fn decrypt(
        &self,
        record: &EncryptedTransaction,
        secret: &SecretKey,
    ) -> CryptoResult<DecryptedTransaction> {
        let amount = crypto::decrypt_string(secret, &record.encrypted_amount)?;
        let timestamp = crypto::decrypt_string(secret, &record.encrypted_timestamp)?;

        Ok(DecryptedTransaction {
            transaction_id: record.transaction_id.clone(),
            from_wallet_id: crypto::decrypt_string(secret, &record.encrypted_from_wallet_id)?,
            to_wallet_id: crypto::decrypt_string(secret, &record.encrypted_to_wallet_id)?,
            amount: Decimal::from_str(&amount)
                .map_err(|_| CryptoError::Decryption("amount field is not a decimal".to_string()))?,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|_| CryptoError::Decryption("timestamp field is not RFC 3339".to_string()))?
                .with_timezone(&Utc),
        })
    }
}
