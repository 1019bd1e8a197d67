// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Data Models
//!
//! Persisted records and the plain values the core exchanges with the HTTP
//! layer. All types derive `Serialize`, `Deserialize`, and `ToSchema`.
//!
//! ## Model Categories
//!
//! - **Wallets**: balance holders and their key pairs
//! - **Transactions**: the logical transfer (`Direct`) and its proxy hops
//! - **Shadow records**: encrypted (payer-only) and desensitized (analytics)
//! - **Compliance**: abnormal-transaction markers
//! - **Escrow**: encrypted key shares and per-wallet escrow state

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fractional digits kept for every amount.
pub const AMOUNT_SCALE: u32 = 2;

// =============================================================================
// Wallets
// =============================================================================

/// What a wallet is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WalletRole {
    /// Customer wallet that sends and receives transfers
    User,
    /// Intermediary used only to decorrelate ledger entries
    Proxy,
}

impl Default for WalletRole {
    fn default() -> Self {
        Self::User
    }
}

/// A custodial wallet. Never carries the private key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Wallet {
    /// Opaque wallet identifier (UUID)
    pub id: String,
    /// Unique display name
    pub name: String,
    /// Non-negative balance
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
    #[serde(default)]
    pub role: WalletRole,
    /// Hex-encoded uncompressed SEC1 public key
    pub public_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Key pair owned 1:1 by a wallet. Stored apart from the wallet row.
#[derive(Clone, Serialize, Deserialize)]
pub struct WalletKeyPair {
    pub wallet_id: String,
    pub public_key: String,
    /// PKCS#8 PEM. The only place a plaintext private key is persisted.
    pub private_key_pem: String,
}

impl std::fmt::Debug for WalletKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeyPair")
            .field("wallet_id", &self.wallet_id)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Ledger entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    /// The logical payer → payee transfer, the only kind users see
    Direct,
    /// Payer → proxy hop
    ToProxy,
    /// Proxy → payee hop
    FromProxy,
}

impl TxKind {
    /// Single-byte tag used inside index keys.
    pub fn tag(self) -> u8 {
        match self {
            Self::Direct => b'D',
            Self::ToProxy => b'T',
            Self::FromProxy => b'F',
        }
    }
}

/// Transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    /// Rejected by the compliance gate; balances untouched
    Failed,
}

impl Default for TxStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub from_wallet_id: String,
    pub to_wallet_id: String,
    /// Always positive
    #[schema(value_type = String, example = "30.00")]
    pub amount: Decimal,
    pub kind: TxKind,
    pub status: TxStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new record with a fresh id, stamped now.
    pub fn new(
        from_wallet_id: impl Into<String>,
        to_wallet_id: impl Into<String>,
        amount: Decimal,
        kind: TxKind,
        status: TxStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from_wallet_id: from_wallet_id.into(),
            to_wallet_id: to_wallet_id.into(),
            amount,
            kind,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending `Direct` record for a logical transfer.
    pub fn direct(from_wallet_id: &str, to_wallet_id: &str, amount: Decimal) -> Self {
        Self::new(
            from_wallet_id,
            to_wallet_id,
            amount,
            TxKind::Direct,
            TxStatus::Pending,
        )
    }

    pub fn mark_completed(&mut self) {
        self.status = TxStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self) {
        self.status = TxStatus::Failed;
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Shadow Records
// =============================================================================

/// Per-field ciphertext of a settled `Direct` transaction, sealed to the
/// payer's public key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EncryptedTransaction {
    /// Plaintext reference to the `Direct` row this shadows
    pub transaction_id: String,
    /// Payer wallet id; lookup key only, the sealed copy is authoritative
    pub owner_wallet_id: String,
    pub encrypted_from_wallet_id: String,
    pub encrypted_to_wallet_id: String,
    pub encrypted_amount: String,
    pub encrypted_timestamp: String,
    pub created_at: DateTime<Utc>,
}

/// Plaintext recovered from an [`EncryptedTransaction`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DecryptedTransaction {
    pub transaction_id: String,
    pub from_wallet_id: String,
    pub to_wallet_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Closed decimal interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AmountRange {
    #[schema(value_type = String)]
    pub min: Decimal,
    #[schema(value_type = String)]
    pub max: Decimal,
}

impl AmountRange {
    pub fn contains(&self, amount: Decimal) -> bool {
        self.min <= amount && amount <= self.max
    }
}

/// Closed interval of unix seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn contains(&self, unix_seconds: i64) -> bool {
        self.start <= unix_seconds && unix_seconds <= self.end
    }
}

/// Analytics view of a transaction: hashed identities, widened values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DesensitizedTransaction {
    /// SHA-256 of the transaction id
    pub transaction_hash: String,
    /// SHA-256 of the payer wallet id
    pub sender_hash: String,
    /// SHA-256 of the payee wallet id
    pub receiver_hash: String,
    pub amount_range: AmountRange,
    pub time_range: TimeRange,
}

// =============================================================================
// Compliance
// =============================================================================

/// Marker written when a transfer fails the compliance check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AbnormalTransaction {
    pub id: String,
    /// The `Failed` direct transaction
    pub transaction_id: String,
    /// Originating wallet
    pub wallet_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    /// Human-readable policy evidence
    pub evidence: String,
    pub created_at: DateTime<Utc>,
}

impl AbnormalTransaction {
    pub fn new(transaction: &Transaction, evidence: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction.id.clone(),
            wallet_id: transaction.from_wallet_id.clone(),
            amount: transaction.amount,
            evidence: evidence.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Escrow
// =============================================================================

/// One Shamir share of a wallet key, sealed to one jury custodian.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct KeyShare {
    pub wallet_id: String,
    /// Custodian index in the jury directory (0-based)
    pub custodian_index: usize,
    /// Public key the share was sealed to
    pub custodian_public_key: String,
    /// ECIES envelope of the encoded share
    pub ciphertext: String,
    pub created_at: DateTime<Utc>,
}

/// A share already opened by its custodian.
#[derive(Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DecryptedShare {
    pub custodian_index: usize,
    /// Encoded share, `threshold:index:hex`
    pub share: String,
}

impl std::fmt::Debug for DecryptedShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedShare")
            .field("custodian_index", &self.custodian_index)
            .finish_non_exhaustive()
    }
}

impl Drop for DecryptedShare {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.share);
    }
}

/// Escrow lifecycle. No transition leads back to `NoEscrow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EscrowState {
    NoEscrow,
    Split,
    Reconstructed,
}

impl Default for EscrowState {
    fn default() -> Self {
        Self::NoEscrow
    }
}

/// Persisted escrow state plus transition timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
pub struct EscrowStatus {
    pub state: EscrowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconstructed_at: Option<DateTime<Utc>>,
}
