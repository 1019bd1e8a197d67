// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! This is the single authoritative balance store. Every mutation goes
//! through a [`LedgerTxn`], which wraps exactly one redb write transaction:
//! redb admits one writer at a time, so a unit sees a serializable view and
//! balance read-modify-write cycles cannot interleave. Dropping a
//! `LedgerTxn` without calling [`LedgerTxn::commit`] rolls everything back.
//!
//! ## Table Layout
//!
//! - `wallets`: wallet_id → Wallet (JSON)
//! - `wallet_names`: name → wallet_id (uniqueness)
//! - `wallet_keys`: wallet_id → WalletKeyPair (JSON)
//! - `transactions`: tx_id → Transaction (JSON)
//! - `wallet_tx_index`: `wallet_id|kind|!created_at_micros|tx_id` → tx_id
//! - `encrypted_transactions`: tx_id → EncryptedTransaction (JSON)
//! - `owner_encrypted_index`: `owner_wallet_id|!created_at_micros|tx_id` → tx_id
//! - `desensitized_transactions`: `!created_at_micros|tx_hash` → DesensitizedTransaction (JSON)
//! - `abnormal_transactions`: abnormal_id → AbnormalTransaction (JSON)
//! - `wallet_abnormal_index`: `wallet_id|!created_at_micros|abnormal_id` → abnormal_id
//! - `key_shares`: `wallet_id|custodian_index` → KeyShare (JSON)
//! - `escrow_state`: wallet_id → EscrowStatus (JSON)

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};

use crate::models::{
    AbnormalTransaction, DesensitizedTransaction, EncryptedTransaction, EscrowStatus, KeyShare,
    Transaction, TxKind, Wallet, WalletKeyPair, WalletRole,
};

// =============================================================================
// Table Definitions
// =============================================================================

const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");
const WALLET_NAMES: TableDefinition<&str, &str> = TableDefinition::new("wallet_names");
const WALLET_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallet_keys");
const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Key format: `wallet_id|kind_tag|!micros_be|tx_id` for newest-first range scans.
const WALLET_TX_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("wallet_tx_index");

const ENCRYPTED_TXS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("encrypted_transactions");
const OWNER_ENCRYPTED_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("owner_encrypted_index");
const DESENSITIZED_TXS: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("desensitized_transactions");
const ABNORMAL_TXS: TableDefinition<&str, &[u8]> = TableDefinition::new("abnormal_transactions");
const WALLET_ABNORMAL_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("wallet_abnormal_index");
const KEY_SHARES: TableDefinition<&str, &[u8]> = TableDefinition::new("key_shares");
const ESCROW_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("escrow_state");

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Upper bound on `page_size` for paginated queries.
pub const MAX_PAGE_SIZE: usize = 100;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Key Helpers
// =============================================================================

fn micros_desc(at: &DateTime<Utc>) -> [u8; 8] {
    (!at.timestamp_micros() as u64).to_be_bytes()
}

/// Composite key for `wallet_tx_index`. Newer entries sort first.
fn make_index_key(wallet_id: &str, kind: TxKind, at: &DateTime<Utc>, tx_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(wallet_id.len() + 3 + 8 + 1 + tx_id.len());
    key.extend_from_slice(wallet_id.as_bytes());
    key.push(b'|');
    key.push(kind.tag());
    key.push(b'|');
    key.extend_from_slice(&micros_desc(at));
    key.push(b'|');
    key.extend_from_slice(tx_id.as_bytes());
    key
}

fn make_prefix(wallet_id: &str, kind: TxKind) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(wallet_id.len() + 3);
    prefix.extend_from_slice(wallet_id.as_bytes());
    prefix.push(b'|');
    prefix.push(kind.tag());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a prefix scan (prefix with 0xFF bytes appended).
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    end.extend_from_slice(&[0xFF; 48]);
    end
}

/// Key for the per-wallet secondary indexes: `wallet_id|!micros|id`.
fn timeline_key(wallet_id: &str, at: &DateTime<Utc>, id: &str) -> Vec<u8> {
    let mut key = timeline_prefix(wallet_id);
    key.extend_from_slice(&micros_desc(at));
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

fn timeline_prefix(wallet_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(wallet_id.len() + 1);
    prefix.extend_from_slice(wallet_id.as_bytes());
    prefix.push(b'|');
    prefix
}

fn desensitized_key(at: &DateTime<Utc>, tx_hash: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + tx_hash.len());
    key.extend_from_slice(&micros_desc(at));
    key.extend_from_slice(tx_hash.as_bytes());
    key
}

fn share_key(wallet_id: &str, index: usize) -> String {
    format!("{wallet_id}|{index}")
}

/// Clamp 1-based `page` / `page_size` into an offset and limit.
pub fn page_window(page: usize, page_size: usize) -> (usize, usize) {
    let size = page_size.clamp(1, MAX_PAGE_SIZE);
    let offset = page.max(1).saturating_sub(1).saturating_mul(size);
    (offset, size)
}

fn get_json<T, Tbl>(table: &Tbl, key: &str) -> LedgerResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn scan_json<T, Tbl>(table: &Tbl) -> LedgerResult<Vec<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    let mut out = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        out.push(serde_json::from_slice(value.value())?);
    }
    Ok(out)
}

// =============================================================================
// Ledger
// =============================================================================

/// Embedded ACID ledger.
pub struct Ledger {
    db: Database,
}

impl Ledger {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_NAMES)?;
            let _ = write_txn.open_table(WALLET_KEYS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(WALLET_TX_INDEX)?;
            let _ = write_txn.open_table(ENCRYPTED_TXS)?;
            let _ = write_txn.open_table(OWNER_ENCRYPTED_INDEX)?;
            let _ = write_txn.open_table(DESENSITIZED_TXS)?;
            let _ = write_txn.open_table(ABNORMAL_TXS)?;
            let _ = write_txn.open_table(WALLET_ABNORMAL_INDEX)?;
            let _ = write_txn.open_table(KEY_SHARES)?;
            let _ = write_txn.open_table(ESCROW_STATE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin an atomic unit. Blocks while another unit is open.
    pub fn begin(&self) -> LedgerResult<LedgerTxn> {
        Ok(LedgerTxn {
            txn: self.db.begin_write()?,
        })
    }

    // =========================================================================
    // Wallets
    // =========================================================================

    pub fn get_wallet(&self, wallet_id: &str) -> LedgerResult<Wallet> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        get_json(&table, wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Wallet {wallet_id}")))
    }

    pub fn get_wallet_by_name(&self, name: &str) -> LedgerResult<Wallet> {
        let wallet_id = {
            let read_txn = self.db.begin_read()?;
            let names = read_txn.open_table(WALLET_NAMES)?;
            let id = names.get(name)?.map(|v| v.value().to_string());
            id.ok_or_else(|| LedgerError::NotFound(format!("Wallet named {name}")))?
        };
        self.get_wallet(&wallet_id)
    }

    /// All wallets with the given role, oldest first.
    pub fn list_wallets(&self, role: WalletRole) -> LedgerResult<Vec<Wallet>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        let mut wallets: Vec<Wallet> = scan_json(&table)?;
        wallets.retain(|w| w.role == role);
        wallets.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(wallets)
    }

    pub fn key_pair(&self, wallet_id: &str) -> LedgerResult<WalletKeyPair> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLET_KEYS)?;
        get_json(&table, wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Key pair for wallet {wallet_id}")))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub fn get_transaction(&self, tx_id: &str) -> LedgerResult<Transaction> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS)?;
        get_json(&table, tx_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Transaction {tx_id}")))
    }

    /// Transactions of one kind touching a wallet, newest first.
    ///
    /// `page` is 1-based; `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn query_by_wallet(
        &self,
        wallet_id: &str,
        kind: TxKind,
        page: usize,
        page_size: usize,
    ) -> LedgerResult<Vec<Transaction>> {
        let (offset, limit) = page_window(page, page_size);

        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(WALLET_TX_INDEX)?;
        let tx_table = read_txn.open_table(TRANSACTIONS)?;

        let prefix = make_prefix(wallet_id, kind);
        let prefix_end = prefix_end(&prefix);

        let mut results = Vec::with_capacity(limit);
        for entry in idx_table
            .range(prefix.as_slice()..prefix_end.as_slice())?
            .skip(offset)
        {
            let (_, tx_id) = entry?;
            let tx_id = tx_id.value().to_string();
            match get_json::<Transaction, _>(&tx_table, &tx_id)? {
                Some(tx) => results.push(tx),
                None => {
                    tracing::warn!(tx_id = %tx_id, "Index entry without transaction row");
                }
            }
            if results.len() >= limit {
                break;
            }
        }

        Ok(results)
    }

    /// Encrypted shadow record of a direct transaction, if one exists.
    pub fn encrypted_transaction(&self, tx_id: &str) -> LedgerResult<Option<EncryptedTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENCRYPTED_TXS)?;
        get_json(&table, tx_id)
    }

    /// Encrypted records whose payer is `wallet_id`, newest first.
    ///
    /// `page` is 1-based; `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn encrypted_for_owner(
        &self,
        wallet_id: &str,
        page: usize,
        page_size: usize,
    ) -> LedgerResult<Vec<EncryptedTransaction>> {
        let (offset, limit) = page_window(page, page_size);

        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(OWNER_ENCRYPTED_INDEX)?;
        let table = read_txn.open_table(ENCRYPTED_TXS)?;

        let prefix = timeline_prefix(wallet_id);
        let end = prefix_end(&prefix);

        let mut records = Vec::with_capacity(limit);
        for entry in idx_table
            .range(prefix.as_slice()..end.as_slice())?
            .skip(offset)
            .take(limit)
        {
            let (_, tx_id) = entry?;
            let tx_id = tx_id.value().to_string();
            match get_json::<EncryptedTransaction, _>(&table, &tx_id)? {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!(tx_id = %tx_id, "Owner index entry without encrypted record");
                }
            }
        }
        Ok(records)
    }

    /// Desensitized records, newest first.
    pub fn list_desensitized(
        &self,
        page: usize,
        page_size: usize,
    ) -> LedgerResult<Vec<DesensitizedTransaction>> {
        let (offset, limit) = page_window(page, page_size);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DESENSITIZED_TXS)?;

        let mut out = Vec::with_capacity(limit);
        for entry in table.iter()?.skip(offset).take(limit) {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    /// Abnormal-transaction markers, newest first.
    pub fn list_abnormal(&self) -> LedgerResult<Vec<AbnormalTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ABNORMAL_TXS)?;
        let mut records: Vec<AbnormalTransaction> = scan_json(&table)?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    // =========================================================================
    // Escrow
    // =========================================================================

    /// Stored shares for a wallet, ordered by custodian index.
    pub fn key_shares(&self, wallet_id: &str) -> LedgerResult<Vec<KeyShare>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KEY_SHARES)?;
        let prefix = format!("{wallet_id}|");
        let end = format!("{wallet_id}|\u{10FFFF}");

        let mut shares = Vec::new();
        for entry in table.range(prefix.as_str()..end.as_str())? {
            let (_, value) = entry?;
            shares.push(serde_json::from_slice::<KeyShare>(value.value())?);
        }
        shares.sort_by_key(|s| s.custodian_index);
        Ok(shares)
    }

    pub fn escrow_status(&self, wallet_id: &str) -> LedgerResult<EscrowStatus> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ESCROW_STATE)?;
        Ok(get_json(&table, wallet_id)?.unwrap_or_default())
    }
}

// =============================================================================
// LedgerTxn
// =============================================================================

/// One atomic unit of work over the ledger.
///
/// Reads inside the unit observe the unit's own writes.
pub struct LedgerTxn {
    txn: WriteTransaction,
}

impl LedgerTxn {
    fn put_json<T: Serialize>(
        &self,
        definition: JsonTable,
        key: &str,
        value: &T,
    ) -> LedgerResult<()> {
        let json = serde_json::to_vec(value)?;
        let mut table = self.txn.open_table(definition)?;
        table.insert(key, json.as_slice())?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(
        &self,
        definition: JsonTable,
        key: &str,
    ) -> LedgerResult<Option<T>> {
        let table = self.txn.open_table(definition)?;
        get_json(&table, key)
    }

    // =========================================================================
    // WalletStore
    // =========================================================================

    pub fn get_wallet(&self, wallet_id: &str) -> LedgerResult<Wallet> {
        self.read_json(WALLETS, wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Wallet {wallet_id}")))
    }

    pub fn key_pair(&self, wallet_id: &str) -> LedgerResult<WalletKeyPair> {
        self.read_json(WALLET_KEYS, wallet_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("Key pair for wallet {wallet_id}")))
    }

    /// Insert a wallet with its key pair. Names are unique.
    pub fn insert_wallet(&self, wallet: &Wallet, keys: &WalletKeyPair) -> LedgerResult<()> {
        {
            let mut names = self.txn.open_table(WALLET_NAMES)?;
            if names.get(wallet.name.as_str())?.is_some() {
                return Err(LedgerError::AlreadyExists(format!(
                    "Wallet named {}",
                    wallet.name
                )));
            }
            names.insert(wallet.name.as_str(), wallet.id.as_str())?;
        }
        if self.read_json::<Wallet>(WALLETS, &wallet.id)?.is_some() {
            return Err(LedgerError::AlreadyExists(format!("Wallet {}", wallet.id)));
        }
        self.put_json(WALLETS, &wallet.id, wallet)?;
        self.put_json(WALLET_KEYS, &wallet.id, keys)
    }

    pub fn update_balance(&self, wallet_id: &str, new_balance: Decimal) -> LedgerResult<Wallet> {
        let mut wallet = self.get_wallet(wallet_id)?;
        wallet.balance = new_balance;
        wallet.updated_at = Utc::now();
        self.put_json(WALLETS, wallet_id, &wallet)?;
        Ok(wallet)
    }

    // =========================================================================
    // TransactionStore
    // =========================================================================

    /// Store a new transaction and index it under both wallets.
    pub fn create_transaction(&self, tx: &Transaction) -> LedgerResult<()> {
        if self.read_json::<Transaction>(TRANSACTIONS, &tx.id)?.is_some() {
            return Err(LedgerError::AlreadyExists(format!("Transaction {}", tx.id)));
        }
        self.put_json(TRANSACTIONS, &tx.id, tx)?;

        let mut idx_table = self.txn.open_table(WALLET_TX_INDEX)?;
        for wallet_id in [&tx.from_wallet_id, &tx.to_wallet_id] {
            let key = make_index_key(wallet_id, tx.kind, &tx.created_at, &tx.id);
            idx_table.insert(key.as_slice(), tx.id.as_str())?;
        }
        Ok(())
    }

    /// Overwrite the row of an existing transaction (status changes).
    pub fn update_transaction(&self, tx: &Transaction) -> LedgerResult<()> {
        if self.read_json::<Transaction>(TRANSACTIONS, &tx.id)?.is_none() {
            return Err(LedgerError::NotFound(format!("Transaction {}", tx.id)));
        }
        self.put_json(TRANSACTIONS, &tx.id, tx)
    }

    pub fn insert_encrypted(&self, record: &EncryptedTransaction) -> LedgerResult<()> {
        if self
            .read_json::<EncryptedTransaction>(ENCRYPTED_TXS, &record.transaction_id)?
            .is_some()
        {
            return Err(LedgerError::AlreadyExists(format!(
                "Encrypted record for {}",
                record.transaction_id
            )));
        }
        self.put_json(ENCRYPTED_TXS, &record.transaction_id, record)?;

        let key = timeline_key(
            &record.owner_wallet_id,
            &record.created_at,
            &record.transaction_id,
        );
        let mut idx_table = self.txn.open_table(OWNER_ENCRYPTED_INDEX)?;
        idx_table.insert(key.as_slice(), record.transaction_id.as_str())?;
        Ok(())
    }

    /// Append a desensitized record, stamped at `at` for ordering.
    pub fn insert_desensitized(
        &self,
        record: &DesensitizedTransaction,
        at: &DateTime<Utc>,
    ) -> LedgerResult<()> {
        let json = serde_json::to_vec(record)?;
        let key = desensitized_key(at, &record.transaction_hash);
        let mut table = self.txn.open_table(DESENSITIZED_TXS)?;
        table.insert(key.as_slice(), json.as_slice())?;
        Ok(())
    }

    pub fn insert_abnormal(&self, record: &AbnormalTransaction) -> LedgerResult<()> {
        self.put_json(ABNORMAL_TXS, &record.id, record)?;

        let key = timeline_key(&record.wallet_id, &record.created_at, &record.id);
        let mut idx_table = self.txn.open_table(WALLET_ABNORMAL_INDEX)?;
        idx_table.insert(key.as_slice(), record.id.as_str())?;
        Ok(())
    }

    pub fn has_abnormal_for_wallet(&self, wallet_id: &str) -> LedgerResult<bool> {
        let idx_table = self.txn.open_table(WALLET_ABNORMAL_INDEX)?;
        let prefix = timeline_prefix(wallet_id);
        let end = prefix_end(&prefix);
        let mut range = idx_table.range(prefix.as_slice()..end.as_slice())?;
        let found = range.next().transpose()?.is_some();
        Ok(found)
    }

    // =========================================================================
    // Escrow
    // =========================================================================

    /// Write-once: an existing `(wallet, index)` share is never replaced.
    pub fn insert_key_share(&self, share: &KeyShare) -> LedgerResult<()> {
        let key = share_key(&share.wallet_id, share.custodian_index);
        if self.read_json::<KeyShare>(KEY_SHARES, &key)?.is_some() {
            return Err(LedgerError::AlreadyExists(format!(
                "Key share {} of wallet {}",
                share.custodian_index, share.wallet_id
            )));
        }
        self.put_json(KEY_SHARES, &key, share)
    }

    pub fn escrow_status(&self, wallet_id: &str) -> LedgerResult<EscrowStatus> {
        Ok(self.read_json(ESCROW_STATE, wallet_id)?.unwrap_or_default())
    }

    pub fn set_escrow_status(&self, wallet_id: &str, status: &EscrowStatus) -> LedgerResult<()> {
        self.put_json(ESCROW_STATE, wallet_id, status)
    }

    // =========================================================================
    // Completion
    // =========================================================================

    pub fn commit(self) -> LedgerResult<()> {
        self.txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TxStatus, WalletRole};
    use rust_decimal_macros::dec;

    fn temp_ledger() -> (Ledger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).unwrap();
        (ledger, dir)
    }

    fn sample_wallet(name: &str, balance: Decimal) -> (Wallet, WalletKeyPair) {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        let wallet = Wallet {
            id: id.clone(),
            name: name.to_string(),
            balance,
            role: WalletRole::User,
            public_key: "04aa".to_string(),
            created_at: now,
            updated_at: now,
        };
        let keys = WalletKeyPair {
            wallet_id: id,
            public_key: "04aa".to_string(),
            private_key_pem: "pem".to_string(),
        };
        (wallet, keys)
    }

    #[test]
    fn insert_and_get_wallet() {
        let (ledger, _dir) = temp_ledger();
        let (wallet, keys) = sample_wallet("alice", dec!(100));

        let unit = ledger.begin().unwrap();
        unit.insert_wallet(&wallet, &keys).unwrap();
        unit.commit().unwrap();

        assert_eq!(ledger.get_wallet(&wallet.id).unwrap(), wallet);
        assert_eq!(ledger.get_wallet_by_name("alice").unwrap().id, wallet.id);
        assert_eq!(ledger.key_pair(&wallet.id).unwrap().private_key_pem, "pem");
    }

    #[test]
    fn duplicate_wallet_name_is_rejected() {
        let (ledger, _dir) = temp_ledger();
        let (a, ka) = sample_wallet("alice", dec!(1));
        let (b, kb) = sample_wallet("alice", dec!(2));

        let unit = ledger.begin().unwrap();
        unit.insert_wallet(&a, &ka).unwrap();
        assert!(matches!(
            unit.insert_wallet(&b, &kb),
            Err(LedgerError::AlreadyExists(_))
        ));
    }

    #[test]
    fn dropped_unit_rolls_back() {
        let (ledger, _dir) = temp_ledger();
        let (wallet, keys) = sample_wallet("bob", dec!(5));

        {
            let unit = ledger.begin().unwrap();
            unit.insert_wallet(&wallet, &keys).unwrap();
            // dropped without commit
        }

        assert!(ledger.get_wallet(&wallet.id).unwrap_err().is_not_found());
        assert!(ledger.get_wallet_by_name("bob").is_err());
    }

    #[test]
    fn unit_reads_its_own_writes() {
        let (ledger, _dir) = temp_ledger();
        let (wallet, keys) = sample_wallet("carol", dec!(10));

        let unit = ledger.begin().unwrap();
        unit.insert_wallet(&wallet, &keys).unwrap();
        unit.update_balance(&wallet.id, dec!(7.5)).unwrap();
        assert_eq!(unit.get_wallet(&wallet.id).unwrap().balance, dec!(7.5));
        unit.commit().unwrap();

        assert_eq!(ledger.get_wallet(&wallet.id).unwrap().balance, dec!(7.5));
    }

    #[test]
    fn query_by_wallet_filters_kind_and_paginates_newest_first() {
        let (ledger, _dir) = temp_ledger();
        let unit = ledger.begin().unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut tx = Transaction::direct("w1", "w2", dec!(1));
            tx.created_at = Utc::now() - chrono::Duration::seconds(10 - i);
            unit.create_transaction(&tx).unwrap();
            ids.push(tx.id);
        }
        let hop = Transaction::new("w1", "p1", dec!(1), TxKind::ToProxy, TxStatus::Completed);
        unit.create_transaction(&hop).unwrap();
        unit.commit().unwrap();

        let page1 = ledger.query_by_wallet("w1", TxKind::Direct, 1, 2).unwrap();
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].id, ids[4], "newest first");
        assert_eq!(page1[1].id, ids[3]);

        let page3 = ledger.query_by_wallet("w1", TxKind::Direct, 3, 2).unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].id, ids[0]);

        let received = ledger.query_by_wallet("w2", TxKind::Direct, 1, 10).unwrap();
        assert_eq!(received.len(), 5);

        let hops = ledger.query_by_wallet("w1", TxKind::ToProxy, 1, 10).unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].id, hop.id);
        assert!(ledger
            .query_by_wallet("p1", TxKind::Direct, 1, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn key_share_is_write_once() {
        let (ledger, _dir) = temp_ledger();
        let share = KeyShare {
            wallet_id: "w1".to_string(),
            custodian_index: 2,
            custodian_public_key: "04bb".to_string(),
            ciphertext: "c".to_string(),
            created_at: Utc::now(),
        };
        let unit = ledger.begin().unwrap();
        unit.insert_key_share(&share).unwrap();
        assert!(matches!(
            unit.insert_key_share(&share),
            Err(LedgerError::AlreadyExists(_))
        ));
        unit.commit().unwrap();

        let stored = ledger.key_shares("w1").unwrap();
        assert_eq!(stored, vec![share]);
        assert!(ledger.key_shares("w10").unwrap().is_empty());
    }

    #[test]
    fn open_creates_missing_parent_and_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("ledger.redb");
        assert!(Ledger::open(&nested).is_ok());

        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let err = Ledger::open(&blocker.join("ledger.redb")).err().unwrap();
        assert!(matches!(err, LedgerError::Io(_)));
    }

    fn encrypted_record(owner: &str, age_secs: i64) -> EncryptedTransaction {
        EncryptedTransaction {
            transaction_id: uuid::Uuid::new_v4().to_string(),
            owner_wallet_id: owner.to_string(),
            encrypted_from_wallet_id: "c".to_string(),
            encrypted_to_wallet_id: "c".to_string(),
            encrypted_amount: "c".to_string(),
            encrypted_timestamp: "c".to_string(),
            created_at: Utc::now() - chrono::Duration::seconds(age_secs),
        }
    }

    #[test]
    fn encrypted_for_owner_uses_owner_index() {
        let (ledger, _dir) = temp_ledger();
        let unit = ledger.begin().unwrap();
        let oldest = encrypted_record("w1", 30);
        let newest = encrypted_record("w1", 10);
        unit.insert_encrypted(&oldest).unwrap();
        unit.insert_encrypted(&encrypted_record("w10", 20)).unwrap();
        unit.insert_encrypted(&newest).unwrap();
        unit.commit().unwrap();

        let page1 = ledger.encrypted_for_owner("w1", 1, 1).unwrap();
        assert_eq!(page1, vec![newest]);
        let page2 = ledger.encrypted_for_owner("w1", 2, 1).unwrap();
        assert_eq!(page2, vec![oldest]);
        assert_eq!(ledger.encrypted_for_owner("w1", 1, 10).unwrap().len(), 2);
        assert_eq!(ledger.encrypted_for_owner("w10", 1, 10).unwrap().len(), 1);
        assert!(ledger.encrypted_for_owner("w2", 1, 10).unwrap().is_empty());
    }

    #[test]
    fn abnormal_lookup_is_per_wallet() {
        let (ledger, _dir) = temp_ledger();
        let mut tx = Transaction::direct("w10", "w2", dec!(20000));
        tx.mark_failed();

        let unit = ledger.begin().unwrap();
        unit.insert_abnormal(&AbnormalTransaction::new(&tx, "over ceiling"))
            .unwrap();
        assert!(unit.has_abnormal_for_wallet("w10").unwrap());
        assert!(!unit.has_abnormal_for_wallet("w1").unwrap());
        assert!(!unit.has_abnormal_for_wallet("w2").unwrap());
        unit.commit().unwrap();

        assert_eq!(ledger.list_abnormal().unwrap().len(), 1);
    }

    #[test]
    fn page_window_clamps() {
        assert_eq!(page_window(0, 0), (0, 1));
        assert_eq!(page_window(1, 10), (0, 10));
        assert_eq!(page_window(3, 10), (20, 10));
        assert_eq!(page_window(2, 1_000), (MAX_PAGE_SIZE, MAX_PAGE_SIZE));
    }

    #[test]
    fn make_index_key_ordering() {
        let old = Utc::now() - chrono::Duration::seconds(5);
        let new = Utc::now();
        let key_old = make_index_key("w", TxKind::Direct, &old, "tx1");
        let key_new = make_index_key("w", TxKind::Direct, &new, "tx2");
        assert!(key_new < key_old, "Newer timestamps should sort first");
    }
}
