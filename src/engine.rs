// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Engine
//!
//! Settles transfers between custodial wallets.
//!
//! ## Transfer Flow
//!
//! Everything below happens inside one [`LedgerTxn`](crate::storage::LedgerTxn);
//! any error drops the unit and nothing survives.
//!
//! 0. Both parties must be user wallets; proxies only relay
//! 1. Insert the `Direct` row as `Pending`
//! 2. Compliance check. On violation: mark `Failed`, store the abnormal
//!    marker, commit, enqueue the alert, return the failed row (not an error)
//! 3. Balance check (`InsufficientBalance` aborts before any mutation)
//! 4. Seal the encrypted record to the payer, build the desensitized record
//! 5. Sample [`PROXY_HOPS`] distinct proxies and write one `ToProxy` plus one
//!    `FromProxy` hop per proxy, amounts from [`split_amount`]
//! 6. Debit payer, credit payee. Proxy balances are never touched.
//! 7. Mark `Completed`, store both shadow records, commit
//!
//! redb admits a single writer, so two transfers from the same wallet can't
//! both pass a stale balance check.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, warn};

use crate::compliance::{ComplianceMonitor, Verdict};
use crate::crypto::{self, CryptoError};
use crate::error::ErrorCategory;
use crate::models::{
    AbnormalTransaction, DecryptedTransaction, Transaction, TxKind, TxStatus, WalletRole,
    AMOUNT_SCALE,
};
use crate::proxy::{ProxyError, ProxyWalletPool};
use crate::records::RecordCodec;
use crate::storage::{page_window, HistoryCache, Ledger, LedgerError};

/// Proxy wallets each transfer is routed through.
pub const PROXY_HOPS: usize = 3;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("sender and receiver must be different wallets")]
    SameWallet,

    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    #[error("proxy wallet {0} cannot send or receive transfers")]
    ProxyParty(String),

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    #[error(transparent)]
    NoProxyWallets(#[from] ProxyError),

    #[error("key pair not found for wallet {0}")]
    KeyPairNotFound(String),

    #[error("private key does not match wallet")]
    InvalidPrivateKey,

    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

impl TransferError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAmount(_)
            | Self::SameWallet
            | Self::ProxyParty(_)
            | Self::InvalidPrivateKey => ErrorCategory::InvalidInput,
            Self::WalletNotFound(_) | Self::KeyPairNotFound(_) => ErrorCategory::NotFound,
            Self::InsufficientBalance { .. } => ErrorCategory::InsufficientBalance,
            Self::NoProxyWallets(_) => ErrorCategory::ResourceExhausted,
            Self::Crypto(_) => ErrorCategory::CryptoFailure,
            Self::Ledger(e) if e.is_not_found() => ErrorCategory::NotFound,
            Self::Ledger(_) => ErrorCategory::PersistenceFailure,
        }
    }
}

fn wallet_lookup(wallet_id: &str) -> impl FnOnce(LedgerError) -> TransferError + '_ {
    move |e| {
        if e.is_not_found() {
            TransferError::WalletNotFound(wallet_id.to_string())
        } else {
            TransferError::Ledger(e)
        }
    }
}

// =============================================================================
// Amount Helpers
// =============================================================================

/// Reject non-positive amounts and amounts finer than [`AMOUNT_SCALE`].
pub fn validate_amount(amount: Decimal) -> Result<Decimal, TransferError> {
    if amount <= Decimal::ZERO {
        return Err(TransferError::InvalidAmount(format!(
            "{amount} is not positive"
        )));
    }
    let normalized = amount.normalize();
    if normalized.scale() > AMOUNT_SCALE {
        return Err(TransferError::InvalidAmount(format!(
            "{amount} has more than {AMOUNT_SCALE} decimal places"
        )));
    }
    Ok(normalized)
}

/// Split `amount` into `parts` pieces that sum exactly to `amount`.
///
/// All but the last piece are `amount / parts` truncated to [`AMOUNT_SCALE`];
/// the last piece takes the remainder.
pub fn split_amount(amount: Decimal, parts: usize) -> Vec<Decimal> {
    if parts <= 1 {
        return vec![amount];
    }
    let share = (amount / Decimal::from(parts as u64))
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero);
    let mut out = vec![share; parts - 1];
    out.push(amount - share * Decimal::from((parts - 1) as u64));
    out
}

// =============================================================================
// Engine
// =============================================================================

pub struct TransactionEngine {
    ledger: Arc<Ledger>,
    proxies: Arc<ProxyWalletPool>,
    monitor: ComplianceMonitor,
    codec: RecordCodec,
    cache: HistoryCache,
}

impl TransactionEngine {
    pub fn new(
        ledger: Arc<Ledger>,
        proxies: Arc<ProxyWalletPool>,
        monitor: ComplianceMonitor,
    ) -> Self {
        Self {
            ledger,
            proxies,
            monitor,
            codec: RecordCodec,
            cache: HistoryCache::default(),
        }
    }

    pub fn monitor(&self) -> &ComplianceMonitor {
        &self.monitor
    }

    /// Move `amount` from one wallet to another.
    ///
    /// A compliance violation is returned as `Ok` with a `Failed`
    /// transaction. Blocking; call from `spawn_blocking` in async code.
    pub fn transfer(
        &self,
        from_wallet_id: &str,
        to_wallet_id: &str,
        amount: Decimal,
    ) -> Result<Transaction, TransferError> {
        let amount = validate_amount(amount)?;
        if from_wallet_id == to_wallet_id {
            return Err(TransferError::SameWallet);
        }

        let unit = self.ledger.begin()?;
        let payer = unit
            .get_wallet(from_wallet_id)
            .map_err(wallet_lookup(from_wallet_id))?;
        let payee = unit
            .get_wallet(to_wallet_id)
            .map_err(wallet_lookup(to_wallet_id))?;
        if let Some(proxy) = [&payer, &payee]
            .into_iter()
            .find(|w| w.role == WalletRole::Proxy)
        {
            return Err(TransferError::ProxyParty(proxy.id.clone()));
        }

        let mut direct = Transaction::direct(&payer.id, &payee.id, amount);
        unit.create_transaction(&direct)?;

        if let Verdict::Violation { evidence } = self.monitor.check(amount, &payer) {
            direct.mark_failed();
            let abnormal = AbnormalTransaction::new(&direct, evidence);
            unit.update_transaction(&direct)?;
            unit.insert_abnormal(&abnormal)?;
            unit.commit()?;
            self.invalidate(&direct);

            warn!(
                transaction_id = %direct.id,
                wallet_id = %payer.id,
                abnormal_id = %abnormal.id,
                "Transfer rejected by compliance policy"
            );
            // Dropped alerts are logged by the monitor; the stored marker is authoritative
            let _ = self.monitor.alert(&direct, &abnormal);
            return Ok(direct);
        }

        if payer.balance < amount {
            return Err(TransferError::InsufficientBalance {
                available: payer.balance,
                requested: amount,
            });
        }
        let new_payee_balance = payee
            .balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::InvalidAmount("payee balance overflow".to_string()))?;

        let keys = unit.key_pair(&payer.id).map_err(|e| {
            if e.is_not_found() {
                TransferError::KeyPairNotFound(payer.id.clone())
            } else {
                TransferError::Ledger(e)
            }
        })?;
        let payer_public = crypto::public_key_from_hex(&keys.public_key)?;
        let encrypted = self.codec.encode(&direct, &payer_public)?;
        let desensitized = self.codec.desensitize(&direct);

        let proxies = self.proxies.sample(PROXY_HOPS)?;
        for (proxy, part) in proxies.iter().zip(split_amount(amount, PROXY_HOPS)) {
            unit.create_transaction(&Transaction::new(
                &payer.id,
                &proxy.id,
                part,
                TxKind::ToProxy,
                TxStatus::Completed,
            ))?;
            unit.create_transaction(&Transaction::new(
                &proxy.id,
                &payee.id,
                part,
                TxKind::FromProxy,
                TxStatus::Completed,
            ))?;
        }

        unit.update_balance(&payer.id, payer.balance - amount)?;
        unit.update_balance(&payee.id, new_payee_balance)?;

        direct.mark_completed();
        unit.update_transaction(&direct)?;
        unit.insert_encrypted(&encrypted)?;
        unit.insert_desensitized(&desensitized, &direct.created_at)?;
        unit.commit()?;
        self.invalidate(&direct);

        info!(
            transaction_id = %direct.id,
            hops = PROXY_HOPS,
            status = ?direct.status,
            "Transfer settled"
        );
        Ok(direct)
    }

    /// `Direct` transactions touching a wallet, newest first.
    pub fn history(
        &self,
        wallet_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Transaction>, TransferError> {
        self.ledger
            .get_wallet(wallet_id)
            .map_err(wallet_lookup(wallet_id))?;

        let (offset, limit) = page_window(page, page_size);
        if offset == 0 {
            if let Some(cached) = self.cache.get_first_page(wallet_id, limit) {
                return Ok(cached);
            }
        }

        let generation = self.cache.generation(wallet_id);
        let txs = self
            .ledger
            .query_by_wallet(wallet_id, TxKind::Direct, page, limit)?;
        if offset == 0 {
            self.cache
                .put_first_page(wallet_id, generation, limit, txs.clone());
        }
        Ok(txs)
    }

    /// Open the payer's encrypted records with their own private key.
    ///
    /// Newest first; `page` is 1-based.
    pub fn decrypted_history(
        &self,
        wallet_id: &str,
        private_key_pem: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<DecryptedTransaction>, TransferError> {
        let wallet = self
            .ledger
            .get_wallet(wallet_id)
            .map_err(wallet_lookup(wallet_id))?;

        let secret =
            crypto::secret_from_pem(private_key_pem).map_err(|_| TransferError::InvalidPrivateKey)?;
        if crypto::public_key_hex(&secret.public_key()) != wallet.public_key {
            return Err(TransferError::InvalidPrivateKey);
        }

        self.ledger
            .encrypted_for_owner(wallet_id, page, page_size)?
            .iter()
            .map(|record| self.codec.decrypt(record, &secret).map_err(TransferError::from))
            .collect()
    }

    fn invalidate(&self, tx: &Transaction) {
        self.cache.invalidate(&tx.from_wallet_id);
        self.cache.invalidate(&tx.to_wallet_id);
    }
}
