// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet creation and proxy pool bootstrap.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::crypto::{self, CryptoError};
use crate::error::ErrorCategory;
use crate::models::{Wallet, WalletKeyPair, WalletRole, AMOUNT_SCALE};
use crate::proxy::ProxyWalletPool;
use crate::storage::{Ledger, LedgerError};

/// Longest accepted wallet name, in characters.
pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("invalid wallet name: {0}")]
    InvalidName(String),

    #[error("invalid initial balance: {0}")]
    InvalidBalance(String),

    #[error("wallet name already taken: {0}")]
    DuplicateName(String),

    #[error("key generation failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("ledger failure: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for ProvisionError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AlreadyExists(what) => Self::DuplicateName(what),
            other => Self::Ledger(other),
        }
    }
}

impl ProvisionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidName(_) | Self::InvalidBalance(_) => ErrorCategory::InvalidInput,
            Self::DuplicateName(_) => ErrorCategory::Conflict,
            Self::Crypto(_) => ErrorCategory::CryptoFailure,
            Self::Ledger(_) => ErrorCategory::PersistenceFailure,
        }
    }
}

fn validate_name(name: &str) -> Result<&str, ProvisionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProvisionError::InvalidName("name is empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ProvisionError::InvalidName(format!(
            "name longer than {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

/// Create a wallet with a fresh key pair.
///
/// The private key is written only to the wallet key table and never
/// returned.
pub fn create_wallet(
    ledger: &Ledger,
    name: &str,
    initial_balance: Decimal,
    role: WalletRole,
) -> Result<Wallet, ProvisionError> {
    let name = validate_name(name)?;
    if initial_balance < Decimal::ZERO {
        return Err(ProvisionError::InvalidBalance(
            "balance cannot be negative".to_string(),
        ));
    }
    if initial_balance.normalize().scale() > AMOUNT_SCALE {
        return Err(ProvisionError::InvalidBalance(format!(
            "more than {AMOUNT_SCALE} decimal places"
        )));
    }

    let pair = crypto::generate_keypair()?;
    let now = Utc::now();
    let wallet = Wallet {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        balance: initial_balance.normalize(),
        role,
        public_key: pair.public_key.clone(),
        created_at: now,
        updated_at: now,
    };
    let keys = WalletKeyPair {
        wallet_id: wallet.id.clone(),
        public_key: pair.public_key,
        private_key_pem: pair.private_key_pem,
    };

    let unit = ledger.begin()?;
    unit.insert_wallet(&wallet, &keys)?;
    unit.commit()?;

    info!(wallet_id = %wallet.id, role = ?wallet.role, "Wallet created");
    Ok(wallet)
}

/// Load existing proxy wallets into `pool`, creating more until it holds `size`.
///
/// Returns the number of wallets created.
pub fn ensure_proxy_pool(
    ledger: &Ledger,
    pool: &ProxyWalletPool,
    size: usize,
) -> Result<usize, ProvisionError> {
    let existing = ledger.list_wallets(WalletRole::Proxy)?;
    let have = existing.len();
    for wallet in existing {
        pool.register(wallet);
    }

    let missing = size.saturating_sub(have);
    for _ in 0..missing {
        let name = format!("proxy-{}", Uuid::new_v4().simple());
        let wallet = create_wallet(ledger, &name, Decimal::ZERO, WalletRole::Proxy)?;
        pool.register(wallet);
    }

    info!(
        pool_size = pool.len(),
        created = missing,
        "Proxy wallet pool ready"
    );
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn temp_ledger() -> (Ledger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).unwrap();
        (ledger, dir)
    }

    #[test]
    fn create_wallet_stores_key_pair() {
        let (ledger, _dir) = temp_ledger();
        let wallet = create_wallet(&ledger, "  alice ", dec!(100), WalletRole::User).unwrap();

        assert_eq!(wallet.name, "alice");
        assert_eq!(wallet.balance, dec!(100));
        let keys = ledger.key_pair(&wallet.id).unwrap();
        assert_eq!(keys.public_key, wallet.public_key);
        let secret = crypto::secret_from_pem(&keys.private_key_pem).unwrap();
        assert_eq!(crypto::public_key_hex(&secret.public_key()), wallet.public_key);
    }

    #[test]
    fn duplicate_names_conflict() {
        let (ledger, _dir) = temp_ledger();
        create_wallet(&ledger, "alice", dec!(1), WalletRole::User).unwrap();
        let err = create_wallet(&ledger, "alice", dec!(1), WalletRole::User).unwrap_err();
        assert!(matches!(err, ProvisionError::DuplicateName(_)));
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    #[test]
    fn rejects_bad_input() {
        let (ledger, _dir) = temp_ledger();
        assert!(matches!(
            create_wallet(&ledger, "   ", dec!(1), WalletRole::User),
            Err(ProvisionError::InvalidName(_))
        ));
        assert!(matches!(
            create_wallet(&ledger, &"x".repeat(65), dec!(1), WalletRole::User),
            Err(ProvisionError::InvalidName(_))
        ));
        assert!(matches!(
            create_wallet(&ledger, "bob", dec!(-1), WalletRole::User),
            Err(ProvisionError::InvalidBalance(_))
        ));
        assert!(matches!(
            create_wallet(&ledger, "bob", dec!(1.001), WalletRole::User),
            Err(ProvisionError::InvalidBalance(_))
        ));
    }

    #[test]
    fn proxy_pool_is_topped_up_once() {
        let (ledger, _dir) = temp_ledger();

        let pool = ProxyWalletPool::default();
        assert_eq!(ensure_proxy_pool(&ledger, &pool, 5).unwrap(), 5);
        assert_eq!(pool.len(), 5);

        // A restart reloads the same wallets instead of creating new ones
        let reloaded = ProxyWalletPool::default();
        assert_eq!(ensure_proxy_pool(&ledger, &reloaded, 5).unwrap(), 0);
        let mut a = pool.ids();
        let mut b = reloaded.ids();
        a.sort();
        b.sort();
        assert_eq!(a, b);

        assert!(ledger.list_wallets(WalletRole::User).unwrap().is_empty());
    }
}
