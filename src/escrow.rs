// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Escrow
//!
//! Threshold custody of wallet private keys.
//!
//! ## Lifecycle
//!
//! ```text
//! NoEscrow ──split──▶ Split ──recover──▶ Reconstructed
//! ```
//!
//! `split` cuts the wallet's 32-byte secret scalar into [`ESCROW_SHARES`]
//! Shamir shares (any [`ESCROW_THRESHOLD`] recombine), seals share `i` to
//! jury member `i`, and writes all of them plus the state change in one
//! ledger unit. Shares are write-once; there is no way back to `NoEscrow`.
//!
//! Custodians open their own share with [`decrypt_share`]. Reassembly
//! happens in [`KeyEscrow::reconstruct`]; [`KeyEscrow::recover`] additionally
//! requires a compliance trigger for the wallet and checks the recovered key
//! against the wallet's public key.

use std::sync::Arc;

use chrono::Utc;
use k256::{PublicKey, SecretKey};
use tracing::info;
use zeroize::Zeroizing;

use crate::crypto::shamir::{self, ShamirError, Share};
use crate::crypto::{self, CryptoError};
use crate::error::ErrorCategory;
use crate::models::{DecryptedShare, EscrowState, EscrowStatus, KeyShare};
use crate::storage::{Ledger, LedgerError};

/// Shares needed to reconstruct.
pub const ESCROW_THRESHOLD: u8 = 3;
/// Shares cut per wallet, one per jury member.
pub const ESCROW_SHARES: u8 = 5;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    #[error("private key not found for wallet {0}")]
    KeyNotFound(String),

    #[error("wallet {0} is already escrowed")]
    AlreadyEscrowed(String),

    #[error("wallet {0} has no escrowed key")]
    NotEscrowed(String),

    #[error("wallet {0} has no abnormal transaction on record")]
    NoComplianceTrigger(String),

    #[error("insufficient shares: need {needed}, have {have}")]
    InsufficientShares { needed: usize, have: usize },

    #[error("invalid share: {0}")]
    InvalidShare(String),

    #[error("recovered key does not belong to wallet {0}")]
    KeyMismatch(String),

    #[error("invalid jury directory: {0}")]
    InvalidJury(String),

    #[error("crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("secret sharing failure: {0}")]
    Sharing(ShamirError),

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<ShamirError> for EscrowError {
    fn from(e: ShamirError) -> Self {
        match e {
            ShamirError::InsufficientShares { needed, have } => {
                Self::InsufficientShares { needed, have }
            }
            ShamirError::InvalidShare(msg) | ShamirError::Inconsistent(msg) => {
                Self::InvalidShare(msg)
            }
            other => Self::Sharing(other),
        }
    }
}

impl EscrowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::WalletNotFound(_) | Self::KeyNotFound(_) | Self::NotEscrowed(_) => {
                ErrorCategory::NotFound
            }
            Self::AlreadyEscrowed(_) | Self::NoComplianceTrigger(_) => ErrorCategory::Conflict,
            Self::InsufficientShares { .. } => ErrorCategory::ResourceExhausted,
            Self::InvalidShare(_) | Self::KeyMismatch(_) | Self::InvalidJury(_) => {
                ErrorCategory::InvalidInput
            }
            Self::Crypto(_) | Self::Sharing(_) => ErrorCategory::CryptoFailure,
            Self::Ledger(e) if e.is_not_found() => ErrorCategory::NotFound,
            Self::Ledger(_) => ErrorCategory::PersistenceFailure,
        }
    }
}

// =============================================================================
// Jury Directory
// =============================================================================

/// Ordered, index-addressable custodian public keys.
#[derive(Debug, Clone)]
pub struct JuryDirectory {
    members: Vec<PublicKey>,
}

impl JuryDirectory {
    pub fn new(members: Vec<PublicKey>) -> Result<Self, EscrowError> {
        if members.len() != ESCROW_SHARES as usize {
            return Err(EscrowError::InvalidJury(format!(
                "expected {ESCROW_SHARES} members, got {}",
                members.len()
            )));
        }
        Ok(Self { members })
    }

    /// Parse hex-encoded SEC1 keys, in custodian order.
    pub fn from_hex<S: AsRef<str>>(keys: &[S]) -> Result<Self, EscrowError> {
        let members = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                crypto::public_key_from_hex(k.as_ref())
                    .map_err(|e| EscrowError::InvalidJury(format!("member {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(members)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PublicKey> {
        self.members.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PublicKey> {
        self.members.iter()
    }
}

// =============================================================================
// Custodian Side
// =============================================================================

/// Open one stored share with the custodian's secret key.
pub fn decrypt_share(share: &KeyShare, custodian: &SecretKey) -> Result<DecryptedShare, EscrowError> {
    Ok(DecryptedShare {
        custodian_index: share.custodian_index,
        share: crypto::decrypt_string(custodian, &share.ciphertext)?,
    })
}

/// Recovered wallet key, handed to the regulator.
pub struct RecoveredKey {
    pub wallet_id: String,
    pub private_key_pem: Zeroizing<String>,
    pub status: EscrowStatus,
}

impl std::fmt::Debug for RecoveredKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveredKey")
            .field("wallet_id", &self.wallet_id)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// KeyEscrow
// =============================================================================

pub struct KeyEscrow {
    ledger: Arc<Ledger>,
    jury: JuryDirectory,
}

impl KeyEscrow {
    pub fn new(ledger: Arc<Ledger>, jury: JuryDirectory) -> Self {
        Self { ledger, jury }
    }

    /// Split a wallet's private key across the jury. All-or-nothing.
    pub fn split(&self, wallet_id: &str) -> Result<Vec<KeyShare>, EscrowError> {
        let unit = self.ledger.begin()?;

        unit.get_wallet(wallet_id).map_err(|e| {
            if e.is_not_found() {
                EscrowError::WalletNotFound(wallet_id.to_string())
            } else {
                EscrowError::Ledger(e)
            }
        })?;

        if unit.escrow_status(wallet_id)?.state != EscrowState::NoEscrow {
            return Err(EscrowError::AlreadyEscrowed(wallet_id.to_string()));
        }

        let keys = unit.key_pair(wallet_id).map_err(|e| {
            if e.is_not_found() {
                EscrowError::KeyNotFound(wallet_id.to_string())
            } else {
                EscrowError::Ledger(e)
            }
        })?;
        let secret = crypto::secret_from_pem(&keys.private_key_pem)?;
        let scalar = Zeroizing::new(secret.to_bytes().to_vec());

        let pieces = shamir::split(&scalar, ESCROW_THRESHOLD, ESCROW_SHARES)?;
        let now = Utc::now();

        let mut stored = Vec::with_capacity(pieces.len());
        for (index, (piece, juror)) in pieces.iter().zip(self.jury.iter()).enumerate() {
            let encoded = piece.encode();
            let share = KeyShare {
                wallet_id: wallet_id.to_string(),
                custodian_index: index,
                custodian_public_key: crypto::public_key_hex(juror),
                ciphertext: crypto::encrypt(juror, encoded.as_bytes())?,
                created_at: now,
            };
            unit.insert_key_share(&share)?;
            stored.push(share);
        }

        unit.set_escrow_status(
            wallet_id,
            &EscrowStatus {
                state: EscrowState::Split,
                split_at: Some(now),
                reconstructed_at: None,
            },
        )?;
        unit.commit()?;

        info!(wallet_id = %wallet_id, shares = stored.len(), "Wallet key escrowed");
        Ok(stored)
    }

    /// Recombine custodian-decrypted shares into a private key.
    ///
    /// Fewer than [`ESCROW_THRESHOLD`] distinct shares is always an error.
    pub fn reconstruct(&self, shares: &[DecryptedShare]) -> Result<SecretKey, EscrowError> {
        let parsed = shares
            .iter()
            .map(|s| {
                let share: Share = s.share.parse()?;
                if usize::from(share.x()) != s.custodian_index + 1 {
                    return Err(EscrowError::InvalidShare(format!(
                        "share does not belong to custodian {}",
                        s.custodian_index
                    )));
                }
                Ok(share)
            })
            .collect::<Result<Vec<_>, EscrowError>>()?;

        let scalar = shamir::combine(&parsed, ESCROW_THRESHOLD)?;
        SecretKey::from_slice(&scalar).map_err(|_| {
            EscrowError::Crypto(CryptoError::InvalidPrivateKey(
                "recombined bytes are not a valid scalar".to_string(),
            ))
        })
    }

    /// Regulator recovery: needs a compliance trigger and a matching key.
    pub fn recover(
        &self,
        wallet_id: &str,
        shares: &[DecryptedShare],
    ) -> Result<RecoveredKey, EscrowError> {
        let unit = self.ledger.begin()?;
        let wallet = unit.get_wallet(wallet_id).map_err(|e| {
            if e.is_not_found() {
                EscrowError::WalletNotFound(wallet_id.to_string())
            } else {
                EscrowError::Ledger(e)
            }
        })?;

        if !unit.has_abnormal_for_wallet(wallet_id)? {
            return Err(EscrowError::NoComplianceTrigger(wallet_id.to_string()));
        }

        let current = unit.escrow_status(wallet_id)?;
        if current.state == EscrowState::NoEscrow {
            return Err(EscrowError::NotEscrowed(wallet_id.to_string()));
        }

        let secret = self.reconstruct(shares)?;
        if crypto::public_key_hex(&secret.public_key()) != wallet.public_key {
            return Err(EscrowError::KeyMismatch(wallet_id.to_string()));
        }

        let status = EscrowStatus {
            state: EscrowState::Reconstructed,
            split_at: current.split_at,
            reconstructed_at: current.reconstructed_at.or_else(|| Some(Utc::now())),
        };
        unit.set_escrow_status(wallet_id, &status)?;
        unit.commit()?;

        info!(wallet_id = %wallet_id, "Escrowed key reconstructed");
        Ok(RecoveredKey {
            wallet_id: wallet_id.to_string(),
            private_key_pem: Zeroizing::new(crypto::secret_to_pem(&secret)?),
            status,
        })
    }

    /// Sealed shares of a wallet, by custodian index.
    pub fn shares(&self, wallet_id: &str) -> Result<Vec<KeyShare>, EscrowError> {
        Ok(self.ledger.key_shares(wallet_id)?)
    }

    pub fn state(&self, wallet_id: &str) -> Result<EscrowStatus, EscrowError> {
        Ok(self.ledger.escrow_status(wallet_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Wallet, WalletKeyPair, WalletRole};
    use k256::elliptic_curve::rand_core::OsRng;

    struct Fixture {
        escrow: KeyEscrow,
        jurors: Vec<SecretKey>,
        wallet: Wallet,
        pem: String,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(Ledger::open(&dir.path().join("ledger.redb")).unwrap());
        let jurors: Vec<SecretKey> = (0..5).map(|_| SecretKey::random(&mut OsRng)).collect();
        let jury = JuryDirectory::new(jurors.iter().map(|s| s.public_key()).collect()).unwrap();

        let pair = crypto::generate_keypair().unwrap();
        let now = Utc::now();
        let wallet = Wallet {
            id: "wallet-1".to_string(),
            name: "alice".to_string(),
            balance: rust_decimal::Decimal::ZERO,
            role: WalletRole::User,
            public_key: pair.public_key.clone(),
            created_at: now,
            updated_at: now,
        };
        let keys = WalletKeyPair {
            wallet_id: wallet.id.clone(),
            public_key: pair.public_key.clone(),
            private_key_pem: pair.private_key_pem.clone(),
        };
        let unit = ledger.begin().unwrap();
        unit.insert_wallet(&wallet, &keys).unwrap();
        unit.commit().unwrap();

        Fixture {
            escrow: KeyEscrow::new(ledger, jury),
            jurors,
            wallet,
            pem: pair.private_key_pem,
            _dir: dir,
        }
    }

    fn opened(f: &Fixture, shares: &[KeyShare], pick: &[usize]) -> Vec<DecryptedShare> {
        pick.iter()
            .map(|&i| decrypt_share(&shares[i], &f.jurors[i]).unwrap())
            .collect()
    }

    #[test]
    fn split_stores_five_sealed_shares() {
        let f = fixture();
        let shares = f.escrow.split(&f.wallet.id).unwrap();
        assert_eq!(shares.len(), 5);
        for (i, share) in shares.iter().enumerate() {
            assert_eq!(share.custodian_index, i);
            assert_eq!(share.custodian_public_key, crypto::public_key_hex(&f.jurors[i].public_key()));
        }
        assert_eq!(f.escrow.shares(&f.wallet.id).unwrap(), shares);
        assert_eq!(
            f.escrow.state(&f.wallet.id).unwrap().state,
            EscrowState::Split
        );
    }

    #[test]
    fn only_the_addressed_juror_can_open_a_share() {
        let f = fixture();
        let shares = f.escrow.split(&f.wallet.id).unwrap();
        assert!(decrypt_share(&shares[0], &f.jurors[1]).is_err());
    }

    #[test]
    fn every_three_subset_reconstructs_the_key() {
        let f = fixture();
        let shares = f.escrow.split(&f.wallet.id).unwrap();
        let expected = crypto::secret_from_pem(&f.pem).unwrap();

        for a in 0..5 {
            for b in (a + 1)..5 {
                for c in (b + 1)..5 {
                    let key = f.escrow.reconstruct(&opened(&f, &shares, &[a, b, c])).unwrap();
                    assert_eq!(key.to_bytes(), expected.to_bytes(), "subset {a},{b},{c}");
                }
            }
        }
    }

    #[test]
    fn two_shares_are_refused() {
        let f = fixture();
        let shares = f.escrow.split(&f.wallet.id).unwrap();
        for a in 0..5 {
            for b in (a + 1)..5 {
                let err = f.escrow.reconstruct(&opened(&f, &shares, &[a, b])).unwrap_err();
                assert!(matches!(
                    err,
                    EscrowError::InsufficientShares { needed: 3, have: 2 }
                ));
            }
        }
    }

    #[test]
    fn repeated_share_does_not_count_twice() {
        let f = fixture();
        let shares = f.escrow.split(&f.wallet.id).unwrap();
        let err = f
            .escrow
            .reconstruct(&opened(&f, &shares, &[0, 0, 1]))
            .unwrap_err();
        assert!(matches!(err, EscrowError::InsufficientShares { .. }));
    }

    #[test]
    fn mislabelled_share_is_rejected() {
        let f = fixture();
        let shares = f.escrow.split(&f.wallet.id).unwrap();
        let mut picked = opened(&f, &shares, &[0, 1, 2]);
        picked[0].custodian_index = 4;
        assert!(matches!(
            f.escrow.reconstruct(&picked),
            Err(EscrowError::InvalidShare(_))
        ));
    }

    #[test]
    fn second_split_is_refused_and_shares_unchanged() {
        let f = fixture();
        let first = f.escrow.split(&f.wallet.id).unwrap();
        assert!(matches!(
            f.escrow.split(&f.wallet.id),
            Err(EscrowError::AlreadyEscrowed(_))
        ));
        assert_eq!(f.escrow.shares(&f.wallet.id).unwrap(), first);
    }

    #[test]
    fn split_unknown_wallet() {
        let f = fixture();
        let err = f.escrow.split("nope").unwrap_err();
        assert!(matches!(err, EscrowError::WalletNotFound(_)));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn recover_requires_compliance_trigger() {
        let f = fixture();
        let shares = f.escrow.split(&f.wallet.id).unwrap();
        let err = f
            .escrow
            .recover(&f.wallet.id, &opened(&f, &shares, &[0, 2, 4]))
            .unwrap_err();
        assert!(matches!(err, EscrowError::NoComplianceTrigger(_)));
        assert_eq!(
            f.escrow.state(&f.wallet.id).unwrap().state,
            EscrowState::Split
        );
    }

    #[test]
    fn jury_must_have_five_members() {
        let keys: Vec<PublicKey> = (0..4)
            .map(|_| SecretKey::random(&mut OsRng).public_key())
            .collect();
        assert!(matches!(
            JuryDirectory::new(keys),
            Err(EscrowError::InvalidJury(_))
        ));
        assert!(matches!(
            JuryDirectory::from_hex(&["zz"; 5]),
            Err(EscrowError::InvalidJury(_))
        ));
    }

    #[test]
    fn jury_from_hex_preserves_order() {
        let secrets: Vec<SecretKey> = (0..5).map(|_| SecretKey::random(&mut OsRng)).collect();
        let hex: Vec<String> = secrets
            .iter()
            .map(|s| crypto::public_key_hex(&s.public_key()))
            .collect();
        let jury = JuryDirectory::from_hex(&hex).unwrap();
        assert_eq!(jury.len(), 5);
        assert_eq!(jury.get(3), Some(&secrets[3].public_key()));
        assert!(jury.get(5).is_none());
    }
}
