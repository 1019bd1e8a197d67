// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

mod common;

use hufu_server::crypto;
use hufu_server::escrow::{decrypt_share, EscrowError};
use hufu_server::models::{DecryptedShare, EscrowState, KeyShare, TxStatus};
use rust_decimal_macros::dec;

use common::{harness, Harness};

fn open(h: &Harness, shares: &[KeyShare], pick: &[usize]) -> Vec<DecryptedShare> {
    pick.iter()
        .map(|&i| decrypt_share(&shares[i], &h.jurors[i]).unwrap())
        .collect()
}

/// Wallet with an abnormal transaction on record and its key escrowed.
fn flagged_and_escrowed(h: &Harness) -> (String, Vec<KeyShare>) {
    let mallory = h.wallet("mallory", dec!(50000));
    let bob = h.wallet("bob", dec!(0));

    let tx = h
        .state
        .engine
        .transfer(&mallory.id, &bob.id, dec!(15000))
        .unwrap();
    assert_eq!(tx.status, TxStatus::Failed);

    let shares = h.state.escrow.split(&mallory.id).unwrap();
    (mallory.id, shares)
}

#[test]
fn three_of_five_recovers_the_wallet_key() {
    let h = harness();
    let (wallet_id, shares) = flagged_and_escrowed(&h);

    let recovered = h
        .state
        .escrow
        .recover(&wallet_id, &open(&h, &shares, &[1, 3, 4]))
        .unwrap();
    assert_eq!(recovered.status.state, EscrowState::Reconstructed);
    assert!(recovered.status.reconstructed_at.is_some());

    let original = crypto::secret_from_pem(&h.private_key_pem(&wallet_id)).unwrap();
    let rebuilt = crypto::secret_from_pem(&recovered.private_key_pem).unwrap();
    assert_eq!(rebuilt.to_bytes(), original.to_bytes());

    assert_eq!(
        h.state.escrow.state(&wallet_id).unwrap().state,
        EscrowState::Reconstructed
    );
}

#[test]
fn two_of_five_is_not_enough() {
    let h = harness();
    let (wallet_id, shares) = flagged_and_escrowed(&h);

    let err = h
        .state
        .escrow
        .recover(&wallet_id, &open(&h, &shares, &[0, 4]))
        .unwrap_err();
    assert!(matches!(
        err,
        EscrowError::InsufficientShares { needed: 3, have: 2 }
    ));
    assert_eq!(
        h.state.escrow.state(&wallet_id).unwrap().state,
        EscrowState::Split
    );
}

#[test]
fn recovery_can_be_repeated() {
    let h = harness();
    let (wallet_id, shares) = flagged_and_escrowed(&h);

    let first = h
        .state
        .escrow
        .recover(&wallet_id, &open(&h, &shares, &[0, 1, 2]))
        .unwrap();
    let second = h
        .state
        .escrow
        .recover(&wallet_id, &open(&h, &shares, &[2, 3, 4]))
        .unwrap();
    assert_eq!(
        first.status.reconstructed_at,
        second.status.reconstructed_at
    );
}

#[test]
fn shares_of_another_wallet_do_not_recover_this_one() {
    let h = harness();
    let (wallet_id, _) = flagged_and_escrowed(&h);

    let other = h.wallet("other", dec!(0));
    let other_shares = h.state.escrow.split(&other.id).unwrap();

    let err = h
        .state
        .escrow
        .recover(&wallet_id, &open(&h, &other_shares, &[0, 1, 2]))
        .unwrap_err();
    assert!(matches!(err, EscrowError::KeyMismatch(_)));
}

#[test]
fn recover_needs_a_split_key() {
    let h = harness();
    let mallory = h.wallet("mallory", dec!(50000));
    let bob = h.wallet("bob", dec!(0));
    h.state
        .engine
        .transfer(&mallory.id, &bob.id, dec!(20000))
        .unwrap();

    let err = h.state.escrow.recover(&mallory.id, &[]).unwrap_err();
    assert!(matches!(err, EscrowError::NotEscrowed(_)));
}

#[test]
fn escrow_does_not_touch_balances_or_history() {
    let h = harness();
    let alice = h.wallet("alice", dec!(100));
    let bob = h.wallet("bob", dec!(0));
    h.state
        .engine
        .transfer(&alice.id, &bob.id, dec!(30))
        .unwrap();

    h.state.escrow.split(&alice.id).unwrap();
    assert_eq!(h.balance(&alice.id), dec!(70));
    assert_eq!(h.state.engine.history(&alice.id, 1, 10).unwrap().len(), 1);

    // Split shares are ciphertext, not the raw encoding
    for share in h.state.escrow.shares(&alice.id).unwrap() {
        assert!(!share.ciphertext.starts_with("3:"));
    }
}
