// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::sync::Arc;

use hufu_server::compliance::{AlertDispatcher, AlertQueue, ComplianceMonitor, CompliancePolicy};
use hufu_server::escrow::JuryDirectory;
use hufu_server::models::{Wallet, WalletRole};
use hufu_server::provisioning;
use hufu_server::proxy::ProxyWalletPool;
use hufu_server::state::AppState;
use hufu_server::storage::{Ledger, LEDGER_FILE};
use k256::elliptic_curve::rand_core::OsRng;
use k256::SecretKey;
use rust_decimal::Decimal;
use tempfile::TempDir;

/// A fully wired service over a throwaway ledger.
pub struct Harness {
    pub state: AppState,
    pub jurors: Vec<SecretKey>,
    pub alerts: AlertQueue,
    _dir: TempDir,
}

pub fn harness() -> Harness {
    harness_with_proxies(5)
}

pub fn harness_with_proxies(proxy_count: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::open(&dir.path().join(LEDGER_FILE)).unwrap());

    let proxies = Arc::new(ProxyWalletPool::default());
    provisioning::ensure_proxy_pool(&ledger, &proxies, proxy_count).unwrap();

    let jurors: Vec<SecretKey> = (0..5).map(|_| SecretKey::random(&mut OsRng)).collect();
    let jury = JuryDirectory::new(jurors.iter().map(|s| s.public_key()).collect()).unwrap();

    let (dispatcher, alerts) = AlertDispatcher::channel(16);
    let monitor = ComplianceMonitor::new(CompliancePolicy::default(), dispatcher);

    Harness {
        state: AppState::new(ledger, proxies, monitor, jury),
        jurors,
        alerts,
        _dir: dir,
    }
}

impl Harness {
    pub fn wallet(&self, name: &str, balance: Decimal) -> Wallet {
        provisioning::create_wallet(&self.state.ledger, name, balance, WalletRole::User).unwrap()
    }

    pub fn balance(&self, wallet_id: &str) -> Decimal {
        self.state.ledger.get_wallet(wallet_id).unwrap().balance
    }

    pub fn private_key_pem(&self, wallet_id: &str) -> String {
        self.state.ledger.key_pair(wallet_id).unwrap().private_key_pem
    }
}
