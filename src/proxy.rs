// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Proxy Wallet Pool
//!
//! Intermediary wallets used to decorrelate payer and payee on the ledger.
//! The pool is filled by provisioning at startup; this module only samples.
//!
//! Sampling is uniform without replacement inside one call. Separate calls
//! may return overlapping sets, and reads never mutate the pool.

use std::sync::RwLock;

use rand::seq::index;

use crate::models::Wallet;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("not enough proxy wallets: need {needed}, have {available}")]
    NoProxyWallets { needed: usize, available: usize },
}

/// Thread-safe set of proxy wallets.
#[derive(Default)]
pub struct ProxyWalletPool {
    wallets: RwLock<Vec<Wallet>>,
}

impl ProxyWalletPool {
    pub fn new(wallets: Vec<Wallet>) -> Self {
        Self {
            wallets: RwLock::new(wallets),
        }
    }

    /// Add a wallet to the pool. Wallets already present (by id) are ignored.
    pub fn register(&self, wallet: Wallet) {
        let mut wallets = match self.wallets.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !wallets.iter().any(|w| w.id == wallet.id) {
            wallets.push(wallet);
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every pooled wallet.
    pub fn ids(&self) -> Vec<String> {
        self.read().iter().map(|w| w.id.clone()).collect()
    }

    /// Draw `n` distinct wallets uniformly at random.
    pub fn sample(&self, n: usize) -> Result<Vec<Wallet>, ProxyError> {
        let wallets = self.read();
        if wallets.len() < n {
            return Err(ProxyError::NoProxyWallets {
                needed: n,
                available: wallets.len(),
            });
        }

        let mut rng = rand::thread_rng();
        Ok(index::sample(&mut rng, wallets.len(), n)
            .into_iter()
            .map(|i| wallets[i].clone())
            .collect())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Wallet>> {
        match self.wallets.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
