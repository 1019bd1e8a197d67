// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::compliance::ComplianceMonitor;
use crate::engine::TransactionEngine;
use crate::error::ApiError;
use crate::escrow::{JuryDirectory, KeyEscrow};
use crate::proxy::ProxyWalletPool;
use crate::storage::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub proxies: Arc<ProxyWalletPool>,
    pub engine: Arc<TransactionEngine>,
    pub escrow: Arc<KeyEscrow>,
}

impl AppState {
    pub fn new(
        ledger: Arc<Ledger>,
        proxies: Arc<ProxyWalletPool>,
        monitor: ComplianceMonitor,
        jury: JuryDirectory,
    ) -> Self {
        let engine = TransactionEngine::new(ledger.clone(), proxies.clone(), monitor);
        let escrow = KeyEscrow::new(ledger.clone(), jury);
        Self {
            ledger,
            proxies,
            engine: Arc::new(engine),
            escrow: Arc::new(escrow),
        }
    }

    /// Run ledger work on the blocking pool.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || f(&state)).await?
    }
}
