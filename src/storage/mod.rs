// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage
//!
//! Persistence for wallets, transactions, shadow records and escrow shares.
//!
//! ## Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.redb    # single ACID database, see `ledger` for tables
//! ```
//!
//! ## Important Notes
//!
//! - All balance mutations go through a [`LedgerTxn`]
//! - Private keys live only in the `wallet_keys` table
//! - Escrow shares are stored as ciphertext only
//! - redb calls block; async callers use `spawn_blocking`

pub mod history_cache;
pub mod ledger;

pub use history_cache::HistoryCache;
pub use ledger::{page_window, Ledger, LedgerError, LedgerResult, LedgerTxn, MAX_PAGE_SIZE};

/// Database file name inside `DATA_DIR`.
pub const LEDGER_FILE: &str = "ledger.redb";
