// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hufu - Custodial Settlement Service
//!
//! Settles transfers between custodial wallets while decorrelating payer and
//! payee on the ledger, keeps encrypted and desensitized shadow records of
//! every transfer, and escrows wallet keys with a 3-of-5 jury.
//!
//! ## Modules
//!
//! - `engine` - Transfer orchestration and history
//! - `compliance` - Transfer policy and regulator alerts
//! - `escrow` - Threshold key escrow
//! - `records` - Encrypted and desensitized shadow records
//! - `proxy` - Proxy wallet sampling
//! - `crypto` - secp256k1 ECIES, hashing, Shamir sharing
//! - `storage` - redb ledger
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod compliance;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod escrow;
pub mod models;
pub mod provisioning;
pub mod proxy;
pub mod records;
pub mod state;
pub mod storage;
