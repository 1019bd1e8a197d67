// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for first-page history lookups.
//!
//! Caches the first page of `Direct` transactions per wallet to avoid
//! repeated redb reads for the most common query pattern. Every settled or
//! rejected transfer invalidates both parties.
//!
//! Each wallet carries a generation that [`HistoryCache::invalidate`] bumps.
//! Readers take the generation before reading the ledger and hand it back to
//! [`HistoryCache::put_first_page`]; a page read before a concurrent commit
//! is then discarded instead of cached.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::models::Transaction;

struct CacheEntry {
    page_size: usize,
    transactions: Vec<Transaction>,
    inserted_at: Instant,
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    generations: HashMap<String, u64>,
}

impl Inner {
    fn generation(&self, wallet_id: &str) -> u64 {
        self.generations.get(wallet_id).copied().unwrap_or(0)
    }
}

/// In-process LRU cache for hot wallet history lookups.
pub struct HistoryCache {
    inner: Mutex<Inner>,
    ttl: Duration,
}

impl HistoryCache {
    /// Create a new cache with the given capacity (wallets) and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                generations: HashMap::new(),
            }),
            ttl,
        }
    }

    /// Cached first page for a wallet, if fresh and fetched with the same page size.
    pub fn get_first_page(&self, wallet_id: &str, page_size: usize) -> Option<Vec<Transaction>> {
        let mut inner = self.inner.lock().ok()?;
        let entry = inner.entries.get(wallet_id)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            inner.entries.pop(wallet_id);
            return None;
        }
        (entry.page_size == page_size).then(|| entry.transactions.clone())
    }

    /// Current generation of a wallet. Take it before reading the ledger.
    pub fn generation(&self, wallet_id: &str) -> u64 {
        self.inner
            .lock()
            .map(|inner| inner.generation(wallet_id))
            .unwrap_or(u64::MAX)
    }

    /// Cache a page read at `generation`. Dropped if the wallet was
    /// invalidated since.
    pub fn put_first_page(
        &self,
        wallet_id: &str,
        generation: u64,
        page_size: usize,
        txs: Vec<Transaction>,
    ) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.generation(wallet_id) != generation {
            return;
        }
        inner.entries.put(
            wallet_id.to_string(),
            CacheEntry {
                page_size,
                transactions: txs,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, wallet_id: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.pop(wallet_id);
            let generation = inner.generations.entry(wallet_id.to_string()).or_insert(0);
            *generation = generation.wrapping_add(1);
        }
    }
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::new(1_024, Duration::from_secs(300))
    }
}
