// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Threshold Secret Sharing
//!
//! Byte-wise Shamir sharing over GF(256) (AES field polynomial `0x11B`).
//!
//! For every secret byte a random polynomial of degree `threshold - 1` is
//! drawn with the secret as its constant term and evaluated at
//! `x = 1..=shares`. Any `threshold` distinct points recover the constant
//! term through Lagrange interpolation at `x = 0`; fewer points are
//! consistent with every possible secret.
//!
//! ## Share Encoding
//!
//! ```text
//! {threshold}:{x}:{hex(y bytes)}
//! ```
//!
//! The threshold travels with each share so that [`combine`] can refuse a
//! short quorum instead of interpolating a wrong secret.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::rand_core::{CryptoRng, OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Errors specific to splitting and combining.
#[derive(Debug, thiserror::Error)]
pub enum ShamirError {
    #[error("invalid parameters: threshold {threshold} of {shares}")]
    InvalidParameters { threshold: u8, shares: u8 },

    #[error("cannot share an empty secret")]
    EmptySecret,

    #[error("insufficient shares: need {needed}, have {have}")]
    InsufficientShares { needed: usize, have: usize },

    #[error("invalid share: {0}")]
    InvalidShare(String),

    #[error("shares disagree: {0}")]
    Inconsistent(String),
}

/// One point of the sharing polynomial, for every secret byte.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    threshold: u8,
    x: u8,
    y: Vec<u8>,
}

impl Share {
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Evaluation point, `1..=shares`.
    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Serialise to the `threshold:x:hex` wire form.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("{}:{}:{}", self.threshold, self.x, hex::encode(&self.y)))
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("threshold", &self.threshold)
            .field("x", &self.x)
            .field("len", &self.y.len())
            .finish()
    }
}

impl FromStr for Share {
    type Err = ShamirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, ':');
        let (Some(threshold), Some(x), Some(data)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ShamirError::InvalidShare(
                "expected format threshold:index:hex".to_string(),
            ));
        };

        let threshold: u8 = threshold
            .parse()
            .map_err(|_| ShamirError::InvalidShare("bad threshold".to_string()))?;
        let x: u8 = x
            .parse()
            .map_err(|_| ShamirError::InvalidShare("bad index".to_string()))?;
        let y = hex::decode(data).map_err(|_| ShamirError::InvalidShare("bad hex".to_string()))?;

        if threshold < 2 {
            return Err(ShamirError::InvalidShare("threshold below 2".to_string()));
        }
        if x == 0 {
            return Err(ShamirError::InvalidShare("index 0 would reveal the secret".to_string()));
        }
        if y.is_empty() {
            return Err(ShamirError::InvalidShare("empty share".to_string()));
        }

        Ok(Self { threshold, x, y })
    }
}

// ============================================================================
// GF(256)
// ============================================================================

fn gf256_mul(a: u8, b: u8) -> u8 {
    let mut result = 0u8;
    let mut a = a;
    let mut b = b;

    for _ in 0..8 {
        if b & 1 != 0 {
            result ^= a;
        }
        let hi_bit = a & 0x80;
        a <<= 1;
        if hi_bit != 0 {
            a ^= 0x1B;
        }
        b >>= 1;
    }

    result
}

/// Multiplicative inverse via a^254 (Fermat). Caller guarantees `a != 0`.
fn gf256_inv(a: u8) -> u8 {
    let mut result = 1u8;
    let mut base = a;
    let mut exp = 254u8;
    while exp > 0 {
        if exp & 1 != 0 {
            result = gf256_mul(result, base);
        }
        base = gf256_mul(base, base);
        exp >>= 1;
    }
    result
}

/// Horner evaluation; `coefficients[0]` is the constant term.
fn eval_polynomial(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| gf256_mul(acc, x) ^ c)
}

// ============================================================================
// Split / Combine
// ============================================================================

/// Split `secret` into `shares` points, any `threshold` of which recombine.
pub fn split(secret: &[u8], threshold: u8, shares: u8) -> Result<Vec<Share>, ShamirError> {
    split_with_rng(secret, threshold, shares, &mut OsRng)
}

fn split_with_rng(
    secret: &[u8],
    threshold: u8,
    shares: u8,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Vec<Share>, ShamirError> {
    if threshold < 2 || threshold > shares {
        return Err(ShamirError::InvalidParameters { threshold, shares });
    }
    if secret.is_empty() {
        return Err(ShamirError::EmptySecret);
    }

    let mut points: Vec<Vec<u8>> = (0..shares)
        .map(|_| Vec::with_capacity(secret.len()))
        .collect();
    let mut coefficients = Zeroizing::new(vec![0u8; threshold as usize]);

    for &byte in secret {
        coefficients[0] = byte;
        rng.fill_bytes(&mut coefficients[1..]);

        for (i, point) in points.iter_mut().enumerate() {
            point.push(eval_polynomial(&coefficients, i as u8 + 1));
        }
    }

    Ok(points
        .into_iter()
        .enumerate()
        .map(|(i, y)| Share {
            threshold,
            x: i as u8 + 1,
            y,
        })
        .collect())
}

/// Recombine shares by Lagrange interpolation at zero.
///
/// Fails with [`ShamirError::InsufficientShares`] when fewer than
/// `threshold` distinct points are supplied. Duplicate points count once.
pub fn combine(shares: &[Share], threshold: u8) -> Result<Zeroizing<Vec<u8>>, ShamirError> {
    let needed = threshold as usize;

    if let Some(bad) = shares.iter().find(|s| s.threshold != threshold) {
        return Err(ShamirError::Inconsistent(format!(
            "share {} was cut for threshold {}, expected {}",
            bad.x, bad.threshold, threshold
        )));
    }

    let mut seen = BTreeSet::new();
    let mut distinct: Vec<&Share> = Vec::with_capacity(shares.len());
    for share in shares {
        if seen.insert(share.x) {
            distinct.push(share);
        } else if distinct.iter().any(|d| d.x == share.x && d.y != share.y) {
            return Err(ShamirError::Inconsistent(format!(
                "two different shares claim index {}",
                share.x
            )));
        }
    }

    if distinct.len() < needed {
        return Err(ShamirError::InsufficientShares {
            needed,
            have: distinct.len(),
        });
    }

    let quorum = &distinct[..needed];
    let len = quorum[0].y.len();
    if quorum.iter().any(|s| s.y.len() != len) {
        return Err(ShamirError::Inconsistent("share lengths differ".to_string()));
    }

    // Lagrange basis at x = 0: l_j = prod_{m != j} x_m / (x_m - x_j); subtraction is XOR.
    let basis: Vec<u8> = quorum
        .iter()
        .enumerate()
        .map(|(j, sj)| {
            quorum
                .iter()
                .enumerate()
                .filter(|(m, _)| *m != j)
                .fold(1u8, |acc, (_, sm)| {
                    gf256_mul(acc, gf256_mul(sm.x, gf256_inv(sm.x ^ sj.x)))
                })
        })
        .collect();

    let mut secret = Zeroizing::new(vec![0u8; len]);
    for (i, out) in secret.iter_mut().enumerate() {
        *out = quorum
            .iter()
            .zip(&basis)
            .fold(0u8, |acc, (share, &l)| acc ^ gf256_mul(share.y[i], l));
    }

    Ok(secret)
}
