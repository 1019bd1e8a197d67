// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the typed [`AppConfig`] loaded
//! once at startup. Invalid values are startup errors, never silently
//! replaced by defaults.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `ledger.redb` | `./data` |
//! | `TRANSFER_CEILING` | Largest amount a single transfer may move | `10000` |
//! | `ALERT_ENDPOINT` | Regulator alert URL | `http://127.0.0.1:3338/api/v1/regulator/alert` |
//! | `ALERT_QUEUE_CAPACITY` | Pending alerts kept before dropping | `1024` |
//! | `ALERT_TIMEOUT_SECS` | HTTP timeout per alert | `5` |
//! | `JURY_PUBLIC_KEYS` | Comma-separated hex SEC1 keys of the 5 custodians | Required |
//! | `PROXY_POOL_SIZE` | Proxy wallets provisioned at startup | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::compliance::DEFAULT_TRANSFER_CEILING;
use crate::escrow::JuryDirectory;
use crate::storage::LEDGER_FILE;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Directory for the ledger database.
///
/// # Default
/// `./data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "./data";

pub const TRANSFER_CEILING_ENV: &str = "TRANSFER_CEILING";

pub const ALERT_ENDPOINT_ENV: &str = "ALERT_ENDPOINT";
pub const DEFAULT_ALERT_ENDPOINT: &str = "http://127.0.0.1:3338/api/v1/regulator/alert";
pub const ALERT_QUEUE_CAPACITY_ENV: &str = "ALERT_QUEUE_CAPACITY";
pub const ALERT_TIMEOUT_SECS_ENV: &str = "ALERT_TIMEOUT_SECS";

/// Comma-separated custodian public keys, in custodian order.
///
/// Exactly five are required; share `i` is sealed to key `i`.
pub const JURY_PUBLIC_KEYS_ENV: &str = "JURY_PUBLIC_KEYS";

pub const PROXY_POOL_SIZE_ENV: &str = "PROXY_POOL_SIZE";

/// `json` for one-object-per-line output, `pretty` for humans.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is required")]
    Missing { name: &'static str },

    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Everything the server needs, resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub transfer_ceiling: Decimal,
    pub alert_endpoint: String,
    pub alert_queue_capacity: usize,
    pub alert_timeout: Duration,
    pub jury: JuryDirectory,
    pub proxy_pool_size: usize,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from an arbitrary source. `lookup` returns `None` for unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(PORT_ENV, get(PORT_ENV), 8080)?;
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
                reason: e.to_string(),
            })?;

        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let transfer_ceiling: Decimal =
            parse_or(TRANSFER_CEILING_ENV, get(TRANSFER_CEILING_ENV), DEFAULT_TRANSFER_CEILING)?;
        if transfer_ceiling <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                name: TRANSFER_CEILING_ENV,
                value: transfer_ceiling.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let alert_queue_capacity: usize =
            parse_or(ALERT_QUEUE_CAPACITY_ENV, get(ALERT_QUEUE_CAPACITY_ENV), 1024)?;
        if alert_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: ALERT_QUEUE_CAPACITY_ENV,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let alert_timeout_secs: u64 =
            parse_or(ALERT_TIMEOUT_SECS_ENV, get(ALERT_TIMEOUT_SECS_ENV), 5)?;

        let jury_raw = get(JURY_PUBLIC_KEYS_ENV).ok_or(ConfigError::Missing {
            name: JURY_PUBLIC_KEYS_ENV,
        })?;
        let jury_keys: Vec<&str> = jury_raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect();
        let jury = JuryDirectory::from_hex(jury_keys.as_slice()).map_err(|e| ConfigError::Invalid {
            name: JURY_PUBLIC_KEYS_ENV,
            value: format!("{} keys", jury_keys.len()),
            reason: e.to_string(),
        })?;

        let proxy_pool_size: usize = parse_or(PROXY_POOL_SIZE_ENV, get(PROXY_POOL_SIZE_ENV), 5)?;

        let log_format = match get(LOG_FORMAT_ENV) {
            None => LogFormat::Pretty,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    value: v,
                    reason: "expected json or pretty".to_string(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            data_dir,
            transfer_ceiling,
            alert_endpoint: get(ALERT_ENDPOINT_ENV)
                .unwrap_or_else(|| DEFAULT_ALERT_ENDPOINT.to_string()),
            alert_queue_capacity,
            alert_timeout: Duration::from_secs(alert_timeout_secs),
            jury,
            proxy_pool_size,
            log_format,
        })
    }

    /// Full path of the ledger database file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn jury_hex() -> String {
        (0..5)
            .map(|_| crypto::generate_keypair().unwrap().public_key)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn load(vars: &[(&str, String)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = load(&[(JURY_PUBLIC_KEYS_ENV, jury_hex())]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
        assert_eq!(cfg.ledger_path(), PathBuf::from("./data/ledger.redb"));
        assert_eq!(cfg.transfer_ceiling, dec!(10000));
        assert_eq!(cfg.alert_endpoint, DEFAULT_ALERT_ENDPOINT);
        assert_eq!(cfg.alert_queue_capacity, 1024);
        assert_eq!(cfg.alert_timeout, Duration::from_secs(5));
        assert_eq!(cfg.jury.len(), 5);
        assert_eq!(cfg.proxy_pool_size, 5);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = load(&[
            (JURY_PUBLIC_KEYS_ENV, jury_hex()),
            (HOST_ENV, "127.0.0.1".to_string()),
            (PORT_ENV, "9000".to_string()),
            (TRANSFER_CEILING_ENV, "2500.50".to_string()),
            (PROXY_POOL_SIZE_ENV, "8".to_string()),
            (LOG_FORMAT_ENV, "json".to_string()),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cfg.transfer_ceiling, dec!(2500.50));
        assert_eq!(cfg.proxy_pool_size, 8);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn jury_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing {
                name: JURY_PUBLIC_KEYS_ENV
            })
        ));
    }

    #[test]
    fn wrong_jury_size_is_rejected() {
        let four = (0..4)
            .map(|_| crypto::generate_keypair().unwrap().public_key)
            .collect::<Vec<_>>()
            .join(",");
        assert!(matches!(
            load(&[(JURY_PUBLIC_KEYS_ENV, four)]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn invalid_numbers_are_errors_not_defaults() {
        let err = load(&[
            (JURY_PUBLIC_KEYS_ENV, jury_hex()),
            (PORT_ENV, "eighty".to_string()),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PORT_ENV, .. }));

        let err = load(&[
            (JURY_PUBLIC_KEYS_ENV, jury_hex()),
            (TRANSFER_CEILING_ENV, "-5".to_string()),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: TRANSFER_CEILING_ENV,
                ..
            }
        ));
    }
}
