//! Process configuration, read from `STOCKROOM_*` environment variables.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::warn;

use stockroom_observability::LogFormat;

pub const BIND_ADDR_VAR: &str = "STOCKROOM_BIND_ADDR";
pub const DATABASE_URL_VAR: &str = "STOCKROOM_DATABASE_URL";
pub const LOG_FORMAT_VAR: &str = "STOCKROOM_LOG_FORMAT";
pub const DB_MAX_CONNECTIONS_VAR: &str = "STOCKROOM_DB_MAX_CONNECTIONS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Unset (or blank) variables fall back to their defaults; set but
    /// unparseable values are an error.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match var(BIND_ADDR_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("{BIND_ADDR_VAR}={raw} is not a socket address"))?,
            None => {
                warn!("{BIND_ADDR_VAR} not set; binding {DEFAULT_BIND_ADDR}");
                DEFAULT_BIND_ADDR
                    .parse()
                    .context("default bind address")?
            }
        };

        let database_url = var(DATABASE_URL_VAR).unwrap_or_else(|| {
            warn!("{DATABASE_URL_VAR} not set; using a non-persistent in-memory database");
            DEFAULT_DATABASE_URL.to_string()
        });

        let db_max_connections = match var(DB_MAX_CONNECTIONS_VAR) {
            Some(raw) => {
                let n: u32 = raw.trim().parse().with_context(|| {
                    format!("{DB_MAX_CONNECTIONS_VAR}={raw} is not a positive integer")
                })?;
                anyhow::ensure!(n > 0, "{DB_MAX_CONNECTIONS_VAR} must be at least 1");
                n
            }
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let log_format = match var(LOG_FORMAT_VAR) {
            Some(raw) => raw.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.db_max_connections, 5);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn values_are_read_from_vars() {
        let cfg = config(&[
            (BIND_ADDR_VAR, "127.0.0.1:3000"),
            (DATABASE_URL_VAR, "sqlite://stock.db"),
            (DB_MAX_CONNECTIONS_VAR, "8"),
            (LOG_FORMAT_VAR, "pretty"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.database_url, "sqlite://stock.db");
        assert_eq!(cfg.db_max_connections, 8);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[(DATABASE_URL_VAR, "  ")]).unwrap();
        assert_eq!(cfg.database_url, "sqlite::memory:");
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(config(&[(BIND_ADDR_VAR, "not-an-addr")]).is_err());
        assert!(config(&[(DB_MAX_CONNECTIONS_VAR, "many")]).is_err());
        assert!(config(&[(DB_MAX_CONNECTIONS_VAR, "0")]).is_err());
        assert!(config(&[(LOG_FORMAT_VAR, "xml")]).is_err());
    }
}
