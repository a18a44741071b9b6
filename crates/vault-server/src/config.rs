//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use vault_ledger::LedgerConfig;
use vault_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: unset, meaning the platform data directory (`vault.db`).
    pub database_path: Option<PathBuf>,

    /// Largest `limit` accepted by message listing.
    /// Env: `MAX_PAGE_LIMIT`
    pub max_page_limit: u32,

    /// `limit` used when a listing request omits it.
    /// Env: `DEFAULT_PAGE_LIMIT`
    pub default_page_limit: u32,

    /// Maximum request body size in bytes.
    /// Env: `MAX_BODY_BYTES`
    /// Default: 16 MiB
    pub max_body_bytes: usize,

    /// Bearer token for `/admin/*`.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            max_page_limit: MAX_PAGE_LIMIT,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_body_bytes: 16 * 1024 * 1024,
            admin_token: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(n) = parse_positive(&lookup, "MAX_PAGE_LIMIT") {
            config.max_page_limit = n;
        }

        if let Some(n) = parse_positive(&lookup, "DEFAULT_PAGE_LIMIT") {
            config.default_page_limit = n;
        }

        if let Some(n) = parse_positive::<usize, _>(&lookup, "MAX_BODY_BYTES") {
            config.max_body_bytes = n;
        }

        if let Some(token) = lookup("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if config.default_page_limit > config.max_page_limit {
            tracing::warn!(
                default = config.default_page_limit,
                max = config.max_page_limit,
                "DEFAULT_PAGE_LIMIT exceeds MAX_PAGE_LIMIT, clamping"
            );
            config.default_page_limit = config.max_page_limit;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            default_page_limit: self.default_page_limit,
            max_page_limit: self.max_page_limit,
        }
    }
}

fn parse_positive<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(n) if n > T::default() => Some(n),
        _ => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_page_limit, 200);
        assert_eq!(config.default_page_limit, 50);
        assert!(config.admin_token.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/ledger.db"),
            ("MAX_PAGE_LIMIT", "500"),
            ("DEFAULT_PAGE_LIMIT", "25"),
            ("ADMIN_TOKEN", "secret"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/ledger.db")));
        assert_eq!(config.max_page_limit, 500);
        assert_eq!(config.default_page_limit, 25);
        assert_eq!(config.admin_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "not an address"),
            ("MAX_PAGE_LIMIT", "0"),
            ("DEFAULT_PAGE_LIMIT", "-3"),
            ("MAX_BODY_BYTES", "lots"),
            ("ADMIN_TOKEN", ""),
        ]);
        let defaults = ServerConfig::default();
        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.max_page_limit, defaults.max_page_limit);
        assert_eq!(config.default_page_limit, defaults.default_page_limit);
        assert_eq!(config.max_body_bytes, defaults.max_body_bytes);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_default_limit_clamped() {
        let config = from_pairs(&[("MAX_PAGE_LIMIT", "10"), ("DEFAULT_PAGE_LIMIT", "40")]);
        assert_eq!(config.default_page_limit, 10);
    }
}
