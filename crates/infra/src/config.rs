//! Configuration loading and representation.
//!
//! Everything is read from the process environment once at startup. The
//! binary merges a `.env` file into the environment before calling
//! [`AppConfig::from_env`].

use std::net::SocketAddr;

use thiserror::Error;

use longhorn_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://longhorn_studies.db";
/// `DATABASE_URL` value selecting the non-durable in-memory store.
pub const IN_MEMORY_DATABASE_URL: &str = "memory";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_ADDR must be a socket address like 0.0.0.0:8000, got {value:?}: {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("LOG_FORMAT: {0}")]
    InvalidLogFormat(String),

    /// Only the scheme is reported; the URL may carry credentials.
    #[error(
        "DATABASE_URL must be a postgres://, postgresql:// or sqlite: URL, or \"memory\"; got scheme {0:?}"
    )]
    UnsupportedDatabaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
    /// Lost when the process exits.
    InMemory,
}

impl DatabaseBackend {
    fn from_url(url: &str) -> Result<Self, ConfigError> {
        if url == IN_MEMORY_DATABASE_URL {
            return Ok(Self::InMemory);
        }
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ConfigError::UnsupportedDatabaseUrl(scheme)),
        }
    }
}

/// Where entities are stored. `max_connections` applies to Postgres only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database: DatabaseConfig,
    /// `EnvFilter` directive, e.g. `info` or `longhorn_api=debug,info`.
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: raw_addr.clone(),
                source,
            })?;

        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "DATABASE_MAX_CONNECTIONS",
                        value: raw,
                    });
                }
            },
        };

        let url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let database = DatabaseConfig {
            backend: DatabaseBackend::from_url(&url)?,
            url,
            max_connections,
        };

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => raw
                .parse()
                .map_err(|e: longhorn_observability::UnknownLogFormat| {
                    ConfigError::InvalidLogFormat(e.to_string())
                })?,
        };

        Ok(Self {
            bind_addr,
            database,
            log_filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cfg.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(cfg.database.url, "sqlite://longhorn_studies.db");
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn database_url_enables_postgres() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://u:p@localhost/longhorn"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ])
        .unwrap();
        assert_eq!(
            cfg.database,
            DatabaseConfig {
                backend: DatabaseBackend::Postgres,
                url: "postgres://u:p@localhost/longhorn".to_string(),
                max_connections: 12,
            }
        );

        let cfg = load(&[("DATABASE_URL", "postgresql://localhost/longhorn")]).unwrap();
        assert_eq!(cfg.database.backend, DatabaseBackend::Postgres);
    }

    #[test]
    fn in_memory_store_is_opt_in() {
        let cfg = load(&[("DATABASE_URL", "memory")]).unwrap();
        assert_eq!(cfg.database.backend, DatabaseBackend::InMemory);

        let cfg = load(&[("DATABASE_URL", "sqlite:///var/lib/longhorn/data.db")]).unwrap();
        assert_eq!(cfg.database.backend, DatabaseBackend::Sqlite);
    }

    #[test]
    fn unknown_database_scheme_is_rejected_without_echoing_the_url() {
        let err = load(&[("DATABASE_URL", "mysql://root:hunter2@db/longhorn")]).unwrap_err();
        assert!(matches!(&err, ConfigError::UnsupportedDatabaseUrl(scheme) if scheme == "mysql"));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let cfg = load(&[("DATABASE_URL", ""), ("BIND_ADDR", "  ")]).unwrap();
        assert_eq!(cfg.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(cfg.bind_addr.port(), 8000);
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let err = load(&[("BIND_ADDR", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }

    #[test]
    fn invalid_pool_size_is_rejected() {
        for raw in ["zero", "0", "-1"] {
            let err = load(&[("DATABASE_MAX_CONNECTIONS", raw)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidNumber { .. }), "{raw}");
        }
    }

    #[test]
    fn log_format_is_parsed() {
        let cfg = load(&[("LOG_FORMAT", "pretty"), ("RUST_LOG", "debug")]).unwrap();
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.log_filter, "debug");

        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }
}
