//! Configuration loading and representation.
//!
//! Everything comes from environment variables; see `AppConfig::from_env`.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Which persistence back-end to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Upper bound on distinct clients tracked at once.
    pub max_clients: usize,
    /// Key clients by the first `X-Forwarded-For` hop. Only safe behind a
    /// proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(24 * 60 * 60),
            max_clients: 10_000,
            trust_forwarded_for: true,
        }
    }
}

/// Administrator created at start-up when absent.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub session_secret: String,
    pub refresh_secret: String,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
    pub seed_admin: Option<SeedAdmin>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("storage", &self.storage_kind())
            .field("rate_limit", &self.rate_limit)
            .field("seed_admin", &self.seed_admin)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// In-memory configuration with the given secrets; handy for tests and
    /// local runs.
    pub fn in_memory(session_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_secret: session_secret.into(),
            refresh_secret: refresh_secret.into(),
            storage: StorageConfig::InMemory,
            rate_limit: RateLimitConfig::default(),
            seed_admin: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => parse("BIND_ADDR", &v)?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let session_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let refresh_secret = get("REFRESH_SECRET").ok_or(ConfigError::Missing("REFRESH_SECRET"))?;

        let persistent = match get("USE_PERSISTENT_STORES") {
            Some(v) => parse::<bool>("USE_PERSISTENT_STORES", &v)?,
            None => false,
        };
        let storage = if persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        let defaults = RateLimitConfig::default();
        let max_requests = match get("RATE_LIMIT_MAX_REQUESTS") {
            Some(v) => parse("RATE_LIMIT_MAX_REQUESTS", &v)?,
            None => defaults.max_requests,
        };
        let window = match get("RATE_LIMIT_WINDOW_SECS") {
            Some(v) => Duration::from_secs(parse("RATE_LIMIT_WINDOW_SECS", &v)?),
            None => defaults.window,
        };
        let max_clients = match get("RATE_LIMIT_MAX_CLIENTS") {
            Some(v) => parse("RATE_LIMIT_MAX_CLIENTS", &v)?,
            None => defaults.max_clients,
        };
        if max_clients == 0 {
            return Err(ConfigError::Invalid {
                name: "RATE_LIMIT_MAX_CLIENTS",
                value: "0".to_string(),
            });
        }
        let trust_forwarded_for = match get("RATE_LIMIT_TRUST_FORWARDED_FOR") {
            Some(v) => parse::<bool>("RATE_LIMIT_TRUST_FORWARDED_FOR", &v)?,
            None => defaults.trust_forwarded_for,
        };

        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin {
                name: get("SEED_ADMIN_NAME").unwrap_or_else(|| "Admin".to_string()),
                email,
                password,
            }),
            (Some(_), None) => return Err(ConfigError::Missing("SEED_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("SEED_ADMIN_EMAIL")),
            (None, None) => None,
        };

        Ok(Self {
            bind_addr,
            session_secret,
            refresh_secret,
            storage,
            rate_limit: RateLimitConfig {
                max_requests,
                window,
                max_clients,
                trust_forwarded_for,
            },
            seed_admin,
        })
    }

    fn storage_kind(&self) -> &'static str {
        match self.storage {
            StorageConfig::InMemory => "in_memory",
            StorageConfig::Postgres { .. } => "postgres",
        }
    }
}

fn parse<T: core::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn secrets_are_required() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("REFRESH_SECRET", "r")])),
            Err(ConfigError::Missing("JWT_SECRET"))
        );
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s"), ("REFRESH_SECRET", "  ")])),
            Err(ConfigError::Missing("REFRESH_SECRET"))
        );
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "s"), ("REFRESH_SECRET", "r")]))
            .unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.storage, StorageConfig::InMemory);
        assert_eq!(cfg.rate_limit, RateLimitConfig::default());
        assert_eq!(cfg.seed_admin, None);
    }

    #[test]
    fn persistent_storage_needs_database_url() {
        let vars = [
            ("JWT_SECRET", "s"),
            ("REFRESH_SECRET", "r"),
            ("USE_PERSISTENT_STORES", "true"),
        ];
        assert_eq!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Missing("DATABASE_URL"))
        );
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let vars = [
            ("JWT_SECRET", "s"),
            ("REFRESH_SECRET", "r"),
            ("RATE_LIMIT_MAX_REQUESTS", "lots"),
        ];
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "RATE_LIMIT_MAX_REQUESTS", .. })
        ));
    }

    #[test]
    fn rate_limit_client_settings_are_read() {
        let vars = [
            ("JWT_SECRET", "s"),
            ("REFRESH_SECRET", "r"),
            ("RATE_LIMIT_MAX_CLIENTS", "50"),
            ("RATE_LIMIT_TRUST_FORWARDED_FOR", "false"),
        ];
        let cfg = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(cfg.rate_limit.max_clients, 50);
        assert!(!cfg.rate_limit.trust_forwarded_for);

        let vars = [
            ("JWT_SECRET", "s"),
            ("REFRESH_SECRET", "r"),
            ("RATE_LIMIT_MAX_CLIENTS", "0"),
        ];
        assert!(matches!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Invalid { name: "RATE_LIMIT_MAX_CLIENTS", .. })
        ));
    }

    #[test]
    fn seed_admin_needs_both_halves() {
        let vars = [
            ("JWT_SECRET", "s"),
            ("REFRESH_SECRET", "r"),
            ("SEED_ADMIN_EMAIL", "admin@example.com"),
        ];
        assert_eq!(
            AppConfig::from_lookup(lookup(&vars)),
            Err(ConfigError::Missing("SEED_ADMIN_PASSWORD"))
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut cfg = AppConfig::in_memory("top-secret", "also-secret");
        cfg.seed_admin = Some(SeedAdmin {
            name: "Admin".into(),
            email: "admin@example.com".into(),
            password: "hunter2".into(),
        });
        let out = format!("{cfg:?}");
        assert!(!out.contains("top-secret"));
        assert!(!out.contains("hunter2"));
        assert!(out.contains("admin@example.com"));
    }
}
