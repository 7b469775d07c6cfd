//! Service configuration, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where embedding records are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum StoreBackend {
    /// Redis with the RediSearch module, addressed by URL.
    Redis { url: String },
    /// Process-local map; lost on restart.
    Memory,
}

/// Top-level senvec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenvecConfig {
    /// Bind address.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    /// Directory holding one sub-directory per model id.
    pub model_dir: PathBuf,
    pub store: StoreBackend,
    /// Upper bound on any single store command.
    pub store_timeout: Duration,
    /// Per-encoder query cache capacity.
    pub cache_size: usize,
    pub cache_ttl: Duration,
    /// Create missing search indexes at startup.
    pub create_indexes: bool,
}

impl Default for SenvecConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            model_dir: PathBuf::from("models"),
            store: StoreBackend::Memory,
            store_timeout: Duration::from_millis(5000),
            cache_size: 1000,
            cache_ttl: Duration::from_secs(3600),
            create_indexes: false,
        }
    }
}

impl SenvecConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = match get("REDIS_URL") {
            Some(url) => StoreBackend::Redis { url },
            None => StoreBackend::Memory,
        };

        Ok(Self {
            host: get("SENVEC_HOST").unwrap_or(defaults.host),
            port: parse_var(&get, "PORT")?.unwrap_or(defaults.port),
            model_dir: get("SENVEC_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            store,
            store_timeout: parse_var(&get, "SENVEC_STORE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            cache_size: parse_var(&get, "SENVEC_CACHE_SIZE")?.unwrap_or(defaults.cache_size),
            cache_ttl: parse_var(&get, "SENVEC_CACHE_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            create_indexes: parse_var(&get, "SENVEC_CREATE_INDEXES")?
                .unwrap_or(defaults.create_indexes),
        })
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(None),
    }
}
