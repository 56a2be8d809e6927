//! Process configuration from environment variables.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use storefront_core::IdStrategy;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REALTIME_BUFFER: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" | "json" => Ok(Self::File),
            "postgres" | "pg" => Ok(Self::Postgres),
            _ => Err("expected memory, file or postgres".to_string()),
        }
    }
}

/// Where and how the service stores its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Memory,
    File { data_dir: PathBuf },
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub storage: Storage,
    pub id_strategy: IdStrategy,
    /// Capacity of the realtime broadcast channel. Slow SSE clients beyond
    /// this many pending events skip ahead.
    pub realtime_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            storage: Storage::Memory,
            id_strategy: IdStrategy::Random,
            realtime_buffer: DEFAULT_REALTIME_BUFFER,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = parse_or(get("HOST"), "HOST", IpAddr::from([0, 0, 0, 0]))?;
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let backend = parse_or(get("STORAGE_BACKEND"), "STORAGE_BACKEND", StorageBackend::Memory)?;

        let storage = match backend {
            StorageBackend::Memory => Storage::Memory,
            StorageBackend::File => Storage::File {
                data_dir: get("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data")),
            },
            StorageBackend::Postgres => Storage::Postgres {
                database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
        };

        let default_strategy = match backend {
            StorageBackend::File => IdStrategy::Sequential,
            _ => IdStrategy::Random,
        };
        let id_strategy = parse_or(get("ID_STRATEGY"), "ID_STRATEGY", default_strategy)?;

        let realtime_buffer = parse_or(get("REALTIME_BUFFER"), "REALTIME_BUFFER", DEFAULT_REALTIME_BUFFER)?;
        if realtime_buffer == 0 {
            return Err(ConfigError::Invalid {
                var: "REALTIME_BUFFER",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            storage,
            id_strategy,
            realtime_buffer,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
