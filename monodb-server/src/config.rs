//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via `MONODB_CONFIG`)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::ServerError;

/// Default TCP port the thin query server listens on.
pub const DEFAULT_PORT: u16 = monodb_query::DEFAULT_PORT;

/// Top-level configuration: the handful of settings the WAL and the thin
/// query server actually need.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// WAL storage configuration.
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration: defaults, then a YAML file if `MONODB_CONFIG`
    /// names one, then environment variable overrides.
    pub fn load() -> Result<Self, ServerError> {
        let mut config = match std::env::var("MONODB_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ServerError::Config(format!("parsing {}: {e}", path.display())))
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.storage.apply_env_overrides();
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 1000,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("MONODB_BIND") {
            match addr.parse() {
                Ok(parsed) => self.bind_addr = parsed,
                Err(e) => tracing::warn!(%addr, error = %e, "ignoring malformed MONODB_BIND"),
            }
        }
        if let Ok(max) = std::env::var("MONODB_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(n) => self.max_connections = n,
                Err(e) => tracing::warn!(%max, error = %e, "ignoring malformed MONODB_MAX_CONNECTIONS"),
            }
        }
    }
}

/// WAL storage configuration, as handed to `monodb_wal::WalConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub wal_dir: PathBuf,
    pub segment_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            wal_dir: PathBuf::from("./data/wal"),
            segment_size: monodb_wal::DEFAULT_SEGMENT_SIZE,
        }
    }
}

impl StorageConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("MONODB_WAL_DIR") {
            self.wal_dir = PathBuf::from(dir);
        }
        if let Ok(size) = std::env::var("MONODB_SEGMENT_SIZE") {
            match size.parse() {
                Ok(n) => self.segment_size = n,
                Err(e) => tracing::warn!(%size, error = %e, "ignoring malformed MONODB_SEGMENT_SIZE"),
            }
        }
    }
}

mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S: Serializer>(addr: &SocketAddr, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SocketAddr, D::Error> {
        let text = String::deserialize(d)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_the_query_languages_default_port() {
        let config = Config::default();
        assert_eq!(config.network.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.storage.segment_size, monodb_wal::DEFAULT_SEGMENT_SIZE);
    }

    #[test]
    fn yaml_round_trips_through_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "network:\n  bind_addr: \"127.0.0.1:9999\"\n  max_connections: 5\nstorage:\n  wal_dir: /tmp/wal\n  segment_size: 4096\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.network.bind_addr.port(), 9999);
        assert_eq!(config.network.max_connections, 5);
        assert_eq!(config.storage.segment_size, 4096);
    }
}
