//! Server configuration
//!
//! Layered in precedence order: built-in defaults, then an optional TOML
//! file, then `SECTORFEE_`-prefixed environment variables, then CLI flags.

use serde::Deserialize;

use sectorfee_core::epoch::{DateMapper, MAINNET_GENESIS_TIMESTAMP};

/// Top-level server configuration
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for the HTTP surface
    pub listen: String,
    pub rpc: RpcSettings,
    pub date: DateSettings,
}

/// Full-node RPC connection settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    /// JSON-RPC endpoint of the full node
    pub endpoint: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

/// Calendar-date mapping settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DateSettings {
    /// Network genesis block timestamp
    pub genesis_timestamp: i64,
    /// Hours added to UTC when bucketing epochs into days
    pub utc_offset_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8099".to_string(),
            rpc: RpcSettings::default(),
            date: DateSettings::default(),
        }
    }
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:1234/rpc/v0".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for DateSettings {
    fn default() -> Self {
        Self {
            genesis_timestamp: MAINNET_GENESIS_TIMESTAMP,
            utc_offset_hours: 0,
        }
    }
}

impl ServerConfig {
    /// Loads defaults, an optional TOML file and `SECTORFEE_` env overrides
    /// (nested keys separated with `__`, e.g. `SECTORFEE_RPC__ENDPOINT`).
    pub fn load(file: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("SECTORFEE").separator("__"))
            .build()?;
        let mut cfg = ServerConfig::default();
        // Merge field by field so a sparse file keeps the remaining defaults.
        if let Ok(listen) = settings.get_string("listen") {
            cfg.listen = listen;
        }
        if let Ok(endpoint) = settings.get_string("rpc.endpoint") {
            cfg.rpc.endpoint = endpoint;
        }
        if let Ok(timeout) = settings.get_int("rpc.timeout_secs") {
            cfg.rpc.timeout_secs = timeout as u64;
        }
        if let Ok(genesis) = settings.get_int("date.genesis_timestamp") {
            cfg.date.genesis_timestamp = genesis;
        }
        if let Ok(offset) = settings.get_int("date.utc_offset_hours") {
            cfg.date.utc_offset_hours = offset;
        }
        Ok(cfg)
    }

    /// Date mapper implied by the date settings
    pub fn date_mapper(&self) -> DateMapper {
        DateMapper::new(self.date.genesis_timestamp, self.date.utc_offset_hours * 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen, "0.0.0.0:8099");
        assert_eq!(cfg.rpc.timeout_secs, 120);
        assert_eq!(cfg.date.genesis_timestamp, MAINNET_GENESIS_TIMESTAMP);
    }

    #[test]
    fn test_mapper_uses_offset_hours() {
        let mut cfg = ServerConfig::default();
        cfg.date.utc_offset_hours = 8;
        let mapper = cfg.date_mapper();
        // genesis is 22:00 UTC; +8h pushes it across midnight
        assert_eq!(mapper.date_key(0), "2020-08-25");
    }
}
