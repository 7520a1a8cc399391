use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::callback::HandlerConfig;
use crate::consts::*;
use crate::deeplink::{Cluster, DeepLinkBuilder};
use crate::error::ConfigError;
use crate::store::FileStore;

pub const DEFAULT_APP_URL: &str = "https://arcade.example";
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Runtime settings, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Origin the wallet redirects back to (`APP_URL`).
    pub app_url: Url,
    /// Solana JSON-RPC endpoint used for relaying (`RPC`).
    pub rpc_url: String,
    /// Cluster passed to the wallet on connect (`CLUSTER`).
    pub cluster: Cluster,
    /// Wallet universal-link base (`PHANTOM_URL`).
    pub phantom_url: Url,
    /// Location of the file-backed store (`STORE_PATH`).
    pub store_path: PathBuf,
    pub replay_ttl: Duration,
    pub guard_release_delay: Duration,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source. Unset or blank variables
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let app_url = parse_url("APP_URL", var("APP_URL").as_deref().unwrap_or(DEFAULT_APP_URL))?;
        let phantom_url = parse_url(
            "PHANTOM_URL",
            var("PHANTOM_URL").as_deref().unwrap_or(PHANTOM_BASE_URL),
        )?;
        let cluster = match var("CLUSTER") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "CLUSTER",
                value: raw,
            })?,
            None => Cluster::default(),
        };
        let store_path = var("STORE_PATH")
            .map(PathBuf::from)
            .or_else(FileStore::default_path)
            .unwrap_or_else(|| PathBuf::from("arcade-link-state.json"));

        Ok(Self {
            app_url,
            rpc_url: var("RPC").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            cluster,
            phantom_url,
            store_path,
            replay_ttl: millis("REPLAY_TTL_MS", var("REPLAY_TTL_MS"), REPLAY_GUARD_TTL_MS)?,
            guard_release_delay: millis(
                "GUARD_RELEASE_MS",
                var("GUARD_RELEASE_MS"),
                GUARD_RELEASE_DELAY_MS,
            )?,
            confirm_timeout: millis("CONFIRM_TIMEOUT_MS", var("CONFIRM_TIMEOUT_MS"), CONFIRM_TIMEOUT_MS)?,
            poll_interval: millis(
                "POLL_INTERVAL_MS",
                var("POLL_INTERVAL_MS"),
                CONFIRM_POLL_INTERVAL_MS,
            )?,
        })
    }

    pub fn deep_links(&self) -> Result<DeepLinkBuilder, ConfigError> {
        DeepLinkBuilder::new(self.phantom_url.clone(), self.app_url.clone(), self.cluster)
    }

    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            replay_ttl: self.replay_ttl,
            guard_release_delay: self.guard_release_delay,
        }
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    })
}

fn millis(name: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        None => Ok(Duration::from_millis(default)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.replay_ttl, Duration::from_millis(5_000));
        assert_eq!(config.phantom_url.as_str(), PHANTOM_BASE_URL);

        let defaults = HandlerConfig::default();
        assert_eq!(config.handler_config().replay_ttl, defaults.replay_ttl);
        assert_eq!(config.handler_config().guard_release_delay, defaults.guard_release_delay);
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("APP_URL", "https://play.example"),
            ("CLUSTER", "mainnet-beta"),
            ("STORE_PATH", "/tmp/state.json"),
            ("REPLAY_TTL_MS", "2500"),
        ])
        .unwrap();
        assert_eq!(config.app_url.as_str(), "https://play.example/");
        assert_eq!(config.cluster, Cluster::MainnetBeta);
        assert_eq!(config.store_path, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.handler_config().replay_ttl, Duration::from_millis(2_500));
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = config(&[("GUARD_RELEASE_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: "GUARD_RELEASE_MS", .. }));
    }

    #[test]
    fn blank_values_use_defaults() {
        let config = config(&[("RPC", "  ")]).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
    }
}
