use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_POCKETBASE_URL: &str = "http://127.0.0.1:8090";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3146";
pub const DEFAULT_SETTINGS_PATH: &str = "data/user_settings.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const OPTIONAL_VARS: [&str; 4] = [
    "POCKETBASE_URL",
    "CINEMAX_BIND_ADDR",
    "CINEMAX_SETTINGS_PATH",
    "CINEMAX_HTTP_TIMEOUT_SECS",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pocketbase_url: String,
    pub bind_addr: SocketAddr,
    pub settings_path: PathBuf,
    pub http_timeout: Duration,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let bind = get("CINEMAX_BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind
            .parse::<SocketAddr>()
            .with_context(|| format!("CINEMAX_BIND_ADDR is not a socket address: {bind}"))?;
        let timeout = get(
            "CINEMAX_HTTP_TIMEOUT_SECS",
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        );
        let timeout_secs = timeout
            .parse::<u64>()
            .with_context(|| format!("CINEMAX_HTTP_TIMEOUT_SECS must be whole seconds: {timeout}"))?;
        Ok(Self {
            pocketbase_url: get("POCKETBASE_URL", DEFAULT_POCKETBASE_URL)
                .trim_end_matches('/')
                .to_string(),
            bind_addr,
            settings_path: PathBuf::from(get("CINEMAX_SETTINGS_PATH", DEFAULT_SETTINGS_PATH)),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Nothing is mandatory; this only reports which defaults are in play.
pub fn check_env() {
    for key in OPTIONAL_VARS {
        if env::var(key).is_err() {
            info!("{} not set, using default", key);
        }
    }
    info!(
        "Backend at {}",
        var_or("POCKETBASE_URL", DEFAULT_POCKETBASE_URL)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).expect("defaults parse");
        assert_eq!(config.pocketbase_url, DEFAULT_POCKETBASE_URL);
        assert_eq!(config.bind_addr.port(), 3146);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.settings_path, PathBuf::from("data/user_settings.json"));
    }

    #[test]
    fn strips_trailing_slash_and_reads_overrides() {
        let config = config_from(&[
            ("POCKETBASE_URL", "https://pb.example.com/"),
            ("CINEMAX_HTTP_TIMEOUT_SECS", "5"),
        ])
        .expect("overrides parse");
        assert_eq!(config.pocketbase_url, "https://pb.example.com");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = config_from(&[("CINEMAX_BIND_ADDR", "nowhere")]).unwrap_err();
        assert!(err.to_string().contains("CINEMAX_BIND_ADDR"));
        let err = config_from(&[("CINEMAX_HTTP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("CINEMAX_HTTP_TIMEOUT_SECS"));
    }
}
