use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: String,
    pub upstreams: Vec<String>,
    pub bus_capacity: usize,
    pub duplicate_window_minutes: u64,
    pub duplicate_max_entries: usize,
    pub nonce_rotation_hours: u64,
    pub inlet_workers: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
    MissingUpstreams,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {e}"),
            ConfigError::MissingUpstreams => write!(f, "relay.upstreams must list at least one bus URL"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    http: Option<RawHttpConfig>,
    bus: Option<RawBusConfig>,
    relay: Option<RawRelayConfig>,
    dedupe: Option<RawDedupeConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct RawHttpConfig {
    bind: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBusConfig {
    capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawRelayConfig {
    upstreams: Option<Vec<String>>,
    nonce_rotation_hours: Option<u64>,
    inlet_workers: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawDedupeConfig {
    window_minutes: Option<u64>,
    max_entries: Option<usize>,
}

pub fn load_config_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
    load_config_from_str(&text)
}

pub fn load_config_from_str(text: &str) -> Result<RelayConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
    build_config(raw)
}

fn build_config(raw: RawConfig) -> Result<RelayConfig, ConfigError> {
    let upstreams = raw
        .relay
        .as_ref()
        .and_then(|r| r.upstreams.clone())
        .unwrap_or_default();
    if upstreams.is_empty() {
        return Err(ConfigError::MissingUpstreams);
    }

    Ok(RelayConfig {
        bind: raw
            .http
            .and_then(|h| h.bind)
            .unwrap_or_else(|| "0.0.0.0:8081".to_owned()),
        upstreams,
        bus_capacity: raw.bus.and_then(|b| b.capacity).unwrap_or(500),
        duplicate_window_minutes: raw
            .dedupe
            .as_ref()
            .and_then(|d| d.window_minutes)
            .unwrap_or(15),
        duplicate_max_entries: raw.dedupe.and_then(|d| d.max_entries).unwrap_or(100_000),
        nonce_rotation_hours: raw
            .relay
            .as_ref()
            .and_then(|r| r.nonce_rotation_hours)
            .unwrap_or(12),
        inlet_workers: raw
            .relay
            .as_ref()
            .and_then(|r| r.inlet_workers)
            .unwrap_or(4),
    })
}
