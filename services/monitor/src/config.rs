use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub bind: String,
    pub database_url: String,
    pub upstream: String,
    pub duplicate_window_minutes: u64,
    pub duplicate_max_entries: usize,
    pub ingest_workers: usize,
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
    MissingDatabaseUrl,
    MissingUpstream,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {e}"),
            ConfigError::MissingDatabaseUrl => write!(f, "monitor.database_url is required"),
            ConfigError::MissingUpstream => write!(f, "monitor.upstream is required"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    http: Option<RawHttpConfig>,
    monitor: Option<RawMonitorConfig>,
    dedupe: Option<RawDedupeConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct RawHttpConfig {
    bind: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawMonitorConfig {
    database_url: Option<String>,
    upstream: Option<String>,
    ingest_workers: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawDedupeConfig {
    window_minutes: Option<u64>,
    max_entries: Option<usize>,
}

pub fn load_config_from_path(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
    load_config_from_str(&text)
}

pub fn load_config_from_str(text: &str) -> Result<MonitorConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
    build_config(raw)
}

fn build_config(raw: RawConfig) -> Result<MonitorConfig, ConfigError> {
    let monitor = raw.monitor.unwrap_or_default();
    let dedupe = raw.dedupe.unwrap_or_default();
    let database_url = monitor.database_url.ok_or(ConfigError::MissingDatabaseUrl)?;
    let upstream = monitor.upstream.ok_or(ConfigError::MissingUpstream)?;

    Ok(MonitorConfig {
        bind: raw
            .http
            .and_then(|h| h.bind)
            .unwrap_or_else(|| "0.0.0.0:8083".to_owned()),
        database_url,
        upstream,
        duplicate_window_minutes: dedupe.window_minutes.unwrap_or(15),
        duplicate_max_entries: dedupe.max_entries.unwrap_or(100_000),
        ingest_workers: monitor.ingest_workers.unwrap_or(4),
    })
}
