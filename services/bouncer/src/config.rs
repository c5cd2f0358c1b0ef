use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct BouncerConfig {
    pub bind: String,
    pub upstream_url: String,
    pub queue_dir: String,
    pub max_body_bytes: usize,
    pub disk_watermark_bytes: u64,
    pub drain_backoff_max_seconds: u64,
    pub max_entry_age_days: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
    MissingUpstreamUrl,
    MissingQueueDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {e}"),
            ConfigError::MissingUpstreamUrl => write!(f, "bouncer.upstream_url is required"),
            ConfigError::MissingQueueDir => write!(f, "bouncer.queue_dir is required"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    http: Option<RawHttpConfig>,
    bouncer: Option<RawBouncerConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct RawHttpConfig {
    bind: Option<String>,
    max_body_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBouncerConfig {
    upstream_url: Option<String>,
    queue_dir: Option<String>,
    disk_watermark_bytes: Option<u64>,
    drain_backoff_max_seconds: Option<u64>,
    max_entry_age_days: Option<u64>,
}

pub fn load_config_from_path(path: &Path) -> Result<BouncerConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
    load_config_from_str(&text)
}

pub fn load_config_from_str(text: &str) -> Result<BouncerConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
    build_config(raw)
}

fn build_config(raw: RawConfig) -> Result<BouncerConfig, ConfigError> {
    let bouncer = raw.bouncer.unwrap_or_default();
    let upstream_url = bouncer.upstream_url.ok_or(ConfigError::MissingUpstreamUrl)?;
    let queue_dir = bouncer.queue_dir.ok_or(ConfigError::MissingQueueDir)?;

    Ok(BouncerConfig {
        bind: raw
            .http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8082".to_owned()),
        upstream_url,
        queue_dir,
        max_body_bytes: raw
            .http
            .and_then(|h| h.max_body_bytes)
            .unwrap_or(1024 * 1024),
        disk_watermark_bytes: bouncer.disk_watermark_bytes.unwrap_or(10 * 1024 * 1024 * 1024),
        drain_backoff_max_seconds: bouncer.drain_backoff_max_seconds.unwrap_or(60),
        max_entry_age_days: bouncer.max_entry_age_days.unwrap_or(7),
    })
}
