//! Gateway configuration loading.
//!
//! TOML is the sole config source. Default path: `/etc/eddn/gateway.toml`.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: String,
    pub schema_dir: String,
    pub max_body_bytes: usize,
    pub trusted_proxy_prefix: Option<String>,
    pub bus_capacity: usize,
    pub duplicate_window_minutes: u64,
    pub duplicate_max_entries: usize,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    http: Option<RawHttpConfig>,
    gateway: Option<RawGatewayConfig>,
    bus: Option<RawBusConfig>,
    dedupe: Option<RawDedupeConfig>,
}

#[derive(Debug, Deserialize)]
struct RawHttpConfig {
    bind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGatewayConfig {
    schema_dir: Option<String>,
    max_body_bytes: Option<usize>,
    trusted_proxy_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawBusConfig {
    capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawDedupeConfig {
    window_minutes: Option<u64>,
    max_entries: Option<usize>,
}

pub fn load_config_from_path(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&toml_str)
}

pub fn load_config() -> Result<GatewayConfig, ConfigError> {
    load_config_from_path(Path::new("/etc/eddn/gateway.toml"))
}

pub fn load_config_from_str(toml_str: &str) -> Result<GatewayConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let http = raw.http.unwrap_or(RawHttpConfig { bind: None });
    let bind = http.bind.unwrap_or_else(|| "0.0.0.0:8080".to_owned());

    let gateway = raw.gateway.unwrap_or(RawGatewayConfig {
        schema_dir: None,
        max_body_bytes: None,
        trusted_proxy_prefix: None,
    });
    let schema_dir = gateway
        .schema_dir
        .ok_or_else(|| ConfigError::MissingField("gateway.schema_dir".to_owned()))?;
    let max_body_bytes = gateway.max_body_bytes.unwrap_or(1024 * 1024);
    let trusted_proxy_prefix = gateway.trusted_proxy_prefix;

    let bus = raw.bus.unwrap_or(RawBusConfig { capacity: None });
    let bus_capacity = bus.capacity.unwrap_or(500);

    let dedupe = raw.dedupe.unwrap_or(RawDedupeConfig {
        window_minutes: None,
        max_entries: None,
    });
    let duplicate_window_minutes = dedupe.window_minutes.unwrap_or(15);
    let duplicate_max_entries = dedupe.max_entries.unwrap_or(100_000);

    Ok(GatewayConfig {
        bind,
        schema_dir,
        max_body_bytes,
        trusted_proxy_prefix,
        bus_capacity,
        duplicate_window_minutes,
        duplicate_max_entries,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingField(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {s}"),
            ConfigError::Parse(s) => write!(f, "Parse error: {s}"),
            ConfigError::MissingField(s) => write!(f, "Missing required field: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_sections_absent() {
        let cfg = load_config_from_str(
            r#"
            [gateway]
            schema_dir = "/etc/eddn/schemas"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bind, "0.0.0.0:8080");
        assert_eq!(cfg.max_body_bytes, 1024 * 1024);
        assert_eq!(cfg.bus_capacity, 500);
        assert_eq!(cfg.duplicate_window_minutes, 15);
        assert_eq!(cfg.duplicate_max_entries, 100_000);
        assert!(cfg.trusted_proxy_prefix.is_none());
    }

    #[test]
    fn missing_schema_dir_is_an_error() {
        let result = load_config_from_str("[http]\nbind = \"0.0.0.0:9000\"\n");
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = load_config_from_str(
            r#"
            [http]
            bind = "127.0.0.1:9000"

            [gateway]
            schema_dir = "/srv/schemas"
            max_body_bytes = 2048
            trusted_proxy_prefix = "10.0.0."

            [bus]
            capacity = 1000

            [dedupe]
            window_minutes = 30
            max_entries = 5000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:9000");
        assert_eq!(cfg.max_body_bytes, 2048);
        assert_eq!(cfg.trusted_proxy_prefix.as_deref(), Some("10.0.0."));
        assert_eq!(cfg.bus_capacity, 1000);
        assert_eq!(cfg.duplicate_window_minutes, 30);
        assert_eq!(cfg.duplicate_max_entries, 5000);
    }
}
