//! The telemetry envelope: the unit of traffic on the bus.
//!
//! Field names on the wire are camelCase (`$schemaRef`, `softwareName`, ...)
//! per the frozen contract in spec §3 / §6; Rust-side fields are snake_case
//! and mapped with `#[serde(rename = ...)]`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields the Gateway sets; never trusted from the client.
pub const TRANSIENT_HEADER_FIELDS: [&str; 2] = ["gatewayTimestamp", "uploaderIP"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "softwareName")]
    pub software_name: String,
    #[serde(rename = "softwareVersion")]
    pub software_version: String,
    #[serde(
        rename = "uploaderID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub uploader_id: Option<String>,
    #[serde(
        rename = "gatewayTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gateway_timestamp: Option<String>,
    #[serde(
        rename = "uploaderIP",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub uploader_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "$schemaRef")]
    pub schema_ref: String,
    pub header: Header,
    pub message: Value,
}

impl Envelope {
    /// Parse an envelope from raw JSON bytes without enforcing the
    /// structural-element check (step 3 of the Gateway upload algorithm).
    /// Returns the raw `serde_json::Value` tree so callers can perform the
    /// `MISSING STRUCTURAL ELEMENT` checks themselves with precise field
    /// names (see `ed_protocol::intake`).
    pub fn parse_json(bytes: &[u8]) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("Envelope serializes to valid JSON")
    }

    /// Strip any client-supplied transient header fields (step 7).
    pub fn strip_transient_header_fields(&mut self) {
        self.header.gateway_timestamp = None;
        self.header.uploader_ip = None;
    }

    /// Canonical JSON used for fingerprinting: keys sorted lexically, no
    /// whitespace, standard (ASCII) escapes, transient header fields
    /// removed. This is the one place fingerprint canonicalization is
    /// implemented; every dedupe fingerprint goes through it.
    pub fn canonical_json(&self) -> Vec<u8> {
        let mut residual = self.to_value();
        if let Some(header) = residual.get_mut("header").and_then(Value::as_object_mut) {
            for field in TRANSIENT_HEADER_FIELDS {
                header.remove(field);
            }
        }
        let sorted = sort_keys(residual);
        serde_json::to_vec(&sorted).expect("canonical value serializes")
    }

    /// Sorted-key JSON of the envelope as it stands, with no fields removed
    /// (`simplejson.dumps(json, sort_keys=True)` in the original Relay).
    /// Unlike `canonical_json`, this keeps `header.gatewayTimestamp` — it's
    /// for serializing the outbound wire envelope, not for fingerprinting.
    pub fn to_sorted_json(&self) -> Vec<u8> {
        let sorted = sort_keys(self.to_value());
        serde_json::to_vec(&sorted).expect("envelope value serializes")
    }
}

/// Recursively rebuild a `Value` with object keys in lexical order. Relies
/// on `serde_json`'s `preserve_order` feature so a `BTreeMap`-backed sort is
/// actually observed in the output rather than re-shuffled by default
/// hashing.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, v);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
