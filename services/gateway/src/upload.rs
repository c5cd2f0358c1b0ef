//! The Gateway upload algorithm (13 steps, authoritative order).

use crate::state::GatewayState;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use ed_protocol::envelope::Envelope;
use ed_protocol::fingerprint::Fingerprint;
use ed_protocol::intake::{decode_body, parse_json, require_structural_elements};
use ed_protocol::rejection::RejectionReason;
use ed_protocol::topic::{encode_frame, Topic};
use ed_schema::ValidationOutcome;
use ed_dedupe::Observation;
use std::net::SocketAddr;

pub async fn upload(
    State(state): State<GatewayState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_upload(&state, peer.ip().to_string(), &headers, &body)
}

/// The algorithm itself, separated from the axum extractors so it can be
/// exercised directly in tests with a synthetic peer address.
fn handle_upload(state: &GatewayState, peer_ip: String, headers: &HeaderMap, body: &[u8]) -> Response {
    // Step 1: body size cap.
    if body.len() > state.config.max_body_bytes {
        return reject(StatusCode::PAYLOAD_TOO_LARGE, RejectionReason::TooLarge);
    }

    // Step 2: decode.
    let content_type = header_str(headers, "content-type");
    let content_encoding = header_str(headers, "content-encoding");
    let decoded = match decode_body(body, &content_type, &content_encoding) {
        Ok(d) => d,
        Err(reason) => return reject(StatusCode::BAD_REQUEST, reason),
    };

    // Step 3: parse JSON.
    let value = match parse_json(&decoded) {
        Ok(v) => v,
        Err(reason) => return reject(StatusCode::BAD_REQUEST, reason),
    };

    // Step 4: structural elements.
    if let Err(reason) = require_structural_elements(&value) {
        return reject(StatusCode::BAD_REQUEST, reason);
    }

    let mut envelope = match Envelope::from_value(value) {
        Ok(e) => e,
        Err(_) => return reject(StatusCode::BAD_REQUEST, RejectionReason::UnparseableJson),
    };

    // Step 5 + 6: schema lookup and validation.
    match state.schemas.validate(&envelope.schema_ref, &envelope.message) {
        ValidationOutcome::Ok => {}
        ValidationOutcome::Unknown => {
            return reject(
                StatusCode::BAD_REQUEST,
                RejectionReason::UnknownSchema(envelope.schema_ref.clone()),
            )
        }
        ValidationOutcome::Invalid { path, reason } => {
            return reject(
                StatusCode::BAD_REQUEST,
                RejectionReason::SchemaInvalid { path, reason },
            )
        }
    }

    // Step 7: strip client-supplied transient fields.
    envelope.strip_transient_header_fields();

    // Step 8: gateway timestamp, ISO-8601 with millisecond precision and trailing Z.
    envelope.header.gateway_timestamp = Some(format_gateway_timestamp());

    // Step 9: uploader IP, honoring X-Forwarded-For only behind a trusted proxy prefix.
    envelope.header.uploader_ip = Some(resolve_uploader_ip(
        &peer_ip,
        headers,
        state.config.trusted_proxy_prefix.as_deref(),
    ));

    // Step 10: fingerprint.
    let fingerprint = Fingerprint::of(&envelope);

    // Step 11: dedupe.
    if state.dedupe.observe(fingerprint) == Observation::Duplicate {
        state.stats.tally("duplicate");
        return (StatusCode::OK, "OK").into_response();
    }

    // Step 12: compress and publish.
    let serialized = serde_json::to_vec(&envelope.to_value()).expect("envelope serializes");
    let compressed = ed_protocol::codec::deflate(&serialized);
    let topic = Topic::for_schema_ref(&envelope.schema_ref);
    let frame = encode_frame(&topic, &compressed);
    state.bus.publish(bytes::Bytes::from(frame));
    state.stats.tally("inbound");
    state.stats.tally(&envelope.schema_ref);

    // Step 13.
    (StatusCode::OK, "OK").into_response()
}

fn reject(status: StatusCode, reason: RejectionReason) -> Response {
    (status, reason.to_wire_body()).into_response()
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn format_gateway_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn resolve_uploader_ip(peer_ip: &str, headers: &HeaderMap, trusted_proxy_prefix: Option<&str>) -> String {
    let Some(prefix) = trusted_proxy_prefix else {
        return peer_ip.to_owned();
    };
    if !peer_ip.starts_with(prefix) {
        return peer_ip.to_owned();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| peer_ip.to_owned())
}
