//! Bouncer upload surface: the same HTTP shape as the Gateway, but with no
//! validation — it only sniffs Content-Type enough to extract a
//! form-encoded `data` field, then appends the raw bytes (plus the
//! original headers, so the replay upstream sees the same request) to the
//! durable journal.

use crate::state::BouncerState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use ed_protocol::rejection::RejectionReason;

pub async fn upload(State(state): State<BouncerState>, headers: HeaderMap, body: Bytes) -> Response {
    handle_upload(&state, &headers, &body)
}

fn handle_upload(state: &BouncerState, headers: &HeaderMap, body: &[u8]) -> Response {
    if body.len() > state.config.max_body_bytes {
        return reject(StatusCode::PAYLOAD_TOO_LARGE, RejectionReason::TooLarge);
    }

    if state.is_over_watermark() {
        return (StatusCode::SERVICE_UNAVAILABLE, "FAIL: QUEUE FULL").into_response();
    }

    let content_type = header_str(headers, "content-type");
    let data = if content_type.starts_with("application/x-www-form-urlencoded") {
        match extract_data_field(body) {
            Some(d) => d,
            None => return reject(StatusCode::BAD_REQUEST, RejectionReason::UnparseableJson),
        }
    } else {
        body.to_vec()
    };

    let preserved_headers: Vec<(String, String)> = headers
        .iter()
        .filter_map(|(name, value)| {
            let v = value.to_str().ok()?;
            Some((name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    match state.journal.enqueue(&preserved_headers, &data) {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "FAIL: QUEUE WRITE ERROR").into_response(),
    }
}

fn extract_data_field(body: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(body).ok()?;
    for pair in text.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next()? == "data" {
            let raw_value = parts.next().unwrap_or("");
            return Some(url_decode(raw_value));
        }
    }
    None
}

fn url_decode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut chars = value.bytes().peekable();
    while let Some(b) = chars.next() {
        match b {
            b'+' => out.push(b' '),
            b'%' => {
                let hi = chars.next();
                let lo = chars.next();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    if let (Some(hi), Some(lo)) = (hex_digit(hi), hex_digit(lo)) {
                        out.push((hi << 4) | lo);
                        continue;
                    }
                }
                out.push(b'%');
            }
            other => out.push(other),
        }
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
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
