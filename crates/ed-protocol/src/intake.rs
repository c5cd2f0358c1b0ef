//! Shared decode/parse/structural-check logic for the Gateway and Bouncer
//! upload surfaces (spec §4.E steps 2-4, §6 "HTTP upload form").

use crate::codec::{inflate, looks_like_zlib};
use crate::rejection::RejectionReason;
use serde_json::Value;

/// Decode a raw POST body into JSON bytes, honoring Content-Encoding,
/// zlib-header sniffing, and form-encoded extraction (spec §4.E step 2).
///
/// `content_type` and `content_encoding` are the raw lowercased header
/// values (or empty string if absent).
pub fn decode_body(
    body: &[u8],
    content_type: &str,
    content_encoding: &str,
) -> Result<Vec<u8>, RejectionReason> {
    let is_form = content_type.starts_with("application/x-www-form-urlencoded");

    let raw = if is_form {
        extract_form_field(body, "data")?
    } else {
        body.to_vec()
    };

    let should_inflate = content_encoding == "gzip"
        || content_encoding == "deflate"
        || (content_encoding.is_empty() && !is_form && looks_like_zlib(&raw));

    if should_inflate {
        inflate(&raw).map_err(|_| RejectionReason::CorruptCompression)
    } else {
        Ok(raw)
    }
}

/// Extract and URL-decode the named field from a form-encoded body.
fn extract_form_field(body: &[u8], field: &str) -> Result<Vec<u8>, RejectionReason> {
    let text = std::str::from_utf8(body).map_err(|_| RejectionReason::UnparseableJson)?;
    for pair in text.split('&') {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or("");
        if key == field {
            let raw_value = parts.next().unwrap_or("");
            return Ok(url_decode(raw_value));
        }
    }
    Err(RejectionReason::UnparseableJson)
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

/// Parse JSON bytes into a `Value` (step 3).
pub fn parse_json(bytes: &[u8]) -> Result<Value, RejectionReason> {
    serde_json::from_slice(bytes).map_err(|_| RejectionReason::UnparseableJson)
}

/// Verify the structural elements required by step 4: `$schemaRef`,
/// `header.softwareName`, `header.softwareVersion`, `message`. Returns the
/// first missing field's name in the rejection, matching the order the
/// elements are listed in spec §3.
pub fn require_structural_elements(value: &Value) -> Result<(), RejectionReason> {
    let schema_ref = value.get("$schemaRef").and_then(Value::as_str);
    if schema_ref.map(str::is_empty).unwrap_or(true) {
        return Err(RejectionReason::MissingElement("$schemaRef".to_owned()));
    }

    let header = value.get("header");
    let software_name = header
        .and_then(|h| h.get("softwareName"))
        .and_then(Value::as_str);
    if software_name.map(str::is_empty).unwrap_or(true) {
        return Err(RejectionReason::MissingElement(
            "header.softwareName".to_owned(),
        ));
    }

    let software_version = header
        .and_then(|h| h.get("softwareVersion"))
        .and_then(Value::as_str);
    if software_version.map(str::is_empty).unwrap_or(true) {
        return Err(RejectionReason::MissingElement(
            "header.softwareVersion".to_owned(),
        ));
    }

    if value.get("message").is_none() {
        return Err(RejectionReason::MissingElement("message".to_owned()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::deflate;
    use serde_json::json;

    #[test]
    fn decode_body_passes_through_raw_json() {
        let body = b"{\"a\":1}";
        let decoded = decode_body(body, "application/json", "").unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn decode_body_inflates_zlib_sniffed_body() {
        let compressed = deflate(b"{\"a\":1}");
        let decoded = decode_body(&compressed, "application/octet-stream", "").unwrap();
        assert_eq!(decoded, b"{\"a\":1}");
    }

    #[test]
    fn decode_body_honors_content_encoding_header() {
        let compressed = deflate(b"{\"a\":1}");
        let decoded = decode_body(&compressed, "application/json", "deflate").unwrap();
        assert_eq!(decoded, b"{\"a\":1}");
    }

    #[test]
    fn decode_body_extracts_form_field() {
        let body = b"data=%7B%22a%22%3A1%7D&other=ignored";
        let decoded =
            decode_body(body, "application/x-www-form-urlencoded", "").unwrap();
        assert_eq!(decoded, b"{\"a\":1}");
    }

    #[test]
    fn decode_body_rejects_corrupt_compression() {
        let body = b"definitely-not-zlib-but-looks-nothing-like-it";
        let err = decode_body(body, "application/octet-stream", "deflate").unwrap_err();
        assert_eq!(err, RejectionReason::CorruptCompression);
    }

    #[test]
    fn require_structural_elements_accepts_complete_envelope() {
        let v = json!({
            "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
            "header": {"softwareName": "EDMC", "softwareVersion": "5.0.0"},
            "message": {}
        });
        assert!(require_structural_elements(&v).is_ok());
    }

    #[test]
    fn require_structural_elements_flags_missing_schema_ref() {
        let v = json!({
            "header": {"softwareName": "EDMC", "softwareVersion": "5.0.0"},
            "message": {}
        });
        assert_eq!(
            require_structural_elements(&v).unwrap_err(),
            RejectionReason::MissingElement("$schemaRef".to_owned())
        );
    }

    #[test]
    fn require_structural_elements_rejects_empty_schema_ref() {
        let v = json!({
            "$schemaRef": "",
            "header": {"softwareName": "EDMC", "softwareVersion": "5.0.0"},
            "message": {}
        });
        assert!(require_structural_elements(&v).is_err());
    }

    #[test]
    fn require_structural_elements_flags_missing_header_fields() {
        let v = json!({
            "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
            "header": {"softwareName": "EDMC"},
            "message": {}
        });
        assert_eq!(
            require_structural_elements(&v).unwrap_err(),
            RejectionReason::MissingElement("header.softwareVersion".to_owned())
        );
    }

    #[test]
    fn require_structural_elements_flags_missing_message() {
        let v = json!({
            "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
            "header": {"softwareName": "EDMC", "softwareVersion": "5.0.0"},
        });
        assert_eq!(
            require_structural_elements(&v).unwrap_err(),
            RejectionReason::MissingElement("message".to_owned())
        );
    }

    #[test]
    fn require_structural_elements_rejects_missing_header_entirely() {
        let v = json!({
            "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
            "message": {}
        });
        assert!(require_structural_elements(&v).is_err());
    }
}
