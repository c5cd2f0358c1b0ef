//! Rejection taxonomy for the upload algorithm (spec §4.E / §7).
//!
//! The wire contract for these is frozen plain text: `FAIL: <reason>`. This
//! type centralizes that formatting so Gateway and Bouncer intake agree on
//! wording.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    UnparseableJson,
    MissingElement(String),
    UnknownSchema(String),
    SchemaInvalid { path: String, reason: String },
    TooLarge,
    CorruptCompression,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::UnparseableJson => write!(f, "UNPARSEABLE JSON"),
            RejectionReason::MissingElement(field) => {
                write!(f, "MISSING STRUCTURAL ELEMENT {field}")
            }
            RejectionReason::UnknownSchema(id) => write!(f, "UNKNOWN SCHEMA {id}"),
            RejectionReason::SchemaInvalid { path, reason } => {
                write!(f, "SCHEMA VALIDATION FAILED {path}: {reason}")
            }
            RejectionReason::TooLarge => write!(f, "TOO LARGE"),
            RejectionReason::CorruptCompression => write!(f, "CORRUPT COMPRESSION"),
        }
    }
}

impl RejectionReason {
    /// The full `FAIL: <reason>` response body.
    pub fn to_wire_body(&self) -> String {
        format!("FAIL: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_element_includes_field_name() {
        let r = RejectionReason::MissingElement("header.softwareName".to_owned());
        assert_eq!(
            r.to_wire_body(),
            "FAIL: MISSING STRUCTURAL ELEMENT header.softwareName"
        );
    }

    #[test]
    fn unknown_schema_includes_id() {
        let r = RejectionReason::UnknownSchema("https://example.com/nope/1".to_owned());
        assert_eq!(
            r.to_wire_body(),
            "FAIL: UNKNOWN SCHEMA https://example.com/nope/1"
        );
    }

    #[test]
    fn schema_invalid_includes_path_and_reason() {
        let r = RejectionReason::SchemaInvalid {
            path: "/message/commodities".to_owned(),
            reason: "expected array".to_owned(),
        };
        assert_eq!(
            r.to_wire_body(),
            "FAIL: SCHEMA VALIDATION FAILED /message/commodities: expected array"
        );
    }

    #[test]
    fn simple_variants_match_literal_wire_text() {
        assert_eq!(
            RejectionReason::UnparseableJson.to_wire_body(),
            "FAIL: UNPARSEABLE JSON"
        );
        assert_eq!(RejectionReason::TooLarge.to_wire_body(), "FAIL: TOO LARGE");
        assert_eq!(
            RejectionReason::CorruptCompression.to_wire_body(),
            "FAIL: CORRUPT COMPRESSION"
        );
    }
}
