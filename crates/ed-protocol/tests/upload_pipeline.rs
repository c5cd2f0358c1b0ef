//! End-to-end exercise of the decode -> parse -> structural-check ->
//! envelope -> fingerprint -> frame pipeline a real upload goes through.

use ed_protocol::codec::deflate;
use ed_protocol::envelope::Envelope;
use ed_protocol::fingerprint::Fingerprint;
use ed_protocol::intake::{decode_body, parse_json, require_structural_elements};
use ed_protocol::topic::{decode_frame, encode_frame, Topic};

fn sample_body() -> Vec<u8> {
    br#"{
        "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
        "header": {
            "softwareName": "EDMC",
            "softwareVersion": "5.10.2",
            "uploaderID": "Cmdr-Jameson"
        },
        "message": {
            "systemName": "Shinrarta Dezhra",
            "commodities": []
        }
    }"#
    .to_vec()
}

#[test]
fn compressed_upload_decodes_validates_and_frames_identically_to_raw() {
    let raw = sample_body();
    let compressed = deflate(&raw);

    let from_raw = decode_body(&raw, "application/json", "").unwrap();
    let from_compressed = decode_body(&compressed, "application/octet-stream", "").unwrap();
    assert_eq!(from_raw, from_compressed);

    let value = parse_json(&from_compressed).unwrap();
    require_structural_elements(&value).unwrap();

    let mut envelope = Envelope::from_value(value).unwrap();
    envelope.header.gateway_timestamp = Some("2026-07-28T00:00:00.000Z".to_owned());
    envelope.header.uploader_ip = Some("203.0.113.9".to_owned());

    let fingerprint_with_transient = Fingerprint::of(&envelope);
    envelope.strip_transient_header_fields();
    let fingerprint_without_transient = Fingerprint::of(&envelope);
    assert_eq!(fingerprint_with_transient, fingerprint_without_transient);

    let topic = Topic::for_schema_ref(&envelope.schema_ref);
    assert!(!topic.is_test());

    let outgoing = deflate(&envelope.canonical_json());
    let frame = encode_frame(&topic, &outgoing);
    let (decoded_topic, decoded_payload) = decode_frame(&frame);
    assert_eq!(decoded_topic, Some(topic.as_str()));
    assert_eq!(decoded_payload, outgoing.as_slice());
}

#[test]
fn missing_message_field_is_rejected_before_envelope_construction() {
    let body = br#"{
        "$schemaRef": "https://eddn.edcd.io/schemas/commodity/3",
        "header": {"softwareName": "EDMC", "softwareVersion": "5.10.2"}
    }"#;
    let value = parse_json(body).unwrap();
    let err = require_structural_elements(&value).unwrap_err();
    assert_eq!(err.to_wire_body(), "FAIL: MISSING STRUCTURAL ELEMENT message");
}
