//! Inbound-frame transform: pseudonymize the uploader, strip the uploader
//! IP, dedupe, and re-publish under the same topic.

use crate::nonce::Nonce;
use ed_protocol::envelope::Envelope;
use ed_protocol::topic::{decode_frame, encode_frame, Topic};
use ed_protocol::{deflate, inflate, Fingerprint};
use sha1::{Digest, Sha1};

#[derive(Debug)]
pub enum TransformError {
    NoTopic,
    Corrupt(ed_protocol::CodecError),
    Malformed(serde_json::Error),
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::NoTopic => write!(f, "frame carried no topic prefix"),
            TransformError::Corrupt(e) => write!(f, "{e}"),
            TransformError::Malformed(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TransformError {}

pub enum Outcome {
    /// Republished frame plus the schema ref its topic routes on.
    Republished { frame: Vec<u8>, schema_ref: String },
    Duplicate,
}

/// Pseudonymize an uploader ID: `SHA1(nonce_bytes || uploaderID_bytes)` hex,
/// with no separator.
pub fn scramble_uploader(nonce: &[u8], uploader_id: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(uploader_id.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn transform(
    raw_frame: &[u8],
    nonce: &Nonce,
    dedupe: &ed_dedupe::DuplicateCache,
) -> Result<Outcome, TransformError> {
    let (topic, compressed) = decode_frame(raw_frame);
    let topic = topic.ok_or(TransformError::NoTopic)?.to_owned();

    let plaintext = inflate(compressed).map_err(TransformError::Corrupt)?;
    let value = Envelope::parse_json(&plaintext).map_err(TransformError::Malformed)?;
    let mut envelope = Envelope::from_value(value).map_err(TransformError::Malformed)?;

    if matches!(dedupe.observe(Fingerprint::of(&envelope)), ed_dedupe::Observation::Duplicate) {
        return Ok(Outcome::Duplicate);
    }

    if let Some(uploader_id) = envelope.header.uploader_id.take() {
        envelope.header.uploader_id = Some(scramble_uploader(&nonce.current(), &uploader_id));
    }
    envelope.header.uploader_ip = None;

    let wire_json = envelope.to_sorted_json();
    let compressed = deflate(&wire_json);
    let wire_topic = Topic::for_schema_ref(&topic);
    let frame = encode_frame(&wire_topic, &compressed);

    Ok(Outcome::Republished {
        frame,
        schema_ref: envelope.schema_ref,
    })
}
