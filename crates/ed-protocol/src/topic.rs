//! Bus topic routing and wire framing (spec §3 / §4.D).

/// Separator used to prefix a frame with its routing topic, e.g.
/// `<topic> |-| <compressed bytes>`. Matches the literal separator used by
/// the original EDDN Monitor (`message.split(b' |-| ')`).
pub const TOPIC_SEPARATOR: &[u8] = b" |-| ";

/// A bus topic: either the production topic or the `/test` topic for a
/// given schema ref.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Route a schema ref to its topic. A schema ID ending in the literal,
    /// case-sensitive suffix `/test` routes to the test topic; all other
    /// suffixes route to the production topic, which is simply the schema
    /// ref itself (spec §3).
    pub fn for_schema_ref(schema_ref: &str) -> Self {
        Topic(schema_ref.to_owned())
    }

    pub fn is_test(&self) -> bool {
        self.0.ends_with("/test")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` matches a subscriber-requested prefix filter. An
    /// empty/absent prefix matches everything (wildcard subscription).
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        prefix.is_empty() || self.0.starts_with(prefix)
    }
}

/// Prefix `compressed` with `topic |-| `, producing the on-wire frame.
pub fn encode_frame(topic: &Topic, compressed: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(topic.0.len() + TOPIC_SEPARATOR.len() + compressed.len());
    frame.extend_from_slice(topic.0.as_bytes());
    frame.extend_from_slice(TOPIC_SEPARATOR);
    frame.extend_from_slice(compressed);
    frame
}

/// Split a frame into its optional topic prefix and payload bytes. When no
/// separator is present, the whole frame is the payload (spec §3: "When no
/// topic prefix is present, the whole frame is the compressed envelope").
pub fn decode_frame(frame: &[u8]) -> (Option<&str>, &[u8]) {
    if let Some(pos) = find_subslice(frame, TOPIC_SEPARATOR) {
        let topic_bytes = &frame[..pos];
        let payload = &frame[pos + TOPIC_SEPARATOR.len()..];
        match std::str::from_utf8(topic_bytes) {
            Ok(topic) => (Some(topic), payload),
            Err(_) => (None, frame),
        }
    } else {
        (None, frame)
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
