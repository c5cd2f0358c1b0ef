//! Content fingerprinting for duplicate suppression (spec §3).

use crate::envelope::Envelope;
use sha1::{Digest, Sha1};

/// A 160-bit opaque content hash of an envelope with transient fields
/// removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 20]);

impl Fingerprint {
    pub fn of(envelope: &Envelope) -> Self {
        let canon = envelope.canonical_json();
        let digest = Sha1::digest(&canon);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Fingerprint(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
