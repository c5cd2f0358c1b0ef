//! Shared JSON error envelope for non-upload HTTP surfaces (stats, ping,
//! subscribe-handshake failures). Upload endpoints never use this; their
//! wire contract is frozen plain text (see `rejection::RejectionReason`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
