//! Wire types and codecs shared by every service on the bus: the envelope
//! format, content fingerprinting, topic routing/framing, the zlib codec,
//! the upload rejection taxonomy, and decode/structural-check helpers used
//! by both the Gateway and the Bouncer intake surfaces.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod intake;
pub mod rejection;
pub mod topic;

pub use codec::{deflate, inflate, looks_like_zlib, CodecError};
pub use envelope::{Envelope, Header};
pub use error::HttpErrorEnvelope;
pub use fingerprint::Fingerprint;
pub use rejection::RejectionReason;
pub use topic::{decode_frame, encode_frame, Topic, TOPIC_SEPARATOR};
