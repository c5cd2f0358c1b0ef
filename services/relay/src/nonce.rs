//! Lazily-rotated pseudonymization nonce.
//!
//! The original generates a fresh nonce once per process lifetime. This
//! keeps the same one-nonce-per-window shape but rotates lazily: the next
//! caller past the rotation threshold pays the (tiny) cost of generating a
//! new one, rather than a dedicated timer task.

use rand::RngCore;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct NonceState {
    bytes: Vec<u8>,
    generated_at: Instant,
}

fn generate_nonce() -> Vec<u8> {
    let mut bytes = vec![0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes
}

pub struct Nonce {
    rotation: Duration,
    inner: Mutex<NonceState>,
}

impl Nonce {
    pub fn new(rotation: Duration) -> Self {
        Nonce {
            rotation,
            inner: Mutex::new(NonceState {
                bytes: generate_nonce(),
                generated_at: Instant::now(),
            }),
        }
    }

    /// Current nonce bytes, rotating first if the window has elapsed.
    pub fn current(&self) -> Vec<u8> {
        let mut state = self.inner.lock().expect("nonce mutex poisoned");
        if state.generated_at.elapsed() >= self.rotation {
            state.bytes = generate_nonce();
            state.generated_at = Instant::now();
        }
        state.bytes.clone()
    }
}
