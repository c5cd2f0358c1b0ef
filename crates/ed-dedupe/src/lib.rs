//! Duplicate suppression cache for the Gateway's upload pipeline.

use ed_protocol::Fingerprint;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    FirstTime,
    Duplicate,
}

struct Inner {
    entries: VecDeque<(Fingerprint, Instant)>,
    seen: HashSet<Fingerprint>,
}

/// A bounded, time-windowed cache of content fingerprints. A single mutex
/// guards an insertion-ordered queue plus a membership set; the critical
/// section is index-only bookkeeping, never I/O, so the lock is held for a
/// bounded, short time.
pub struct DuplicateCache {
    window: Duration,
    max_entries: usize,
    inner: Mutex<Inner>,
}

impl DuplicateCache {
    /// `window == Duration::ZERO` disables the cache entirely: `observe`
    /// always reports `FirstTime` and nothing is retained.
    pub fn new(window: Duration, max_entries: usize) -> Self {
        DuplicateCache {
            window,
            max_entries,
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                seen: HashSet::new(),
            }),
        }
    }

    pub fn observe(&self, fp: Fingerprint) -> Observation {
        if self.window.is_zero() {
            return Observation::FirstTime;
        }

        let now = Instant::now();
        let mut inner = self.inner.lock().expect("duplicate cache mutex poisoned");
        expire(&mut inner, self.window, now);

        if inner.seen.contains(&fp) {
            return Observation::Duplicate;
        }

        inner.seen.insert(fp);
        inner.entries.push_back((fp, now));
        evict_overflow(&mut inner, self.max_entries);
        Observation::FirstTime
    }

    /// Externally-driven idle sweep: expires entries older than `window`
    /// without requiring an `observe` call. The owning service calls this
    /// from its own `tokio::time::interval` loop (at least once a minute).
    pub fn sweep(&self, now: Instant) {
        if self.window.is_zero() {
            return;
        }
        let mut inner = self.inner.lock().expect("duplicate cache mutex poisoned");
        expire(&mut inner, self.window, now);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("duplicate cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn expire(inner: &mut Inner, window: Duration, now: Instant) {
    while let Some((_, inserted_at)) = inner.entries.front() {
        if now.duration_since(*inserted_at) > window {
            if let Some((fp, _)) = inner.entries.pop_front() {
                inner.seen.remove(&fp);
            }
        } else {
            break;
        }
    }
}

/// Evict the oldest 10% regardless of age, a separate resource-bound code
/// path from the time-based sweep above.
fn evict_overflow(inner: &mut Inner, max_entries: usize) {
    if inner.entries.len() <= max_entries {
        return;
    }
    let to_evict = (max_entries / 10).max(1);
    for _ in 0..to_evict {
        if let Some((fp, _)) = inner.entries.pop_front() {
            inner.seen.remove(&fp);
        } else {
            break;
        }
    }
}
