//! Per-name counters with a periodic rate snapshot, the same shape as the
//! teacher's `services/receiver/src/cache.rs::StreamCounts`, generalized
//! from per-stream keys to arbitrary named counters (schema refs, software
//! names, `bus_dropped`, ...).

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
pub struct NameStats {
    pub count: u64,
    #[serde(rename = "rate")]
    pub rate_per_second: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Summary {
    pub names: HashMap<String, NameStats>,
}

struct Snapshot {
    count: u64,
    at: Instant,
}

/// Thread-safe named counters plus the last periodic snapshot used to
/// compute a rate at summary time.
pub struct StatsCollector {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
    snapshots: RwLock<HashMap<String, Snapshot>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        StatsCollector {
            counters: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    fn counter_for(&self, name: &str) -> Arc<AtomicU64> {
        {
            let counters = self.counters.read().expect("stats counters lock poisoned");
            if let Some(c) = counters.get(name) {
                return c.clone();
            }
        }
        let mut counters = self.counters.write().expect("stats counters lock poisoned");
        counters
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }

    pub fn tally(&self, name: &str) {
        self.counter_for(name).fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of every known counter's current value, to be called
    /// from the owning service's `tokio::time::interval` loop.
    pub fn snapshot(&self) {
        let now = Instant::now();
        let names: Vec<String> = self
            .counters
            .read()
            .expect("stats counters lock poisoned")
            .keys()
            .cloned()
            .collect();
        let mut snapshots = self.snapshots.write().expect("stats snapshots lock poisoned");
        for name in names {
            let count = self.counter_for(&name).load(Ordering::Relaxed);
            snapshots.insert(name, Snapshot { count, at: now });
        }
    }

    /// Spawn the periodic snapshot task on the current Tokio runtime.
    pub fn spawn_snapshot_task(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                this.snapshot();
            }
        })
    }

    pub fn default_snapshot_interval() -> Duration {
        DEFAULT_SNAPSHOT_INTERVAL
    }

    pub fn get_summary(&self) -> Summary {
        let counters = self.counters.read().expect("stats counters lock poisoned");
        let snapshots = self.snapshots.read().expect("stats snapshots lock poisoned");
        let now = Instant::now();

        let mut names = HashMap::new();
        for (name, counter) in counters.iter() {
            let count = counter.load(Ordering::Relaxed);
            let rate = match snapshots.get(name) {
                Some(snap) => {
                    let elapsed = now.duration_since(snap.at).as_secs_f64();
                    if elapsed > 0.0 {
                        (count.saturating_sub(snap.count)) as f64 / elapsed
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            };
            names.insert(
                name.clone(),
                NameStats {
                    count,
                    rate_per_second: rate,
                },
            );
        }
        Summary { names }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_increments_named_counter() {
        let stats = StatsCollector::new();
        stats.tally("commodity/3");
        stats.tally("commodity/3");
        stats.tally("journal/1");
        let summary = stats.get_summary();
        assert_eq!(summary.names["commodity/3"].count, 2);
        assert_eq!(summary.names["journal/1"].count, 1);
    }

    #[test]
    fn unknown_name_has_no_entry_until_tallied() {
        let stats = StatsCollector::new();
        assert!(stats.get_summary().names.is_empty());
    }

    #[test]
    fn rate_is_zero_before_any_snapshot() {
        let stats = StatsCollector::new();
        stats.tally("x");
        let summary = stats.get_summary();
        assert_eq!(summary.names["x"].rate_per_second, 0.0);
    }

    #[tokio::test]
    async fn rate_reflects_growth_since_last_snapshot() {
        let stats = StatsCollector::new();
        stats.tally("x");
        stats.snapshot();
        for _ in 0..10 {
            stats.tally("x");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        let summary = stats.get_summary();
        assert_eq!(summary.names["x"].count, 11);
        assert!(summary.names["x"].rate_per_second > 0.0);
    }
}
