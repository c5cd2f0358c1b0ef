use crate::config::RelayConfig;
use crate::nonce::Nonce;
use ed_bus::Bus;
use ed_dedupe::DuplicateCache;
use ed_stats::StatsCollector;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct RelayState {
    pub bus: Bus,
    pub dedupe: Arc<DuplicateCache>,
    pub stats: Arc<StatsCollector>,
    pub nonce: Arc<Nonce>,
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        let dedupe = Arc::new(DuplicateCache::new(
            Duration::from_secs(config.duplicate_window_minutes * 60),
            config.duplicate_max_entries,
        ));
        let nonce = Arc::new(Nonce::new(Duration::from_secs(config.nonce_rotation_hours * 3600)));
        let bus = Bus::with_capacity(config.bus_capacity);
        RelayState {
            bus,
            dedupe,
            stats: Arc::new(StatsCollector::new()),
            nonce,
            config: Arc::new(config),
        }
    }
}
