use crate::config::GatewayConfig;
use ed_bus::Bus;
use ed_dedupe::DuplicateCache;
use ed_schema::SchemaRegistry;
use ed_stats::StatsCollector;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct GatewayState {
    pub schemas: Arc<SchemaRegistry>,
    pub dedupe: Arc<DuplicateCache>,
    pub stats: Arc<StatsCollector>,
    pub bus: Bus,
    pub config: Arc<GatewayConfig>,
}

impl GatewayState {
    pub fn new(schemas: SchemaRegistry, config: GatewayConfig) -> Self {
        let dedupe = DuplicateCache::new(
            Duration::from_secs(config.duplicate_window_minutes * 60),
            config.duplicate_max_entries,
        );
        let bus = Bus::with_capacity(config.bus_capacity);
        GatewayState {
            schemas: Arc::new(schemas),
            dedupe: Arc::new(dedupe),
            stats: Arc::new(StatsCollector::new()),
            bus,
            config: Arc::new(config),
        }
    }
}
