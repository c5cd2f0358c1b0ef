use crate::config::MonitorConfig;
use ed_dedupe::DuplicateCache;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct MonitorState {
    pub pool: PgPool,
    pub dedupe: Arc<DuplicateCache>,
    pub config: Arc<MonitorConfig>,
}

impl MonitorState {
    pub fn new(pool: PgPool, config: MonitorConfig) -> Self {
        let dedupe = Arc::new(DuplicateCache::new(
            Duration::from_secs(config.duplicate_window_minutes * 60),
            config.duplicate_max_entries,
        ));
        MonitorState {
            pool,
            dedupe,
            config: Arc::new(config),
        }
    }
}
