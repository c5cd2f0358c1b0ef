use crate::config::BouncerConfig;
use crate::journal::Journal;
use std::sync::Arc;

#[derive(Clone)]
pub struct BouncerState {
    pub journal: Arc<Journal>,
    pub config: Arc<BouncerConfig>,
}

impl BouncerState {
    pub fn new(journal: Journal, config: BouncerConfig) -> Self {
        BouncerState {
            journal: Arc::new(journal),
            config: Arc::new(config),
        }
    }

    /// Approximate queue size on disk, used to decide whether to reject new
    /// uploads with 503 (spec: "Bouncer blocks POSTs with 503 when disk is
    /// full"). `queue_dir`'s total file size is the simplest faithful proxy
    /// for "disk full" without shelling out to a filesystem-statvfs crate
    /// the teacher doesn't otherwise depend on.
    pub fn queue_bytes_on_disk(&self) -> u64 {
        let mut total = 0u64;
        if let Ok(read_dir) = std::fs::read_dir(&self.config.queue_dir) {
            for entry in read_dir.flatten() {
                if let Ok(meta) = entry.metadata() {
                    total += meta.len();
                }
            }
        }
        total
    }

    pub fn is_over_watermark(&self) -> bool {
        self.queue_bytes_on_disk() >= self.config.disk_watermark_bytes
    }
}
