use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters updated by the ingestion loop.
#[derive(Debug, Default)]
pub struct IngestStats {
    packets_received: AtomicU64,
    packets_written: AtomicU64,
    samples_written: AtomicU64,
    decode_errors: AtomicU64,
    shape_errors: AtomicU64,
    empty_polls: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub packets_received: u64,
    pub packets_written: u64,
    pub samples_written: u64,
    pub decode_errors: u64,
    pub shape_errors: u64,
    pub empty_polls: u64,
}

impl StatsSnapshot {
    pub fn dropped(&self) -> u64 {
        self.decode_errors + self.shape_errors
    }
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }
    /// Returns the total number of written packets including this one.
    pub fn record_written(&self, samples: usize) -> u64 {
        self.samples_written
            .fetch_add(samples as u64, Ordering::Relaxed);
        self.packets_written.fetch_add(1, Ordering::Relaxed) + 1
    }
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_shape_error(&self) {
        self.shape_errors.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_written: self.packets_written.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            shape_errors: self.shape_errors.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
        }
    }
}
