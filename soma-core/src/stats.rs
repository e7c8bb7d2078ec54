//! Per-engine I/O statistics
//!
//! Counting is off until [`IoStats::enable`] is called. Counters are relaxed
//! atomics; they are diagnostics, not synchronization.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters an engine bumps as it works
#[derive(Debug, Default)]
pub struct IoStats {
    enabled: AtomicBool,
    fragments_written: AtomicU64,
    cells_written: AtomicU64,
    bytes_written: AtomicU64,
    arrays_opened: AtomicU64,
    groups_opened: AtomicU64,
    metadata_reads: AtomicU64,
}

/// Point-in-time copy of [`IoStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IoStatsSnapshot {
    pub enabled: bool,
    pub fragments_written: u64,
    pub cells_written: u64,
    pub bytes_written: u64,
    pub arrays_opened: u64,
    pub groups_opened: u64,
    pub metadata_reads: u64,
}

impl IoStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Zero every counter; the enabled flag is unchanged
    pub fn reset(&self) {
        for counter in [
            &self.fragments_written,
            &self.cells_written,
            &self.bytes_written,
            &self.arrays_opened,
            &self.groups_opened,
            &self.metadata_reads,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn bump(&self, counter: &AtomicU64, by: u64) {
        if self.is_enabled() {
            counter.fetch_add(by, Ordering::Relaxed);
        }
    }

    pub fn record_fragment(&self, cells: u64, bytes: u64) {
        self.bump(&self.fragments_written, 1);
        self.bump(&self.cells_written, cells);
        self.bump(&self.bytes_written, bytes);
    }

    pub fn record_array_open(&self) {
        self.bump(&self.arrays_opened, 1);
    }

    pub fn record_group_open(&self) {
        self.bump(&self.groups_opened, 1);
    }

    pub fn record_metadata_read(&self) {
        self.bump(&self.metadata_reads, 1);
    }

    pub fn snapshot(&self) -> IoStatsSnapshot {
        IoStatsSnapshot {
            enabled: self.is_enabled(),
            fragments_written: self.fragments_written.load(Ordering::Relaxed),
            cells_written: self.cells_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            arrays_opened: self.arrays_opened.load(Ordering::Relaxed),
            groups_opened: self.groups_opened.load(Ordering::Relaxed),
            metadata_reads: self.metadata_reads.load(Ordering::Relaxed),
        }
    }

    /// Counters as a JSON object
    #[cfg(feature = "serde")]
    pub fn dump(&self) -> String {
        // A struct of integers and a bool always serializes
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let stats = IoStats::new();
        stats.record_fragment(10, 100);
        assert_eq!(stats.snapshot(), IoStatsSnapshot::default());
    }

    #[test]
    fn test_enable_reset() {
        let stats = IoStats::new();
        stats.enable();
        stats.record_fragment(10, 100);
        stats.record_fragment(5, 40);
        stats.record_metadata_read();

        let snap = stats.snapshot();
        assert_eq!(snap.fragments_written, 2);
        assert_eq!(snap.cells_written, 15);
        assert_eq!(snap.bytes_written, 140);
        assert_eq!(snap.metadata_reads, 1);

        stats.reset();
        assert_eq!(stats.snapshot().cells_written, 0);
        assert!(stats.is_enabled());

        stats.disable();
        stats.record_group_open();
        assert_eq!(stats.snapshot().groups_opened, 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_dump_is_json() {
        let stats = IoStats::new();
        stats.enable();
        stats.record_array_open();
        let value: serde_json::Value = serde_json::from_str(&stats.dump()).unwrap();
        assert_eq!(value["arrays_opened"], 1);
        assert_eq!(value["enabled"], true);
    }
}
