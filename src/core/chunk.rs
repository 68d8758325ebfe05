// plc-logtrace - core/chunk.rs
//
// ChunkedParsedLog: a bounded-memory view over a file's full time range,
// backed by time-aligned TimeChunks loaded on demand through a caller-
// supplied loader callback and held in a hand-rolled LRU (the reference
// implementation hand-rolls its own OrderedDict-based LRU too; no `lru`
// crate appears anywhere in this corpus's dependency stacks).
//
// Caller-synchronized: a `ChunkedParsedLog` is not `Sync` by itself (no
// internal locking); a `ChunkManager` wrapping one for concurrent access
// would need its own external lock, per §4.9's concurrency note.

use crate::core::model::{LogEntry, TimeChunk, Timestamp};
use chrono::Duration;
use std::collections::{HashMap, HashSet};

/// Result of a chunk-load attempt, supplied by the caller's loader
/// callback.
pub type LoadResult = Result<TimeChunk, String>;

struct Resident {
    chunk: TimeChunk,
    last_used: u64,
}

/// A bounded-memory, chunk-backed view over `[full_time_range.0,
/// full_time_range.1]`. Entries are fetched lazily per time window and
/// evicted least-recently-used once more than `max_resident_chunks`
/// chunks are held.
pub struct ChunkedParsedLog {
    full_start: Timestamp,
    full_end: Timestamp,
    chunk_duration: Duration,
    max_resident_chunks: usize,
    resident: HashMap<Timestamp, Resident>,
    tick: u64,
    /// Global tallies, accumulated monotonically as chunks are first
    /// loaded. Unlike `resident`, these never shrink on eviction — they
    /// track the full inventory seen so far, not what's currently cached.
    all_signals: HashSet<String>,
    all_devices: HashSet<String>,
    total_entry_count: usize,
}

impl ChunkedParsedLog {
    pub fn new(full_time_range: (Timestamp, Timestamp), chunk_duration_seconds: f64, max_resident_chunks: usize) -> Self {
        Self {
            full_start: full_time_range.0,
            full_end: full_time_range.1,
            chunk_duration: Duration::milliseconds((chunk_duration_seconds * 1000.0) as i64),
            max_resident_chunks: max_resident_chunks.max(1),
            resident: HashMap::new(),
            tick: 0,
            all_signals: HashSet::new(),
            all_devices: HashSet::new(),
            total_entry_count: 0,
        }
    }

    pub fn full_time_range(&self) -> (Timestamp, Timestamp) {
        (self.full_start, self.full_end)
    }

    /// Every signal key (`device_id::signal_name`) seen across every
    /// chunk ever loaded, including chunks since evicted.
    pub fn all_signals(&self) -> &HashSet<String> {
        &self.all_signals
    }

    /// Every device id seen across every chunk ever loaded, including
    /// chunks since evicted.
    pub fn all_devices(&self) -> &HashSet<String> {
        &self.all_devices
    }

    /// Total entry count across every chunk ever loaded. Monotonically
    /// increasing: eviction does not decrement it, since it tracks
    /// entries seen, not entries currently resident.
    pub fn total_entry_count(&self) -> usize {
        self.total_entry_count
    }

    /// The aligned chunk key covering `t`: `full_start + floor((t -
    /// full_start) / chunk_duration) * chunk_duration`.
    pub fn chunk_key(&self, t: Timestamp) -> Timestamp {
        let elapsed_ms = (t - self.full_start).num_milliseconds();
        let dur_ms = self.chunk_duration.num_milliseconds().max(1);
        let aligned_ms = elapsed_ms.div_euclid(dur_ms) * dur_ms;
        self.full_start + Duration::milliseconds(aligned_ms)
    }

    /// Every chunk key whose `[key, key + chunk_duration)` window
    /// overlaps `[start, end)`.
    pub fn overlapping_chunks(&self, start: Timestamp, end: Timestamp) -> Vec<Timestamp> {
        let mut keys = Vec::new();
        let mut key = self.chunk_key(start);
        loop {
            if key > end {
                break;
            }
            let chunk_end = key + self.chunk_duration;
            if chunk_end > start {
                keys.push(key);
            }
            if key > self.full_end {
                break;
            }
            key = key + self.chunk_duration;
        }
        keys
    }

    fn touch(&mut self, key: Timestamp) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(r) = self.resident.get_mut(&key) {
            r.last_used = tick;
        }
    }

    fn evict_if_over_capacity(&mut self) {
        while self.resident.len() > self.max_resident_chunks {
            if let Some((&oldest_key, _)) = self.resident.iter().min_by_key(|(_, r)| r.last_used) {
                tracing::debug!(chunk_key = %oldest_key, "evicting least-recently-used chunk");
                self.resident.remove(&oldest_key);
            } else {
                break;
            }
        }
    }

    /// Ensures the chunk at `key` is resident, invoking `loader` only on
    /// a miss. Returns `false` (chunk skipped) if the loader errors.
    pub fn ensure_chunk_loaded<F: FnMut(Timestamp, Timestamp) -> LoadResult>(
        &mut self,
        key: Timestamp,
        mut loader: F,
    ) -> bool {
        if self.resident.contains_key(&key) {
            self.touch(key);
            return true;
        }
        let chunk_end = (key + self.chunk_duration).min(self.full_end);
        match loader(key, chunk_end) {
            Ok(chunk) => {
                self.all_signals.extend(chunk.signals.iter().cloned());
                self.all_devices.extend(chunk.devices.iter().cloned());
                self.total_entry_count += chunk.entries.len();

                self.tick += 1;
                let tick = self.tick;
                self.resident.insert(key, Resident { chunk, last_used: tick });
                self.evict_if_over_capacity();
                true
            }
            Err(reason) => {
                tracing::warn!(chunk_key = %key, reason, "chunk loader failed");
                false
            }
        }
    }

    /// Loads every chunk overlapping `[start, end)` and returns their
    /// entries in `[start, end)`, sorted by timestamp.
    pub fn get_entries_in_range<F: FnMut(Timestamp, Timestamp) -> LoadResult>(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        mut loader: F,
    ) -> Vec<LogEntry> {
        let keys = self.overlapping_chunks(start, end);
        let mut entries = Vec::new();
        for key in keys {
            if !self.ensure_chunk_loaded(key, &mut loader) {
                continue;
            }
            if let Some(resident) = self.resident.get(&key) {
                entries.extend(
                    resident
                        .chunk
                        .entries
                        .iter()
                        .filter(|e| e.timestamp >= start && e.timestamp < end)
                        .cloned(),
                );
            }
        }
        entries.sort_by_key(|e| e.timestamp);
        entries
    }

    /// Loads every chunk overlapping `[start, end)` without returning
    /// entries, for warming the cache ahead of an anticipated query.
    pub fn prefetch_chunks<F: FnMut(Timestamp, Timestamp) -> LoadResult>(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        mut loader: F,
    ) {
        for key in self.overlapping_chunks(start, end) {
            self.ensure_chunk_loaded(key, &mut loader);
        }
    }

    /// Drops every resident chunk. `full_time_range` and chunk-alignment
    /// metadata survive.
    pub fn clear_cache(&mut self) {
        self.resident.clear();
    }

    pub fn resident_keys(&self) -> Vec<Timestamp> {
        self.resident.keys().copied().collect()
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet as StdHashSet;

    fn ts(secs: i64) -> Timestamp {
        chrono::Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn loader_for(duration_secs: i64) -> impl FnMut(Timestamp, Timestamp) -> LoadResult {
        move |start, end| {
            let _ = duration_secs;
            Ok(TimeChunk::empty(start, end))
        }
    }

    #[test]
    fn chunk_key_aligns_to_duration_boundaries() {
        let store = ChunkedParsedLog::new((ts(0), ts(1000)), 300.0, 16);
        assert_eq!(store.chunk_key(ts(0)), ts(0));
        assert_eq!(store.chunk_key(ts(299)), ts(0));
        assert_eq!(store.chunk_key(ts(300)), ts(300));
        assert_eq!(store.chunk_key(ts(650)), ts(600));
    }

    #[test]
    fn lru_eviction_matches_scenario_6() {
        let mut store = ChunkedParsedLog::new((ts(0), ts(1200)), 300.0, 2);
        let mut loader = loader_for(300);

        store.get_entries_in_range(ts(0), ts(1), &mut loader); // c0
        store.get_entries_in_range(ts(300), ts(301), &mut loader); // c1
        store.get_entries_in_range(ts(600), ts(601), &mut loader); // c2 -> evicts c0
        store.get_entries_in_range(ts(0), ts(1), &mut loader); // c0 again -> evicts c1

        let resident: StdHashSet<Timestamp> = store.resident_keys().into_iter().collect();
        assert_eq!(resident, StdHashSet::from([ts(600), ts(0)]));
        assert_eq!(store.resident_count(), 2);
    }

    #[test]
    fn clear_cache_drops_residents_but_keeps_range() {
        let mut store = ChunkedParsedLog::new((ts(0), ts(600)), 300.0, 16);
        store.get_entries_in_range(ts(0), ts(1), &mut loader_for(300));
        assert_eq!(store.resident_count(), 1);
        store.clear_cache();
        assert_eq!(store.resident_count(), 0);
        assert_eq!(store.full_time_range(), (ts(0), ts(600)));
    }

    fn entry(device: &str, signal: &str, timestamp: Timestamp) -> LogEntry {
        LogEntry {
            device_id: device.into(),
            signal_name: signal.into(),
            timestamp,
            value: crate::core::model::Value::Boolean(true),
            signal_type: crate::core::model::SignalType::Boolean,
        }
    }

    #[test]
    fn global_tallies_accumulate_monotonically_across_eviction() {
        let mut store = ChunkedParsedLog::new((ts(0), ts(1200)), 300.0, 1);
        let mut loader = |start: Timestamp, end: Timestamp| -> LoadResult {
            let device = if start == ts(0) { "Robot-01" } else { "Robot-02" };
            Ok(TimeChunk::from_entries(start, end, vec![entry(device, "X", start)]))
        };

        store.get_entries_in_range(ts(0), ts(1), &mut loader); // c0: Robot-01
        store.get_entries_in_range(ts(300), ts(301), &mut loader); // c1: Robot-02, evicts c0

        assert_eq!(store.resident_count(), 1);
        assert_eq!(store.total_entry_count(), 2);
        assert!(store.all_devices().contains("Robot-01"));
        assert!(store.all_devices().contains("Robot-02"));
        assert!(store.all_signals().contains("Robot-01::X"));
        assert!(store.all_signals().contains("Robot-02::X"));
    }
}
