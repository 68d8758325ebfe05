// plc-logtrace - core/chunk_manager.rs
//
// Binds a file path + detected parser + ChunkedParsedLog together and
// supplies the store's loader: prefer a parser's optimized
// `parse_time_window` when available, otherwise fall back to a full
// parse-then-filter (documented as inefficient — see generic::
// parse_time_window_default).

use crate::core::chunk::ChunkedParsedLog;
use crate::core::model::{LogEntry, TimeChunk, Timestamp};
use crate::core::parser::traits::Parser;
use chrono::Duration;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn load_chunk(parser: &dyn Parser, path: &Path, start: Timestamp, end: Timestamp) -> Result<TimeChunk, String> {
    let result = parser.parse_time_window(path, start, end);
    match result.data {
        Some(data) => Ok(TimeChunk::from_entries(start, end, data.entries)),
        None => {
            if let Some(first_error) = result.errors.first() {
                tracing::warn!(path = %path.display(), reason = %first_error.reason, "chunk load produced no data");
            }
            Ok(TimeChunk::empty(start, end))
        }
    }
}

pub struct ChunkManager {
    path: PathBuf,
    parser: Arc<dyn Parser>,
    store: ChunkedParsedLog,
    prefetch_chunks_ahead: f64,
}

impl ChunkManager {
    pub fn new(
        path: PathBuf,
        parser: Arc<dyn Parser>,
        full_time_range: (Timestamp, Timestamp),
        chunk_duration_seconds: f64,
        max_resident_chunks: usize,
    ) -> Self {
        Self {
            path,
            parser,
            store: ChunkedParsedLog::new(full_time_range, chunk_duration_seconds, max_resident_chunks),
            prefetch_chunks_ahead: crate::util::constants::DEFAULT_PREFETCH_CHUNKS_AHEAD,
        }
    }

    pub fn get_entries_in_range(&mut self, start: Timestamp, end: Timestamp) -> Vec<LogEntry> {
        let path = self.path.clone();
        let parser = Arc::clone(&self.parser);
        let entries = self
            .store
            .get_entries_in_range(start, end, |s, e| load_chunk(parser.as_ref(), &path, s, e));

        if self.prefetch_chunks_ahead > 0.0 {
            self.run_prefetch(start, end);
        }

        entries
    }

    fn run_prefetch(&mut self, start: Timestamp, end: Timestamp) {
        let (full_start, full_end) = self.store.full_time_range();
        let query_span = end - start;
        let lookahead = Duration::milliseconds(
            (query_span.num_milliseconds() as f64 * self.prefetch_chunks_ahead) as i64,
        );
        let prefetch_start = (start - lookahead).max(full_start);
        let prefetch_end = (end + lookahead).min(full_end);

        let path = self.path.clone();
        let parser = Arc::clone(&self.parser);
        self.store
            .prefetch_chunks(prefetch_start, prefetch_end, |s, e| load_chunk(parser.as_ref(), &path, s, e));
    }

    pub fn clear_cache(&mut self) {
        self.store.clear_cache();
    }

    pub fn full_time_range(&self) -> (Timestamp, Timestamp) {
        self.store.full_time_range()
    }

    /// Every signal key seen across every chunk loaded so far, including
    /// chunks since evicted from residency.
    pub fn all_signals(&self) -> &std::collections::HashSet<String> {
        self.store.all_signals()
    }

    /// Every device id seen across every chunk loaded so far, including
    /// chunks since evicted from residency.
    pub fn all_devices(&self) -> &std::collections::HashSet<String> {
        self.store.all_devices()
    }

    /// Total entry count across every chunk loaded so far. Monotonically
    /// increasing.
    pub fn total_entry_count(&self) -> usize {
        self.store.total_entry_count()
    }
}
