// plc-logtrace - core/pipeline.rs
//
// Batch-concurrent parsing. Lines are split into fixed-size batches and
// handed to a rayon thread pool; each batch is parsed independently and
// results are reassembled in their original file order (not
// worker-completion order) before a single chronology check and
// conditional sort runs over the whole file.
//
// Reassembling in input order, rather than completion order, is a
// deliberate choice: it guarantees that parsing the same file under 1,
// N, or "process" workers produces byte-identical entries, matching the
// mode-independence invariant this engine promises callers (see
// SPEC_FULL.md §8, invariant 6, and DESIGN.md for why this departs from
// the as-completed reassembly the original reference used).

use crate::core::model::{LogEntry, ParseError};
use crate::core::parser::generic::{self, LineFormat};
use crate::core::{intern, model::ProgressEvent};
use crate::util::constants;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// Splits `lines` into fixed-size batches, parses each batch against
/// `fmt` in parallel, and reassembles the results in original order.
pub fn parse_lines_concurrent(
    fmt: &dyn LineFormat,
    interner: &intern::Interner,
    lines: &[String],
    workers: usize,
    use_processes: bool,
) -> (Vec<LogEntry>, Vec<ParseError>) {
    let batch_size = if use_processes {
        constants::LINES_PER_BATCH_PROCESSES
    } else {
        constants::LINES_PER_BATCH_THREADS
    };

    let pool = build_pool(workers);

    let batches: Vec<&[String]> = lines.chunks(batch_size).collect();

    let batch_results: Vec<(Vec<LogEntry>, Vec<ParseError>)> = pool.install(|| {
        batches
            .into_par_iter()
            .enumerate()
            .map(|(batch_idx, batch)| parse_batch(fmt, interner, batch, batch_idx * batch_size))
            .collect()
    });

    let mut entries = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();
    let mut last_ts = None;
    let mut out_of_order = false;

    for (batch_entries, batch_errors) in batch_results {
        for entry in batch_entries {
            if let Some(prev) = last_ts {
                if entry.timestamp < prev {
                    out_of_order = true;
                }
            }
            last_ts = Some(entry.timestamp);
            entries.push(entry);
        }
        errors.extend(batch_errors);
    }

    if out_of_order {
        entries.sort_by_key(|e| e.timestamp);
    }

    (entries, errors)
}

fn parse_batch(
    fmt: &dyn LineFormat,
    interner: &intern::Interner,
    batch: &[String],
    line_offset: usize,
) -> (Vec<LogEntry>, Vec<ParseError>) {
    let mut entries = Vec::with_capacity(batch.len());
    let mut errors = Vec::new();
    for (i, line) in batch.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match generic::parse_line(fmt, interner, line) {
            Ok(entry) => entries.push(entry),
            Err(reason) => errors.push(ParseError::line(
                (line_offset + i + 1) as u64,
                line.clone(),
                reason,
            )),
        }
    }
    (entries, errors)
}

fn build_pool(workers: usize) -> rayon::ThreadPool {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if workers > 0 {
        builder = builder.num_threads(workers);
    }
    builder
        .build()
        .expect("failed to build worker pool")
}

// =============================================================================
// Multi-file cancellable sessions with progress reporting
// =============================================================================

/// Handle for a multi-file parsing session running on a background
/// thread. A single-shot `Arc<AtomicBool>` cancel flag ceases submission
/// of new files and discards in-flight results; no partial result is
/// emitted for a cancelled file.
pub struct BatchSession {
    progress_rx: mpsc::Receiver<ProgressEvent>,
    cancel_flag: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<Vec<(PathBuf, crate::core::model::ParseResult)>>>,
}

impl BatchSession {
    /// Spawns a background thread that parses `files` one at a time
    /// (the files themselves are already internally parallel via
    /// `parse`), emitting a `ProgressEvent` pair per file.
    pub fn start(
        files: Vec<PathBuf>,
        parser: Arc<dyn crate::core::parser::traits::Parser>,
        workers: usize,
        use_processes: bool,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_clone = Arc::clone(&cancel);

        let handle = std::thread::spawn(move || {
            let total = files.len();
            let mut results = Vec::with_capacity(total);
            for (index, path) in files.into_iter().enumerate() {
                if cancel_clone.load(Ordering::SeqCst) {
                    let _ = tx.send(ProgressEvent::Cancelled);
                    return results;
                }
                let _ = tx.send(ProgressEvent::FileStarted {
                    index,
                    total,
                    path: path.clone(),
                });
                let result = parser.parse(&path, workers, use_processes);
                let _ = tx.send(ProgressEvent::FileCompleted {
                    index,
                    total,
                    path: path.clone(),
                    entries: result.data.as_ref().map(|d| d.entries.len()).unwrap_or(0),
                    errors: result.errors.len(),
                });
                results.push((path, result));
            }
            results
        });

        Self {
            progress_rx: rx,
            cancel_flag: cancel,
            handle: Some(handle),
        }
    }

    /// Requests cancellation. Already-completed files keep their
    /// results; the file in flight when this is called still finishes
    /// (workers are not preemptible mid-line), but no further files are
    /// started.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Polls for pending progress events without blocking.
    pub fn poll_progress(&self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.progress_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Blocks until the session completes and returns per-file results.
    pub fn join(mut self) -> Vec<(PathBuf, crate::core::model::ParseResult)> {
        self.handle.take().map(|h| h.join().unwrap_or_default()).unwrap_or_default()
    }
}
