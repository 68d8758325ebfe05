// plc-logtrace - util/constants.rs
//
// Single source of truth for named constants, limits, and defaults.
// Rule 11: explicit named-constant bounds instead of magic numbers
// scattered through the engine.

// =============================================================================
// Application metadata
// =============================================================================

pub const APP_NAME: &str = "plc-logtrace";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Lexical / parsing limits
// =============================================================================

/// Read buffer size for streaming file reads.
pub const READ_BUFFER_BYTES: usize = 1024 * 1024; // 1 MiB

/// Number of lines flushed from the streaming path into one batch.
pub const STREAM_FLUSH_BATCH: usize = 2_000;

/// Lines submitted to one worker batch when `use_processes` is false.
pub const LINES_PER_BATCH_THREADS: usize = 20_000;

/// Lines submitted to one worker batch when `use_processes` is requested.
/// This implementation routes both modes through the same thread pool
/// (see DESIGN.md), but still honors the larger batch-size knob the
/// process tier calls for.
pub const LINES_PER_BATCH_PROCESSES: usize = 50_000;

/// Number of non-blank sample lines `can_parse` inspects for most parsers.
pub const CAN_PARSE_SAMPLE_LINES: usize = 5;

/// Number of non-blank sample lines `can_parse` inspects for `mcs_log`,
/// whose action-header signature needs a slightly larger sample to reach
/// a confident match rate.
pub const CAN_PARSE_SAMPLE_LINES_MCS: usize = 10;

/// Minimum fraction of sampled lines that must match for `can_parse` to
/// accept a file.
pub const CAN_PARSE_MIN_MATCH_RATE: f64 = 0.6;

/// Maximum number of parse errors recorded per file before suppression.
pub const MAX_PARSE_ERRORS_PER_FILE: usize = 1_000;

/// Heuristic used by `parse_time_window` implementations that stream and
/// early-terminate: stop after this many consecutive lines are seen past
/// the requested window (assumes chronological input).
pub const MAX_CONSECUTIVE_OUT_OF_RANGE: usize = 1_000;

// =============================================================================
// Worker pool defaults
// =============================================================================

/// 0 = auto-detect (use available CPU cores).
pub const DEFAULT_WORKER_COUNT: usize = 0;

// =============================================================================
// Chunked store defaults
// =============================================================================

pub const DEFAULT_CHUNK_DURATION_SECONDS: f64 = 300.0;
pub const DEFAULT_MAX_RESIDENT_CHUNKS: usize = 16;

/// How many chunk-durations of lookahead/lookbehind the chunk manager
/// prefetches around a query, scaled by the query's own duration.
pub const DEFAULT_PREFETCH_CHUNKS_AHEAD: f64 = 1.0;

// =============================================================================
// Logging
// =============================================================================

pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

pub const CONFIG_FILE_NAME: &str = "logtrace.toml";
