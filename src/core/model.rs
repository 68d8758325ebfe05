// plc-logtrace - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no parser
// logic (core depends on std + chrono + serde only).
//
// These types are the shared vocabulary across every layer: parsers
// produce LogEntry, the pipeline produces ParseResult, aggregation
// merges ParseResults, and state reconstruction turns ParsedLog into
// SignalData.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Canonical in-memory form of an interned identifier (device id, signal
/// name). Cheap to clone; equality/hash compare by pointer-backed content.
pub type Symbol = Arc<str>;

pub type Timestamp = DateTime<Utc>;

// =============================================================================
// Signal type / value
// =============================================================================

/// The declared or inferred type of a signal's value.
///
/// `Float` exists for forward compatibility but is never produced by any
/// parser in this crate — the reference data model this is derived from
/// never defines a float variant either, so no code path here emits one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalType {
    Boolean,
    String,
    Integer,
    Float,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalType::Boolean => "Boolean",
            SignalType::String => "String",
            SignalType::Integer => "Integer",
            SignalType::Float => "Float",
        };
        f.write_str(s)
    }
}

/// A parsed signal value, tagged by the `SignalType` it was produced under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn signal_type(&self) -> SignalType {
        match self {
            Value::Boolean(_) => SignalType::Boolean,
            Value::Integer(_) => SignalType::Integer,
            Value::Float(_) => SignalType::Float,
            Value::Text(_) => SignalType::String,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// Log entry
// =============================================================================

/// A single parsed signal event, normalised across all parser formats.
///
/// This is the core data unit that flows through the batch pipeline,
/// aggregation, and signal-state reconstruction.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub device_id: Symbol,
    pub signal_name: Symbol,
    pub timestamp: Timestamp,
    pub value: Value,
    pub signal_type: SignalType,
}

impl LogEntry {
    /// The canonical signal key: `device_id::signal_name`.
    pub fn signal_key(&self) -> String {
        format!("{}::{}", self.device_id, self.signal_name)
    }
}

// =============================================================================
// Parse error (line-level and whole-result diagnostics)
// =============================================================================

/// Diagnostic for one failed line, or a whole-file/whole-result failure
/// when `line_number == 0`.
#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    pub line_number: u64,
    pub content: String,
    pub reason: String,
    pub file_path: Option<PathBuf>,
}

impl ParseError {
    pub fn line(line_number: u64, content: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line_number,
            content: content.into(),
            reason: reason.into(),
            file_path: None,
        }
    }

    /// Whole-file/whole-result error: no single line is implicated.
    pub fn whole(reason: impl Into<String>) -> Self {
        Self {
            line_number: 0,
            content: String::new(),
            reason: reason.into(),
            file_path: None,
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file_path {
            Some(p) if self.line_number > 0 => {
                write!(f, "{} line {}: {}", p.display(), self.line_number, self.reason)
            }
            Some(p) => write!(f, "{}: {}", p.display(), self.reason),
            None if self.line_number > 0 => write!(f, "line {}: {}", self.line_number, self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

// =============================================================================
// Parsed log (aggregate of entries plus derived metadata)
// =============================================================================

/// An aggregate of entries plus derived metadata, invariant-checked at
/// construction: entries are timestamp-sorted, `signals`/`devices` are
/// exactly the sets implied by `entries`, `time_range` is exactly
/// `(min, max)` of the entry timestamps.
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    pub entries: Vec<LogEntry>,
    pub signals: HashSet<String>,
    pub devices: HashSet<String>,
    pub time_range: Option<(Timestamp, Timestamp)>,
}

impl ParsedLog {
    /// Builds a `ParsedLog` from entries, deriving `signals`/`devices`/
    /// `time_range`. Does not sort: callers that cannot guarantee
    /// chronological order should sort before calling this.
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        let mut signals = HashSet::with_capacity(entries.len());
        let mut devices = HashSet::with_capacity(entries.len());
        let mut time_range = None;

        for e in &entries {
            signals.insert(e.signal_key());
            devices.insert(e.device_id.to_string());
            time_range = Some(match time_range {
                None => (e.timestamp, e.timestamp),
                Some((min, max)) => (min.min(e.timestamp), max.max(e.timestamp)),
            });
        }

        Self {
            entries,
            signals,
            devices,
            time_range,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Parse result
// =============================================================================

/// The outcome of parsing one file (or a merged multi-file session).
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub data: Option<ParsedLog>,
    pub errors: Vec<ParseError>,
    pub processing_time_seconds: Option<f64>,
}

impl ParseResult {
    pub fn success(&self) -> bool {
        self.data.is_some()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn failed(error: ParseError) -> Self {
        Self {
            data: None,
            errors: vec![error],
            processing_time_seconds: None,
        }
    }
}

// =============================================================================
// Signal state reconstruction types
// =============================================================================

/// One interval of constant value for one signal: a half-open `[start, end)`
/// window. `start_offset`/`end_offset` are seconds from the owning
/// `SignalData`'s `time_anchor`, precomputed to support binary search over
/// states by elapsed time without re-deriving durations on every query.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalState {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub value: Value,
    pub start_offset: f64,
    pub end_offset: f64,
}

impl SignalState {
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Reconstructed step-function history for one `(device_id, signal_name)`
/// pair.
#[derive(Debug, Clone)]
pub struct SignalData {
    pub device_id: Symbol,
    pub signal_name: Symbol,
    pub key: String,
    pub signal_type: SignalType,
    pub time_anchor: Timestamp,
    /// `None` when states have not yet been computed (lazy mode) or have
    /// been cleared by a consumer. Producers must not clear this while
    /// `pinned` is true.
    pub states: Option<Vec<SignalState>>,
    pub pinned: bool,
}

impl SignalData {
    pub fn has_transitions(&self) -> bool {
        matches!(&self.states, Some(s) if s.len() > 1)
    }

    pub fn display_label(&self) -> String {
        format!("{} -> {}", self.device_id, self.signal_name)
    }

    /// Drops computed states to reclaim memory, unless pinned.
    pub fn clear_states(&mut self) {
        if !self.pinned {
            self.states = None;
        }
    }
}

// =============================================================================
// Chunked time-window storage types
// =============================================================================

/// A time-aligned slab of entries held in the bounded LRU cache of a
/// `ChunkedParsedLog`.
#[derive(Debug, Clone, Default)]
pub struct TimeChunk {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub entries: Vec<LogEntry>,
    pub signals: HashSet<String>,
    pub devices: HashSet<String>,
}

impl TimeChunk {
    pub fn empty(start_time: Timestamp, end_time: Timestamp) -> Self {
        Self {
            start_time,
            end_time,
            entries: Vec::new(),
            signals: HashSet::new(),
            devices: HashSet::new(),
        }
    }

    pub fn from_entries(start_time: Timestamp, end_time: Timestamp, entries: Vec<LogEntry>) -> Self {
        let mut signals = HashSet::with_capacity(entries.len());
        let mut devices = HashSet::with_capacity(entries.len());
        for e in &entries {
            signals.insert(e.signal_key());
            devices.insert(e.device_id.to_string());
        }
        Self {
            start_time,
            end_time,
            entries,
            signals,
            devices,
        }
    }
}

// =============================================================================
// Progress reporting (ambient)
// =============================================================================

/// Progress messages sent from a batch-parsing session to the caller over
/// an `mpsc` channel. Mirrors the abstract "(current_file_index,
/// total_files, file_path)" tuple stream with the concrete shape this
/// implementation uses.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    FileStarted {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    FileCompleted {
        index: usize,
        total: usize,
        path: PathBuf,
        entries: usize,
        errors: usize,
    },
    Cancelled,
}

// =============================================================================
// Engine configuration
// =============================================================================

/// Validated, serde/TOML-driven configuration for engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 0 = auto-detect (use available CPU cores).
    pub worker_count: usize,
    pub use_processes: bool,
    pub chunk_duration_seconds: f64,
    pub max_resident_chunks: usize,
    pub max_parse_errors_per_file: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: crate::util::constants::DEFAULT_WORKER_COUNT,
            use_processes: false,
            chunk_duration_seconds: crate::util::constants::DEFAULT_CHUNK_DURATION_SECONDS,
            max_resident_chunks: crate::util::constants::DEFAULT_MAX_RESIDENT_CHUNKS,
            max_parse_errors_per_file: crate::util::constants::MAX_PARSE_ERRORS_PER_FILE,
        }
    }
}

impl EngineConfig {
    /// Validates range constraints, returning a `ConfigError::ValueOutOfRange`
    /// for the first violation found.
    pub fn validate(&self) -> crate::util::error::Result<()> {
        use crate::util::error::ConfigError;

        if self.chunk_duration_seconds <= 0.0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "chunk_duration_seconds".into(),
                value: self.chunk_duration_seconds.to_string(),
                expected: "> 0.0".into(),
            }
            .into());
        }
        if self.max_resident_chunks == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "max_resident_chunks".into(),
                value: "0".into(),
                expected: ">= 1".into(),
            }
            .into());
        }
        if self.max_parse_errors_per_file == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "max_parse_errors_per_file".into(),
                value: "0".into(),
                expected: ">= 1".into(),
            }
            .into());
        }
        Ok(())
    }
}
