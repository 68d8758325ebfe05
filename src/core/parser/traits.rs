// plc-logtrace - core/parser/traits.rs
//
// The parser contract every concrete format implements. Expressed as an
// explicit trait (the duck-typed interface of the reference design) so
// the registry can hold a homogeneous collection of trait objects.

use crate::core::model::{ParseResult, Timestamp};
use std::path::Path;

/// A pluggable log format parser.
pub trait Parser: Send + Sync {
    /// Stable identifier used by the registry and for explicit dispatch.
    fn name(&self) -> &'static str;

    /// Samples the first few non-blank lines of `path` and returns true
    /// if enough of them match this parser's format signature.
    fn can_parse(&self, path: &Path) -> bool;

    /// Parses the full file. `workers > 1` enables the batch pipeline for
    /// parsers that support per-line parallelism; `use_processes` asks
    /// for the process-tier batch-size knob (see DESIGN.md for how this
    /// implementation maps it onto the same thread pool).
    fn parse(&self, path: &Path, workers: usize, use_processes: bool) -> ParseResult;

    /// Streams entries as they are produced, without holding the whole
    /// file's output in memory at once. Lines that fail to parse are
    /// silently skipped, matching each parser's streaming behavior.
    fn parse_streaming<'a>(&'a self, path: &Path) -> Box<dyn Iterator<Item = crate::core::model::LogEntry> + 'a>;

    /// Parses only entries whose timestamp falls in `[start, end)`.
    /// The default implementation (provided by callers, not here, since
    /// it needs a full parse) is to parse fully and filter; parsers that
    /// can stream-and-early-terminate should override this in their own
    /// `impl`.
    fn parse_time_window(&self, path: &Path, start: Timestamp, end: Timestamp) -> ParseResult;
}
