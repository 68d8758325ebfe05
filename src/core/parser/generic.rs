// plc-logtrace - core/parser/generic.rs
//
// Shared machinery for the template/regex-driven parsers (plc_debug,
// plc_tab, csv_signal, default). Each concrete parser supplies a
// `LineFormat` describing its fast path and regex fallback; this module
// runs the common per-line pipeline, batch dispatch, chronology
// detection, and the fallback "parse fully, then filter" time-window
// implementation.
//
// `mcs_log` does not implement `LineFormat` — it expands one input line
// into multiple entries and is written directly against `Parser`.

use crate::core::model::{LogEntry, ParseError, ParseResult, ParsedLog, SignalType, Timestamp};
use crate::core::{intern, lexical, pipeline};
use crate::util::constants;
use regex::Regex;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Raw (unconverted) fields extracted by a fast-path or regex match.
#[derive(Debug, Clone)]
pub struct FastFields {
    pub ts: String,
    pub path: String,
    pub signal: String,
    pub dtype_token: Option<String>,
    pub value: String,
}

/// Format-specific hooks a `LineFormat` implementation must supply.
pub trait LineFormat: Send + Sync {
    fn parser_name(&self) -> &'static str;

    /// Regex used to extract `device_id` from the captured `path` field.
    fn device_id_regex(&self) -> &Regex;

    /// Attempts the indexed-scan hot path. Returning `None` falls
    /// through to the regex.
    fn fast_parse_line(&self, line: &str) -> Option<FastFields>;

    /// Regex fallback with named captures `ts`, `path`, `signal`, `value`,
    /// and optionally `dtype`.
    fn line_regex(&self) -> &Regex;

    /// Maps a declared type token (e.g. `"Boolean"`) to a `SignalType`.
    /// Returns `None` if the token is unrecognized.
    fn type_from_token(&self, token: &str) -> Option<SignalType>;

    /// Whether an undeclared/unrecognized type token falls back to
    /// inference rather than failing the line.
    fn infer_allowed(&self) -> bool;

    /// Whether this format carries a `Float` SignalType. None of this
    /// crate's parsers do (see core::model::SignalType doc comment).
    fn float_enabled(&self) -> bool {
        false
    }
}

fn extract_fields(fmt: &dyn LineFormat, line: &str) -> Option<FastFields> {
    if let Some(fields) = fmt.fast_parse_line(line) {
        return Some(fields);
    }
    let caps = fmt.line_regex().captures(line)?;
    Some(FastFields {
        ts: caps.name("ts")?.as_str().to_string(),
        path: caps.name("path").map(|m| m.as_str().to_string()).unwrap_or_default(),
        signal: caps.name("signal")?.as_str().to_string(),
        dtype_token: caps.name("dtype").map(|m| m.as_str().to_string()),
        value: caps.name("value")?.as_str().to_string(),
    })
}

/// Runs the per-line pipeline (§4.3, steps 1-8) for one line. Returns
/// `Err(reason)` describing why the line failed, for the caller to wrap
/// in a `ParseError`.
pub fn parse_line(
    fmt: &dyn LineFormat,
    interner: &intern::Interner,
    line: &str,
) -> Result<LogEntry, String> {
    let fields = extract_fields(fmt, line).ok_or_else(|| "line does not match format".to_string())?;

    let timestamp = lexical::fast_timestamp(&fields.ts)
        .ok_or_else(|| format!("invalid timestamp '{}'", fields.ts))?;

    let device_id = fmt
        .device_id_regex()
        .captures(&fields.path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| format!("device id not found in '{}'", fields.path))?;

    let declared = fields
        .dtype_token
        .as_deref()
        .and_then(|t| fmt.type_from_token(t));

    if fields.dtype_token.is_some() && declared.is_none() && !fmt.infer_allowed() {
        return Err(format!(
            "unrecognized type token '{}'",
            fields.dtype_token.unwrap_or_default()
        ));
    }

    let value = lexical::parse_value_fast(&fields.value, declared, fmt.infer_allowed(), fmt.float_enabled())
        .ok_or_else(|| format!("invalid value '{}' for declared type", fields.value))?;

    let signal_type = value.signal_type();

    Ok(LogEntry {
        device_id: interner.intern(&device_id),
        signal_name: interner.intern(&fields.signal),
        timestamp,
        value,
        signal_type,
    })
}

/// Reads `path` into UTF-8 lines, tolerating a leading `utf-8-sig` BOM
/// and trailing `\r` (CRLF line endings).
pub fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::with_capacity(constants::READ_BUFFER_BYTES, file);
    let mut lines = Vec::new();
    let mut first = true;
    loop {
        let mut buf = String::new();
        let bytes_read = reader.read_line(&mut buf)?;
        if bytes_read == 0 {
            break;
        }
        if buf.ends_with('\n') {
            buf.pop();
        }
        if buf.ends_with('\r') {
            buf.pop();
        }
        if first {
            first = false;
            if let Some(stripped) = buf.strip_prefix('\u{feff}') {
                buf = stripped.to_string();
            }
        }
        lines.push(buf);
    }
    Ok(lines)
}

/// `can_parse` sampling: accepts a file if at least
/// `constants::CAN_PARSE_MIN_MATCH_RATE` of the first `sample_size`
/// non-blank lines match the fast path or regex.
pub fn sample_can_parse(fmt: &dyn LineFormat, path: &Path, sample_size: usize) -> bool {
    let lines = match read_lines(path) {
        Ok(l) => l,
        Err(_) => return false,
    };
    let mut sampled = 0usize;
    let mut matched = 0usize;
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        if sampled >= sample_size {
            break;
        }
        sampled += 1;
        if extract_fields(fmt, line).is_some() {
            matched += 1;
        }
    }
    if sampled == 0 {
        return false;
    }
    (matched as f64 / sampled as f64) >= constants::CAN_PARSE_MIN_MATCH_RATE
}

/// Full parse of `path` using `fmt`, dispatching to the batch pipeline
/// when `workers > 1`.
pub fn parse_file(fmt: &dyn LineFormat, path: &Path, workers: usize, use_processes: bool) -> ParseResult {
    let start = std::time::Instant::now();
    let lines = match read_lines(path) {
        Ok(l) => l,
        Err(e) => {
            return ParseResult::failed(
                ParseError::whole(format!("failed to read file: {e}")).with_file(path),
            )
        }
    };

    let interner = intern::Interner::new();
    let (entries, errors) = if workers > 1 {
        pipeline::parse_lines_concurrent(fmt, &interner, &lines, workers, use_processes)
    } else {
        parse_lines_single(fmt, &interner, &lines)
    };

    let errors: Vec<ParseError> = errors.into_iter().map(|e| e.with_file(path)).collect();

    if entries.is_empty() {
        let mut errs = errors;
        if errs.is_empty() {
            errs.push(ParseError::whole("no data").with_file(path));
        }
        return ParseResult {
            data: None,
            errors: errs,
            processing_time_seconds: Some(start.elapsed().as_secs_f64()),
        };
    }

    ParseResult {
        data: Some(ParsedLog::from_entries(entries)),
        errors,
        processing_time_seconds: Some(start.elapsed().as_secs_f64()),
    }
}

/// Single-threaded line parse with chronology detection: entries are
/// sorted only if an out-of-order timestamp was actually observed.
pub fn parse_lines_single(
    fmt: &dyn LineFormat,
    interner: &intern::Interner,
    lines: &[String],
) -> (Vec<LogEntry>, Vec<ParseError>) {
    let mut entries = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();
    let mut last_ts: Option<Timestamp> = None;
    let mut out_of_order = false;

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(fmt, interner, line) {
            Ok(entry) => {
                if let Some(prev) = last_ts {
                    if entry.timestamp < prev {
                        out_of_order = true;
                    }
                }
                last_ts = Some(entry.timestamp);
                entries.push(entry);
            }
            Err(reason) => {
                if errors.len() < constants::MAX_PARSE_ERRORS_PER_FILE {
                    errors.push(ParseError::line((idx + 1) as u64, line.clone(), reason));
                }
            }
        }
    }

    if out_of_order {
        entries.sort_by_key(|e| e.timestamp);
    }

    (entries, errors)
}

/// Streaming iterator over `path`'s entries. Lines that fail to parse
/// are silently skipped (matching each format's streaming behavior,
/// distinct from `parse`'s error-accumulating contract).
pub fn parse_file_streaming<'a>(
    fmt: &'a dyn LineFormat,
    path: &Path,
) -> Box<dyn Iterator<Item = LogEntry> + 'a> {
    let lines = read_lines(path).unwrap_or_default();
    let interner = intern::Interner::new();
    Box::new(
        lines
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .filter_map(move |line| parse_line(fmt, &interner, &line).ok()),
    )
}

/// Default `parse_time_window`: parse fully, then filter by timestamp.
/// Documented as inefficient; parsers for which this matters override it
/// with a streaming early-terminating implementation.
pub fn parse_time_window_default(
    fmt: &dyn LineFormat,
    path: &Path,
    start: Timestamp,
    end: Timestamp,
) -> ParseResult {
    if start == end {
        let mut log = ParsedLog::from_entries(Vec::new());
        log.time_range = Some((start, end));
        return ParseResult {
            data: Some(log),
            errors: Vec::new(),
            processing_time_seconds: Some(0.0),
        };
    }
    let full = parse_file(fmt, path, 1, false);
    let Some(data) = full.data else {
        return full;
    };
    let filtered: Vec<LogEntry> = data
        .entries
        .into_iter()
        .filter(|e| e.timestamp >= start && e.timestamp < end)
        .collect();
    ParseResult {
        data: Some(ParsedLog::from_entries(filtered)),
        errors: full.errors,
        processing_time_seconds: full.processing_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::plc_debug::PlcDebugParser;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn parse_time_window_default_with_equal_bounds_returns_empty_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "2024-01-01 10:00:00.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : ON"
        )
        .unwrap();

        let fmt = PlcDebugParser::new();
        let t = chrono::Utc.timestamp_opt(0, 0).unwrap();
        let result = parse_time_window_default(&fmt, file.path(), t, t);
        let data = result.data.unwrap();
        assert!(data.entries.is_empty());
        assert_eq!(data.time_range, Some((t, t)));
        assert!(result.errors.is_empty());
    }
}
