// plc-logtrace - core/parser/mcs_log.rs
//
// `TS [ACTION=CommandID, CarrierID] [Key=Value], [Key2=Value2], ...`
// or the simplified single-parameter header `TS [ACTION=CarrierID] [Key=Value]...`
//
// Example: 2025-12-05 00:00:36.322 [UPDATE=336182, BBADFB0397] [CurrentLocation=B1ACNV13301-120]
// Example: 2025-12-09 00:00:01.443 [UPDATE=SDADTN490165] [CarrierLoc=B1ACNV13301-108]
//
// One input line expands into several entries: always `_Action`, an
// optional `_CommandID` (only present in the two-parameter header), and
// one entry per `[Key=Value]` pair that follows. This defeats per-line
// worker parallelism, so `parse` always runs single-threaded regardless
// of the `workers` argument — mirroring the generic pipeline's own
// multi-entry carve-out.
//
// Lines that don't match the header at all are silently skipped: no
// `ParseError` is recorded for them, matching the reference's
// "line didn't match expected format, continue" behavior.

use crate::core::intern::Interner;
use crate::core::lexical::fast_timestamp;
use crate::core::model::{LogEntry, ParseError, ParseResult, ParsedLog, SignalType, Timestamp, Value};
use crate::core::parser::generic::read_lines;
use crate::core::parser::traits::Parser;
use crate::util::constants;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const BOOLEAN_KEYS: &[&str] = &[
    "IsBoost",
    "IsMultiJob",
    "IsMultipleDestination",
    "IsLocationGroupOrder",
    "IsExecuteCommand",
];

const INTEGER_KEYS: &[&str] = &["Priority", "AltCount", "AltCount2", "WaitCount", "CirculationCount"];

const STATE_KEYS: &[&str] = &[
    "TransferState",
    "TransferState2",
    "TransferAbnormalState",
    "TransferAbnormalState2",
    "ResultCode",
    "ResultCode2",
    "CommandType",
];

fn normalize_signal_name(key: &str) -> &str {
    match key {
        "CarrierLoc" | "CarrierLocation" => "CurrentLocation",
        other => other,
    }
}

fn infer_type_for_key(key: &str, value: &str) -> SignalType {
    if BOOLEAN_KEYS.contains(&key) {
        return SignalType::Boolean;
    }
    if INTEGER_KEYS.contains(&key) {
        return SignalType::Integer;
    }
    if STATE_KEYS.contains(&key) {
        return SignalType::String;
    }
    let upper = value.to_ascii_uppercase();
    if upper == "TRUE" || upper == "FALSE" {
        return SignalType::Boolean;
    }
    if value.parse::<i64>().is_ok() {
        return SignalType::Integer;
    }
    SignalType::String
}

fn value_for_type(value: &str, signal_type: SignalType) -> Value {
    match signal_type {
        SignalType::Boolean => {
            let upper = value.to_ascii_uppercase();
            Value::Boolean(matches!(upper.as_str(), "TRUE" | "1" | "YES" | "ON"))
        }
        SignalType::Integer => match value.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Text(value.to_string()),
        },
        _ => Value::Text(value.to_string()),
    }
}

struct LineEntry {
    signal_name: String,
    timestamp: Timestamp,
    value: Value,
    signal_type: SignalType,
}

pub struct McsLogParser {
    line_re: Regex,
    kv_pair_re: Regex,
}

impl McsLogParser {
    pub fn new() -> Self {
        Self {
            line_re: Regex::new(
                r"^(?P<ts>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d+)\s+\[(?P<action>ADD|UPDATE|REMOVE)=(?P<first_id>[^,\]]+)(?:,\s*(?P<second_id>[^\]]+))?\]\s*(?P<kvpairs>.*)?$",
            )
            .unwrap(),
            kv_pair_re: Regex::new(r"\[([^=\]]+)=([^\]]*)\]").unwrap(),
        }
    }

    /// Parses one line into `(device_id, entries)`. Returns `None` if the
    /// line doesn't match the header at all, or the timestamp is invalid.
    fn parse_line_to_entries(&self, line: &str) -> Option<(String, Vec<LineEntry>)> {
        let caps = self.line_re.captures(line)?;
        let ts_str = caps.name("ts")?.as_str();
        let timestamp = fast_timestamp(ts_str)?;
        let action = caps.name("action")?.as_str();
        let first_id = caps.name("first_id")?.as_str().trim();
        let second_id = caps.name("second_id").map(|m| m.as_str().trim());
        let kvpairs = caps.name("kvpairs").map(|m| m.as_str()).unwrap_or("");

        let (command_id, carrier_id) = match second_id {
            Some(second) => (Some(first_id), second),
            None => (None, first_id),
        };

        let mut entries = Vec::new();
        entries.push(LineEntry {
            signal_name: "_Action".to_string(),
            timestamp,
            value: Value::Text(action.to_string()),
            signal_type: SignalType::String,
        });

        if let Some(command_id) = command_id {
            if !command_id.is_empty() {
                entries.push(LineEntry {
                    signal_name: "_CommandID".to_string(),
                    timestamp,
                    value: Value::Text(command_id.to_string()),
                    signal_type: SignalType::String,
                });
            }
        }

        for caps in self.kv_pair_re.captures_iter(kvpairs) {
            let key = caps.get(1)?.as_str().trim();
            let value = caps.get(2)?.as_str().trim();
            if key.is_empty() {
                continue;
            }
            let key = normalize_signal_name(key);
            if value.is_empty() || value == "None" {
                continue;
            }
            let signal_type = infer_type_for_key(key, value);
            entries.push(LineEntry {
                signal_name: key.to_string(),
                timestamp,
                value: value_for_type(value, signal_type),
                signal_type,
            });
        }

        Some((carrier_id.to_string(), entries))
    }
}

impl Default for McsLogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for McsLogParser {
    fn name(&self) -> &'static str {
        "mcs_log"
    }

    fn can_parse(&self, path: &Path) -> bool {
        let lines = match read_lines(path) {
            Ok(l) => l,
            Err(_) => return false,
        };
        let mut checked = 0usize;
        let mut matched = 0usize;
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            if checked >= constants::CAN_PARSE_SAMPLE_LINES_MCS {
                break;
            }
            checked += 1;
            if self.line_re.is_match(line) {
                matched += 1;
            }
        }
        checked > 0 && (matched as f64 / checked as f64) >= constants::CAN_PARSE_MIN_MATCH_RATE
    }

    fn parse(&self, path: &Path, _workers: usize, _use_processes: bool) -> ParseResult {
        let start = std::time::Instant::now();
        let lines = match read_lines(path) {
            Ok(l) => l,
            Err(e) => {
                return ParseResult::failed(
                    ParseError::whole(format!("failed to read file: {e}")).with_file(path),
                )
            }
        };

        let interner = Interner::new();
        let mut entries = Vec::new();
        let mut errors = Vec::new();
        let mut last_ts: Option<Timestamp> = None;
        let mut out_of_order = false;

        for line in lines.iter() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some((device_id, line_entries)) = self.parse_line_to_entries(trimmed) else {
                continue;
            };
            if line_entries.is_empty() {
                continue;
            }
            let device_sym = interner.intern(&device_id);
            for e in line_entries {
                if let Some(prev) = last_ts {
                    if e.timestamp < prev {
                        out_of_order = true;
                    }
                }
                last_ts = Some(e.timestamp);
                entries.push(LogEntry {
                    device_id: device_sym.clone(),
                    signal_name: interner.intern(&e.signal_name),
                    timestamp: e.timestamp,
                    value: e.value,
                    signal_type: e.signal_type,
                });
            }
        }

        if out_of_order {
            entries.sort_by_key(|e| e.timestamp);
        }

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

        errors.truncate(constants::MAX_PARSE_ERRORS_PER_FILE);
        ParseResult {
            data: Some(ParsedLog::from_entries(entries)),
            errors,
            processing_time_seconds: Some(start.elapsed().as_secs_f64()),
        }
    }

    fn parse_streaming<'a>(&'a self, path: &Path) -> Box<dyn Iterator<Item = LogEntry> + 'a> {
        let lines = read_lines(path).unwrap_or_default();
        let interner = Interner::new();
        Box::new(lines.into_iter().filter(|l| !l.trim().is_empty()).flat_map(move |line| {
            let Some((device_id, line_entries)) = self.parse_line_to_entries(line.trim()) else {
                return Vec::new().into_iter();
            };
            let device_sym = interner.intern(&device_id);
            let out: Vec<LogEntry> = line_entries
                .into_iter()
                .map(|e| LogEntry {
                    device_id: device_sym.clone(),
                    signal_name: interner.intern(&e.signal_name),
                    timestamp: e.timestamp,
                    value: e.value,
                    signal_type: e.signal_type,
                })
                .collect();
            out.into_iter()
        }))
    }

    fn parse_time_window(&self, path: &Path, start: Timestamp, end: Timestamp) -> ParseResult {
        if start == end {
            let mut log = ParsedLog::from_entries(Vec::new());
            log.time_range = Some((start, end));
            return ParseResult {
                data: Some(log),
                errors: Vec::new(),
                processing_time_seconds: Some(0.0),
            };
        }
        let lines = match read_lines(path) {
            Ok(l) => l,
            Err(e) => {
                return ParseResult::failed(
                    ParseError::whole(format!("failed to read file: {e}")).with_file(path),
                )
            }
        };
        let interner = Interner::new();
        let mut entries = Vec::new();
        let errors = Vec::new();
        let mut seen_start = false;
        let mut consecutive_out_of_range = 0usize;

        for line in lines.iter() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Some((device_id, line_entries)) = self.parse_line_to_entries(trimmed) else {
                continue;
            };
            let Some(first) = line_entries.first() else {
                continue;
            };
            if first.timestamp < start {
                consecutive_out_of_range = 0;
                continue;
            }
            if first.timestamp >= end {
                consecutive_out_of_range += 1;
                if seen_start && consecutive_out_of_range > constants::MAX_CONSECUTIVE_OUT_OF_RANGE {
                    break;
                }
                continue;
            }
            seen_start = true;
            consecutive_out_of_range = 0;
            let device_sym = interner.intern(&device_id);
            for e in line_entries {
                entries.push(LogEntry {
                    device_id: device_sym.clone(),
                    signal_name: interner.intern(&e.signal_name),
                    timestamp: e.timestamp,
                    value: e.value,
                    signal_type: e.signal_type,
                });
            }
        }

        ParseResult {
            data: Some(ParsedLog::from_entries(entries)),
            errors,
            processing_time_seconds: None,
        }
    }
}

static DEFAULT_INSTANCE: OnceLock<McsLogParser> = OnceLock::new();

/// Returns the process-wide default instance, for callers that just want
/// a quick one-off parse without constructing their own.
pub fn shared() -> &'static McsLogParser {
    DEFAULT_INSTANCE.get_or_init(McsLogParser::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_parameter_header_emits_action_and_command_id() {
        let parser = McsLogParser::new();
        let line = "2025-12-05 00:00:36.322 [UPDATE=336182, BBADFB0397] [CurrentLocation=B1ACNV13301-120]";
        let (device_id, entries) = parser.parse_line_to_entries(line).unwrap();
        assert_eq!(device_id, "BBADFB0397");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].signal_name, "_Action");
        assert_eq!(entries[0].value, Value::Text("UPDATE".to_string()));
        assert_eq!(entries[1].signal_name, "_CommandID");
        assert_eq!(entries[1].value, Value::Text("336182".to_string()));
        assert_eq!(entries[2].signal_name, "CurrentLocation");
    }

    #[test]
    fn simplified_header_has_no_command_id_and_normalizes_alias() {
        let parser = McsLogParser::new();
        let line = "2025-12-09 00:00:01.443 [UPDATE=SDADTN490165] [CarrierLoc=B1ACNV13301-108]";
        let (device_id, entries) = parser.parse_line_to_entries(line).unwrap();
        assert_eq!(device_id, "SDADTN490165");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].signal_name, "_Action");
        assert_eq!(entries[1].signal_name, "CurrentLocation");
    }

    #[test]
    fn empty_and_none_valued_pairs_are_skipped() {
        let parser = McsLogParser::new();
        let line = "2025-12-09 00:00:01.443 [ADD=SDADTN490140] [CarrierID=SDADTN490140], [Notes=None]";
        let (_, entries) = parser.parse_line_to_entries(line).unwrap();
        assert!(entries.iter().all(|e| e.signal_name != "Notes"));
    }

    #[test]
    fn unmatched_line_returns_none() {
        let parser = McsLogParser::new();
        assert!(parser.parse_line_to_entries("not an mcs line at all").is_none());
    }

    #[test]
    fn parse_time_window_with_equal_bounds_returns_empty_range() {
        let parser = McsLogParser::new();
        let t = chrono::Utc::now();
        let result = parser.parse_time_window(Path::new("/nonexistent"), t, t);
        let data = result.data.unwrap();
        assert!(data.entries.is_empty());
        assert_eq!(data.time_range, Some((t, t)));
        assert!(result.errors.is_empty());
    }
}
