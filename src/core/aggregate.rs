// plc-logtrace - core/aggregate.rs
//
// Merges per-file ParseResults into one combined ParsedLog: entries are
// concatenated then sorted by timestamp, signal/device sets unioned,
// time_range widened, and errors carried through with their file_path
// intact.

use crate::core::model::{ParseError, ParseResult, ParsedLog};
use std::collections::HashSet;
use std::path::PathBuf;

/// Merges `results` (one per input file) into a single `ParseResult`.
/// `processing_time_seconds` is left to the caller to set to the total
/// wall-clock elapsed across the whole session, not summed from inputs.
pub fn merge_parse_results(results: Vec<(PathBuf, ParseResult)>) -> ParseResult {
    let mut all_entries = Vec::new();
    let mut signals = HashSet::new();
    let mut devices = HashSet::new();
    let mut time_range: Option<(crate::core::model::Timestamp, crate::core::model::Timestamp)> = None;
    let mut errors = Vec::new();

    for (path, result) in results {
        match result.data {
            Some(log) => {
                all_entries.extend(log.entries);
                signals.extend(log.signals);
                devices.extend(log.devices);
                if let Some((min, max)) = log.time_range {
                    time_range = Some(match time_range {
                        None => (min, max),
                        Some((cur_min, cur_max)) => (cur_min.min(min), cur_max.max(max)),
                    });
                }
                errors.extend(result.errors);
            }
            None => {
                if result.errors.is_empty() {
                    errors.push(
                        ParseError::whole("Parsing failed with no additional details").with_file(path),
                    );
                } else {
                    errors.extend(result.errors);
                }
            }
        }
    }

    all_entries.sort_by_key(|e| e.timestamp);

    if all_entries.is_empty() {
        return ParseResult {
            data: None,
            errors,
            processing_time_seconds: None,
        };
    }

    ParseResult {
        data: Some(ParsedLog {
            entries: all_entries,
            signals,
            devices,
            time_range,
        }),
        errors,
        processing_time_seconds: None,
    }
}

/// Merges already-built `ParsedLog`s (no error tracking), used when
/// combining chunk-query results rather than whole-file parses.
pub fn merge_parsed_logs(logs: Vec<ParsedLog>) -> ParsedLog {
    let mut all_entries = Vec::new();
    let mut signals = HashSet::new();
    let mut devices = HashSet::new();
    let mut time_range = None;

    for log in logs {
        all_entries.extend(log.entries);
        signals.extend(log.signals);
        devices.extend(log.devices);
        if let Some((min, max)) = log.time_range {
            time_range = Some(match time_range {
                None => (min, max),
                Some((cur_min, cur_max)) => (
                    std::cmp::min(cur_min, min),
                    std::cmp::max(cur_max, max),
                ),
            });
        }
    }

    all_entries.sort_by_key(|e| e.timestamp);
    ParsedLog {
        entries: all_entries,
        signals,
        devices,
        time_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{LogEntry, SignalType, Value};
    use chrono::{TimeZone, Utc};

    fn entry(device: &str, ts: i64, v: i64) -> LogEntry {
        LogEntry {
            device_id: std::sync::Arc::from(device),
            signal_name: std::sync::Arc::from("FORCE"),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            value: Value::Integer(v),
            signal_type: SignalType::Integer,
        }
    }

    #[test]
    fn merge_concatenates_and_sorts_by_timestamp() {
        let log_a = ParsedLog::from_entries(vec![entry("A", 100, 1), entry("A", 200, 2)]);
        let log_b = ParsedLog::from_entries(vec![entry("B", 50, 3)]);
        let merged = merge_parse_results(vec![
            (PathBuf::from("a.log"), ParseResult { data: Some(log_a), errors: vec![], processing_time_seconds: None }),
            (PathBuf::from("b.log"), ParseResult { data: Some(log_b), errors: vec![], processing_time_seconds: None }),
        ]);
        let data = merged.data.unwrap();
        assert_eq!(data.entries.len(), 3);
        assert_eq!(data.entries[0].device_id.as_ref(), "B");
        assert_eq!(data.devices.len(), 2);
    }

    #[test]
    fn fully_failed_result_without_errors_gets_synthesized_message() {
        let merged = merge_parse_results(vec![(
            PathBuf::from("bad.log"),
            ParseResult { data: None, errors: vec![], processing_time_seconds: None },
        )]);
        assert_eq!(merged.errors[0].reason, "Parsing failed with no additional details");
    }
}
