// plc-logtrace - core/parser/plc_debug.rs
//
// `TS [Level] [path] [Category:Signal] (DType) : Value`
//
// Example: 2024-01-01 10:00:00.000 [Debug] [/AreaA/Line01/Robot-01@Main]
//          [INPUT1:I_MOVE_IN] (Boolean) : ON
//
// Fast path locates each bracket pair by `find`; the category prefix
// before the ':' inside the third bracket is discarded, only the part
// after the colon becomes the signal name.

use crate::core::model::{ParseResult, SignalType, Timestamp};
use crate::core::parser::generic::{self, FastFields, LineFormat};
use crate::core::parser::traits::Parser;
use crate::util::constants;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub struct PlcDebugParser {
    device_id_re: Regex,
    line_re: Regex,
}

impl PlcDebugParser {
    pub fn new() -> Self {
        Self {
            device_id_re: Regex::new(r"([A-Za-z0-9_-]+-\d+)(?:@[^\]]+)?$").unwrap(),
            line_re: Regex::new(
                r"^(?P<ts>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?)\s+\[[^\]]*\]\s+\[(?P<path>[^\]]*)\]\s+\[[^:\]]*:(?P<signal>[^\]]*)\]\s+\((?P<dtype>[^)]*)\)\s*:\s*(?P<value>.*)$",
            )
            .unwrap(),
        }
    }
}

impl Default for PlcDebugParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFormat for PlcDebugParser {
    fn parser_name(&self) -> &'static str {
        "plc_debug"
    }

    fn device_id_regex(&self) -> &Regex {
        &self.device_id_re
    }

    fn fast_parse_line(&self, line: &str) -> Option<FastFields> {
        let b1_start = line.find('[')?;
        let ts = line[..b1_start].trim().to_string();
        let b1_end = b1_start + line[b1_start..].find(']')?;

        let rest1 = &line[b1_end + 1..];
        let b2_start = b1_end + 1 + rest1.find('[')?;
        let b2_end = b2_start + line[b2_start..].find(']')?;
        let path = line[b2_start + 1..b2_end].to_string();

        let rest2 = &line[b2_end + 1..];
        let b3_start = b2_end + 1 + rest2.find('[')?;
        let b3_end = b3_start + line[b3_start..].find(']')?;
        let catsig = &line[b3_start + 1..b3_end];
        let colon_rel = catsig.find(':')?;
        let signal = catsig[colon_rel + 1..].to_string();

        let rest3 = &line[b3_end + 1..];
        let p_start = b3_end + 1 + rest3.find('(')?;
        let p_end = p_start + line[p_start..].find(')')?;
        let dtype = line[p_start + 1..p_end].to_string();

        let rest4 = &line[p_end + 1..];
        let colon2_rel = rest4.find(':')?;
        let value = rest4[colon2_rel + 1..].trim().to_string();

        Some(FastFields {
            ts,
            path,
            signal,
            dtype_token: Some(dtype),
            value,
        })
    }

    fn line_regex(&self) -> &Regex {
        &self.line_re
    }

    fn type_from_token(&self, token: &str) -> Option<SignalType> {
        match token {
            "Boolean" => Some(SignalType::Boolean),
            "String" => Some(SignalType::String),
            "Integer" => Some(SignalType::Integer),
            _ => None,
        }
    }

    fn infer_allowed(&self) -> bool {
        true
    }
}

impl Parser for PlcDebugParser {
    fn name(&self) -> &'static str {
        "plc_debug"
    }

    fn can_parse(&self, path: &Path) -> bool {
        generic::sample_can_parse(self, path, constants::CAN_PARSE_SAMPLE_LINES)
    }

    fn parse(&self, path: &Path, workers: usize, use_processes: bool) -> ParseResult {
        generic::parse_file(self, path, workers, use_processes)
    }

    fn parse_streaming<'a>(&'a self, path: &Path) -> Box<dyn Iterator<Item = crate::core::model::LogEntry> + 'a> {
        generic::parse_file_streaming(self, path)
    }

    fn parse_time_window(&self, path: &Path, start: Timestamp, end: Timestamp) -> ParseResult {
        if start == end {
            let mut log = crate::core::model::ParsedLog::from_entries(Vec::new());
            log.time_range = Some((start, end));
            return ParseResult {
                data: Some(log),
                errors: Vec::new(),
                processing_time_seconds: Some(0.0),
            };
        }

        // The original streams and stops after a run of consecutive
        // out-of-range lines, assuming chronological input. We keep that
        // heuristic: once we've seen MAX_CONSECUTIVE_OUT_OF_RANGE lines
        // past `end` in a row, further lines are assumed to stay past
        // the window and streaming stops early.
        let lines = match generic::read_lines(path) {
            Ok(l) => l,
            Err(e) => {
                return ParseResult::failed(
                    crate::core::model::ParseError::whole(format!("failed to read file: {e}"))
                        .with_file(path),
                )
            }
        };
        let interner = crate::core::intern::Interner::new();
        let mut entries = Vec::new();
        let mut errors = Vec::new();
        let mut consecutive_past_end = 0usize;

        for (idx, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match generic::parse_line(self, &interner, line) {
                Ok(entry) => {
                    if entry.timestamp >= end {
                        consecutive_past_end += 1;
                        if consecutive_past_end >= constants::MAX_CONSECUTIVE_OUT_OF_RANGE {
                            break;
                        }
                        continue;
                    }
                    consecutive_past_end = 0;
                    if entry.timestamp >= start {
                        entries.push(entry);
                    }
                }
                Err(reason) => {
                    errors.push(
                        crate::core::model::ParseError::line((idx + 1) as u64, line.clone(), reason)
                            .with_file(path),
                    );
                }
            }
        }

        ParseResult {
            data: Some(crate::core::model::ParsedLog::from_entries(entries)),
            errors,
            processing_time_seconds: None,
        }
    }
}

static DEFAULT_INSTANCE: OnceLock<PlcDebugParser> = OnceLock::new();

/// Returns the process-wide default instance, for callers that just want
/// a quick one-off parse without constructing their own.
pub fn shared() -> &'static PlcDebugParser {
    DEFAULT_INSTANCE.get_or_init(PlcDebugParser::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn parse_time_window_with_equal_bounds_returns_empty_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "2024-01-01 10:00:00.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : ON"
        )
        .unwrap();

        let parser = PlcDebugParser::new();
        let t = chrono::Utc.timestamp_opt(0, 0).unwrap();
        let result = parser.parse_time_window(file.path(), t, t);
        let data = result.data.unwrap();
        assert!(data.entries.is_empty());
        assert_eq!(data.time_range, Some((t, t)));
        assert!(result.errors.is_empty());
    }
}
