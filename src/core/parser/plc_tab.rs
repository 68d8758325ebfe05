// plc-logtrace - core/parser/plc_tab.rs
//
// `TS [] path\tsignal\tdirection\tvalue\tblank\tlocation\tflag1\t(flag2)\tts2`
//
// Example: 2024-01-01 10:00:00.000 [] CellA/Assembly/Press-03@Main\t
//          ANALOG:FORCE\tOUT\t237\t\tStation-05\tOK\t\t2024-01-01 10:00:00.000
//
// No dtype token in this format — type is always inferred from the
// value. The device-id regex is relaxed relative to the base default:
// it does not require a trailing hyphen-digit run.

use crate::core::model::{ParseResult, SignalType, Timestamp};
use crate::core::parser::generic::{self, FastFields, LineFormat};
use crate::core::parser::traits::Parser;
use crate::util::constants;
use regex::Regex;
use std::path::Path;

const MIN_TAB_PARTS: usize = 8;
const SEPARATOR: &str = " [] ";

pub struct PlcTabParser {
    device_id_re: Regex,
    line_re: Regex,
}

impl PlcTabParser {
    pub fn new() -> Self {
        Self {
            device_id_re: Regex::new(r"([A-Za-z0-9_-]+)(?:@[^\]]+)?$").unwrap(),
            line_re: Regex::new(
                r"^(?P<ts>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?) \[\]\s+(?P<path>[^\t]+)\t(?P<signal>[^\t]+)\t[^\t]*\t(?P<value>[^\t]*)",
            )
            .unwrap(),
        }
    }
}

impl Default for PlcTabParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFormat for PlcTabParser {
    fn parser_name(&self) -> &'static str {
        "plc_tab"
    }

    fn device_id_regex(&self) -> &Regex {
        &self.device_id_re
    }

    fn fast_parse_line(&self, line: &str) -> Option<FastFields> {
        let sep_idx = line.find(SEPARATOR)?;
        let ts = line[..sep_idx].trim().to_string();
        let rest = &line[sep_idx + SEPARATOR.len()..];
        let parts: Vec<&str> = rest.split('\t').collect();
        if parts.len() < MIN_TAB_PARTS {
            return None;
        }
        Some(FastFields {
            ts,
            path: parts[0].to_string(),
            signal: parts[1].to_string(),
            dtype_token: None,
            value: parts[3].to_string(),
        })
    }

    fn line_regex(&self) -> &Regex {
        &self.line_re
    }

    fn type_from_token(&self, _token: &str) -> Option<SignalType> {
        None
    }

    fn infer_allowed(&self) -> bool {
        true
    }
}

impl Parser for PlcTabParser {
    fn name(&self) -> &'static str {
        "plc_tab"
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
        generic::parse_time_window_default(self, path, start, end)
    }
}
