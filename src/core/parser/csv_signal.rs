// plc-logtrace - core/parser/csv_signal.rs
//
// `TS,path,signal,value`
//
// Example: 2024-01-01 10:00:00.000,CellA/Assembly/Press-03,FORCE,237
//
// No fast indexed-scan path — fields are comma-separated but values may
// themselves contain no commas, so a single regex does the whole job.
// No dtype token; device id uses the base (strict, trailing hyphen-digit)
// regex.

use crate::core::model::{ParseResult, SignalType, Timestamp};
use crate::core::parser::generic::{self, FastFields, LineFormat};
use crate::core::parser::traits::Parser;
use crate::util::constants;
use regex::Regex;
use std::path::Path;

pub struct CsvSignalParser {
    device_id_re: Regex,
    line_re: Regex,
}

impl CsvSignalParser {
    pub fn new() -> Self {
        Self {
            device_id_re: Regex::new(r"([A-Za-z0-9_-]+-\d+)(?:@[^\]]+)?$").unwrap(),
            line_re: Regex::new(
                r"^(?P<ts>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?),(?P<path>[^,]*),(?P<signal>[^,]*),(?P<value>.*)$",
            )
            .unwrap(),
        }
    }
}

impl Default for CsvSignalParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFormat for CsvSignalParser {
    fn parser_name(&self) -> &'static str {
        "csv_signal"
    }

    fn device_id_regex(&self) -> &Regex {
        &self.device_id_re
    }

    fn fast_parse_line(&self, _line: &str) -> Option<FastFields> {
        None
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

impl Parser for CsvSignalParser {
    fn name(&self) -> &'static str {
        "csv_signal"
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
