// plc-logtrace - core/parser/default_parser.rs
//
// `DeviceID SignalName HH:MM:SS Value Type`
//
// Example: DEVICE_A MOTOR_START 10:30:45 true boolean
// Example: DEVICE_B COUNTER_1 10:30:47 100 integer
//
// The fallback format used when no other parser claims a file. Unlike
// every other format here, the type is always an explicit trailing
// token (`boolean`/`string`/`integer`, case-insensitive) rather than
// inferred — there is no type-inference fallback for this format.
//
// It carries no date component, so lines are stamped against a day
// counter that advances whenever a later line's time-of-day is smaller
// than the previous one's — this is midnight-unsafe by construction: a
// burst of genuinely out-of-order lines near midnight is
// indistinguishable from a real day rollover and will mis-stamp the
// day. Kept faithful to the reference behavior rather than "fixed",
// since fixing it would require information (an explicit date) this
// format does not carry.
//
// Unlike the other formats, this one does not go through `LineFormat`:
// it has no declared device-id sub-regex (the first token *is* the
// device id), and never enables concurrency or sorts the result — this
// is the one parser that must preserve raw line order unconditionally.

use crate::core::intern::Interner;
use crate::core::model::{LogEntry, ParseError, ParseResult, ParsedLog, SignalType, Timestamp, Value};
use crate::core::parser::generic::read_lines;
use crate::core::parser::traits::Parser;
use crate::util::constants;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::path::Path;

pub struct DefaultParser;

impl DefaultParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits on the first four whitespace runs, Python `str.split(maxsplit=4)`
/// style: each of the first four fields is a single non-whitespace
/// token (device_id, signal_name, time, value), the fifth is everything
/// after the fourth token's trailing whitespace (the type token), with
/// its own leading/trailing whitespace trimmed but any internal
/// whitespace preserved verbatim.
fn split_fixed5(line: &str) -> Option<(&str, &str, &str, &str, &str)> {
    let mut rest = line;
    let mut fields = [""; 4];
    for field in fields.iter_mut() {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        *field = &rest[..end];
        rest = &rest[end..];
    }
    let type_tok = rest.trim();
    Some((fields[0], fields[1], fields[2], fields[3], type_tok))
}

fn parse_time_token(token: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(token, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(token, "%H:%M:%S"))
        .ok()
}

fn type_from_token(token: &str) -> Option<SignalType> {
    match token.to_ascii_lowercase().as_str() {
        "boolean" => Some(SignalType::Boolean),
        "string" => Some(SignalType::String),
        "integer" => Some(SignalType::Integer),
        _ => None,
    }
}

/// Parses `value_str` against the declared `signal_type`. Boolean
/// accepts `true`/`1`/`false`/`0`, case-insensitively; integer requires
/// a plain `i64`; string is the value verbatim.
fn value_for_type(value: &str, signal_type: SignalType) -> Result<Value, String> {
    match signal_type {
        SignalType::Boolean => match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Boolean(true)),
            "false" | "0" => Ok(Value::Boolean(false)),
            _ => Err(format!("invalid boolean value '{value}'")),
        },
        SignalType::Integer => value
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("invalid integer value '{value}'")),
        SignalType::String => Ok(Value::Text(value.to_string())),
        SignalType::Float => Err("float values are not produced by this format".to_string()),
    }
}

impl Parser for DefaultParser {
    fn name(&self) -> &'static str {
        "default"
    }

    fn can_parse(&self, path: &Path) -> bool {
        let lines = match read_lines(path) {
            Ok(l) => l,
            Err(_) => return false,
        };
        let mut sampled = 0usize;
        let mut matched = 0usize;
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            if sampled >= constants::CAN_PARSE_SAMPLE_LINES {
                break;
            }
            sampled += 1;
            if let Some((_device, _signal, time, _value, type_tok)) = split_fixed5(line) {
                if parse_time_token(time).is_some() && type_from_token(type_tok).is_some() {
                    matched += 1;
                }
            }
        }
        sampled > 0 && (matched as f64 / sampled as f64) >= constants::CAN_PARSE_MIN_MATCH_RATE
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
        let mut entries = Vec::with_capacity(lines.len());
        let mut errors = Vec::new();
        let mut cached_day: NaiveDate = Utc::now().date_naive();
        let mut last_time: Option<NaiveTime> = None;

        for (idx, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_one(line, &interner, &mut cached_day, &mut last_time) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    if errors.len() < constants::MAX_PARSE_ERRORS_PER_FILE {
                        errors.push(ParseError::line((idx + 1) as u64, line.clone(), reason).with_file(path));
                    }
                }
            }
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

        ParseResult {
            data: Some(ParsedLog::from_entries(entries)),
            errors,
            processing_time_seconds: Some(start.elapsed().as_secs_f64()),
        }
    }

    fn parse_streaming<'a>(&'a self, path: &Path) -> Box<dyn Iterator<Item = LogEntry> + 'a> {
        let lines = read_lines(path).unwrap_or_default();
        let interner = Interner::new();
        let mut cached_day = Utc::now().date_naive();
        let mut last_time: Option<NaiveTime> = None;
        Box::new(lines.into_iter().filter(|l| !l.trim().is_empty()).filter_map(move |line| {
            self.parse_one(&line, &interner, &mut cached_day, &mut last_time).ok()
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
        let full = self.parse(path, 1, false);
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
}

impl DefaultParser {
    fn parse_one(
        &self,
        line: &str,
        interner: &Interner,
        cached_day: &mut NaiveDate,
        last_time: &mut Option<NaiveTime>,
    ) -> Result<LogEntry, String> {
        let (device_tok, signal_tok, time_tok, value_tok, type_tok) =
            split_fixed5(line).ok_or_else(|| "expected 5 whitespace-separated fields".to_string())?;
        let time = parse_time_token(time_tok).ok_or_else(|| format!("invalid time '{time_tok}'"))?;
        let signal_type =
            type_from_token(type_tok).ok_or_else(|| format!("invalid type '{type_tok}'"))?;

        if let Some(prev) = *last_time {
            if time < prev {
                *cached_day = *cached_day + Duration::days(1);
            }
        }
        *last_time = Some(time);

        let naive = cached_day.and_time(time);
        let timestamp = match Utc.from_local_datetime(&naive).single() {
            Some(dt) => dt,
            None => Utc.from_utc_datetime(&naive),
        };

        let value = value_for_type(value_tok, signal_type)?;

        Ok(LogEntry {
            device_id: interner.intern(device_tok),
            signal_name: interner.intern(signal_tok),
            timestamp,
            value,
            signal_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_five_fixed_fields_with_type_as_last_token() {
        let (device, signal, time, value, type_tok) =
            split_fixed5("DEVICE_A  MOTOR_START   10:30:45   true   boolean  ").unwrap();
        assert_eq!(device, "DEVICE_A");
        assert_eq!(signal, "MOTOR_START");
        assert_eq!(time, "10:30:45");
        assert_eq!(value, "true");
        assert_eq!(type_tok, "boolean");
    }

    #[test]
    fn boolean_type_accepts_any_case_and_numeric_form() {
        assert_eq!(value_for_type("TRUE", SignalType::Boolean).unwrap(), Value::Boolean(true));
        assert_eq!(value_for_type("1", SignalType::Boolean).unwrap(), Value::Boolean(true));
        assert_eq!(value_for_type("False", SignalType::Boolean).unwrap(), Value::Boolean(false));
        assert!(value_for_type("maybe", SignalType::Boolean).is_err());
    }

    #[test]
    fn integer_type_rejects_non_decimal_forms() {
        assert!(value_for_type("0x1F", SignalType::Integer).is_err());
        assert_eq!(value_for_type("237", SignalType::Integer).unwrap(), Value::Integer(237));
    }

    #[test]
    fn unrecognized_type_token_is_rejected() {
        assert!(type_from_token("float").is_none());
        assert_eq!(type_from_token("BOOLEAN"), Some(SignalType::Boolean));
    }

    #[test]
    fn day_advances_on_time_rollback() {
        let parser = DefaultParser::new();
        let interner = Interner::new();
        let mut day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut last = None;
        let first = parser
            .parse_one("Press-03 FORCE 23:59:59 1 integer", &interner, &mut day, &mut last)
            .unwrap();
        let second = parser
            .parse_one("Press-03 FORCE 00:00:01 2 integer", &interner, &mut day, &mut last)
            .unwrap();
        assert!(second.timestamp > first.timestamp);
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn parse_time_window_with_equal_bounds_returns_empty_range() {
        use chrono::TimeZone as _;
        let parser = DefaultParser::new();
        let t = chrono::Utc.timestamp_opt(0, 0).unwrap();
        let result = parser.parse_time_window(Path::new("/nonexistent"), t, t);
        let data = result.data.unwrap();
        assert!(data.entries.is_empty());
        assert_eq!(data.time_range, Some((t, t)));
        assert!(result.errors.is_empty());
    }
}
