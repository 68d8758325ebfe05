// plc-logtrace - core/lexical.rs
//
// Fast lexical primitives used on the hot per-line parsing path. These
// exist to keep common lines exception-free: a cheap shape check runs
// before the allocating/parsing conversion, so malformed values fail
// fast without ever constructing a regex match or throwing.

use crate::core::model::{SignalType, Timestamp, Value};
use chrono::{NaiveDate, TimeZone, Utc};

const BOOL_TRUE_TOKENS: &[&str] = &["ON", "TRUE", "YES", "1"];
const BOOL_FALSE_TOKENS: &[&str] = &["OFF", "FALSE", "NO", "0"];

/// Parses the fixed form `YYYY-MM-DD HH:MM:SS[.ffffff]` without locale
/// lookup, reading fixed offsets instead of a general strptime pass.
/// Fractional digits beyond six are truncated; fewer than six are
/// right-padded with zeros.
pub fn fast_timestamp(text: &str) -> Option<Timestamp> {
    let bytes = text.as_bytes();
    if bytes.len() < 19 {
        return None;
    }
    let digit = |i: usize| -> Option<u32> {
        let b = *bytes.get(i)?;
        if b.is_ascii_digit() {
            Some((b - b'0') as u32)
        } else {
            None
        }
    };
    let two = |i: usize| -> Option<u32> { Some(digit(i)? * 10 + digit(i + 1)?) };

    if bytes[4] != b'-' || bytes[7] != b'-' || bytes[10] != b' ' || bytes[13] != b':' || bytes[16] != b':' {
        return None;
    }

    let year = digit(0)? * 1000 + digit(1)? * 100 + digit(2)? * 10 + digit(3)?;
    let month = two(5)?;
    let day = two(8)?;
    let hour = two(11)?;
    let minute = two(14)?;
    let second = two(17)?;

    let mut nanos = 0u32;
    if bytes.len() > 19 && bytes[19] == b'.' {
        let frac = &text[20..];
        let mut micros_str = String::with_capacity(6);
        for c in frac.chars().take(6) {
            if !c.is_ascii_digit() {
                break;
            }
            micros_str.push(c);
        }
        while micros_str.len() < 6 {
            micros_str.push('0');
        }
        if let Ok(micros) = micros_str.parse::<u32>() {
            nanos = micros * 1000;
        }
    }

    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;
    let naive = date.and_hms_nano_opt(hour, minute, second, nanos)?;
    match Utc.from_local_datetime(&naive).single() {
        Some(dt) => Some(dt),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

/// Quick shape check for an integer-like token: optional sign, optional
/// `0x`/`0b`/`0o` prefix with a matching digit class, or plain decimal
/// digits tolerating `,`/`_` separators.
pub fn is_int_like(raw: &str) -> bool {
    let s = raw.trim();
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    if s.is_empty() {
        return false;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        return !bin.is_empty() && bin.chars().all(|c| c == '0' || c == '1');
    }
    if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        return !oct.is_empty() && oct.chars().all(|c| ('0'..='7').contains(&c));
    }
    let stripped: String = s.chars().filter(|&c| c != ',' && c != '_').collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}

/// Quick shape check for a float-like token: an int-like mantissa with a
/// fractional part and/or scientific exponent.
pub fn is_float_like(raw: &str) -> bool {
    let s = raw.trim();
    if is_int_like(s) {
        return false;
    }
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let cleaned: String = s.chars().filter(|&c| c != ',' && c != '_').collect();
    if cleaned.is_empty() {
        return false;
    }
    let mut saw_digit = false;
    let mut saw_dot = false;
    let mut saw_exp = false;
    let mut chars = cleaned.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '0'..='9' => saw_digit = true,
            '.' if !saw_dot && !saw_exp => saw_dot = true,
            'e' | 'E' if saw_digit && !saw_exp => {
                saw_exp = true;
                if matches!(chars.peek(), Some('+') | Some('-')) {
                    chars.next();
                }
            }
            _ => return false,
        }
    }
    saw_digit && (saw_dot || saw_exp)
}

/// Converts an int-like token, stripping comma/underscore separators and
/// honoring `0x`/`0b`/`0o` prefixes.
pub fn parse_int_like(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => (-1i64, r),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if let Some(oct) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        let cleaned: String = rest.chars().filter(|&c| c != ',' && c != '_').collect();
        cleaned.parse::<i64>().ok()?
    };
    Some(sign * value)
}

/// Converts a float-like token, stripping comma/underscore separators.
pub fn parse_float_like(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|&c| c != ',' && c != '_').collect();
    cleaned.parse::<f64>().ok()
}

/// Infers a `SignalType` for an undeclared value token. Booleans are
/// recognised from a fixed upper-cased token set; `Float` is only
/// considered when `float_enabled` is set (this crate's concrete parsers
/// never enable it, since the data model this was derived from has no
/// float variant in practice).
pub fn infer_type_fast(raw: &str, float_enabled: bool) -> SignalType {
    let upper = raw.trim().to_ascii_uppercase();
    if BOOL_TRUE_TOKENS.contains(&upper.as_str()) || BOOL_FALSE_TOKENS.contains(&upper.as_str()) {
        return SignalType::Boolean;
    }
    if is_int_like(raw) {
        return SignalType::Integer;
    }
    if float_enabled && is_float_like(raw) {
        return SignalType::Float;
    }
    SignalType::String
}

/// Parses `raw` against `declared` (or the result of `infer_type_fast` if
/// `declared` is `None` and `infer_ok`). Returns `None` only when a type
/// is required (no inference allowed) and the conversion fails.
pub fn parse_value_fast(
    raw: &str,
    declared: Option<SignalType>,
    infer_ok: bool,
    float_enabled: bool,
) -> Option<Value> {
    let effective = declared.unwrap_or_else(|| infer_type_fast(raw, float_enabled));
    match effective {
        SignalType::Boolean => {
            let upper = raw.trim().to_ascii_uppercase();
            if BOOL_TRUE_TOKENS.contains(&upper.as_str()) {
                Some(Value::Boolean(true))
            } else if BOOL_FALSE_TOKENS.contains(&upper.as_str()) {
                Some(Value::Boolean(false))
            } else if infer_ok {
                Some(Value::Text(raw.to_string()))
            } else {
                None
            }
        }
        SignalType::Integer => match parse_int_like(raw) {
            Some(i) => Some(Value::Integer(i)),
            None if infer_ok => Some(Value::Text(raw.to_string())),
            None => None,
        },
        SignalType::Float => match parse_float_like(raw) {
            Some(v) => Some(Value::Float(v)),
            None if infer_ok => Some(Value::Text(raw.to_string())),
            None => None,
        },
        SignalType::String => Some(Value::Text(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_timestamp_parses_millis() {
        let ts = fast_timestamp("2024-01-01 10:00:00.000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T10:00:00+00:00");
    }

    #[test]
    fn fast_timestamp_pads_short_fraction() {
        let a = fast_timestamp("2024-01-01 10:00:00.5").unwrap();
        let b = fast_timestamp("2024-01-01 10:00:00.500000").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fast_timestamp_rejects_malformed() {
        assert!(fast_timestamp("not a timestamp").is_none());
        assert!(fast_timestamp("2024/01/01 10:00:00.000").is_none());
    }

    #[test]
    fn int_like_accepts_separators_and_prefixes() {
        assert!(is_int_like("1,234"));
        assert!(is_int_like("-42"));
        assert!(is_int_like("0x1F"));
        assert!(!is_int_like("12.5"));
        assert!(!is_int_like(""));
    }

    #[test]
    fn float_like_excludes_plain_ints() {
        assert!(!is_float_like("237"));
        assert!(is_float_like("237.5"));
        assert!(is_float_like("1e10"));
    }

    #[test]
    fn infer_type_fast_prefers_boolean_tokens() {
        assert_eq!(infer_type_fast("ON", false), SignalType::Boolean);
        assert_eq!(infer_type_fast("237", false), SignalType::Integer);
        assert_eq!(infer_type_fast("B1ACNV13301-120", false), SignalType::String);
    }

    #[test]
    fn parse_value_fast_falls_back_to_text_when_inference_allowed() {
        let v = parse_value_fast("not-a-bool", Some(SignalType::Boolean), true, false).unwrap();
        assert_eq!(v, Value::Text("not-a-bool".to_string()));
    }

    #[test]
    fn parse_value_fast_fails_strictly_when_inference_disallowed() {
        assert!(parse_value_fast("not-a-bool", Some(SignalType::Boolean), false, false).is_none());
    }
}
