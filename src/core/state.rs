// plc-logtrace - core/state.rs
//
// Turns a flat, timestamp-sorted ParsedLog into one step-function
// SignalData per (device_id, signal_name). Buckets keep first-seen
// insertion order (entries arrive pre-sorted by the parser, so bucket
// order is stable run to run).
//
// Consecutive equal-valued states are coalesced into one wider interval
// (resolved design choice, see DESIGN.md) — downstream waveform/query
// consumers see one state per true value change rather than one per
// source event.

use crate::core::model::{LogEntry, ParsedLog, SignalData, SignalState, Symbol, Timestamp, Value};
use std::collections::HashMap;

/// Groups `log.entries` by `(device_id, signal_name)`, preserving each
/// bucket's entries in their original (already timestamp-sorted) order.
pub fn group_by_signal(log: &ParsedLog) -> Vec<(Symbol, Symbol, Vec<&LogEntry>)> {
    let mut order: Vec<(Symbol, Symbol)> = Vec::new();
    let mut buckets: HashMap<(Symbol, Symbol), Vec<&LogEntry>> = HashMap::new();

    for entry in &log.entries {
        let key = (entry.device_id.clone(), entry.signal_name.clone());
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(entry);
    }

    order
        .into_iter()
        .map(|key| {
            let mut entries = buckets.remove(&key).unwrap_or_default();
            entries.sort_by_key(|e| e.timestamp);
            (key.0, key.1, entries)
        })
        .collect()
}

/// Builds one `SignalData` per distinct signal in `log`. When `lazy` is
/// true, `states` is left `None` and must be filled in later via
/// `compute_signal_states`.
pub fn process_signals_for_waveform(log: &ParsedLog, lazy: bool) -> Vec<SignalData> {
    let mut out: Vec<SignalData> = group_by_signal(log)
        .into_iter()
        .map(|(device_id, signal_name, entries)| {
            let signal_type = entries
                .first()
                .map(|e| e.signal_type)
                .unwrap_or(crate::core::model::SignalType::String);
            let key = format!("{device_id}::{signal_name}");
            let mut data = SignalData {
                device_id,
                signal_name,
                key,
                signal_type,
                time_anchor: log.time_range.map(|(start, _)| start).unwrap_or_else(chrono::Utc::now),
                states: None,
                pinned: false,
            };
            if !lazy {
                data.states = Some(compute_states_for_bucket(&entries, log.time_range));
            }
            data
        })
        .collect();

    out.sort_by(|a, b| (a.device_id.as_ref(), a.signal_name.as_ref()).cmp(&(b.device_id.as_ref(), b.signal_name.as_ref())));
    out
}

/// Computes (and coalesces) the step-function states for `signal_data`
/// from its bucket of entries in `log`, then stores them. No-op if
/// `signal_data` is `pinned` and already has states.
pub fn compute_signal_states(signal_data: &mut SignalData, log: &ParsedLog) {
    if signal_data.pinned && signal_data.states.is_some() {
        return;
    }
    let entries: Vec<&LogEntry> = log
        .entries
        .iter()
        .filter(|e| e.device_id == signal_data.device_id && e.signal_name == signal_data.signal_name)
        .collect();
    signal_data.states = Some(compute_states_for_bucket(&entries, log.time_range));
}

fn compute_states_for_bucket(
    entries: &[&LogEntry],
    time_range: Option<(Timestamp, Timestamp)>,
) -> Vec<SignalState> {
    if entries.is_empty() {
        return Vec::new();
    }
    let anchor = time_range.map(|(start, _)| start).unwrap_or(entries[0].timestamp);
    let overall_end = time_range.map(|(_, end)| end).unwrap_or(entries[entries.len() - 1].timestamp);

    let mut raw = Vec::with_capacity(entries.len());
    for i in 0..entries.len() {
        let start_time = entries[i].timestamp;
        let end_time = if i + 1 < entries.len() {
            entries[i + 1].timestamp
        } else {
            overall_end
        };
        raw.push((start_time, end_time, entries[i].value.clone()));
    }

    coalesce_and_offset(raw, anchor)
}

fn coalesce_and_offset(
    raw: Vec<(Timestamp, Timestamp, Value)>,
    anchor: Timestamp,
) -> Vec<SignalState> {
    let mut coalesced: Vec<(Timestamp, Timestamp, Value)> = Vec::with_capacity(raw.len());
    for (start, end, value) in raw {
        if let Some(last) = coalesced.last_mut() {
            if last.2 == value {
                last.1 = end;
                continue;
            }
        }
        coalesced.push((start, end, value));
    }

    coalesced
        .into_iter()
        .map(|(start_time, end_time, value)| {
            let start_offset = (start_time - anchor).num_milliseconds() as f64 / 1000.0;
            let end_offset = (end_time - anchor).num_milliseconds() as f64 / 1000.0;
            SignalState {
                start_time,
                end_time,
                value,
                start_offset,
                end_offset,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::SignalType;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(device: &str, signal: &str, secs: i64, v: i64) -> LogEntry {
        LogEntry {
            device_id: std::sync::Arc::from(device),
            signal_name: std::sync::Arc::from(signal),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            value: Value::Integer(v),
            signal_type: SignalType::Integer,
        }
    }

    #[test]
    fn groups_preserve_first_seen_order_across_two_signals() {
        let log = ParsedLog::from_entries(vec![
            entry("A", "X", 0, 1),
            entry("B", "Y", 1, 1),
            entry("A", "X", 2, 2),
        ]);
        let groups = group_by_signal(&log);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.as_ref(), "X");
        assert_eq!(groups[0].2.len(), 2);
    }

    #[test]
    fn coalesces_adjacent_equal_states() {
        let log = ParsedLog::from_entries(vec![
            entry("A", "X", 0, 1),
            entry("A", "X", 10, 1),
            entry("A", "X", 20, 2),
        ]);
        let data = process_signals_for_waveform(&log, false);
        let states = data[0].states.as_ref().unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].end_time, Utc.timestamp_opt(20, 0).unwrap());
    }

    #[test]
    fn last_state_ends_at_overall_time_range_end() {
        let log = ParsedLog::from_entries(vec![entry("A", "X", 0, 1), entry("A", "X", 5, 2)]);
        let data = process_signals_for_waveform(&log, false);
        let states = data[0].states.as_ref().unwrap();
        assert_eq!(states.last().unwrap().end_time, log.time_range.unwrap().1);
    }

    #[test]
    fn lazy_mode_leaves_states_empty() {
        let log = ParsedLog::from_entries(vec![entry("A", "X", 0, 1)]);
        let data = process_signals_for_waveform(&log, true);
        assert!(data[0].states.is_none());
    }

    #[test]
    fn pinned_signal_data_is_not_recomputed() {
        let log = ParsedLog::from_entries(vec![entry("A", "X", 0, 1), entry("A", "X", 5, 2)]);
        let mut data = process_signals_for_waveform(&log, true).remove(0);
        data.pinned = true;
        data.states = Some(vec![SignalState {
            start_time: Utc.timestamp_opt(0, 0).unwrap(),
            end_time: Utc.timestamp_opt(0, 0).unwrap() + Duration::seconds(1),
            value: Value::Integer(99),
            start_offset: 0.0,
            end_offset: 1.0,
        }]);
        compute_signal_states(&mut data, &log);
        assert_eq!(data.states.as_ref().unwrap()[0].value, Value::Integer(99));
    }
}
