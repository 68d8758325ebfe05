// plc-logtrace - tests/e2e_discovery.rs
//
// End-to-end tests driving the real public API against real files on
// disk: registry detection, parsing, aggregation, signal-state
// reconstruction, and chunked-store queries. No mocks — real parsers,
// real timestamps, real tempfiles.

use chrono::{TimeZone, Utc};
use plc_logtrace::core::chunk_manager::ChunkManager;
use plc_logtrace::core::model::{SignalType, Value};
use plc_logtrace::core::parser::registry::ParserRegistry;
use plc_logtrace::core::parser::traits::Parser;
use plc_logtrace::core::{aggregate, state};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn write_fixture(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create tempfile");
    write!(file, "{contents}").expect("write fixture contents");
    file
}

// =============================================================================
// 1. Bracket parser basic
// =============================================================================

#[test]
fn e2e_bracket_parser_basic() {
    let file = write_fixture(
        "2024-01-01 10:00:00.000 [Debug] [/AreaA/Line01/Robot-01@Main] [INPUT1:I_MOVE_IN] (Boolean) : ON\n",
    );
    let registry = ParserRegistry::builtin();
    let result = registry.parse(file.path(), None, 1, false);
    let data = result.data.expect("parse should succeed");

    assert_eq!(data.entries.len(), 1);
    let entry = &data.entries[0];
    assert_eq!(entry.device_id.as_ref(), "Robot-01");
    assert_eq!(entry.signal_name.as_ref(), "I_MOVE_IN");
    assert_eq!(entry.value, Value::Boolean(true));
    assert_eq!(entry.signal_type, SignalType::Boolean);
    assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
}

// =============================================================================
// 2. Tab parser with inferred integer
// =============================================================================

#[test]
fn e2e_tab_parser_inferred_integer() {
    let file = write_fixture(
        "2024-01-01 10:00:00.000 [] CellA/Assembly/Press-03@Main\tANALOG:FORCE\tOUT\t237\t\tStation-05\tOK\t\t2024-01-01 10:00:00.000\n",
    );
    let registry = ParserRegistry::builtin();
    let result = registry.parse(file.path(), Some("plc_tab"), 1, false);
    let data = result.data.expect("parse should succeed");

    let entry = &data.entries[0];
    assert_eq!(entry.device_id.as_ref(), "Press-03");
    assert_eq!(entry.signal_name.as_ref(), "ANALOG:FORCE");
    assert_eq!(entry.value, Value::Integer(237));
    assert_eq!(entry.signal_type, SignalType::Integer);
}

// =============================================================================
// 3. Multi-entry MCS line
// =============================================================================

#[test]
fn e2e_multi_entry_mcs_line() {
    let file = write_fixture(
        "2025-12-05 00:00:36.322 [UPDATE=336182, BBADFB0397] [CurrentLocation=B1ACNV13301-120]\n",
    );
    let registry = ParserRegistry::builtin();
    let result = registry.parse(file.path(), Some("mcs_log"), 1, false);
    let data = result.data.expect("parse should succeed");

    assert_eq!(data.entries.len(), 3);
    assert!(data.entries.iter().all(|e| e.device_id.as_ref() == "BBADFB0397"));

    let action = data.entries.iter().find(|e| e.signal_name.as_ref() == "_Action").unwrap();
    assert_eq!(action.value, Value::Text("UPDATE".to_string()));

    let command_id = data.entries.iter().find(|e| e.signal_name.as_ref() == "_CommandID").unwrap();
    assert_eq!(command_id.value, Value::Text("336182".to_string()));

    let location = data.entries.iter().find(|e| e.signal_name.as_ref() == "CurrentLocation").unwrap();
    assert_eq!(location.value, Value::Text("B1ACNV13301-120".to_string()));
}

// =============================================================================
// 4. Alias normalization
// =============================================================================

#[test]
fn e2e_alias_normalization() {
    let file = write_fixture(
        "2025-12-09 00:00:01.443 [UPDATE=SDADTN490165] [CarrierLoc=B1ACNV13301-108]\n",
    );
    let registry = ParserRegistry::builtin();
    let result = registry.parse(file.path(), Some("mcs_log"), 1, false);
    let data = result.data.expect("parse should succeed");

    assert!(data.entries.iter().all(|e| e.device_id.as_ref() == "SDADTN490165"));
    assert!(data.entries.iter().any(|e| e.signal_name.as_ref() == "CurrentLocation"));
    assert!(!data.entries.iter().any(|e| e.signal_name.as_ref() == "_CommandID"));
}

// =============================================================================
// 5. Chronology detection avoids sort (merge produces one contiguous run)
// =============================================================================

#[test]
fn e2e_chronology_detection_avoids_sort_on_merge() {
    let file_a = write_fixture(
        "2024-01-01 10:00:00.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : ON\n\
         2024-01-01 10:00:01.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : OFF\n",
    );
    let file_b = write_fixture(
        "2024-01-01 11:00:00.000 [Debug] [/A/Robot-02@Main] [S:Y] (Boolean) : ON\n",
    );

    let registry = ParserRegistry::builtin();
    let result_a = registry.parse(file_a.path(), Some("plc_debug"), 1, false);
    let result_b = registry.parse(file_b.path(), Some("plc_debug"), 1, false);

    let merged = aggregate::merge_parse_results(vec![
        (PathBuf::from(file_a.path()), result_a),
        (PathBuf::from(file_b.path()), result_b),
    ]);
    let data = merged.data.expect("merge should succeed");

    assert_eq!(data.entries.len(), 3);
    let timestamps: Vec<_> = data.entries.iter().map(|e| e.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted, "merged entries must be contiguous and sorted");
}

// =============================================================================
// 6. Chunked store LRU eviction
// =============================================================================

#[test]
fn e2e_chunked_store_lru_eviction() {
    let mut lines = String::new();
    for minute in [0, 5, 10, 15] {
        lines.push_str(&format!(
            "2024-01-01 00:{minute:02}:00.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : ON\n"
        ));
    }
    let file = write_fixture(&lines);

    let registry = ParserRegistry::builtin();
    let parser = registry.get("plc_debug").expect("plc_debug registered");
    let full = parser.parse(file.path(), 1, false);
    let full_range = full.data.expect("parse should succeed").time_range.unwrap();

    let mut manager = ChunkManager::new(
        PathBuf::from(file.path()),
        Arc::clone(&parser),
        full_range,
        300.0,
        2,
    );

    let minute = chrono::Duration::minutes(1);
    let query = |m: i64, mgr: &mut ChunkManager| {
        let start = full_range.0 + minute * m as i32;
        mgr.get_entries_in_range(start, start + chrono::Duration::seconds(1));
    };

    query(0, &mut manager); // chunk 0
    query(5, &mut manager); // chunk 1 ([300,600))
    query(10, &mut manager); // chunk 2 ([600,900)) -> evicts chunk 0
    query(0, &mut manager); // chunk 0 again -> evicts chunk 1

    // Querying a still-resident chunk should not error or lose entries.
    let entries = manager.get_entries_in_range(full_range.0, full_range.0 + chrono::Duration::seconds(1));
    assert!(!entries.is_empty());
}

// =============================================================================
// Signal-state reconstruction
// =============================================================================

#[test]
fn e2e_signal_state_reconstruction_coalesces_and_spans_full_range() {
    let file = write_fixture(
        "2024-01-01 10:00:00.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : ON\n\
         2024-01-01 10:00:01.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : ON\n\
         2024-01-01 10:00:02.000 [Debug] [/A/Robot-01@Main] [S:X] (Boolean) : OFF\n",
    );
    let registry = ParserRegistry::builtin();
    let result = registry.parse(file.path(), Some("plc_debug"), 1, false);
    let data = result.data.expect("parse should succeed");

    let signal_data = state::process_signals_for_waveform(&data, false);
    assert_eq!(signal_data.len(), 1);
    let states = signal_data[0].states.as_ref().unwrap();

    // The two consecutive ON states coalesce into one.
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].value, Value::Boolean(true));
    assert_eq!(states[0].end_time, data.time_range.unwrap().0 + chrono::Duration::seconds(2));
    assert_eq!(states.last().unwrap().end_time, data.time_range.unwrap().1);
}

// =============================================================================
// Registry error paths
// =============================================================================

#[test]
fn e2e_unknown_parser_name_reports_literal_error() {
    let file = write_fixture("anything\n");
    let registry = ParserRegistry::builtin();
    let result = registry.parse(file.path(), Some("not-a-real-parser"), 1, false);
    assert!(result.data.is_none());
    assert_eq!(result.errors[0].reason, "Parser 'not-a-real-parser' not found");
}

#[test]
fn e2e_default_parser_handles_positional_format_without_date() {
    let file = write_fixture(
        "Press-03 FORCE 10:00:00 237 integer\nPress-03 FORCE 10:00:01 238 integer\n",
    );
    let registry = ParserRegistry::builtin();
    let result = registry.parse(file.path(), Some("default"), 1, false);
    let data = result.data.expect("parse should succeed");

    assert_eq!(data.entries.len(), 2);
    assert_eq!(data.entries[0].device_id.as_ref(), "Press-03");
    assert_eq!(data.entries[0].value, Value::Integer(237));
}
