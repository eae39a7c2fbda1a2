//! Phase 4 tests: File I/O, controller lifecycle, CLI integration.

use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crossfacet::cli::commands::parse_selection;
use crossfacet::engine::FacetController;
use crossfacet::format::{read_config, RecordFormat, RecordReader, SnapshotWriter};
use crossfacet::types::{
    BucketValue, DimensionConfig, FacetConfig, FacetError, FieldValue, Record, RecordId,
};

// ==================== Helpers ====================

const CONFIG_TOML: &str = r#"
id_field = "SARPID"

[[dimensions]]
name = "height"
field = "HeightClass"
values = [0, 1, 2, 3]

[[dimensions]]
name = "purpose"
field = "Purpose"
values = ["water", "power", "recreation"]
label = "Primary purpose"

[[dimensions]]
name = "species"
field = "Species"
values = [1, 2, 3]
array = true
"#;

const RECORDS_JSON: &str = r#"[
    {"SARPID": "b1", "HeightClass": 0, "Purpose": "water", "Species": [1, 2]},
    {"SARPID": "b2", "HeightClass": 0, "Purpose": "power", "Species": [2]},
    {"SARPID": "b3", "HeightClass": 1, "Purpose": "water", "Species": []},
    {"SARPID": "b4", "HeightClass": 1, "Purpose": "recreation", "Species": [1]},
    {"SARPID": "b5", "HeightClass": 2, "Purpose": "water", "Species": [3]},
    {"SARPID": "b6", "HeightClass": 2, "Purpose": "power", "Species": [1, 3]},
    {"SARPID": "b7", "HeightClass": 3, "Purpose": null},
    {"SARPID": "b8", "HeightClass": 0, "Purpose": "mystery", "Species": [2, 3]}
]"#;

fn temp_file(suffix: &str, contents: &str) -> NamedTempFile {
    let tmp = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    std::fs::write(tmp.path(), contents).unwrap();
    tmp
}

fn barrier_config() -> FacetConfig {
    FacetConfig::from_toml_str(CONFIG_TOML).unwrap()
}

fn barrier_records() -> Vec<Record> {
    RecordReader::new("SARPID")
        .read_from(RECORDS_JSON.as_bytes(), RecordFormat::Json)
        .unwrap()
}

fn loaded() -> FacetController {
    let mut controller = FacetController::new();
    controller.load(barrier_records(), barrier_config()).unwrap();
    controller
}

fn text_ids(ids: &[&str]) -> Vec<RecordId> {
    ids.iter().map(|&id| RecordId::from(id)).collect()
}

// ==================== Readers ====================

#[test]
fn test_read_json_records() {
    let records = barrier_records();
    assert_eq!(records.len(), 8);
    assert_eq!(records[0].id, RecordId::from("b1"));
    assert_eq!(
        records[0].get("Species"),
        Some(&FieldValue::List(vec![FieldValue::Int(1), FieldValue::Int(2)]))
    );
    assert!(records[6].get("Purpose").is_none());
}

#[test]
fn test_read_json_positional_ids() {
    let tmp = temp_file(".json", r#"[{"id": 10, "A": 1}, {"A": 2}, {"id": "  ", "A": 3}]"#);
    let records = RecordReader::new("id").read_from_file(tmp.path()).unwrap();
    assert_eq!(records[0].id, RecordId::Int(10));
    assert_eq!(records[1].id, RecordId::Positional(1));
    assert_eq!(records[2].id, RecordId::Positional(2));
}

#[test]
fn test_read_json_rejects_bad_shapes() {
    let reader = RecordReader::new("id");
    assert!(matches!(
        reader.read_from(r#"{"id": 1}"#.as_bytes(), RecordFormat::Json),
        Err(FacetError::InvalidRecordSet(_))
    ));
    assert!(matches!(
        reader.read_from(r#"[{"id": 1}, 2]"#.as_bytes(), RecordFormat::Json),
        Err(FacetError::InvalidRecordSet(_))
    ));
    assert!(matches!(
        reader.read_from("[{".as_bytes(), RecordFormat::Json),
        Err(FacetError::Json(_))
    ));
}

#[test]
fn test_read_csv_records() {
    let csv = "id, HeightClass ,Purpose,Species\n1,0,water,\"1,2\"\n2,,power,3\n,3,recreation,\n";
    let tmp = temp_file(".csv", csv);
    let records = RecordReader::new("id").read_from_file(tmp.path()).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id, RecordId::Int(1));
    assert_eq!(records[0].get("HeightClass"), Some(&FieldValue::Int(0)));
    assert!(records[1].get("HeightClass").is_none());
    assert_eq!(records[2].id, RecordId::Positional(2));

    let config = FacetConfig::new(vec![
        DimensionConfig::new("height", "HeightClass", [0, 1, 2, 3]).missing(0),
        DimensionConfig::new("species", "Species", [1, 2, 3]).array(true),
    ]);
    let mut controller = FacetController::new();
    let state = controller.load(records, config).unwrap();
    assert_eq!(state.count("height", &BucketValue::Int(0)), Some(2));
    assert_eq!(state.count("species", &BucketValue::Int(2)), Some(1));
    assert_eq!(state.count("species", &BucketValue::Int(3)), Some(1));
}

#[test]
fn test_numeric_ids_match_across_formats() {
    let json = temp_file(".json", r#"[{"id": "5", "A": 1}, {"id": 6, "A": 2}]"#);
    let csv = temp_file(".csv", "id,A\n5,1\n6,2\n");
    let reader = RecordReader::new("id");
    let from_json = reader.read_from_file(json.path()).unwrap();
    let from_csv = reader.read_from_file(csv.path()).unwrap();
    let ids = |records: &[Record]| records.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&from_json), vec![RecordId::Int(5), RecordId::Int(6)]);
    assert_eq!(ids(&from_json), ids(&from_csv));

    let config = FacetConfig::new(vec![DimensionConfig::new("a", "A", [1, 2])]);
    let mut controller = FacetController::new();
    controller.load(from_json, config).unwrap();
    controller.toggle("a", 1).unwrap();
    assert_eq!(controller.is_selected(&RecordId::from("5")), Some(true));
    assert_eq!(controller.is_selected(&5.into()), Some(true));
    assert_eq!(controller.is_selected(&6.into()), Some(false));
}

#[test]
fn test_unsupported_record_format() {
    let tmp = temp_file(".xml", "<barriers/>");
    let err = RecordReader::new("id").read_from_file(tmp.path()).unwrap_err();
    assert!(matches!(err, FacetError::UnsupportedFormat(_)));
    assert_eq!(
        RecordFormat::from_path(std::path::Path::new("dams.CSV")).unwrap(),
        RecordFormat::Csv
    );
}

#[test]
fn test_read_config_files() {
    let toml = temp_file(".toml", CONFIG_TOML);
    let config = read_config(toml.path()).unwrap();
    assert_eq!(config, barrier_config());

    let json = temp_file(
        ".json",
        r#"{"dimensions": [{"name": "height", "field": "HeightClass", "values": [0, 1]}]}"#,
    );
    let config = read_config(json.path()).unwrap();
    assert_eq!(config.dimensions[0].values.len(), 2);

    let yaml = temp_file(".yaml", "dimensions: []");
    assert!(matches!(
        read_config(yaml.path()),
        Err(FacetError::UnsupportedFormat(_))
    ));
}

// ==================== Controller Lifecycle ====================

#[test]
fn test_bad_config_keeps_previous_state() {
    let mut controller = loaded();
    let before = controller.toggle("height", 0).unwrap();

    let bad = FacetConfig::new(vec![
        DimensionConfig::new("height", "HeightClass", [0]),
        DimensionConfig::new("height", "Height", [0]),
    ]);
    let err = controller.load(barrier_records(), bad).unwrap_err();
    assert!(err.is_config_error());

    assert!(Arc::ptr_eq(&before, &controller.get_state()));
    assert_eq!(
        controller.get_selection().values("height"),
        &[BucketValue::Int(0)]
    );
    assert_eq!(controller.config(), Some(&barrier_config()));
}

#[test]
fn test_load_discards_pending_mutations() {
    let mut controller = loaded();
    controller.stage_toggle("height", 0).unwrap();
    assert!(controller.has_pending());

    let state = controller.load(barrier_records(), barrier_config()).unwrap();
    assert!(!controller.has_pending());
    assert!(controller.get_selection().is_empty());
    assert_eq!(state.data_version, 2);
    assert_eq!(state.filtered_count, 8);

    // A flush after the load has nothing left to publish.
    assert!(Arc::ptr_eq(&state, &controller.flush()));
}

#[test]
fn test_replace_data_keeps_selection() {
    let mut controller = loaded();
    controller.toggle("purpose", "power").unwrap();

    let fewer: Vec<Record> = barrier_records().into_iter().take(4).collect();
    let state = controller.replace_data(fewer).unwrap();
    assert_eq!(state.data_version, 2);
    assert_eq!(state.total_count, 4);
    assert_eq!(state.filtered_count, 1);
    assert!(state.has_filters);
    assert_eq!(
        controller.get_selection().values("purpose"),
        &[BucketValue::from("power")]
    );
}

#[test]
fn test_replace_data_applies_staged_mutations() {
    let mut controller = loaded();
    controller.stage_toggle("height", 0).unwrap();
    assert!(controller.has_pending());

    let state = controller.replace_data(barrier_records()).unwrap();
    assert!(!controller.has_pending());
    assert!(state.has_filters);
    assert_eq!(state.data_version, 2);
    assert_eq!(state.filtered_count, 3);
    assert_eq!(
        controller.get_selection().values("height"),
        &[BucketValue::Int(0)]
    );
    assert!(Arc::ptr_eq(&state, &controller.flush()));
}

#[test]
fn test_replace_data_drops_vanished_dynamic_values() {
    let config = FacetConfig::new(vec![
        DimensionConfig::new("height", "HeightClass", [0, 1]),
        DimensionConfig::discovered("owner", "Owner"),
    ]);
    let records = vec![
        Record::new(1).field("HeightClass", 0).field("Owner", "state"),
        Record::new(2).field("HeightClass", 1).field("Owner", "private"),
    ];
    let mut controller = FacetController::new();
    controller.load(records, config).unwrap();
    controller.toggle("owner", "private").unwrap();
    controller.toggle("height", 1).unwrap();

    let replacement = vec![
        Record::new(3).field("HeightClass", 1).field("Owner", "state"),
        Record::new(4).field("HeightClass", 0).field("Owner", "federal"),
    ];
    let state = controller.replace_data(replacement).unwrap();
    assert!(controller.get_selection().values("owner").is_empty());
    assert_eq!(
        controller.get_selection().values("height"),
        &[BucketValue::Int(1)]
    );
    assert_eq!(state.filtered_count, 1);
    assert_eq!(
        controller.values("owner").unwrap(),
        &[BucketValue::from("federal"), BucketValue::from("state")]
    );
}

#[test]
fn test_replace_data_requires_load() {
    let mut controller = FacetController::new();
    assert!(matches!(
        controller.replace_data(barrier_records()),
        Err(FacetError::NotLoaded)
    ));
}

// ==================== Batching ====================

#[test]
fn test_batch_equals_sequential() {
    let mut sequential = loaded();
    sequential.toggle("height", 0).unwrap();
    sequential.toggle("species", 2).unwrap();
    sequential.toggle("height", 1).unwrap();
    let expected = sequential.toggle("height", 0).unwrap();

    let mut batched = loaded();
    let state = batched
        .batch(|batch| {
            batch.toggle("height", 0)?;
            batch.toggle("species", 2)?;
            batch.toggle("height", 1)?;
            batch.toggle("height", 0)?;
            assert_eq!(batch.selection().values("height"), &[BucketValue::Int(1)]);
            Ok(())
        })
        .unwrap();
    assert_eq!(*state, *expected);
    assert_eq!(batched.get_selection(), sequential.get_selection());
}

#[test]
fn test_batch_error_rolls_back() {
    let mut controller = loaded();
    let before = controller.toggle("height", 1).unwrap();

    let err = controller
        .batch(|batch| {
            batch.clear_dimension("height")?;
            batch.toggle("purpose", "water")?;
            batch.toggle("purpose", "bogus")?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, FacetError::UnknownBucket { .. }));
    assert!(Arc::ptr_eq(&before, &controller.get_state()));
    assert!(!controller.has_pending());
    assert_eq!(
        controller.get_selection().values("height"),
        &[BucketValue::Int(1)]
    );
    assert!(controller.get_selection().values("purpose").is_empty());

    // Later recomputations see the restored selection.
    let state = controller.toggle("purpose", "recreation").unwrap();
    let mut fresh = loaded();
    fresh.toggle("height", 1).unwrap();
    let expected = fresh.toggle("purpose", "recreation").unwrap();
    assert_eq!(*state, *expected);
}

#[test]
fn test_batch_reset_then_select() {
    let mut controller = loaded();
    controller.toggle("species", 1).unwrap();
    let state = controller
        .batch(|batch| {
            batch.reset();
            batch.set_selection("purpose", &[BucketValue::from("water")])
        })
        .unwrap();
    assert_eq!(state.filtered_count, 3);
    assert!(controller.get_selection().values("species").is_empty());
}

// ==================== Selection and Ids ====================

#[test]
fn test_filtered_ids_and_membership() {
    let mut controller = loaded();
    assert_eq!(controller.filtered_ids().len(), 8);

    controller.toggle("purpose", "water").unwrap();
    assert_eq!(controller.filtered_ids(), text_ids(&["b1", "b3", "b5"]));
    assert_eq!(controller.is_selected(&RecordId::from("b1")), Some(true));
    assert_eq!(controller.is_selected(&RecordId::from("b2")), Some(false));
    assert_eq!(controller.is_selected(&RecordId::from("zz")), None);

    // Staged changes move membership but not the published ids.
    controller.stage_clear("purpose").unwrap();
    assert_eq!(controller.is_selected(&RecordId::from("b2")), Some(true));
    assert_eq!(controller.filtered_ids(), text_ids(&["b1", "b3", "b5"]));
    controller.flush();
    assert_eq!(controller.filtered_ids().len(), 8);
}

#[test]
fn test_selection_predicates_reproduce_filter() {
    let mut controller = loaded();
    controller.toggle("height", 0).unwrap();
    controller.toggle("species", 2).unwrap();
    controller.toggle("species", 3).unwrap();

    let predicates = controller.get_selection().predicates();
    assert_eq!(predicates.len(), 2);
    assert_eq!(predicates[0].field, "HeightClass");
    assert!(!predicates[0].any_of);
    assert_eq!(predicates[1].field, "Species");
    assert!(predicates[1].any_of);
    assert_eq!(
        predicates[1].values,
        vec![BucketValue::Int(2), BucketValue::Int(3)]
    );

    // Evaluate the predicates the way an external map filter would.
    let matching: Vec<RecordId> = barrier_records()
        .into_iter()
        .filter(|record| {
            predicates.iter().all(|p| {
                let Some(value) = record.get(&p.field) else {
                    return false;
                };
                if p.any_of {
                    value.to_buckets().iter().any(|v| p.values.contains(v))
                } else {
                    value.to_bucket().is_some_and(|v| p.values.contains(&v))
                }
            })
        })
        .map(|record| record.id)
        .collect();
    assert_eq!(matching, controller.filtered_ids());
    assert_eq!(matching, text_ids(&["b1", "b2", "b8"]));
}

// ==================== Snapshots ====================

#[test]
fn test_state_serializes_as_plain_data() {
    let mut controller = loaded();
    let state = controller.toggle("height", 0).unwrap();
    let value = serde_json::to_value(&*state).unwrap();

    assert_eq!(value["data_version"], 1);
    assert_eq!(value["total_count"], 8);
    assert_eq!(value["filtered_count"], 3);
    assert_eq!(value["has_filters"], true);
    assert_eq!(value["empty_dimensions"], serde_json::json!([]));
    assert_eq!(
        value["dimension_counts"]["purpose"]["buckets"][0],
        serde_json::json!({"value": "water", "count": 1})
    );
    assert_eq!(value["dimension_counts"]["purpose"]["unrecognized"], 1);

    let selection = serde_json::to_value(controller.get_selection()).unwrap();
    assert_eq!(selection["dimensions"][0]["dimension"], "height");
    assert_eq!(selection["dimensions"][0]["values"], serde_json::json!([0]));
}

#[test]
fn test_snapshot_writer() {
    let controller = loaded();
    let state = controller.get_state();
    let compact = SnapshotWriter::new(false).render(&*state).unwrap();
    let pretty = SnapshotWriter::new(true).render(&*state).unwrap();
    assert!(!compact.contains('\n'));
    assert!(pretty.contains('\n'));

    let tmp = temp_file(".json", "");
    SnapshotWriter::new(true)
        .write_to_file(tmp.path(), &*state)
        .unwrap();
    let text = std::fs::read_to_string(tmp.path()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["filtered_count"], 8);
}

#[test]
fn test_snapshot_shared_across_threads() {
    let mut controller = loaded();
    let state = controller.toggle("purpose", "water").unwrap();
    let reader = Arc::clone(&state);
    let handle = std::thread::spawn(move || reader.filtered_count);

    // Further mutations never touch a published snapshot.
    controller.reset();
    assert_eq!(handle.join().unwrap(), 3);
    assert_eq!(state.filtered_count, 3);
}

#[test]
fn test_data_version_increments() {
    let mut controller = loaded();
    assert_eq!(controller.get_state().data_version, 1);
    assert_eq!(controller.toggle("height", 0).unwrap().data_version, 1);
    let state = controller.replace_data(barrier_records()).unwrap();
    assert_eq!(state.data_version, 2);
    let state = controller.load(barrier_records(), barrier_config()).unwrap();
    assert_eq!(state.data_version, 3);
}

// ==================== CLI Helpers ====================

/// Path of the `xfacet` binary built for integration tests.
fn xfacet_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_xfacet"))
}

/// Run the `xfacet` CLI with the given arguments and return the output.
fn run_xfacet(args: &[&str]) -> Output {
    Command::new(xfacet_bin())
        .args(args)
        .output()
        .expect("Failed to run xfacet")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "xfacet failed with status {:?}\nstdout: {}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

// ==================== CLI Tests ====================

#[test]
fn test_parse_selection() {
    assert_eq!(
        parse_selection("height=2").unwrap(),
        ("height".to_string(), BucketValue::Int(2))
    );
    assert_eq!(
        parse_selection(" purpose = water ").unwrap(),
        ("purpose".to_string(), BucketValue::from("water"))
    );
    assert!(matches!(
        parse_selection("height"),
        Err(FacetError::InvalidSelection(_))
    ));
    assert!(parse_selection("=2").is_err());
    assert!(parse_selection("height=").is_err());
}

#[test]
fn test_cli_summary_text() {
    let config = temp_file(".toml", CONFIG_TOML);
    let data = temp_file(".json", RECORDS_JSON);
    let output = run_xfacet(&[
        "summary",
        "--config",
        config.path().to_str().unwrap(),
        data.path().to_str().unwrap(),
        "--select",
        "height=0",
    ]);
    assert_success(&output);
    let out = stdout_str(&output);
    assert!(out.contains("Records: 8 (filtered: 3)"), "{}", out);
    assert!(out.contains("Filters: height=0"), "{}", out);
    assert!(out.contains("Primary purpose"), "{}", out);
    assert!(out.contains("  0: 3  *"), "{}", out);
}

#[test]
fn test_cli_summary_json_and_output_file() {
    let config = temp_file(".toml", CONFIG_TOML);
    let data = temp_file(".json", RECORDS_JSON);
    let snapshot = temp_file(".json", "");
    let output = run_xfacet(&[
        "--format",
        "json",
        "summary",
        "--config",
        config.path().to_str().unwrap(),
        data.path().to_str().unwrap(),
        "--select",
        "purpose=water",
        "--select",
        "purpose=power",
        "--output",
        snapshot.path().to_str().unwrap(),
    ]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_str(&stdout_str(&output)).unwrap();
    assert_eq!(report["state"]["filtered_count"], 5);
    assert_eq!(
        report["selection"]["dimensions"][1]["values"],
        serde_json::json!(["water", "power"])
    );

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(snapshot.path()).unwrap()).unwrap();
    assert_eq!(written, report["state"]);
}

#[test]
fn test_cli_ids() {
    let config = temp_file(".toml", CONFIG_TOML);
    let data = temp_file(".json", RECORDS_JSON);
    let output = run_xfacet(&[
        "ids",
        "--config",
        config.path().to_str().unwrap(),
        data.path().to_str().unwrap(),
        "--select",
        "species=3",
        "--limit",
        "2",
    ]);
    assert_success(&output);
    let out = stdout_str(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["b5", "b6", "... 1 more"]);
}

#[test]
fn test_cli_dimensions_and_validate() {
    let config = temp_file(".toml", CONFIG_TOML);
    let data = temp_file(".json", RECORDS_JSON);

    let output = run_xfacet(&["dimensions", config.path().to_str().unwrap()]);
    assert_success(&output);
    assert!(stdout_str(&output).contains("species <- Species: 1,2,3 [array]"));

    let output = run_xfacet(&[
        "--format",
        "json",
        "validate",
        config.path().to_str().unwrap(),
        "--data",
        data.path().to_str().unwrap(),
    ]);
    assert_success(&output);
    let report: serde_json::Value = serde_json::from_str(&stdout_str(&output)).unwrap();
    assert_eq!(report["records"], 8);
    assert_eq!(report["duplicate_ids"], 0);
    assert_eq!(report["unrecognized"]["purpose"], 2);
}

#[test]
fn test_cli_exit_codes() {
    let config = temp_file(".toml", CONFIG_TOML);
    let data = temp_file(".json", RECORDS_JSON);
    let config_path = config.path().to_str().unwrap();
    let data_path = data.path().to_str().unwrap();

    let output = run_xfacet(&["summary", "--config", config_path, "/nonexistent/data.json"]);
    assert_eq!(output.status.code(), Some(1));

    let bad_data = temp_file(".json", "{\"not\": \"an array\"}");
    let output = run_xfacet(&[
        "summary",
        "--config",
        config_path,
        bad_data.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let bad_config = temp_file(
        ".toml",
        "[[dimensions]]\nname = \"height\"\nfield = \"HeightClass\"\n",
    );
    let output = run_xfacet(&["validate", bad_config.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));

    let output = run_xfacet(&[
        "summary",
        "--config",
        config_path,
        data_path,
        "--select",
        "height=9",
    ]);
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("height"));
}
