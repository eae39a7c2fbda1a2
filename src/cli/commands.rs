//! CLI command implementations.

use std::collections::BTreeMap;
use std::path::Path;

use crate::engine::{FacetController, Selection};
use crate::format::{read_config, RecordReader, SnapshotWriter};
use crate::types::{
    AggregateState, BucketCount, BucketValue, DimensionConfig, DimensionCounts, FacetConfig,
    FacetError, FacetResult,
};

/// Parse a `dimension=value` filter argument.
pub fn parse_selection(arg: &str) -> FacetResult<(String, BucketValue)> {
    let (dimension, value) = arg
        .split_once('=')
        .ok_or_else(|| FacetError::InvalidSelection(arg.to_string()))?;
    let dimension = dimension.trim();
    if dimension.is_empty() || value.trim().is_empty() {
        return Err(FacetError::InvalidSelection(arg.to_string()));
    }
    Ok((dimension.to_string(), BucketValue::parse(value)))
}

/// Load the configuration and records into a fresh controller.
pub fn open_controller(config_path: &Path, data_path: &Path) -> FacetResult<FacetController> {
    let config = read_config(config_path)?;
    let records = RecordReader::new(config.id_field.clone()).read_from_file(data_path)?;
    let mut controller = FacetController::new();
    controller.load(records, config)?;
    Ok(controller)
}

/// Apply `dimension=value` arguments as one batch. Repeated dimensions
/// select several values.
pub fn apply_selections(
    controller: &mut FacetController,
    selections: &[String],
) -> FacetResult<()> {
    let mut grouped: BTreeMap<String, Vec<BucketValue>> = BTreeMap::new();
    for arg in selections {
        let (dimension, value) = parse_selection(arg)?;
        grouped.entry(dimension).or_default().push(value);
    }
    if grouped.is_empty() {
        return Ok(());
    }
    controller.batch(|batch| {
        for (dimension, values) in &grouped {
            batch.set_selection(dimension, values)?;
        }
        Ok(())
    })?;
    Ok(())
}

/// Print aggregate counts for a filtered record set.
pub fn cmd_summary(
    config_path: &Path,
    data_path: &Path,
    selections: &[String],
    output: Option<&Path>,
    json: bool,
) -> FacetResult<()> {
    let mut controller = open_controller(config_path, data_path)?;
    apply_selections(&mut controller, selections)?;
    let state = controller.get_state();

    if let Some(path) = output {
        SnapshotWriter::new(true).write_to_file(path, &*state)?;
        eprintln!("Wrote snapshot to {}", path.display());
    }

    if json {
        let report = serde_json::json!({
            "state": &*state,
            "selection": controller.get_selection(),
        });
        SnapshotWriter::new(true).write_to(&mut std::io::stdout(), &report)?;
    } else {
        print_summary(&state, &controller.get_selection(), controller.dimensions());
    }
    Ok(())
}

fn print_summary(state: &AggregateState, selection: &Selection, dimensions: &[DimensionConfig]) {
    println!(
        "Records: {} (filtered: {})",
        state.total_count, state.filtered_count
    );
    if state.has_filters {
        let active: Vec<String> = selection
            .dimensions
            .iter()
            .filter(|d| !d.values.is_empty())
            .map(|d| format!("{}={}", d.dimension, join_values(&d.values)))
            .collect();
        println!("Filters: {}", active.join("; "));
    }

    for dim in dimensions {
        let Some(counts) = state.counts(&dim.name) else {
            continue;
        };
        let is_empty = state.is_empty_dimension(&dim.name);
        if is_empty && dim.hide_empty {
            continue;
        }
        let title = dim.label.as_deref().unwrap_or(&dim.name);
        if is_empty {
            println!("{} (insufficient unique values)", title);
        } else {
            println!("{}", title);
        }
        for bucket in ordered_buckets(counts, dim.sort) {
            let marker = if selection.contains(&dim.name, &bucket.value) {
                "  *"
            } else {
                ""
            };
            println!("  {}: {}{}", bucket.value, bucket.count, marker);
        }
        if counts.unrecognized > 0 {
            println!("  unrecognized: {}", counts.unrecognized);
        }
    }
}

fn ordered_buckets(counts: &DimensionCounts, by_count: bool) -> Vec<&BucketCount> {
    let mut buckets: Vec<_> = counts.buckets.iter().collect();
    if by_count {
        buckets.sort_by(|a, b| b.count.cmp(&a.count));
    }
    buckets
}

fn join_values(values: &[BucketValue]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Print ids of records matching the filters.
pub fn cmd_ids(
    config_path: &Path,
    data_path: &Path,
    selections: &[String],
    limit: usize,
    json: bool,
) -> FacetResult<()> {
    let mut controller = open_controller(config_path, data_path)?;
    apply_selections(&mut controller, selections)?;
    let ids = controller.filtered_ids();
    let shown: Vec<_> = ids.iter().take(limit).collect();

    if json {
        let report = serde_json::json!({
            "count": ids.len(),
            "ids": shown,
        });
        println!("{}", report);
    } else {
        for id in &shown {
            println!("{}", id);
        }
        if ids.len() > shown.len() {
            println!("... {} more", ids.len() - shown.len());
        }
    }
    Ok(())
}

/// List configured dimensions.
pub fn cmd_dimensions(config_path: &Path, json: bool) -> FacetResult<()> {
    let config = read_config(config_path)?;
    if json {
        SnapshotWriter::new(true).write_to(&mut std::io::stdout(), &config)?;
        return Ok(());
    }

    println!("Id field: {}", config.id_field);
    println!("Minimum non-zero buckets: {}", config.min_nonzero_buckets);
    for dim in &config.dimensions {
        let mut traits = Vec::new();
        if dim.array {
            traits.push("array");
        }
        if dim.dynamic {
            traits.push("dynamic");
        }
        if dim.hide_empty {
            traits.push("hide-empty");
        }
        let suffix = if traits.is_empty() {
            String::new()
        } else {
            format!(" [{}]", traits.join(", "))
        };
        println!(
            "  {} <- {}: {}{}",
            dim.name,
            dim.field,
            join_values(&dim.values),
            suffix
        );
    }
    Ok(())
}

/// Validate a configuration and, optionally, report data anomalies in a record file.
pub fn cmd_validate(config_path: &Path, data_path: Option<&Path>, json: bool) -> FacetResult<()> {
    let config = read_config(config_path)?;
    let Some(data_path) = data_path else {
        if json {
            println!(
                "{}",
                serde_json::json!({"valid": true, "dimensions": config.dimensions.len()})
            );
        } else {
            println!(
                "Configuration OK ({} dimensions)",
                config.dimensions.len()
            );
        }
        return Ok(());
    };

    let report = anomaly_report(config, data_path)?;
    if json {
        println!("{}", report);
    } else {
        println!("Configuration OK");
        println!("Records: {}", report["records"]);
        println!("Duplicate ids: {}", report["duplicate_ids"]);
        println!("Positional ids: {}", report["positional_ids"]);
        if let Some(dims) = report["unrecognized"].as_object() {
            for (name, count) in dims {
                println!("  {}: {} unrecognized", name, count);
            }
        }
    }
    Ok(())
}

fn anomaly_report(config: FacetConfig, data_path: &Path) -> FacetResult<serde_json::Value> {
    let records = RecordReader::new(config.id_field.clone()).read_from_file(data_path)?;
    let mut controller = FacetController::new();
    let state = controller.load(records, config)?;
    let unrecognized: serde_json::Map<String, serde_json::Value> = state
        .dimension_counts
        .iter()
        .map(|(name, counts)| (name.clone(), counts.unrecognized.into()))
        .collect();
    Ok(serde_json::json!({
        "valid": true,
        "records": state.total_count,
        "duplicate_ids": controller.store().duplicate_ids(),
        "positional_ids": controller.store().positional_ids(),
        "unrecognized": unrecognized,
    }))
}
