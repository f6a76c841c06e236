//! Chart data shaping: turns raw rows plus a [`ChartSpec`] into plot-ready
//! records.
//!
//! Shaping is self-healing: when a spec references a column that does not
//! exist (or holds no values), the requested name is repaired through the
//! first-token fallback and the spec is rewritten in place. At most one
//! substitution happens per axis, so shaping always terminates. A spec
//! that cannot be repaired shapes to an empty series, which callers treat
//! as "unplottable" rather than an error.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;
use serde_json::{Map, Value, json};

use crate::chart::{AggregateMode, ChartSpec, ChartType};
use crate::data::{Row, display_value, is_blank, to_number};
use crate::resolve::fallback_column;

/// Scatter series larger than this are decimated before plotting.
pub const MAX_SCATTER_POINTS: usize = 1000;
const BAR_TOP_GROUPS: usize = 10;
const PIE_TOP_GROUPS: usize = 5;

/// Shapes `rows` according to the spec, possibly rewriting `spec.x` /
/// `spec.y` (and `spec.y2`) to repaired column names.
pub fn shape_chart_data(rows: &[Row], spec: &mut ChartSpec) -> Vec<Value> {
    if rows.is_empty() {
        return Vec::new();
    }
    let mut columns: Vec<String> = rows[0].keys().cloned().collect();
    columns.sort();

    if !heal_axis(rows, &columns, &mut spec.x) || !heal_axis(rows, &columns, &mut spec.y) {
        return Vec::new();
    }
    if let Some(y2) = spec.y2.clone() {
        let mut y2_name = y2;
        if heal_axis(rows, &columns, &mut y2_name) {
            spec.y2 = Some(y2_name);
        } else {
            spec.y2 = None;
        }
    }

    match spec.chart_type {
        ChartType::Scatter => shape_scatter(rows, &spec.x, &spec.y),
        ChartType::Pie => {
            let mode = effective_mode(spec.aggregate, AggregateMode::Sum);
            let mut records = aggregate_rows(rows, &spec.x, &spec.y, mode);
            sort_desc_by_value(&mut records, &spec.y);
            records.truncate(PIE_TOP_GROUPS);
            records
        }
        ChartType::Bar => {
            let mode = effective_mode(spec.aggregate, AggregateMode::Sum);
            let mut records = aggregate_rows(rows, &spec.x, &spec.y, mode);
            sort_desc_by_value(&mut records, &spec.y);
            records.truncate(BAR_TOP_GROUPS);
            records
        }
        ChartType::Line | ChartType::Area => {
            if let Some(y2) = spec.y2.clone() {
                return shape_dual_axis(rows, &spec.x, &spec.y, &y2);
            }
            if spec.aggregate != AggregateMode::None {
                let mut records = aggregate_rows(rows, &spec.x, &spec.y, spec.aggregate);
                records.sort_by(|a, b| {
                    string_field(a, &spec.x).cmp(&string_field(b, &spec.x))
                });
                records
            } else {
                shape_raw_line(rows, &spec.x, &spec.y)
            }
        }
    }
}

/// Validates one axis column, applying the bounded fallback when the column
/// is missing from the rows or blank everywhere. Returns false when the
/// axis cannot be made plottable.
fn heal_axis(rows: &[Row], columns: &[String], axis: &mut String) -> bool {
    if column_usable(rows, axis) {
        return true;
    }
    // Restricting candidates to usable columns keeps an all-blank column
    // from substituting for itself.
    let usable: Vec<String> = columns
        .iter()
        .filter(|c| column_usable(rows, c))
        .cloned()
        .collect();
    if let Some(replacement) = fallback_column(axis, &usable) {
        debug!("Substituting column '{axis}' with '{replacement}'");
        *axis = replacement.to_string();
        return true;
    }
    false
}

fn column_usable(rows: &[Row], column: &str) -> bool {
    rows[0].contains_key(column)
        && rows
            .iter()
            .any(|row| row.get(column).is_some_and(|cell| !is_blank(cell)))
}

fn effective_mode(requested: AggregateMode, default: AggregateMode) -> AggregateMode {
    if requested == AggregateMode::None {
        default
    } else {
        requested
    }
}

fn shape_scatter(rows: &[Row], x: &str, y: &str) -> Vec<Value> {
    let points: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            let px = row.get(x).map(to_number)?;
            let py = row.get(y).map(to_number)?;
            if px.is_nan() || py.is_nan() {
                None
            } else {
                Some(json!({ "x": px, "y": py }))
            }
        })
        .collect();
    decimate(points, MAX_SCATTER_POINTS)
}

/// Uniform decimation by integer step, then truncation. Keeps the overall
/// shape of the distribution while bounding the series length.
pub fn decimate(points: Vec<Value>, limit: usize) -> Vec<Value> {
    if points.len() <= limit {
        return points;
    }
    let step = points.len() / limit;
    let mut sampled: Vec<Value> = points.into_iter().step_by(step.max(1)).collect();
    sampled.truncate(limit);
    sampled
}

fn shape_raw_line(rows: &[Row], x: &str, y: &str) -> Vec<Value> {
    let mut records: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            let label = display_value(row.get(x)?);
            let value = to_number(row.get(y)?);
            if value.is_nan() {
                None
            } else {
                Some(json!({ "x": label, "y": value }))
            }
        })
        .collect();
    // Lexicographic x ordering is intentional even for numeric or date
    // labels; ordinal labels like "2024-01" < "2024-02" rely on it.
    records.sort_by(|a, b| string_field(a, "x").cmp(&string_field(b, "x")));
    records
}

/// One record per x value with both series attached; a missing side is
/// emitted as null so the axes stay independent.
pub fn shape_dual_axis(rows: &[Row], x: &str, y1: &str, y2: &str) -> Vec<Value> {
    let mut records: Vec<Value> = rows
        .iter()
        .filter_map(|row| {
            let label = display_value(row.get(x)?);
            let v1 = to_number(row.get(y1)?);
            let v2 = to_number(row.get(y2)?);
            if v1.is_nan() && v2.is_nan() {
                return None;
            }
            let mut record = Map::new();
            record.insert("x".to_string(), Value::String(label));
            record.insert(y1.to_string(), number_or_null(v1));
            record.insert(y2.to_string(), number_or_null(v2));
            Some(Value::Object(record))
        })
        .collect();
    records.sort_by(|a, b| string_field(a, "x").cmp(&string_field(b, "x")));
    records
}

fn number_or_null(value: f64) -> Value {
    if value.is_nan() {
        Value::Null
    } else {
        json!(value)
    }
}

/// Groups coerced values of `value_column` by the raw string form of
/// `group_by`, then reduces each group. Non-coercible values are dropped
/// from their group, never zero-filled; groups left empty are dropped.
pub fn aggregate_rows(
    rows: &[Row],
    group_by: &str,
    value_column: &str,
    mode: AggregateMode,
) -> Vec<Value> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        let Some(key_cell) = row.get(group_by) else { continue };
        let key = display_value(key_cell);
        let value = row.get(value_column).map(to_number).unwrap_or(f64::NAN);
        if value.is_nan() {
            continue;
        }
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key.clone());
                Vec::new()
            })
            .push(value);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let values = groups.get(&key)?;
            if values.is_empty() {
                return None;
            }
            let aggregated = match mode {
                AggregateMode::Sum => values.iter().sum(),
                AggregateMode::Mean => values.iter().sum::<f64>() / values.len() as f64,
                AggregateMode::Count => values.len() as f64,
                AggregateMode::None => values[0],
            };
            let mut record = Map::new();
            record.insert(group_by.to_string(), Value::String(key));
            record.insert(value_column.to_string(), json!(aggregated));
            Some(Value::Object(record))
        })
        .collect()
}

fn sort_desc_by_value(records: &mut [Value], value_column: &str) {
    records.sort_by(|a, b| {
        let va = numeric_field(a, value_column);
        let vb = numeric_field(b, value_column);
        vb.partial_cmp(&va).unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn string_field(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn numeric_field(record: &Value, key: &str) -> f64 {
    record
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(f64::NAN)
}

/// Paired non-NaN numeric values of two columns.
pub fn numeric_pairs(rows: &[Row], x: &str, y: &str) -> Vec<(f64, f64)> {
    rows.iter()
        .filter_map(|row| {
            let px = row.get(x).map(to_number)?;
            let py = row.get(y).map(to_number)?;
            if px.is_nan() || py.is_nan() {
                None
            } else {
                Some((px, py))
            }
        })
        .collect()
}

/// Extent of a column's coercible values.
pub fn numeric_range(rows: &[Row], column: &str) -> Option<(f64, f64)> {
    rows.iter()
        .filter_map(|row| {
            let v = row.get(column).map(to_number)?;
            if v.is_nan() { None } else { Some(v) }
        })
        .minmax()
        .into_option()
}

/// Pads an axis domain by 10% of its range on both ends (or by 1 when the
/// range is zero) so points never sit on the chart edge.
pub fn padded_domain(min: f64, max: f64) -> [f64; 2] {
    let range = max - min;
    let pad = if range == 0.0 { 1.0 } else { range * 0.1 };
    [min - pad, max + pad]
}

/// Ordinary least squares fit; `None` when the x variance term is zero.
pub fn ols_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.is_empty() {
        return None;
    }
    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_x2: f64 = points.iter().map(|(x, _)| x * x).sum();
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((slope, intercept))
}

/// Two endpoint records for a fitted line across the (padded) x domain,
/// enough for the renderer to draw a straight overlay.
pub fn trend_line_records(points: &[(f64, f64)], x_domain: [f64; 2]) -> Vec<Value> {
    match ols_fit(points) {
        Some((slope, intercept)) => {
            let [lo, hi] = x_domain;
            vec![
                json!({ "x": lo, "y": slope * lo + intercept }),
                json!({ "x": hi, "y": slope * hi + intercept }),
            ]
        }
        None => Vec::new(),
    }
}

/// Axis orientation for correlation scatters: the variable with the smaller
/// numeric range goes on X. A visualization convention, kept for output
/// parity with the rest of the pipeline's consumers.
pub fn orient_scatter_axes<'a>(
    rows: &[Row],
    target: &'a str,
    other: &'a str,
) -> (&'a str, &'a str) {
    let target_span = numeric_range(rows, target)
        .map(|(lo, hi)| hi - lo)
        .unwrap_or(0.0);
    let other_span = numeric_range(rows, other)
        .map(|(lo, hi)| hi - lo)
        .unwrap_or(0.0);
    if target_span <= other_span {
        (target, other)
    } else {
        (other, target)
    }
}
