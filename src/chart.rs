//! Chart specification model and sanitization.
//!
//! Specs arrive from two places: the detector/correlation paths build them
//! directly, and the text-generation collaborator proposes them as loose
//! JSON. Collaborator output is repaired here: axis fields are unwrapped to
//! single strings and column names are coerced onto real dataset columns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolve::{apply_synonyms, fallback_column, resolve_column};
use crate::summary::{ColumnType, DataSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Scatter,
    Pie,
    Area,
}

impl ChartType {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "line" => Some(Self::Line),
            "bar" => Some(Self::Bar),
            "scatter" => Some(Self::Scatter),
            "pie" => Some(Self::Pie),
            "area" => Some(Self::Area),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    Sum,
    Mean,
    Count,
    #[default]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<String>,
    #[serde(default)]
    pub aggregate: AggregateMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_domain: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_domain: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trend_line: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_insight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Value>,
}

impl ChartSpec {
    pub fn new(chart_type: ChartType, title: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            chart_type,
            title: title.into(),
            x: x.into(),
            y: y.into(),
            y2: None,
            aggregate: AggregateMode::None,
            x_domain: None,
            y_domain: None,
            trend_line: Vec::new(),
            key_insight: None,
            recommendation: None,
            data: Vec::new(),
        }
    }

    pub fn with_aggregate(mut self, aggregate: AggregateMode) -> Self {
        self.aggregate = aggregate;
        self
    }
}

/// A chart proposal as the collaborator emits it: axis fields may be
/// strings, arrays, or nested objects, and the type label is free text.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChartSpec {
    #[serde(rename = "type", default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x: Value,
    #[serde(default)]
    pub y: Value,
    #[serde(default)]
    pub aggregate: Option<String>,
}

/// Unwraps a proposed axis field into a single column-name string.
/// Arrays take their first string element; objects take the first of the
/// conventional name keys, else the first string value.
pub fn sanitize_axis(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(sanitize_axis),
        Value::Object(map) => {
            for key in ["name", "column", "field"] {
                if let Some(found) = map.get(key).and_then(sanitize_axis) {
                    return Some(found);
                }
            }
            map.values().find_map(sanitize_axis)
        }
        _ => None,
    }
}

/// Maps a requested column name onto a real one: synonym substitution,
/// fuzzy resolution, then the first-token fallback.
pub fn repair_column(requested: &str, columns: &[String]) -> Option<String> {
    let substituted = apply_synonyms(requested);
    resolve_column(&substituted, columns)
        .or_else(|| fallback_column(&substituted, columns))
        .map(|c| c.to_string())
}

/// Turns a raw collaborator proposal into a validated [`ChartSpec`], or
/// `None` when the proposal cannot be mapped onto the dataset.
pub fn repair_spec(raw: &RawChartSpec, columns: &[String]) -> Option<ChartSpec> {
    let chart_type = raw.chart_type.as_deref().and_then(ChartType::parse)?;
    let x = repair_column(&sanitize_axis(&raw.x)?, columns)?;
    let y = repair_column(&sanitize_axis(&raw.y)?, columns)?;
    let title = raw
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("{y} by {x}"));
    let aggregate = match raw.aggregate.as_deref().map(str::trim) {
        Some("sum") => AggregateMode::Sum,
        Some("mean") | Some("avg") | Some("average") => AggregateMode::Mean,
        Some("count") => AggregateMode::Count,
        _ => AggregateMode::None,
    };
    Some(ChartSpec::new(chart_type, title, x, y).with_aggregate(aggregate))
}

/// Deterministic chart proposals derived from the summary alone. Used when
/// the collaborator yields nothing usable and by the offline model.
pub fn propose_default_specs(summary: &DataSummary) -> Vec<ChartSpec> {
    let mut specs = Vec::new();
    let date = summary.date_columns.first();
    let categorical = summary
        .columns
        .iter()
        .find(|c| c.column_type == ColumnType::Text)
        .map(|c| c.name.clone());

    if let Some(date) = date {
        for numeric in summary.numeric_columns.iter().take(2) {
            specs.push(ChartSpec::new(
                ChartType::Line,
                format!("{numeric} over {date}"),
                date.clone(),
                numeric.clone(),
            ));
        }
    }
    if let Some(cat) = &categorical {
        for numeric in summary.numeric_columns.iter().take(2) {
            specs.push(
                ChartSpec::new(
                    ChartType::Bar,
                    format!("{numeric} by {cat}"),
                    cat.clone(),
                    numeric.clone(),
                )
                .with_aggregate(AggregateMode::Sum),
            );
        }
    }
    if summary.numeric_columns.len() >= 2 {
        specs.push(ChartSpec::new(
            ChartType::Scatter,
            format!(
                "{} vs {}",
                summary.numeric_columns[0], summary.numeric_columns[1]
            ),
            summary.numeric_columns[0].clone(),
            summary.numeric_columns[1].clone(),
        ));
    }
    if let Some(cat) = &categorical
        && let Some(numeric) = summary.numeric_columns.first()
    {
        specs.push(
            ChartSpec::new(
                ChartType::Pie,
                format!("{numeric} share by {cat}"),
                cat.clone(),
                numeric.clone(),
            )
            .with_aggregate(AggregateMode::Sum),
        );
    }
    specs.truncate(6);
    specs
}
