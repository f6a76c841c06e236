//! Text-generation collaborator boundary.
//!
//! The analysis core never talks to a model service directly; it receives a
//! [`TextGeneration`] implementation and treats every response as untrusted
//! text. Responses are parsed tolerantly: the first balanced JSON value is
//! extracted, and anything malformed degrades to the deterministic
//! fallbacks (classification defaults to general, insights come from the
//! [`crate::insight`] module).
//!
//! [`OfflineModel`] is a rule-based implementation that keeps the CLI and
//! the test suite fully deterministic.

use anyhow::Result;
use log::warn;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::chart::{ChartSpec, RawChartSpec, propose_default_specs};
use crate::correlation::Correlation;
use crate::insight::{self, InsightText};
use crate::intent::mentions_chart_type;
use crate::resolve::normalize;
use crate::summary::{ColumnType, DataSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Correlation,
    General,
}

/// Parsed classification of a chat question.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: QuestionKind,
    pub target_variable: Option<String>,
    pub specific_variable: Option<String>,
}

impl Classification {
    pub fn general() -> Self {
        Self {
            kind: QuestionKind::General,
            target_variable: None,
            specific_variable: None,
        }
    }
}

/// Open-ended answer to a general question; may carry chart proposals that
/// go through the same sanitization as upload proposals.
#[derive(Debug, Default, Deserialize)]
pub struct GeneralAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub charts: Vec<RawChartSpec>,
}

/// The external model collaborator. Implementations return raw text; the
/// core owns all parsing and every fallback.
pub trait TextGeneration {
    fn generate_chart_specs(&self, summary: &DataSummary) -> Result<String>;
    fn classify_question(&self, question: &str, numeric_columns: &[String]) -> Result<String>;
    fn generate_chart_insights(&self, spec: &ChartSpec, summary: &DataSummary) -> Result<String>;
    fn generate_correlation_insights(
        &self,
        target: &str,
        correlations: &[Correlation],
    ) -> Result<String>;
    fn answer_general(&self, question: &str, summary: &DataSummary) -> Result<String>;
}

/// Extracts the first balanced JSON value from free-form model text.
/// Handles responses that wrap JSON in prose or code fences.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let start = raw.find(['{', '['])?;
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return serde_json::from_str(&raw[start..=idx]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct WireClassification {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "targetVariable", alias = "target_variable")]
    target_variable: Option<String>,
    #[serde(rename = "specificVariable", alias = "specific_variable")]
    specific_variable: Option<String>,
}

/// Classification parse with the documented failure default: anything
/// malformed is `general` with no target.
pub fn parse_classification(raw: &str) -> Classification {
    let Some(value) = extract_json(raw) else {
        warn!("Classifier returned non-JSON output; defaulting to general");
        return Classification::general();
    };
    match serde_json::from_value::<WireClassification>(value) {
        Ok(wire) => {
            let kind = match wire.kind.as_deref().map(str::trim) {
                Some("correlation") => QuestionKind::Correlation,
                _ => QuestionKind::General,
            };
            Classification {
                kind,
                target_variable: wire.target_variable.filter(|t| !t.trim().is_empty()),
                specific_variable: wire.specific_variable.filter(|t| !t.trim().is_empty()),
            }
        }
        Err(_) => Classification::general(),
    }
}

/// Chart proposals parse: accepts a bare array, an object with a `charts`
/// key, or a single spec object. Unusable elements are skipped.
pub fn parse_chart_specs(raw: &str) -> Vec<RawChartSpec> {
    let Some(value) = extract_json(raw) else {
        return Vec::new();
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(ref map) if map.contains_key("charts") => {
            match map.get("charts") {
                Some(Value::Array(items)) => items.clone(),
                _ => vec![value],
            }
        }
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawChartSpec>(item).ok())
        .collect()
}

pub fn parse_insight(raw: &str) -> Option<InsightText> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).ok()
}

pub fn parse_general_answer(raw: &str) -> Option<GeneralAnswer> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).ok()
}

/// Rule-based stand-in for a hosted model. Deterministic by construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineModel;

impl OfflineModel {
    /// Columns mentioned in the question, in order of appearance.
    fn mentioned_columns(question: &str, columns: &[String]) -> Vec<String> {
        let q = normalize(question);
        let mut found: Vec<(usize, String)> = columns
            .iter()
            .filter_map(|col| {
                let needle = normalize(col);
                if needle.is_empty() {
                    return None;
                }
                q.find(&needle).map(|pos| (pos, col.clone()))
            })
            .collect();
        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, col)| col).collect()
    }

    fn looks_like_correlation(question: &str) -> bool {
        let q = question.to_lowercase();
        ["affect", "correlat", "driv", "impact", "influenc", "relationship", "depend"]
            .iter()
            .any(|kw| q.contains(kw))
    }
}

impl TextGeneration for OfflineModel {
    fn generate_chart_specs(&self, summary: &DataSummary) -> Result<String> {
        Ok(serde_json::to_string(&propose_default_specs(summary))?)
    }

    fn classify_question(&self, question: &str, numeric_columns: &[String]) -> Result<String> {
        // Chart-type intent always overrides correlation intent.
        let correlation =
            Self::looks_like_correlation(question) && !mentions_chart_type(question);
        let mentioned = Self::mentioned_columns(question, numeric_columns);
        let response = if correlation {
            json!({
                "type": "correlation",
                "targetVariable": mentioned.first(),
                "specificVariable": mentioned.get(1),
            })
        } else {
            json!({ "type": "general" })
        };
        Ok(response.to_string())
    }

    fn generate_chart_insights(&self, spec: &ChartSpec, _summary: &DataSummary) -> Result<String> {
        Ok(serde_json::to_string(&insight::chart_insight(spec))?)
    }

    fn generate_correlation_insights(
        &self,
        target: &str,
        correlations: &[Correlation],
    ) -> Result<String> {
        let texts: Vec<String> = correlations
            .iter()
            .take(3)
            .map(|c| insight::correlation_insight(target, c))
            .collect();
        Ok(serde_json::to_string(&texts)?)
    }

    fn answer_general(&self, question: &str, summary: &DataSummary) -> Result<String> {
        let mentioned = Self::mentioned_columns(question, &summary.column_names());
        let numeric = mentioned.iter().find(|c| summary.is_numeric(c));
        let grouping = mentioned.iter().find(|c| {
            summary
                .columns
                .iter()
                .any(|p| &p.name == *c && p.column_type == ColumnType::Text)
        });
        let chart_type = ["pie", "bar", "line", "scatter", "area"]
            .iter()
            .find(|t| question.to_lowercase().contains(*t))
            .copied();

        let mut charts = Vec::new();
        if let (Some(chart_type), Some(numeric)) = (chart_type, numeric) {
            let x = grouping
                .cloned()
                .or_else(|| summary.date_columns.first().cloned());
            if let Some(x) = x {
                charts.push(json!({
                    "type": chart_type,
                    "title": format!("{numeric} by {x}"),
                    "x": x,
                    "y": numeric,
                    "aggregate": if chart_type == "line" || chart_type == "area" { Value::Null } else { json!("sum") },
                }));
            }
        }
        let answer = if charts.is_empty() {
            format!(
                "The dataset has {} rows and {} columns ({} numeric). Ask about a specific measure to see it charted.",
                summary.row_count,
                summary.column_count,
                summary.numeric_columns.len()
            )
        } else {
            format!("Here is the chart you asked for, built from {} rows.", summary.row_count)
        };
        Ok(json!({ "answer": answer, "charts": charts }).to_string())
    }
}
