//! Deterministic insight text derived from already-shaped chart data.
//!
//! Used whenever the text-generation collaborator fails or returns
//! something unparseable, so every emitted chart still carries a readable
//! key insight and recommendation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart::{ChartSpec, ChartType};
use crate::correlation::Correlation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightText {
    pub key_insight: String,
    pub recommendation: String,
}

/// Summarizes a shaped chart from its own numbers.
pub fn chart_insight(spec: &ChartSpec) -> InsightText {
    if spec.data.is_empty() {
        return InsightText {
            key_insight: format!("No plottable data was found for {}.", spec.title),
            recommendation: "Check that the referenced columns contain values.".to_string(),
        };
    }
    match spec.chart_type {
        ChartType::Bar | ChartType::Pie => grouped_insight(spec),
        ChartType::Line | ChartType::Area => series_insight(spec),
        ChartType::Scatter => scatter_insight(spec),
    }
}

fn grouped_insight(spec: &ChartSpec) -> InsightText {
    let values: Vec<f64> = spec
        .data
        .iter()
        .filter_map(|record| numeric_field(record, &spec.y))
        .collect();
    let total: f64 = values.iter().sum();
    let top_label = spec
        .data
        .first()
        .and_then(|record| string_field(record, &spec.x))
        .unwrap_or_default();
    let share = if total != 0.0 {
        values.first().copied().unwrap_or(0.0) / total * 100.0
    } else {
        0.0
    };
    InsightText {
        key_insight: format!(
            "{top_label} leads {} with {share:.0}% of the plotted total across {} groups.",
            spec.y,
            spec.data.len()
        ),
        recommendation: format!(
            "Drill into {top_label} to understand what separates it from the other groups."
        ),
    }
}

fn series_insight(spec: &ChartSpec) -> InsightText {
    let values: Vec<f64> = spec
        .data
        .iter()
        .filter_map(|record| {
            numeric_field(record, &spec.y).or_else(|| numeric_field(record, "y"))
        })
        .collect();
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return InsightText {
            key_insight: format!("{} holds no numeric values to trend.", spec.y),
            recommendation: "Pick a numeric measure for the y-axis.".to_string(),
        };
    };
    let direction = if last > first {
        "rose"
    } else if last < first {
        "fell"
    } else {
        "held steady"
    };
    let change = if *first != 0.0 {
        format!(" ({:+.1}%)", (last - first) / first.abs() * 100.0)
    } else {
        String::new()
    };
    InsightText {
        key_insight: format!(
            "{} {direction} from {first} to {last}{change} across {} points.",
            spec.y,
            values.len()
        ),
        recommendation: format!("Investigate the periods where {} shifted fastest.", spec.y),
    }
}

fn scatter_insight(spec: &ChartSpec) -> InsightText {
    let direction = match spec.trend_line.as_slice() {
        [first, second] => {
            let y0 = numeric_field(first, "y").unwrap_or(0.0);
            let y1 = numeric_field(second, "y").unwrap_or(0.0);
            if y1 > y0 {
                "tend to rise together"
            } else if y1 < y0 {
                "move in opposite directions"
            } else {
                "show no clear joint movement"
            }
        }
        _ => "show no clear joint movement",
    };
    InsightText {
        key_insight: format!(
            "{} and {} {direction} across {} plotted points.",
            spec.x,
            spec.y,
            spec.data.len()
        ),
        recommendation: "Correlation is not causation; validate the relationship before acting on it."
            .to_string(),
    }
}

/// One sentence describing a single correlation result. The signed
/// coefficient is reported exactly as computed.
pub fn correlation_insight(target: &str, correlation: &Correlation) -> String {
    let strength = describe_strength(correlation.correlation);
    let direction = if correlation.correlation >= 0.0 {
        "positive"
    } else {
        "negative"
    };
    format!(
        "{} shows a {strength} {direction} correlation with {target} (r = {:.2}, n = {}).",
        correlation.variable, correlation.correlation, correlation.n_pairs
    )
}

pub fn describe_strength(r: f64) -> &'static str {
    let magnitude = r.abs();
    if magnitude >= 0.7 {
        "strong"
    } else if magnitude >= 0.4 {
        "moderate"
    } else {
        "weak"
    }
}

fn numeric_field(record: &Value, key: &str) -> Option<f64> {
    record.get(key).and_then(Value::as_f64)
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) if !other.is_null() => Some(other.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AggregateMode, ChartSpec, ChartType};
    use serde_json::json;

    #[test]
    fn grouped_insight_reports_leading_group_share() {
        let mut spec = ChartSpec::new(ChartType::Bar, "Sales by Region", "Region", "Sales")
            .with_aggregate(AggregateMode::Sum);
        spec.data = vec![
            json!({"Region": "North", "Sales": 75.0}),
            json!({"Region": "South", "Sales": 25.0}),
        ];
        let insight = chart_insight(&spec);
        assert!(insight.key_insight.contains("North"));
        assert!(insight.key_insight.contains("75%"));
    }

    #[test]
    fn series_insight_describes_direction() {
        let mut spec = ChartSpec::new(ChartType::Line, "Sales over Month", "Month", "Sales");
        spec.data = vec![json!({"x": "2024-01", "y": 10.0}), json!({"x": "2024-02", "y": 15.0})];
        let insight = chart_insight(&spec);
        assert!(insight.key_insight.contains("rose"));
    }

    #[test]
    fn correlation_insight_keeps_the_sign() {
        let text = correlation_insight(
            "Sales",
            &Correlation {
                variable: "Price".into(),
                correlation: -0.82,
                n_pairs: 40,
            },
        );
        assert!(text.contains("strong negative"));
        assert!(text.contains("-0.82"));
    }

    #[test]
    fn describe_strength_buckets() {
        assert_eq!(describe_strength(0.9), "strong");
        assert_eq!(describe_strength(-0.5), "moderate");
        assert_eq!(describe_strength(0.1), "weak");
    }
}
