//! Question classification: a fixed-priority chain of pure detectors.
//!
//! Each detector is a predicate + extractor over the raw question text.
//! The first detector that succeeds short-circuits the rest; only when
//! none match does the question fall through to the generic collaborator
//! classification. Phrase splitting on " vs " / " and " is deliberately
//! literal, so column names containing those words can mis-parse; that
//! behavior is pinned by tests rather than patched.

use std::sync::OnceLock;

use regex::Regex;

use crate::resolve::resolve_column;
use crate::summary::DataSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// "A and B as a line chart" style question: one dual-y-axis line chart.
    TwoSeriesLine { first: String, second: String },
    /// Literal " vs " question; `dual_axis` selects between a single
    /// dual-axis line chart and the wider scatter-plus-lines fan-out.
    Vs {
        first: String,
        second: String,
        dual_axis: bool,
    },
    /// No specialized detector matched; defer to the collaborator.
    Generic,
}

/// Explicit `name (x-axis)` / `y axis = name` annotations. These outrank
/// any column chosen by heuristics later in the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisOverrides {
    pub x: Option<String>,
    pub y: Option<String>,
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid builtin regex"))
}

fn line_cue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r"\bline\b|\bplot\b|\bgraph\b|over (time|months|weeks|days)",
    )
}

fn dual_axis_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"two separate ax[ei]s|separate ax[ei]s|dual axis")
}

fn leading_verb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r"^(?:can you |could you |please )?(?:show|plot|graph|chart|display|draw|compare)(?: me)?(?: a| the)?\s+",
    )
}

fn chart_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(
        &RE,
        r"\s+over\s+.*$|on two separate ax[ei]s|two separate ax[ei]s|dual axis|as a line chart|line chart|line graph|\b(?:charts?|graphs?|plots?|lines?)\b|together",
    )
}

fn chart_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\b(pie|bar|line|scatter|area|histogram)\b")
}

/// Runs the specialized detectors in priority order.
pub fn detect_intent(question: &str, summary: &DataSummary) -> Intent {
    if let Some(intent) = detect_two_series_line(question, summary) {
        return intent;
    }
    if let Some(intent) = detect_vs(question, summary) {
        return intent;
    }
    Intent::Generic
}

/// Detector 1: two numeric series joined by " and " or " vs " together with
/// a line-chart cue, or an explicit dual-axis request.
pub fn detect_two_series_line(question: &str, summary: &DataSummary) -> Option<Intent> {
    let q = question.to_lowercase();
    let joined = q.contains(" and ") || q.contains(" vs ");
    let cued = line_cue_re().is_match(&q) || dual_axis_re().is_match(&q);
    if !joined || !cued {
        return None;
    }
    let (left, right) = split_on_first(&q, &[" vs ", " and "])?;
    let first = resolve_numeric(&strip_chart_phrases(left), summary)?;
    let second = resolve_numeric(&strip_chart_phrases(right), summary)?;
    Some(Intent::TwoSeriesLine { first, second })
}

/// Detector 2: literal " vs ", with or without a chart-type preference.
pub fn detect_vs(question: &str, summary: &DataSummary) -> Option<Intent> {
    let q = question.to_lowercase();
    let (left, right) = split_on_first(&q, &[" vs "])?;
    let left = leading_verb_re().replace(left.trim(), "").to_string();
    let first = resolve_numeric(&strip_chart_phrases(&left), summary)?;
    let second = resolve_numeric(&strip_chart_phrases(right), summary)?;
    let dual_axis =
        dual_axis_re().is_match(&q) || q.contains("line chart") || q.contains("plot") || q.contains("graph");
    Some(Intent::Vs {
        first,
        second,
        dual_axis,
    })
}

fn split_on_first<'a>(text: &'a str, separators: &[&str]) -> Option<(&'a str, &'a str)> {
    for sep in separators {
        if let Some(idx) = text.find(sep) {
            return Some((&text[..idx], &text[idx + sep.len()..]));
        }
    }
    None
}

fn strip_chart_phrases(half: &str) -> String {
    let stripped = leading_verb_re().replace(half.trim(), "");
    let stripped = chart_phrase_re().replace_all(&stripped, "");
    stripped.trim_matches(|c: char| c.is_whitespace() || c == '?' || c == '.' || c == ',')
        .to_string()
}

fn resolve_numeric(fragment: &str, summary: &DataSummary) -> Option<String> {
    if fragment.is_empty() {
        return None;
    }
    let columns = summary.column_names();
    let resolved = resolve_column(fragment, &columns)?;
    summary.is_numeric(resolved).then(|| resolved.to_string())
}

/// Extracts explicit axis annotations anywhere in the text. Both the
/// `name (x-axis)` and `x-axis: name` / `x axis = name` forms are honored.
pub fn axis_overrides(question: &str) -> AxisOverrides {
    static NAME_THEN_AXIS: OnceLock<Regex> = OnceLock::new();
    static AXIS_THEN_NAME: OnceLock<Regex> = OnceLock::new();
    let name_then_axis = cached(
        &NAME_THEN_AXIS,
        r"(?i)([A-Za-z0-9_]+)\s*\(\s*([xy])[\s-]?axis\s*\)",
    );
    let axis_then_name = cached(
        &AXIS_THEN_NAME,
        r"(?i)\b([xy])[\s-]?axis\s*[:=]\s*([A-Za-z0-9_]+(?:\s+[A-Za-z0-9_]+)*)",
    );

    let mut overrides = AxisOverrides::default();
    for captures in name_then_axis.captures_iter(question) {
        let name = captures[1].trim().to_string();
        match captures[2].to_lowercase().as_str() {
            "x" => overrides.x = Some(name),
            _ => overrides.y = Some(name),
        }
    }
    for captures in axis_then_name.captures_iter(question) {
        let name = captures[2].trim().to_string();
        match captures[1].to_lowercase().as_str() {
            "x" => overrides.x = Some(name),
            _ => overrides.y = Some(name),
        }
    }
    overrides
}

/// Chart-type intent always overrides correlation intent downstream.
pub fn mentions_chart_type(question: &str) -> bool {
    chart_type_re().is_match(&question.to_lowercase())
}

/// True when the user asks for the series combined into one chart.
pub fn wants_single_chart(question: &str) -> bool {
    let q = question.to_lowercase();
    q.contains("one line chart")
        || q.contains("single chart")
        || q.contains("one chart")
        || q.contains("together")
}

/// X-axis election for dual-axis charts: first date column, else a column
/// named like a period, else the first column overall.
pub fn choose_time_axis(summary: &DataSummary) -> Option<String> {
    if let Some(date) = summary.date_columns.first() {
        return Some(date.clone());
    }
    if let Some(period) = summary.columns.iter().find(|c| {
        let lowered = c.name.to_lowercase();
        lowered.contains("month") || lowered.contains("date") || lowered.contains("week")
    }) {
        return Some(period.name.clone());
    }
    summary.columns.first().map(|c| c.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{ColumnProfile, ColumnType};

    fn summary(numeric: &[&str], date: &[&str], text: &[&str]) -> DataSummary {
        let mut columns = Vec::new();
        for name in date {
            columns.push(ColumnProfile {
                name: name.to_string(),
                column_type: ColumnType::Date,
                sample_values: vec![],
            });
        }
        for name in numeric {
            columns.push(ColumnProfile {
                name: name.to_string(),
                column_type: ColumnType::Numeric,
                sample_values: vec![],
            });
        }
        for name in text {
            columns.push(ColumnProfile {
                name: name.to_string(),
                column_type: ColumnType::Text,
                sample_values: vec![],
            });
        }
        DataSummary {
            row_count: 0,
            column_count: columns.len(),
            columns,
            numeric_columns: numeric.iter().map(|n| n.to_string()).collect(),
            date_columns: date.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[test]
    fn two_series_detector_needs_a_line_cue() {
        let s = summary(&["Price", "Sales"], &["Month"], &[]);
        assert_eq!(
            detect_two_series_line("show Price and Sales as a line chart", &s),
            Some(Intent::TwoSeriesLine {
                first: "Price".into(),
                second: "Sales".into()
            })
        );
        assert_eq!(detect_two_series_line("Price and Sales summary", &s), None);
    }

    #[test]
    fn two_series_detector_rejects_non_numeric_halves() {
        let s = summary(&["Sales"], &["Month"], &["Region"]);
        assert_eq!(
            detect_two_series_line("plot Region and Sales over time", &s),
            None
        );
    }

    #[test]
    fn vs_detector_triggers_on_bare_vs() {
        let s = summary(&["Price", "Sales"], &[], &[]);
        assert_eq!(
            detect_vs("Price vs Sales", &s),
            Some(Intent::Vs {
                first: "Price".into(),
                second: "Sales".into(),
                dual_axis: false,
            })
        );
    }

    #[test]
    fn vs_detector_marks_dual_axis_when_requested() {
        let s = summary(&["Price", "Sales"], &[], &[]);
        assert_eq!(
            detect_vs("Price vs Sales on two separate axes", &s),
            Some(Intent::Vs {
                first: "Price".into(),
                second: "Sales".into(),
                dual_axis: true,
            })
        );
    }

    #[test]
    fn detect_intent_prefers_two_series_over_vs() {
        let s = summary(&["Price", "Sales"], &["Month"], &[]);
        assert!(matches!(
            detect_intent("Price vs Sales over time", &s),
            Intent::TwoSeriesLine { .. }
        ));
    }

    #[test]
    fn axis_overrides_parses_both_annotation_forms() {
        let overrides = axis_overrides("plot Sales (y-axis) and Price (x axis)");
        assert_eq!(overrides.x.as_deref(), Some("Price"));
        assert_eq!(overrides.y.as_deref(), Some("Sales"));

        let overrides = axis_overrides("chart with x-axis: Month, y axis = Total Sales");
        assert_eq!(overrides.x.as_deref(), Some("Month"));
        assert_eq!(overrides.y.as_deref(), Some("Total Sales"));
    }

    #[test]
    fn chart_type_mentions_are_detected() {
        assert!(mentions_chart_type("show a pie chart of Sales"));
        assert!(mentions_chart_type("bar of sales by region"));
        assert!(!mentions_chart_type("what affects Sales"));
    }

    #[test]
    fn choose_time_axis_prefers_dates_then_period_names() {
        let s = summary(&["Sales"], &["OrderDate"], &["Region"]);
        assert_eq!(choose_time_axis(&s), Some("OrderDate".into()));

        let s = summary(&["Sales", "Week Number"], &[], &["Region"]);
        assert_eq!(choose_time_axis(&s), Some("Week Number".into()));

        let s = summary(&["Sales"], &[], &["Region"]);
        assert_eq!(choose_time_axis(&s), Some("Sales".into()));
    }

    #[test]
    fn and_splitting_is_literal_first_occurrence() {
        // A column literally named with "and" in it splits at the first
        // " and "; fuzzy resolution then reassembles the halves. Pinned
        // behavior, not a bug fix target.
        let s = summary(&["Supply and Demand", "Sales"], &["Month"], &[]);
        assert_eq!(
            detect_two_series_line("plot Supply and Demand and Sales over time", &s),
            Some(Intent::TwoSeriesLine {
                first: "Supply and Demand".into(),
                second: "Sales".into()
            })
        );
    }
}
