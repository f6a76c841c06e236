//! Chart spec generation: the orchestration layer over the resolver,
//! correlation engine, shaper, and intent chain.
//!
//! Two entry points mirror the product surfaces: [`Analyzer::analyze_upload`]
//! for the initial-file path (collaborator proposes charts, we sanitize and
//! shape them) and [`Analyzer::answer_question`] for chat follow-ups (the
//! detector chain runs first; only unmatched questions reach the generic
//! collaborator classification).
//!
//! Degraded outcomes (unresolvable columns, unplottable data, malformed
//! collaborator output) are answered with descriptive text, never errors.
//! Only structural failures (an empty question) propagate as errors.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::chart::{AggregateMode, ChartSpec, ChartType, propose_default_specs, repair_spec};
use crate::correlation::{Correlation, correlate, rank_by_strength};
use crate::data::{Dataset, Row};
use crate::insight;
use crate::intent::{self, AxisOverrides, Intent};
use crate::llm::{
    Classification, QuestionKind, TextGeneration, extract_json, parse_chart_specs,
    parse_classification, parse_general_answer, parse_insight,
};
use crate::resolve::resolve_column;
use crate::shape::{self, shape_chart_data};
use crate::summary::{DataSummary, summarize};

const MAX_UPLOAD_CHARTS: usize = 6;
const SAMPLE_ROWS: usize = 5;
const TOP_CORRELATION_CHARTS: usize = 3;

/// Result of the initial-upload analysis path.
#[derive(Debug, Serialize)]
pub struct UploadAnalysis {
    pub summary: DataSummary,
    pub charts: Vec<ChartSpec>,
    pub insights: Vec<String>,
    pub sample_rows: Vec<Row>,
}

/// Result of a chat question. A degraded path still carries a readable
/// `answer`; it just has no charts. Correlation answers additionally carry
/// the ranked coefficients so callers can render them as a table.
#[derive(Debug, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub charts: Vec<ChartSpec>,
    pub insights: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub correlations: Vec<Correlation>,
}

pub struct Analyzer<'a> {
    dataset: &'a Dataset,
    summary: DataSummary,
    model: &'a dyn TextGeneration,
}

impl<'a> Analyzer<'a> {
    pub fn new(dataset: &'a Dataset, model: &'a dyn TextGeneration) -> Self {
        let summary = summarize(dataset);
        Self {
            dataset,
            summary,
            model,
        }
    }

    pub fn summary(&self) -> &DataSummary {
        &self.summary
    }

    /// Initial-upload path: collaborator proposals, sanitized and shaped.
    pub fn analyze_upload(&self) -> Result<UploadAnalysis> {
        let raw = self
            .model
            .generate_chart_specs(&self.summary)
            .unwrap_or_else(|err| {
                warn!("Chart proposal call failed: {err:#}");
                String::new()
            });
        let mut specs: Vec<ChartSpec> = parse_chart_specs(&raw)
            .iter()
            .filter_map(|raw_spec| repair_spec(raw_spec, &self.dataset.columns))
            .collect();
        if specs.is_empty() {
            info!("Collaborator proposed no usable charts; falling back to defaults");
            specs = propose_default_specs(&self.summary);
        }
        specs.truncate(MAX_UPLOAD_CHARTS);

        let mut charts = Vec::new();
        let mut insights = Vec::new();
        for mut spec in specs {
            let data = shape_chart_data(&self.dataset.rows, &mut spec);
            if data.is_empty() {
                continue;
            }
            spec.data = data;
            insights.push(self.enrich_chart(&mut spec));
            charts.push(spec);
        }
        info!(
            "Upload analysis produced {} chart(s) from {} row(s)",
            charts.len(),
            self.dataset.rows.len()
        );
        Ok(UploadAnalysis {
            summary: self.summary.clone(),
            charts,
            insights,
            sample_rows: self.dataset.rows.iter().take(SAMPLE_ROWS).cloned().collect(),
        })
    }

    /// Chat path: detector chain, then classification, then shaping and
    /// enrichment. Degraded outcomes return text answers.
    pub fn answer_question(&self, question: &str) -> Result<ChatAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(anyhow!("Question must not be empty"));
        }
        if self.dataset.is_empty() {
            return Ok(self.rejected("The dataset has no rows to analyze."));
        }

        let overrides = intent::axis_overrides(question);
        let mut reply = match intent::detect_intent(question, &self.summary) {
            Intent::TwoSeriesLine { first, second } => self.dual_axis_answer(&first, &second),
            Intent::Vs {
                first,
                second,
                dual_axis: true,
            } => self.dual_axis_answer(&first, &second),
            Intent::Vs {
                first,
                second,
                dual_axis: false,
            } => self.vs_fanout(&first, &second, &overrides),
            Intent::Generic => {
                let mut classification = self.classify(question);
                // Explicit chart-type intent always wins over correlation.
                if intent::mentions_chart_type(question) {
                    classification.kind = QuestionKind::General;
                }
                match classification.kind {
                    QuestionKind::Correlation => {
                        self.correlation_answer(&classification, &overrides)
                    }
                    QuestionKind::General => self.general_answer(question),
                }
            }
        };

        reply.charts = self.merge_line_pair(question, reply.charts);
        for chart in &mut reply.charts {
            let key_insight = self.enrich_chart(chart);
            reply.insights.push(key_insight);
        }
        Ok(reply)
    }

    fn classify(&self, question: &str) -> Classification {
        match self
            .model
            .classify_question(question, &self.summary.numeric_columns)
        {
            Ok(raw) => parse_classification(&raw),
            Err(err) => {
                warn!("Classification call failed: {err:#}");
                Classification::general()
            }
        }
    }

    fn rejected(&self, message: impl Into<String>) -> ChatAnswer {
        let answer = message.into();
        info!("Question rejected: {answer}");
        ChatAnswer {
            answer,
            charts: Vec::new(),
            insights: Vec::new(),
            correlations: Vec::new(),
        }
    }

    fn available_columns(&self) -> String {
        self.dataset.columns.join(", ")
    }

    /// One dual-y-axis line chart over the elected time axis.
    fn dual_axis_answer(&self, first: &str, second: &str) -> ChatAnswer {
        let Some(x) = intent::choose_time_axis(&self.summary) else {
            return self.rejected("No column is available to use as the x-axis.");
        };
        let mut spec = ChartSpec::new(
            ChartType::Line,
            format!("{first} and {second} over {x}"),
            x.clone(),
            first,
        );
        spec.y2 = Some(second.to_string());
        let data = shape_chart_data(&self.dataset.rows, &mut spec);
        if data.is_empty() {
            return self.rejected(format!(
                "No plottable values were found for {first} and {second}."
            ));
        }
        spec.data = data;
        ChatAnswer {
            answer: format!(
                "Plotted {first} and {second} as one line chart with independent y-axes over {x}."
            ),
            charts: vec![spec],
            insights: Vec::new(),
            correlations: Vec::new(),
        }
    }

    /// The wider " vs " fan-out: a scatter plus each measure over time.
    fn vs_fanout(&self, first: &str, second: &str, overrides: &AxisOverrides) -> ChatAnswer {
        let mut charts = Vec::new();

        let mut scatter = ChartSpec::new(
            ChartType::Scatter,
            format!("{first} vs {second}"),
            first,
            second,
        );
        self.apply_axis_overrides(&mut scatter, overrides);
        let data = shape_chart_data(&self.dataset.rows, &mut scatter);
        if !data.is_empty() {
            scatter.data = data;
            charts.push(scatter);
        }

        if let Some(time_axis) = intent::choose_time_axis(&self.summary) {
            for variable in [first, second] {
                let mut line = ChartSpec::new(
                    ChartType::Line,
                    format!("{variable} over {time_axis}"),
                    time_axis.clone(),
                    variable,
                );
                let data = shape_chart_data(&self.dataset.rows, &mut line);
                if !data.is_empty() {
                    line.data = data;
                    charts.push(line);
                }
            }
        }

        if charts.is_empty() {
            return self.rejected(format!(
                "Neither {first} nor {second} produced plottable data."
            ));
        }
        ChatAnswer {
            answer: format!(
                "Showing {first} against {second}, plus each measure on its own timeline."
            ),
            charts,
            insights: Vec::new(),
            correlations: Vec::new(),
        }
    }

    fn correlation_answer(
        &self,
        classification: &Classification,
        overrides: &AxisOverrides,
    ) -> ChatAnswer {
        let Some(target_fragment) = classification.target_variable.as_deref() else {
            return self.rejected(format!(
                "I couldn't tell which measure to analyze. Available columns: {}.",
                self.available_columns()
            ));
        };
        let Some(target) = resolve_column(target_fragment, &self.dataset.columns) else {
            return self.rejected(format!(
                "'{target_fragment}' doesn't match any column. Available columns: {}.",
                self.available_columns()
            ));
        };
        let target = target.to_string();

        if let Some(specific_fragment) = classification.specific_variable.as_deref() {
            let Some(specific) = resolve_column(specific_fragment, &self.dataset.columns) else {
                return self.rejected(format!(
                    "'{specific_fragment}' doesn't match any column. Available columns: {}.",
                    self.available_columns()
                ));
            };
            return self.pair_answer(&target, &specific.to_string(), overrides);
        }

        if !self.summary.is_numeric(&target) {
            return self.rejected(format!(
                "'{target}' isn't a numeric column, so correlations can't be computed. \
                 Numeric columns: {}.",
                self.summary.numeric_columns.join(", ")
            ));
        }
        self.top_factors_answer(&target, overrides)
    }

    /// Two-variable correlation request, branched on column types.
    fn pair_answer(&self, target: &str, specific: &str, overrides: &AxisOverrides) -> ChatAnswer {
        let target_numeric = self.summary.is_numeric(target);
        let specific_numeric = self.summary.is_numeric(specific);

        match (target_numeric, specific_numeric) {
            (true, true) => {
                let candidates = vec![specific.to_string()];
                let results = correlate(&self.dataset.rows, target, &candidates);
                let Some(result) = results.first() else {
                    return self.rejected(format!(
                        "{target} and {specific} have no overlapping numeric values to correlate."
                    ));
                };
                let Some(chart) = self.correlation_scatter(target, specific, result, overrides)
                else {
                    return self.rejected(format!(
                        "{target} and {specific} correlate (r = {:.2}) but produced no plottable points.",
                        result.correlation
                    ));
                };
                ChatAnswer {
                    answer: insight::correlation_insight(target, result),
                    charts: vec![chart],
                    insights: Vec::new(),
                    correlations: vec![result.clone()],
                }
            }
            (true, false) | (false, true) => {
                let (numeric, categorical) = if target_numeric {
                    (target, specific)
                } else {
                    (specific, target)
                };
                let mut spec = ChartSpec::new(
                    ChartType::Bar,
                    format!("Average {numeric} by {categorical}"),
                    categorical,
                    numeric,
                )
                .with_aggregate(AggregateMode::Mean);
                self.apply_axis_overrides(&mut spec, overrides);
                let data = shape_chart_data(&self.dataset.rows, &mut spec);
                if data.is_empty() {
                    return self.rejected(format!(
                        "No values of {numeric} could be grouped by {categorical}."
                    ));
                }
                spec.data = data;
                ChatAnswer {
                    answer: format!(
                        "{categorical} is categorical, so I compared the average {numeric} across its groups."
                    ),
                    charts: vec![spec],
                    insights: Vec::new(),
                    correlations: Vec::new(),
                }
            }
            (false, false) => self.rejected(format!(
                "Both {target} and {specific} are categorical; correlation needs at least one \
                 numeric measure. Numeric columns: {}.",
                self.summary.numeric_columns.join(", ")
            )),
        }
    }

    /// Open "what affects X" request: engine vs all other numeric columns.
    fn top_factors_answer(&self, target: &str, overrides: &AxisOverrides) -> ChatAnswer {
        let results = correlate(&self.dataset.rows, target, &self.summary.numeric_columns);
        if results.is_empty() {
            return self.rejected(format!(
                "No measurable correlations were found for {target}."
            ));
        }
        let ranked = rank_by_strength(results);

        let mut charts = Vec::new();
        for result in ranked.iter().take(TOP_CORRELATION_CHARTS) {
            if let Some(chart) =
                self.correlation_scatter(target, &result.variable, result, overrides)
            {
                charts.push(chart);
            }
        }
        if ranked.len() > 1 {
            charts.push(ranking_chart(target, &ranked));
        }

        let answer = self.correlation_summary_text(target, &ranked);
        ChatAnswer {
            answer,
            charts,
            insights: Vec::new(),
            correlations: ranked,
        }
    }

    fn correlation_summary_text(&self, target: &str, ranked: &[Correlation]) -> String {
        let raw = self
            .model
            .generate_correlation_insights(target, ranked)
            .unwrap_or_default();
        if let Some(Value::Array(items)) = extract_json(&raw) {
            let texts: Vec<String> = items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            if !texts.is_empty() {
                return texts.join(" ");
            }
        }
        ranked
            .iter()
            .take(TOP_CORRELATION_CHARTS)
            .map(|c| insight::correlation_insight(target, c))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Scatter chart for one correlation pair: range-based axis orientation
    /// (overridden by explicit annotations), padded domains, trend line,
    /// and the coefficient embedded in the title.
    fn correlation_scatter(
        &self,
        target: &str,
        other: &str,
        result: &Correlation,
        overrides: &AxisOverrides,
    ) -> Option<ChartSpec> {
        let rows = &self.dataset.rows;
        let (ox, oy) = shape::orient_scatter_axes(rows, target, other);
        let mut spec = ChartSpec::new(
            ChartType::Scatter,
            String::new(),
            ox.to_string(),
            oy.to_string(),
        );
        self.apply_axis_overrides(&mut spec, overrides);
        spec.title = format!("{} vs {} (r = {:.2})", spec.x, spec.y, result.correlation);

        let data = shape_chart_data(rows, &mut spec);
        if data.is_empty() {
            return None;
        }
        if let Some((lo, hi)) = shape::numeric_range(rows, &spec.x) {
            spec.x_domain = Some(shape::padded_domain(lo, hi));
        }
        if let Some((lo, hi)) = shape::numeric_range(rows, &spec.y) {
            spec.y_domain = Some(shape::padded_domain(lo, hi));
        }
        if let Some(x_domain) = spec.x_domain {
            let pairs = shape::numeric_pairs(rows, &spec.x, &spec.y);
            spec.trend_line = shape::trend_line_records(&pairs, x_domain);
        }
        spec.data = data;
        Some(spec)
    }

    /// Explicit axis annotations outrank whatever orientation a heuristic
    /// picked: when an override names the column currently on the other
    /// axis, the axes swap.
    fn apply_axis_overrides(&self, spec: &mut ChartSpec, overrides: &AxisOverrides) {
        if let Some(resolved) = overrides
            .x
            .as_deref()
            .and_then(|req| resolve_column(req, &self.dataset.columns))
            && resolved == spec.y
        {
            std::mem::swap(&mut spec.x, &mut spec.y);
        }
        if let Some(resolved) = overrides
            .y
            .as_deref()
            .and_then(|req| resolve_column(req, &self.dataset.columns))
            && resolved == spec.x
        {
            std::mem::swap(&mut spec.x, &mut spec.y);
        }
    }

    /// Open-ended fallback: the collaborator answers freely and may propose
    /// charts, which get the same sanitization as upload proposals.
    fn general_answer(&self, question: &str) -> ChatAnswer {
        let raw = self
            .model
            .answer_general(question, &self.summary)
            .unwrap_or_else(|err| {
                warn!("General answer call failed: {err:#}");
                String::new()
            });
        let parsed = parse_general_answer(&raw).unwrap_or_default();

        let mut charts = Vec::new();
        for raw_spec in &parsed.charts {
            if let Some(mut spec) = repair_spec(raw_spec, &self.dataset.columns) {
                let data = shape_chart_data(&self.dataset.rows, &mut spec);
                if !data.is_empty() {
                    spec.data = data;
                    charts.push(spec);
                }
            }
        }

        let answer = if parsed.answer.trim().is_empty() {
            format!(
                "The dataset has {} rows and {} columns. Numeric columns: {}.",
                self.summary.row_count,
                self.summary.column_count,
                self.summary.numeric_columns.join(", ")
            )
        } else {
            parsed.answer
        };
        ChatAnswer {
            answer,
            charts,
            insights: Vec::new(),
            correlations: Vec::new(),
        }
    }

    /// Second-pass merge: when the user asked for a single combined chart
    /// and exactly two line charts share an x column, outer-join them into
    /// one dual-y-axis chart.
    fn merge_line_pair(&self, question: &str, charts: Vec<ChartSpec>) -> Vec<ChartSpec> {
        if !intent::wants_single_chart(question) {
            return charts;
        }
        let line_indices: Vec<usize> = charts
            .iter()
            .enumerate()
            .filter(|(_, c)| c.chart_type == ChartType::Line && c.y2.is_none())
            .map(|(idx, _)| idx)
            .collect();
        if line_indices.len() != 2 {
            return charts;
        }
        let (first_idx, second_idx) = (line_indices[0], line_indices[1]);
        if charts[first_idx].x != charts[second_idx].x {
            return charts;
        }

        let merged = merge_dual_axis(&charts[first_idx], &charts[second_idx]);
        let mut kept: Vec<ChartSpec> = charts
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| *idx != first_idx && *idx != second_idx)
            .map(|(_, chart)| chart)
            .collect();
        kept.push(merged);
        kept
    }

    fn enrich_chart(&self, chart: &mut ChartSpec) -> String {
        let parsed = self
            .model
            .generate_chart_insights(chart, &self.summary)
            .ok()
            .and_then(|raw| parse_insight(&raw));
        let insight = parsed.unwrap_or_else(|| insight::chart_insight(chart));
        chart.key_insight = Some(insight.key_insight.clone());
        chart.recommendation = Some(insight.recommendation);
        insight.key_insight
    }
}

/// Signed-correlation ranking chart. The target heads the list at r = 1 as
/// the reference bar; candidate values keep their computed sign.
fn ranking_chart(target: &str, ranked: &[Correlation]) -> ChartSpec {
    let mut data = Vec::with_capacity(ranked.len() + 1);
    data.push(json!({ "variable": target, "correlation": 1.0 }));
    for result in ranked {
        data.push(json!({
            "variable": result.variable,
            "correlation": result.correlation,
        }));
    }
    let mut spec = ChartSpec::new(
        ChartType::Bar,
        format!("Correlation with {target}"),
        "variable",
        "correlation",
    );
    spec.data = data;
    spec
}

/// Outer join of two shaped line series on the x label.
fn merge_dual_axis(first: &ChartSpec, second: &ChartSpec) -> ChartSpec {
    let mut joined: BTreeMap<String, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for record in &first.data {
        if let Some(label) = series_label(record, &first.x) {
            joined.entry(label).or_default().0 = series_value(record, &first.y);
        }
    }
    for record in &second.data {
        if let Some(label) = series_label(record, &second.x) {
            joined.entry(label).or_default().1 = series_value(record, &second.y);
        }
    }

    let mut spec = ChartSpec::new(
        ChartType::Line,
        format!("{} and {} over {}", first.y, second.y, first.x),
        first.x.clone(),
        first.y.clone(),
    );
    spec.y2 = Some(second.y.clone());
    spec.data = joined
        .into_iter()
        .map(|(label, (v1, v2))| {
            let mut record = Map::new();
            record.insert("x".to_string(), Value::String(label));
            record.insert(first.y.clone(), option_number(v1));
            record.insert(second.y.clone(), option_number(v2));
            Value::Object(record)
        })
        .collect();
    spec
}

fn series_label(record: &Value, x: &str) -> Option<String> {
    let value = record.get("x").or_else(|| record.get(x))?;
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn series_value(record: &Value, y: &str) -> Option<f64> {
    record
        .get("y")
        .or_else(|| record.get(y))
        .and_then(Value::as_f64)
}

fn option_number(value: Option<f64>) -> Value {
    match value {
        Some(v) => json!(v),
        None => Value::Null,
    }
}

/// Convenience wrapper for the upload surface.
pub fn analyze_dataset(dataset: &Dataset, model: &dyn TextGeneration) -> Result<UploadAnalysis> {
    Analyzer::new(dataset, model).analyze_upload()
}

/// Convenience wrapper for the chat surface.
pub fn answer(dataset: &Dataset, model: &dyn TextGeneration, question: &str) -> Result<ChatAnswer> {
    Analyzer::new(dataset, model).answer_question(question)
}
