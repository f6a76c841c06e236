//! Fixed-width console tables for the CLI surfaces.

use std::fmt::Write as _;

use crate::correlation::Correlation;
use crate::summary::DataSummary;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let cells: Vec<String> = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized: String = value
                .chars()
                .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
                .collect();
            format!("{sanitized:<width$}")
        })
        .collect();
    cells.join("  ").trim_end().to_string()
}

/// Table rows for the `probe` output: one line per column profile.
pub fn summary_rows(summary: &DataSummary) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = vec![
        "column".to_string(),
        "type".to_string(),
        "sample_values".to_string(),
    ];
    let rows = summary
        .columns
        .iter()
        .map(|profile| {
            vec![
                profile.name.clone(),
                format!("{:?}", profile.column_type).to_lowercase(),
                profile.sample_values.join(", "),
            ]
        })
        .collect();
    (headers, rows)
}

/// Table rows for a correlation ranking.
pub fn correlation_rows(results: &[Correlation]) -> (Vec<String>, Vec<Vec<String>>) {
    let headers = vec![
        "variable".to_string(),
        "correlation".to_string(),
        "n_pairs".to_string(),
    ];
    let rows = results
        .iter()
        .map(|result| {
            vec![
                result.variable.clone(),
                format!("{:+.3}", result.correlation),
                result.n_pairs.to_string(),
            ]
        })
        .collect();
    (headers, rows)
}
