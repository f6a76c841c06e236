//! CSV-backed tabular data loader.
//!
//! The analysis core consumes datasets as in-memory rows; this module is the
//! concrete loader behind the CLI and tests. Cells are parsed best-effort
//! into typed values (number, date, text) so that downstream coercion and
//! type inference see the same shapes an upstream loader would deliver.

use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::data::{CellValue, Dataset, Row, parse_naive_date};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Reads a headered CSV file into a [`Dataset`].
pub fn load_csv(path: &Path, delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Opening CSV file {path:?}"))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Reading headers from {path:?}"))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() {
        return Err(anyhow!("File {path:?} has no header row"));
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let mut row = Row::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            let raw = record.get(idx).unwrap_or("");
            row.insert(name.clone(), parse_cell(raw));
        }
        rows.push(row);
    }
    Dataset::new(headers, rows)
}

/// Best-effort typed parse of a raw CSV field. Percent and comma-formatted
/// numerics stay textual here; numeric coercion handles them later so the
/// original rendering is preserved for categorical use.
pub fn parse_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Null;
    }
    if let Ok(number) = trimmed.parse::<f64>() {
        return CellValue::Number(number);
    }
    if let Ok(date) = parse_naive_date(trimmed) {
        return CellValue::Date(date);
    }
    CellValue::Text(trimmed.to_string())
}
