use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single cell of a dataset. Untagged so rows serialize as plain JSON
/// objects (`null`, numbers, `"2024-01-01"` date strings, text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

pub type Row = HashMap<String, CellValue>;

/// An in-memory tabular dataset: an ordered column list plus rows keyed by
/// column name. Every row carries the same key set; the column set is fixed
/// once the dataset is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() || columns.iter().any(|c| !row.contains_key(c)) {
                return Err(anyhow!(
                    "Row {} does not match the dataset column set",
                    idx + 1
                ));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Coerces a cell into a plottable number, producing NaN when impossible.
///
/// Percent suffixes and thousands separators are stripped from text cells
/// (`"12.5%"` -> 12.5, `"1,234"` -> 1234). Numbers pass through with full
/// precision. Dates do not coerce; temporal values plot as categorical
/// labels, not as numbers.
pub fn to_number(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Null | CellValue::Date(_) => f64::NAN,
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return f64::NAN;
            }
            let cleaned: String = trimmed.chars().filter(|c| *c != '%' && *c != ',').collect();
            cleaned.trim().parse::<f64>().unwrap_or(f64::NAN)
        }
    }
}

/// Raw string form of a cell, used for group keys and categorical axis
/// labels. Null renders as the empty string.
pub fn display_value(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        CellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{n:.0}")
            } else {
                n.to_string()
            }
        }
        CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        CellValue::Text(s) => s.clone(),
    }
}

pub fn is_blank(cell: &CellValue) -> bool {
    match cell {
        CellValue::Null => true,
        CellValue::Text(s) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}
