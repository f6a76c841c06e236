use serde::{Deserialize, Serialize};

use crate::data::{CellValue, Dataset, display_value, is_blank, parse_naive_date, to_number};

const SAMPLE_VALUES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Date,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub sample_values: Vec<String>,
}

/// Derived metadata for a dataset: per-column inferred types plus the
/// numeric and date column name sets the analysis paths key off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
    pub numeric_columns: Vec<String>,
    pub date_columns: Vec<String>,
}

impl DataSummary {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }

    pub fn is_date(&self, column: &str) -> bool {
        self.date_columns.iter().any(|c| c == column)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Candidate-elimination typing over a column's non-blank cells, in the
/// spirit of CSV schema probing: a candidate survives only while every
/// observed value fits it.
#[derive(Debug, Clone)]
struct TypeCandidate {
    possible_numeric: bool,
    possible_date: bool,
    saw_value: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            possible_numeric: true,
            possible_date: true,
            saw_value: false,
        }
    }

    fn observe(&mut self, cell: &CellValue) {
        if is_blank(cell) {
            return;
        }
        self.saw_value = true;
        if self.possible_numeric && to_number(cell).is_nan() {
            self.possible_numeric = false;
        }
        if self.possible_date && !cell_is_date(cell) {
            self.possible_date = false;
        }
    }

    fn decide(&self) -> ColumnType {
        if !self.saw_value {
            ColumnType::Text
        } else if self.possible_numeric {
            ColumnType::Numeric
        } else if self.possible_date {
            ColumnType::Date
        } else {
            ColumnType::Text
        }
    }
}

fn cell_is_date(cell: &CellValue) -> bool {
    match cell {
        CellValue::Date(_) => true,
        CellValue::Text(s) => parse_naive_date(s.trim()).is_ok(),
        _ => false,
    }
}

/// Profiles every column of the dataset. Each column lands in exactly one of
/// numeric / date / text.
pub fn summarize(dataset: &Dataset) -> DataSummary {
    let mut columns = Vec::with_capacity(dataset.columns.len());
    let mut numeric_columns = Vec::new();
    let mut date_columns = Vec::new();

    for name in &dataset.columns {
        let mut candidate = TypeCandidate::new();
        let mut samples: Vec<String> = Vec::new();
        for row in &dataset.rows {
            let Some(cell) = row.get(name) else { continue };
            candidate.observe(cell);
            if samples.len() < SAMPLE_VALUES && !is_blank(cell) {
                let rendered = display_value(cell);
                if !samples.contains(&rendered) {
                    samples.push(rendered);
                }
            }
        }
        let column_type = candidate.decide();
        match column_type {
            ColumnType::Numeric => numeric_columns.push(name.clone()),
            ColumnType::Date => date_columns.push(name.clone()),
            ColumnType::Text => {}
        }
        columns.push(ColumnProfile {
            name: name.clone(),
            column_type,
            sample_values: samples,
        });
    }

    DataSummary {
        row_count: dataset.rows.len(),
        column_count: dataset.columns.len(),
        columns,
        numeric_columns,
        date_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Row;

    fn dataset(columns: &[&str], rows: Vec<Vec<CellValue>>) -> Dataset {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|cells| {
                let mut row = Row::new();
                for (name, cell) in columns.iter().zip(cells) {
                    row.insert(name.clone(), cell);
                }
                row
            })
            .collect();
        Dataset::new(columns, rows).expect("dataset")
    }

    #[test]
    fn summarize_partitions_columns_by_type() {
        let ds = dataset(
            &["Month", "Sales", "Region"],
            vec![
                vec![
                    CellValue::Text("2024-01-01".into()),
                    CellValue::Number(10.0),
                    CellValue::Text("North".into()),
                ],
                vec![
                    CellValue::Text("2024-02-01".into()),
                    CellValue::Text("12.5%".into()),
                    CellValue::Text("South".into()),
                ],
            ],
        );
        let summary = summarize(&ds);
        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.numeric_columns, vec!["Sales".to_string()]);
        assert_eq!(summary.date_columns, vec!["Month".to_string()]);
        assert!(summary.columns.iter().any(|c| {
            c.name == "Region" && c.column_type == ColumnType::Text
        }));
    }

    #[test]
    fn summarize_single_bad_value_demotes_numeric_column() {
        let ds = dataset(
            &["Mixed"],
            vec![
                vec![CellValue::Number(1.0)],
                vec![CellValue::Text("oops".into())],
            ],
        );
        let summary = summarize(&ds);
        assert!(summary.numeric_columns.is_empty());
        assert_eq!(summary.columns[0].column_type, ColumnType::Text);
    }

    #[test]
    fn summarize_blank_cells_do_not_affect_typing() {
        let ds = dataset(
            &["Sales"],
            vec![
                vec![CellValue::Number(5.0)],
                vec![CellValue::Null],
                vec![CellValue::Text("  ".into())],
            ],
        );
        let summary = summarize(&ds);
        assert_eq!(summary.numeric_columns, vec!["Sales".to_string()]);
        assert_eq!(summary.columns[0].sample_values, vec!["5".to_string()]);
    }

    #[test]
    fn summarize_all_blank_column_is_text() {
        let ds = dataset(&["Empty"], vec![vec![CellValue::Null], vec![CellValue::Null]]);
        let summary = summarize(&ds);
        assert_eq!(summary.columns[0].column_type, ColumnType::Text);
        assert!(summary.columns[0].sample_values.is_empty());
    }
}
