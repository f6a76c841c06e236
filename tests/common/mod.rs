#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

use datasight::data::{CellValue, Dataset, Row};

pub fn num(value: f64) -> CellValue {
    CellValue::Number(value)
}

pub fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

pub fn null() -> CellValue {
    CellValue::Null
}

/// Builds a dataset from a column list and row-major cell values.
pub fn dataset(columns: &[&str], cells: Vec<Vec<CellValue>>) -> Dataset {
    let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    let rows: Vec<Row> = cells
        .into_iter()
        .map(|row_cells| {
            let mut row = Row::new();
            for (name, cell) in columns.iter().zip(row_cells) {
                row.insert(name.clone(), cell);
            }
            row
        })
        .collect();
    Dataset::new(columns, rows).expect("well-formed dataset")
}

/// A Month/Sales/Region dataset used across the integration tests.
pub fn sales_dataset() -> Dataset {
    let regions = ["North", "South", "East", "West"];
    let mut rows = Vec::new();
    for month in 1..=12 {
        for (idx, region) in regions.iter().enumerate() {
            rows.push(vec![
                text(&format!("2024-{month:02}")),
                num((month * 10 + idx * 3) as f64),
                text(region),
            ]);
        }
    }
    dataset(&["Month", "Sales", "Region"], rows)
}

/// CSV text matching [`sales_dataset`], for loader and CLI tests.
pub fn sales_csv() -> String {
    let mut out = String::from("Month,Sales,Region\n");
    let regions = ["North", "South", "East", "West"];
    for month in 1..=12 {
        for (idx, region) in regions.iter().enumerate() {
            out.push_str(&format!(
                "2024-{month:02},{},{region}\n",
                month * 10 + idx * 3
            ));
        }
    }
    out
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
