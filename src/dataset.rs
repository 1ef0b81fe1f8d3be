use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error for {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// In-memory tabular dataset: an ordered header row plus string cells.
/// Column lookups are by name so absent columns degrade to empty values.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Dataset {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Raw cell value; None when the row or column does not exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Trimmed, non-empty cell value.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        self.cell(row, column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn add_column(&mut self, name: &str) {
        if self.column_index(name).is_none() {
            self.columns.push(name.to_string());
            for row in &mut self.rows {
                row.push(String::new());
            }
        }
    }

    /// Sets a cell, appending the column first if the dataset lacks it.
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) {
        self.add_column(column);
        let col = match self.column_index(column) {
            Some(c) => c,
            None => return,
        };
        if let Some(cells) = self.rows.get_mut(row) {
            cells[col] = value.into();
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), DatasetError> {
        let display = path.display().to_string();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
                path: display.clone(),
                source,
            })?;
        }

        let csv_err = |source: csv::Error| DatasetError::Csv {
            path: display.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
        writer.write_record(&self.columns).map_err(csv_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| DatasetError::Io {
            path: display.clone(),
            source,
        })?;

        info!("Saved {} rows to {}", self.rows.len(), display);
        Ok(())
    }
}

/// Output path with the run date embedded, e.g. output/generated_leads_2026-08-05.csv
pub fn dated_path(output_dir: &Path, stem: &str) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d");
    output_dir.join(format!("{stem}_{today}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut ds = Dataset::new(vec!["name".into(), "phone".into()]);
        ds.push_row(vec!["Jane Doe".into(), "0400111222".into()]);
        ds.push_row(vec!["Sam Lee".into()]);
        ds
    }

    #[test]
    fn short_rows_are_padded() {
        let ds = sample();
        assert_eq!(ds.cell(1, "phone"), Some(""));
        assert_eq!(ds.value(1, "phone"), None);
    }

    #[test]
    fn set_appends_missing_column() {
        let mut ds = sample();
        ds.set(0, "email", "jane@example.com");
        assert_eq!(ds.columns().len(), 3);
        assert_eq!(ds.value(0, "email"), Some("jane@example.com"));
        assert_eq!(ds.cell(1, "email"), Some(""));
    }

    #[test]
    fn unknown_column_reads_as_none() {
        let ds = sample();
        assert_eq!(ds.cell(0, "linkedin"), None);
    }

    #[test]
    fn dated_path_embeds_date() {
        let path = dated_path(Path::new("output"), "generated_leads");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("generated_leads_"));
        assert!(name.ends_with(".csv"));
    }
}
