use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::{error, info};
use thiserror::Error;

use crate::dataset::Dataset;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input file not found: {0}")]
    NotFound(String),

    #[error("could not open {path}: {message}")]
    Open { path: String, message: String },

    #[error("{0} has no header row")]
    NoHeaders(String),
}

/// Loads a lead dataset from CSV or Excel, chosen by file extension.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.display().to_string()));
    }

    let is_excel = path
        .extension()
        .map_or(false, |ext| ext == "xlsx" || ext == "xls");

    if is_excel {
        load_excel(path)
    } else {
        load_csv(path)
    }
}

fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let display = path.display().to_string();
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| LoadError::Open {
            path: display.clone(),
            message: e.to_string(),
        })?;

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| LoadError::Open {
            path: display.clone(),
            message: e.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(LoadError::NoHeaders(display));
    }

    let mut dataset = Dataset::new(columns);
    for result in rdr.records() {
        match result {
            Ok(record) => dataset.push_row(record.iter().map(str::to_string).collect()),
            Err(e) => error!("Skipping malformed CSV record: {e}"),
        }
    }

    info!("Loaded {} rows from {}", dataset.len(), display);
    Ok(dataset)
}

fn load_excel(path: &Path) -> Result<Dataset, LoadError> {
    let display = path.display().to_string();
    let mut excel: Xlsx<_> = open_workbook::<Xlsx<_>, _>(path).map_err(|e| LoadError::Open {
        path: display.clone(),
        message: e.to_string(),
    })?;

    let worksheets = excel.worksheets();
    let (_name, range) = worksheets
        .first()
        .ok_or_else(|| LoadError::NoHeaders(display.clone()))?;

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .ok_or_else(|| LoadError::NoHeaders(display.clone()))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut dataset = Dataset::new(columns);
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    String::new()
                } else {
                    cell.to_string().trim().to_string()
                }
            })
            .collect();
        if cells.iter().any(|c| !c.is_empty()) {
            dataset.push_row(cells);
        }
    }

    info!("Loaded {} rows from {}", dataset.len(), display);
    Ok(dataset)
}

/// Newest dated generated-leads file in the output directory, if any.
/// Filenames sort lexically because the date is zero-padded ISO.
pub fn latest_generated_leads(output_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(output_dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, is_dated_generated_name)
        })
        .collect();
    candidates.sort();
    candidates.pop()
}

fn is_dated_generated_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("generated_leads_") else {
        return false;
    };
    let Some(date) = rest
        .strip_suffix(".csv")
        .or_else(|| rest.strip_suffix(".xlsx"))
    else {
        return false;
    };
    date.len() == 10 && date.chars().all(|c| c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_csv_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.csv");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "name,company,phone").unwrap();
        writeln!(file, "Jane Doe,Ray White, 0400111222 ").unwrap();
        drop(file);

        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.value(0, "phone"), Some("0400111222"));
        assert_eq!(ds.cell(0, "suburb"), None);
    }

    #[test]
    fn missing_input_is_an_error() {
        let err = load_dataset(Path::new("nope/leads.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn picks_latest_generated_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "generated_leads_2026-07-01.csv",
            "generated_leads_2026-08-02.csv",
            "generated_leads_enriched_2026-08-03.csv",
            "notes.txt",
        ] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let latest = latest_generated_leads(dir.path()).unwrap();
        assert_eq!(
            latest.file_name().unwrap().to_str().unwrap(),
            "generated_leads_2026-08-02.csv"
        );
    }

    #[test]
    fn no_candidates_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_generated_leads(dir.path()).is_none());
    }
}
