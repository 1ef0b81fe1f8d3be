use std::collections::HashMap;

use crate::dataset::Dataset;
use crate::models::{ContactEnrichment, EnrichmentRecord};

// Values the model (or a previous run) leaves behind that mean "nothing
// here". "if found or null" is a literal artifact of echoed instructions.
const PLACEHOLDERS: [&str; 6] = ["", "null", "none", "nan", "n/a", "if found or null"];

pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.contains(&value.trim().to_lowercase().as_str())
}

fn cell_is_placeholder(dataset: &Dataset, row: usize, column: &str) -> bool {
    is_placeholder(dataset.cell(row, column).unwrap_or(""))
}

/// Field-level overwrite rules for found contact details:
///   - phone: overwrite unconditionally when the candidate holds a value;
///   - email: only fill an empty cell, and the candidate must look like an
///     address;
///   - linkedin: only fill a cell that is empty or not a linkedin value,
///     and the candidate must be one;
///   - source: always recorded when present.
pub fn apply_contact_details(dataset: &mut Dataset, row: usize, details: &ContactEnrichment) {
    if let Some(phone) = non_placeholder(&details.phone) {
        dataset.set(row, "phone", phone);
    }

    if let Some(email) = non_placeholder(&details.email) {
        if email.contains('@') && cell_is_placeholder(dataset, row, "email") {
            dataset.set(row, "email", email);
        }
    }

    if let Some(linkedin) = non_placeholder(&details.linkedin) {
        let current_has_linkedin = dataset
            .cell(row, "linkedin")
            .map_or(false, |v| v.to_lowercase().contains("linkedin"));
        if linkedin.to_lowercase().contains("linkedin")
            && (cell_is_placeholder(dataset, row, "linkedin") || !current_has_linkedin)
        {
            dataset.set(row, "linkedin", linkedin);
        }
    }

    if let Some(source) = non_placeholder(&details.source) {
        dataset.set(row, "contact_source", source);
    }
}

fn non_placeholder(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !is_placeholder(v))
}

/// Columns appended to the dataset by verification enrichment, in output
/// order.
pub const ENRICHMENT_COLUMNS: [&str; 12] = [
    "verified_at_company",
    "current_company",
    "current_role",
    "verified_phone",
    "verified_email",
    "linkedin_url",
    "confidence",
    "notes",
    "last_enriched",
    "enrichment_status",
    "enrichment_error",
    "raw_response",
];

/// Applies verification records onto the dataset as appended columns.
/// Re-enriching a row overwrites its prior values; rows are never added
/// or removed.
pub fn apply_verification(dataset: &mut Dataset, enrichments: &HashMap<usize, EnrichmentRecord>) {
    for column in ENRICHMENT_COLUMNS {
        dataset.add_column(column);
    }

    for (&row, record) in enrichments {
        let value = match serde_json::to_value(record) {
            Ok(v) => v,
            Err(_) => continue,
        };
        for column in ENRICHMENT_COLUMNS {
            if let Some(cell) = value.get(column) {
                let text = match cell {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                dataset.set(row, column, text);
            }
        }
    }
}
