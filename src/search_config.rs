use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}. Create it or set CONFIG_FILE to the correct path.")]
    NotFound(String),

    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: String,
        source: serde_json::Error,
    },

    #[error("config missing required keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchTemplate {
    pub query: String,
    pub category: String,
}

/// Search parameters loaded from config.json.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub cities: Vec<String>,
    pub search_templates: Vec<SearchTemplate>,
    // BTreeMap keeps the task order deterministic across runs.
    pub boutique_agencies: BTreeMap<String, Vec<String>>,
}

impl SearchConfig {
    pub fn agency_count(&self) -> usize {
        self.boutique_agencies.values().map(Vec::len).sum()
    }
}

const REQUIRED_KEYS: [&str; 3] = ["cities", "search_templates", "boutique_agencies"];

pub fn load(path: &Path) -> Result<SearchConfig, ConfigError> {
    let display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|_| ConfigError::NotFound(display.clone()))?;

    let value: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::InvalidJson {
        path: display.clone(),
        source,
    })?;

    // Report every missing key at once, not just the first.
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| value.get(**key).is_none())
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingKeys(missing));
    }

    serde_json::from_value(value).map_err(|source| ConfigError::InvalidJson {
        path: display,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_config() {
        let file = write_config(
            r#"{
                "cities": ["Sydney", "Melbourne"],
                "search_templates": [{"query": "top agents in {city}", "category": "Top Agents"}],
                "boutique_agencies": {"Sydney": ["BresicWhitney", "The Agency"]}
            }"#,
        );
        let config = load(file.path()).unwrap();
        assert_eq!(config.cities.len(), 2);
        assert_eq!(config.search_templates[0].category, "Top Agents");
        assert_eq!(config.agency_count(), 2);
    }

    #[test]
    fn reports_all_missing_keys() {
        let file = write_config(r#"{"cities": []}"#);
        let err = load(file.path()).unwrap_err();
        match err {
            ConfigError::MissingKeys(keys) => {
                assert_eq!(keys, vec!["search_templates", "boutique_agencies"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = load(Path::new("does_not_exist/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
