use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("GROQ_API_KEY is not set. Export it or add it to your environment.")]
    MissingApiKey,

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime knobs, all environment-provided so nothing is hardcoded.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_workers: usize,
    pub request_delay: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub checkpoint_interval: usize,
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let api_key = env::var("GROQ_API_KEY").map_err(|_| SettingsError::MissingApiKey)?;

        Ok(Settings {
            api_key,
            base_url: var_or("GROQ_BASE_URL", "https://api.groq.com/openai/v1"),
            model: var_or("GROQ_MODEL", "groq/compound-mini"),
            max_workers: parse_var("MAX_WORKERS", 5)?,
            request_delay: Duration::from_secs_f64(parse_var("REQUEST_DELAY", 2.0)?),
            retry_attempts: parse_var("RETRY_ATTEMPTS", 5)?,
            retry_delay: Duration::from_secs_f64(parse_var("RETRY_DELAY", 10.0)?),
            checkpoint_interval: parse_var("CHECKPOINT_INTERVAL", 50)?,
            input_file: PathBuf::from(var_or("INPUT_FILE", "input_leads.xlsx")),
            output_dir: PathBuf::from(var_or("OUTPUT_DIR", "output")),
            config_file: PathBuf::from(var_or("CONFIG_FILE", "config.json")),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, SettingsError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}
