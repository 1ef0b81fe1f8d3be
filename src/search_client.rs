use std::time::Duration;

use log::warn;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::delay;
use crate::response_parser::{extract_json, JsonShape, ParseError};
use crate::settings::Settings;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Terminal failure of one search after retries are exhausted. Parse and
/// API failures are distinct so callers can record them separately.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("model reply was not parseable JSON: {error}")]
    Parse { error: ParseError, raw: String },

    #[error("search request failed: {message}")]
    Api { message: String },
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed API response body: {0}")]
    Body(String),

    #[error("API response contained no choices")]
    Empty,
}

impl ApiError {
    fn is_rate_limit(&self) -> bool {
        match self {
            ApiError::RateLimited => true,
            ApiError::Status { status: 429, .. } => true,
            other => {
                let text = other.to_string().to_lowercase();
                text.contains("rate") || text.contains("429")
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// One handle per worker onto the search-capable model endpoint. A fixed
/// throttling sleep precedes every request; retries use a fixed pause, or
/// an escalating one after a rate-limit signal.
pub struct SearchClient {
    api_key: String,
    base_url: String,
    model: String,
    request_delay: Duration,
    retry_attempts: u32,
    retry_delay: Duration,
    client: Client,
}

impl SearchClient {
    pub fn new(settings: &Settings) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        SearchClient {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            request_delay: settings.request_delay,
            retry_attempts: settings.retry_attempts.max(1),
            retry_delay: settings.retry_delay,
            client,
        }
    }

    /// Submits the prompt and returns the JSON value extracted from the
    /// reply, retrying on parse and transient API failures. The terminal
    /// error reflects the last attempt's failure kind.
    pub fn search(&self, prompt: &str, shape: JsonShape) -> Result<Value, SearchError> {
        let mut last_failure: Option<SearchError> = None;

        for attempt in 1..=self.retry_attempts {
            delay::request_throttle(self.request_delay);

            match self.complete(prompt) {
                Ok(content) => match extract_json(&content, shape) {
                    Ok(value) => return Ok(value),
                    Err(error) => {
                        warn!("Attempt {attempt}: reply was not valid JSON ({error})");
                        last_failure = Some(SearchError::Parse {
                            error,
                            raw: content,
                        });
                        if attempt < self.retry_attempts {
                            delay::retry_pause(self.retry_delay);
                        }
                    }
                },
                Err(error) => {
                    warn!("Attempt {attempt}: {error}");
                    let rate_limited = error.is_rate_limit();
                    last_failure = Some(SearchError::Api {
                        message: error.to_string(),
                    });
                    if attempt < self.retry_attempts {
                        if rate_limited {
                            delay::rate_limit_pause(self.retry_delay, attempt);
                        } else {
                            delay::retry_pause(self.retry_delay);
                        }
                    }
                }
            }
        }

        Err(last_failure.unwrap_or(SearchError::Api {
            message: "no attempts were made".to_string(),
        }))
    }

    // One chat-completions round trip; low temperature keeps replies
    // deterministic-leaning.
    fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.1,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .map_err(|e| ApiError::Body(e.to_string()))?;
        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ApiError::Empty)
    }
}
