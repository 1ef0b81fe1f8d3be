use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Best-effort string out of a reply field: strings are trimmed, numbers
/// and booleans stringified, anything else (null, nested values) dropped.
pub(crate) fn field_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn now_timestamp() -> String {
    Local::now().to_rfc3339()
}

/// A candidate contact produced by a generation search.
#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub name: String,
    pub company: String,
    pub role: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub source: String,
    pub match_reason: String,
    pub search_category: String,
    pub search_city: String,
    pub generated_at: String,
}

impl Lead {
    /// Builds a lead from one element of the model's JSON array, tagged
    /// with the originating search. Non-objects are discarded.
    pub fn from_value(value: &Value, category: &str, search_city: &str) -> Option<Lead> {
        if !value.is_object() {
            return None;
        }
        Some(Lead {
            name: field_string(value, "name").unwrap_or_default(),
            company: field_string(value, "company").unwrap_or_default(),
            role: field_string(value, "role").unwrap_or_default(),
            city: field_string(value, "city").unwrap_or_default(),
            phone: field_string(value, "phone"),
            email: field_string(value, "email"),
            linkedin: field_string(value, "linkedin"),
            source: field_string(value, "source").unwrap_or_default(),
            match_reason: field_string(value, "match_reason").unwrap_or_default(),
            search_category: category.to_string(),
            search_city: search_city.to_string(),
            generated_at: now_timestamp(),
        })
    }

    /// Dedup identity: lowercased trimmed name and company.
    pub fn identity_key(&self) -> (String, String) {
        (
            self.name.trim().to_lowercase(),
            self.company.trim().to_lowercase(),
        )
    }

    /// Administrative or empty entries are never kept.
    pub fn disqualified(&self) -> bool {
        let name = self.name.trim().to_lowercase();
        name.is_empty() || name == "nan" || name.contains("admin") || name.contains("reception")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Success,
    ParseError,
    ApiError,
}

/// Result of one verification search, keyed by the originating row index
/// in the checkpoint. Exactly one record exists per processed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at_company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub enrichment_status: EnrichmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    pub last_enriched: String,
}

impl EnrichmentRecord {
    pub fn from_search_value(value: &Value) -> EnrichmentRecord {
        EnrichmentRecord {
            verified_at_company: field_string(value, "verified_at_company"),
            current_company: field_string(value, "current_company"),
            current_role: field_string(value, "current_role"),
            verified_phone: field_string(value, "verified_phone"),
            verified_email: field_string(value, "verified_email"),
            linkedin_url: field_string(value, "linkedin_url"),
            confidence: field_string(value, "confidence"),
            notes: field_string(value, "notes"),
            enrichment_status: EnrichmentStatus::Success,
            enrichment_error: None,
            raw_response: None,
            last_enriched: now_timestamp(),
        }
    }

    pub fn parse_failure(error: String, raw: &str) -> EnrichmentRecord {
        EnrichmentRecord {
            enrichment_error: Some(error),
            raw_response: Some(truncate(raw, 500)),
            ..EnrichmentRecord::failure(EnrichmentStatus::ParseError)
        }
    }

    pub fn api_failure(error: String) -> EnrichmentRecord {
        EnrichmentRecord {
            enrichment_error: Some(error),
            ..EnrichmentRecord::failure(EnrichmentStatus::ApiError)
        }
    }

    fn failure(status: EnrichmentStatus) -> EnrichmentRecord {
        EnrichmentRecord {
            verified_at_company: None,
            current_company: None,
            current_role: None,
            verified_phone: None,
            verified_email: None,
            linkedin_url: None,
            confidence: None,
            notes: None,
            enrichment_status: status,
            enrichment_error: None,
            raw_response: None,
            last_enriched: now_timestamp(),
        }
    }
}

fn truncate(raw: &str, limit: usize) -> String {
    if raw.len() <= limit {
        raw.to_string()
    } else {
        let mut end = limit;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        raw[..end].to_string()
    }
}

/// Contact details found for a lead that was missing them.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactEnrichment {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub source: Option<String>,
}

impl ContactEnrichment {
    pub fn from_search_value(value: &Value) -> ContactEnrichment {
        ContactEnrichment {
            phone: field_string(value, "phone"),
            email: field_string(value, "email"),
            linkedin: field_string(value, "linkedin"),
            source: field_string(value, "source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lead_from_value_tolerates_nulls_and_numbers() {
        let value = json!({
            "name": " Jane Doe ",
            "company": "Ray White",
            "phone": 400111222,
            "email": null,
        });
        let lead = Lead::from_value(&value, "Top Agents", "Sydney").unwrap();
        assert_eq!(lead.name, "Jane Doe");
        assert_eq!(lead.phone.as_deref(), Some("400111222"));
        assert_eq!(lead.email, None);
        assert_eq!(lead.role, "");
        assert_eq!(lead.search_city, "Sydney");
    }

    #[test]
    fn non_object_values_are_discarded() {
        assert!(Lead::from_value(&json!("just a string"), "c", "s").is_none());
    }

    #[test]
    fn enrichment_statuses_serialize_as_tags() {
        let record = EnrichmentRecord::api_failure("boom".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["enrichment_status"], "api_error");
        assert_eq!(value["enrichment_error"], "boom");
        assert!(value.get("verified_phone").is_none());
    }

    #[test]
    fn parse_failure_keeps_a_bounded_raw_reply() {
        let raw = "x".repeat(2000);
        let record = EnrichmentRecord::parse_failure("bad json".to_string(), &raw);
        assert_eq!(record.raw_response.as_ref().unwrap().len(), 500);
        assert_eq!(record.enrichment_status, EnrichmentStatus::ParseError);
    }
}
