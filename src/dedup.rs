use std::collections::HashSet;

use crate::models::Lead;

/// Drops later duplicates by (name, company) identity, keeping first-seen
/// order, and discards administrative or unnamed entries outright.
pub fn deduplicate(leads: Vec<Lead>) -> Vec<Lead> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for lead in leads {
        if lead.disqualified() {
            continue;
        }
        if seen.insert(lead.identity_key()) {
            unique.push(lead);
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lead(name: &str, company: &str) -> Lead {
        Lead::from_value(
            &json!({"name": name, "company": company}),
            "Test",
            "Sydney",
        )
        .unwrap()
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let out = deduplicate(vec![
            lead("Jane Doe", "Ray White"),
            lead("Sam Lee", "LJ Hooker"),
            lead("JANE DOE ", "ray white"),
            lead("Ana Kim", "Ray White"),
        ]);
        let names: Vec<&str> = out.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Doe", "Sam Lee", "Ana Kim"]);
    }

    #[test]
    fn same_name_different_company_is_kept() {
        let out = deduplicate(vec![
            lead("Jane Doe", "Ray White"),
            lead("Jane Doe", "LJ Hooker"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn drops_administrative_and_empty_names() {
        let out = deduplicate(vec![
            lead("", "Ray White"),
            lead("nan", "Ray White"),
            lead("Front Reception", "Ray White"),
            lead("Admin Team", "Ray White"),
            lead("Jane Doe", "Ray White"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Jane Doe");
    }

    #[test]
    fn no_two_outputs_share_an_identity_key() {
        let out = deduplicate(vec![
            lead("Jane Doe", "Ray White"),
            lead(" jane doe", "Ray White "),
            lead("Sam Lee", "LJ Hooker"),
            lead("Sam Lee", "LJ Hooker"),
        ]);
        let mut keys = HashSet::new();
        assert!(out.iter().all(|l| keys.insert(l.identity_key())));
    }
}
