use crate::dataset::Dataset;

// Column names the enrichment drivers expect on their input datasets.
// Absent columns degrade to "Unknown" in the prompts rather than failing.
pub const CONTACT_NAME: &str = "Contact Name";
pub const AGENCY_NAME: &str = "Agency Name";
pub const MOBILE: &str = "Mobile";
pub const PHONE: &str = "Phone";
pub const EMAIL_ADDRESS: &str = "Email Address";
pub const SUBURB: &str = "Suburb";
pub const STATE: &str = "State";

/// Wraps a search query with the JSON-array reply instructions for lead
/// generation.
pub fn generation_prompt(query: &str) -> String {
    format!(
        "{query}\n\n\
         Return JSON array only:\n\
         [{{\"name\":\"\",\"company\":\"\",\"role\":\"\",\"city\":\"\",\"phone\":null,\"email\":null,\"linkedin\":null,\"source\":\"\",\"match_reason\":\"\"}}]\n\n\
         Find 5-10 agents. No markdown, just JSON array."
    )
}

/// Query used when searching a specific agency rather than a category.
pub fn agency_query(agency: &str, city: &str) -> String {
    format!(
        "Find real estate agents at {agency} in {city}, Australia. \
         Include principals/directors AND sales associates, BDMs, and junior agents \
         who do prospecting. Look for agents who handle high volumes of calls and inquiries."
    )
}

fn field_or_unknown(dataset: &Dataset, row: usize, column: &str) -> String {
    dataset
        .value(row, column)
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Prompt asking the model to verify one lead row and reply with a JSON
/// object of verification fields.
pub fn verification_prompt(dataset: &Dataset, row: usize) -> String {
    let name = dataset.value(row, CONTACT_NAME).unwrap_or_default();
    let company = dataset.value(row, AGENCY_NAME).unwrap_or_default();
    let mobile = field_or_unknown(dataset, row, MOBILE);
    let phone = field_or_unknown(dataset, row, PHONE);
    let email = field_or_unknown(dataset, row, EMAIL_ADDRESS);

    let suburb = dataset.value(row, SUBURB).unwrap_or_default();
    let state = dataset.value(row, STATE).unwrap_or_default();
    let mut location = format!("{suburb} {state}").trim().to_string();
    if location.is_empty() {
        location = "Australia".to_string();
    }

    format!(
        "Search the web to verify and enrich information about this real estate agent:\n\n\
         Name: {name}\n\
         Company: {company}\n\
         Location: {location}\n\
         Current Mobile: {mobile}\n\
         Current Phone: {phone}\n\
         Current Email: {email}\n\n\
         Please search for this person and provide:\n\
         1. VERIFIED: Is this person currently working at {company}? (Yes/No/Unknown)\n\
         2. CURRENT_COMPANY: Their current company name (if different from above)\n\
         3. CURRENT_ROLE: Their current job title/position\n\
         4. VERIFIED_PHONE: Any phone number found for them\n\
         5. VERIFIED_EMAIL: Any email found for them\n\
         6. LINKEDIN_URL: Their LinkedIn profile URL if found\n\
         7. CONFIDENCE: How confident are you in this data? (High/Medium/Low)\n\
         8. NOTES: Any other relevant info (awards, specializations, years experience)\n\n\
         Respond in this exact JSON format:\n\
         {{\n\
             \"verified_at_company\": \"Yes/No/Unknown\",\n\
             \"current_company\": \"company name or null\",\n\
             \"current_role\": \"role or null\",\n\
             \"verified_phone\": \"phone or null\",\n\
             \"verified_email\": \"email or null\",\n\
             \"linkedin_url\": \"url or null\",\n\
             \"confidence\": \"High/Medium/Low\",\n\
             \"notes\": \"additional info or null\"\n\
         }}\n\n\
         Only return the JSON, no other text."
    )
}

/// Prompt asking the model for missing contact details, replying with a
/// JSON object.
pub fn contact_prompt(dataset: &Dataset, row: usize) -> String {
    let name = dataset.value(row, "name").unwrap_or_default();
    let company = dataset.value(row, "company").unwrap_or_default();
    let city = dataset
        .value(row, "search_city")
        .or_else(|| dataset.value(row, "city"))
        .unwrap_or_default();
    let role = dataset.value(row, "role").unwrap_or_default();

    format!(
        "Search for the contact details of this real estate agent:\n\n\
         Name: {name}\n\
         Company: {company}\n\
         City: {city}, Australia\n\
         Role: {role}\n\n\
         Search their agency website, LinkedIn, RateMyAgent, Domain, RealEstate.com.au, \
         and any other sources.\n\n\
         Find their:\n\
         1. Mobile phone number (Australian format starting with 04xx)\n\
         2. Office phone number\n\
         3. Email address\n\
         4. LinkedIn URL\n\n\
         Return ONLY a JSON object:\n\
         {{\"phone\": \"mobile or office number\", \"email\": \"email address\", \"linkedin\": \"linkedin url\", \"source\": \"where you found it\"}}\n\n\
         If you cannot find a piece of information, use null for that field.\n\
         Return ONLY the JSON, no other text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_prompt_degrades_missing_columns() {
        let mut ds = Dataset::new(vec![CONTACT_NAME.into(), AGENCY_NAME.into()]);
        ds.push_row(vec!["Jane Doe".into(), "Ray White".into()]);

        let prompt = verification_prompt(&ds, 0);
        assert!(prompt.contains("Name: Jane Doe"));
        assert!(prompt.contains("Location: Australia"));
        assert!(prompt.contains("Current Mobile: Unknown"));
    }

    #[test]
    fn contact_prompt_prefers_search_city() {
        let mut ds = Dataset::new(vec![
            "name".into(),
            "company".into(),
            "city".into(),
            "search_city".into(),
        ]);
        ds.push_row(vec![
            "Sam Lee".into(),
            "LJ Hooker".into(),
            "Parramatta".into(),
            "Sydney".into(),
        ]);

        let prompt = contact_prompt(&ds, 0);
        assert!(prompt.contains("City: Sydney, Australia"));
    }

    #[test]
    fn generation_prompt_requests_an_array() {
        let prompt = generation_prompt("Find top selling agents in Brisbane");
        assert!(prompt.starts_with("Find top selling agents in Brisbane"));
        assert!(prompt.contains("Return JSON array only"));
    }
}
