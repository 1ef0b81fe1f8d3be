use std::collections::HashMap;
use std::time::Instant;

use anyhow::{anyhow, Context};
use log::{error, info};

use lead_enricher_lib::response_parser::JsonShape;
use lead_enricher_lib::{
    dataset, input_loader, logger, merge, prompts, run_pool, ContactEnrichment, PoolOutcome,
    ProgressTracker, SearchClient, SearchError, Settings,
};

fn main() -> anyhow::Result<()> {
    logger::init();

    let settings = Settings::from_env().context("invalid environment configuration")?;

    let input_path = input_loader::latest_generated_leads(&settings.output_dir).ok_or_else(|| {
        anyhow!(
            "no generated_leads_<date> file found in {}; run generate_leads first",
            settings.output_dir.display()
        )
    })?;
    info!("Enriching contacts from {}", input_path.display());

    let mut dataset = input_loader::load_dataset(&input_path).context("could not load leads")?;

    let missing: Vec<usize> = (0..dataset.len())
        .filter(|&row| merge::is_placeholder(dataset.cell(row, "phone").unwrap_or("")))
        .collect();

    info!(
        "Total leads: {} | Missing phone: {} | Workers: {}",
        dataset.len(),
        missing.len(),
        settings.max_workers
    );

    let tracker = ProgressTracker::new(missing.len());
    let started = Instant::now();

    // The pool borrows the dataset read-only; merging happens afterwards
    // on the driver thread.
    let mut results: HashMap<usize, Result<ContactEnrichment, String>> = HashMap::new();
    {
        let dataset = &dataset;
        let settings_ref = &settings;
        let tracker_ref = &tracker;
        run_pool(
            missing.clone(),
            settings.max_workers,
            move |row: usize| {
                let name = dataset.value(row, "name").unwrap_or("").to_string();
                let prompt = prompts::contact_prompt(dataset, row);
                let client = SearchClient::new(settings_ref);

                match client.search(&prompt, JsonShape::Object) {
                    Ok(value) => {
                        let details = ContactEnrichment::from_search_value(&value);
                        let progress = tracker_ref.record(true);
                        let phone_display = details.phone.as_deref().unwrap_or("-");
                        info!(
                            "[{:3}/{}] {:28} | {:15}",
                            progress.completed, progress.total, name, phone_display
                        );
                        (row, Ok(details))
                    }
                    Err(e) => {
                        let progress = tracker_ref.record(false);
                        error!(
                            "[{:3}/{}] {:28} | {}",
                            progress.completed, progress.total, name, e
                        );
                        let message = match e {
                            SearchError::Parse { error, .. } => error.to_string(),
                            SearchError::Api { message } => message,
                        };
                        (row, Err(message))
                    }
                }
            },
            |outcome| match outcome {
                PoolOutcome::Finished((row, result)) => {
                    results.insert(row, result);
                }
                PoolOutcome::Crashed { task, message } => {
                    error!("Contact search crashed: {message}");
                    tracker.record(false);
                    if let Some(&row) = missing.get(task) {
                        results.insert(row, Err(message));
                    }
                }
            },
        );
    }

    let mut found_phone = 0;
    let mut found_email = 0;
    for (&row, result) in &results {
        let Ok(details) = result else { continue };
        if details
            .phone
            .as_deref()
            .map_or(false, |p| !merge::is_placeholder(p))
        {
            found_phone += 1;
        }
        if details
            .email
            .as_deref()
            .map_or(false, |e| !merge::is_placeholder(e) && e.contains('@'))
        {
            found_email += 1;
        }
        merge::apply_contact_details(&mut dataset, row, details);
    }

    let output_path = dataset::dated_path(&settings.output_dir, "generated_leads_enriched");
    dataset
        .write_csv(&output_path)
        .context("could not write enriched leads")?;

    let progress = tracker.snapshot();
    info!(
        "Contact enrichment done in {:.1} minutes: processed {}, errors {}",
        started.elapsed().as_secs_f64() / 60.0,
        progress.completed,
        progress.errored
    );
    info!("New phones found: {found_phone} | New emails found: {found_email}");

    let has_phone = (0..dataset.len())
        .filter(|&row| !merge::is_placeholder(dataset.cell(row, "phone").unwrap_or("")))
        .count();
    let has_email = (0..dataset.len())
        .filter(|&row| dataset.cell(row, "email").unwrap_or("").contains('@'))
        .count();
    let total = dataset.len().max(1);
    info!(
        "Total phones now: {}/{} ({:.1}%) | Total emails now: {}/{} ({:.1}%)",
        has_phone,
        dataset.len(),
        has_phone as f64 / total as f64 * 100.0,
        has_email,
        dataset.len(),
        has_email as f64 / total as f64 * 100.0
    );

    Ok(())
}
