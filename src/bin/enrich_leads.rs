use std::time::Instant;

use anyhow::Context;
use log::{error, info, warn};

use lead_enricher_lib::response_parser::JsonShape;
use lead_enricher_lib::{
    checkpoint, dataset, input_loader, logger, merge, prompts, run_pool, CheckpointCadence,
    CheckpointStore, EnrichmentRecord, EnrichmentStatus, PoolOutcome, ProgressTracker,
    SearchClient, SearchError, Settings,
};

fn main() -> anyhow::Result<()> {
    logger::init();

    let settings = Settings::from_env().context("invalid environment configuration")?;

    info!("Lead enrichment starting: {}", settings.input_file.display());
    let mut dataset =
        input_loader::load_dataset(&settings.input_file).context("could not load input leads")?;
    info!(
        "Loaded {} leads | Workers: {}",
        dataset.len(),
        settings.max_workers
    );

    let store = CheckpointStore::new(settings.output_dir.join("enrichment_checkpoint.json"));
    let mut state = store.load();

    let (pending, skipped) = checkpoint::rows_to_enrich(&dataset, &state, prompts::CONTACT_NAME);
    if skipped > 0 {
        info!("Skipped {skipped} leads with missing names");
    }
    if !state.processed_indices.is_empty() {
        info!(
            "Resuming: {} already done, {} remaining",
            state.processed_indices.len(),
            pending.len()
        );
    }
    if pending.is_empty() {
        info!("All leads already processed!");
        return Ok(());
    }

    info!("Starting enrichment of {} leads", pending.len());
    let tracker = ProgressTracker::new(pending.len());
    let mut cadence = CheckpointCadence::new(settings.checkpoint_interval);
    let started = Instant::now();

    let task_rows = pending.clone();
    {
        let dataset = &dataset;
        let settings_ref = &settings;
        let tracker_ref = &tracker;
        run_pool(
            pending,
            settings.max_workers,
            move |row: usize| {
                let name = dataset
                    .value(row, prompts::CONTACT_NAME)
                    .unwrap_or("")
                    .to_string();
                let prompt = prompts::verification_prompt(dataset, row);
                let client = SearchClient::new(settings_ref);

                let record = match client.search(&prompt, JsonShape::Object) {
                    Ok(value) => EnrichmentRecord::from_search_value(&value),
                    Err(SearchError::Parse { error, raw }) => {
                        EnrichmentRecord::parse_failure(error.to_string(), &raw)
                    }
                    Err(SearchError::Api { message }) => EnrichmentRecord::api_failure(message),
                };

                let succeeded = record.enrichment_status == EnrichmentStatus::Success;
                let progress = tracker_ref.record(succeeded);
                let short: String = name.chars().take(30).collect();
                if succeeded {
                    info!(
                        "[{}/{} ({:.1}%)] OK {} - {}",
                        progress.completed,
                        progress.total,
                        progress.percent(),
                        short,
                        record.confidence.as_deref().unwrap_or("N/A")
                    );
                } else {
                    warn!(
                        "[{}/{} ({:.1}%)] FAILED {} - {}",
                        progress.completed,
                        progress.total,
                        progress.percent(),
                        short,
                        record.enrichment_error.as_deref().unwrap_or("unknown")
                    );
                }

                (row, record)
            },
            |outcome| {
                // Record the result before marking the index processed, so
                // the durable set never claims un-recorded work.
                let (row, record) = match outcome {
                    PoolOutcome::Finished(done) => done,
                    PoolOutcome::Crashed { task, message } => {
                        error!("Enrichment worker crashed: {message}");
                        tracker.record(false);
                        let row = task_rows[task];
                        (row, EnrichmentRecord::api_failure(message))
                    }
                };
                state.record(row, record);

                if cadence.completed_one() {
                    if let Err(e) = store.save(&state) {
                        error!("Checkpoint save failed: {e}");
                    }
                }
            },
        );
    }

    // Unconditional final save so the durable state covers every
    // processed item even when the interval does not divide the total.
    store
        .save(&state)
        .context("could not write final checkpoint")?;

    let progress = tracker.snapshot();
    let elapsed = started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        progress.completed as f64 / elapsed
    } else {
        0.0
    };
    info!(
        "Enrichment complete: {} leads in {:.1}s ({:.1} leads/sec) | success {} | errors {}",
        progress.completed, elapsed, rate, progress.succeeded, progress.errored
    );

    merge::apply_verification(&mut dataset, &state.enrichments);
    let output_path = dataset::dated_path(&settings.output_dir, "enriched_leads");
    dataset
        .write_csv(&output_path)
        .context("could not write enriched leads")?;

    let count_status = |status: EnrichmentStatus| {
        state
            .enrichments
            .values()
            .filter(|e| e.enrichment_status == status)
            .count()
    };
    let count_verified = |expected: &str| {
        state
            .enrichments
            .values()
            .filter(|e| e.verified_at_company.as_deref() == Some(expected))
            .count()
    };
    let count_confidence = |expected: &str| {
        state
            .enrichments
            .values()
            .filter(|e| e.confidence.as_deref() == Some(expected))
            .count()
    };

    info!(
        "Successfully enriched: {} | parse errors: {} | api errors: {}",
        count_status(EnrichmentStatus::Success),
        count_status(EnrichmentStatus::ParseError),
        count_status(EnrichmentStatus::ApiError)
    );
    info!(
        "Still at listed company: {} | No longer at company: {}",
        count_verified("Yes"),
        count_verified("No")
    );
    info!(
        "Confidence high: {} | medium: {} | low: {}",
        count_confidence("High"),
        count_confidence("Medium"),
        count_confidence("Low")
    );

    Ok(())
}
