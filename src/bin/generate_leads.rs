use std::collections::HashMap;
use std::time::Instant;

use anyhow::Context;
use log::{error, info};

use lead_enricher_lib::response_parser::JsonShape;
use lead_enricher_lib::{
    dataset, dedup, logger, prompts, run_pool, search_config, Dataset, Lead, PoolOutcome,
    ProgressTracker, SearchClient, Settings,
};

struct SearchTask {
    prompt: String,
    category: String,
    city: String,
}

const LEAD_COLUMNS: [&str; 12] = [
    "name",
    "company",
    "role",
    "city",
    "phone",
    "email",
    "linkedin",
    "match_reason",
    "search_category",
    "source",
    "search_city",
    "generated_at",
];

fn main() -> anyhow::Result<()> {
    logger::init();

    let settings = Settings::from_env().context("invalid environment configuration")?;
    let config =
        search_config::load(&settings.config_file).context("could not load search config")?;

    info!("Smart lead generator starting");
    info!(
        "Cities: {} | Search categories: {} | Boutique agencies: {}",
        config.cities.len(),
        config.search_templates.len(),
        config.agency_count()
    );

    // One task per city x template, plus one per named agency.
    let mut tasks = Vec::new();
    for city in &config.cities {
        for template in &config.search_templates {
            let query = template.query.replace("{city}", city);
            tasks.push(SearchTask {
                prompt: prompts::generation_prompt(&query),
                category: template.category.clone(),
                city: city.clone(),
            });
        }
    }
    for (city, agencies) in &config.boutique_agencies {
        for agency in agencies {
            let label: String = agency.chars().take(20).collect();
            tasks.push(SearchTask {
                prompt: prompts::generation_prompt(&prompts::agency_query(agency, city)),
                category: format!("Agency: {label}"),
                city: city.clone(),
            });
        }
    }

    info!("Total search tasks: {}", tasks.len());
    let tracker = ProgressTracker::new(tasks.len());
    let started = Instant::now();

    let mut all_leads: Vec<Lead> = Vec::new();
    run_pool(
        tasks,
        settings.max_workers,
        |task: SearchTask| {
            // Each worker builds its own client handle.
            let client = SearchClient::new(&settings);
            match client.search(&task.prompt, JsonShape::Array) {
                Ok(value) => {
                    let leads: Vec<Lead> = value
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|item| {
                                    Lead::from_value(item, &task.category, &task.city)
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    let progress = tracker.record(true);
                    info!(
                        "[{:3}] {:12} | {:25} | Found {:2} leads",
                        progress.completed,
                        task.city,
                        task.category,
                        leads.len()
                    );
                    leads
                }
                Err(e) => {
                    let progress = tracker.record(false);
                    error!(
                        "[{:3}] {:12} | {:25} | {}",
                        progress.completed, task.city, task.category, e
                    );
                    Vec::new()
                }
            }
        },
        |outcome| match outcome {
            PoolOutcome::Finished(leads) => all_leads.extend(leads),
            PoolOutcome::Crashed { task, message } => {
                error!("Search task {task} crashed: {message}");
                tracker.record(false);
            }
        },
    );

    let progress = tracker.snapshot();
    info!("Deduplicating {} raw leads", all_leads.len());
    let unique = dedup::deduplicate(all_leads);
    info!("After deduplication: {}", unique.len());

    let mut output = Dataset::new(LEAD_COLUMNS.iter().map(|c| c.to_string()).collect());
    for lead in &unique {
        output.push_row(vec![
            lead.name.clone(),
            lead.company.clone(),
            lead.role.clone(),
            lead.city.clone(),
            lead.phone.clone().unwrap_or_default(),
            lead.email.clone().unwrap_or_default(),
            lead.linkedin.clone().unwrap_or_default(),
            lead.match_reason.clone(),
            lead.search_category.clone(),
            lead.source.clone(),
            lead.search_city.clone(),
            lead.generated_at.clone(),
        ]);
    }

    let output_path = dataset::dated_path(&settings.output_dir, "generated_leads");
    output
        .write_csv(&output_path)
        .context("could not write generated leads")?;

    info!(
        "Done in {:.1} minutes: {} queries, {} errors, {} unique leads",
        started.elapsed().as_secs_f64() / 60.0,
        progress.completed,
        progress.errored,
        unique.len()
    );

    for city in &config.cities {
        let count = unique
            .iter()
            .filter(|l| {
                l.city.eq_ignore_ascii_case(city) || l.search_city.eq_ignore_ascii_case(city)
            })
            .count();
        info!("  {city:15} {count:4}");
    }

    let mut by_category: HashMap<&str, usize> = HashMap::new();
    for lead in &unique {
        *by_category.entry(lead.search_category.as_str()).or_default() += 1;
    }
    let mut categories: Vec<(&str, usize)> = by_category.into_iter().collect();
    categories.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (category, count) in categories.into_iter().take(10) {
        info!("  {category:30} {count:4}");
    }

    Ok(())
}
