//! # Daily Brief
//!
//! Builds a topical news brief from RSS feeds, grounds each headline with
//! cited facts from a language model, and submits the result to Gamma as a
//! shareable social-card page with a PDF export.
//!
//! ## Features
//!
//! - Merges a Google News keyword search with any operator RSS/Atom sources
//! - Translates CJK keywords to English for wider feed coverage
//! - Enriches headlines with facts whose citations must come from evidence
//!   actually fetched for that headline
//! - Writes a JSON run report per run
//!
//! ## Usage
//!
//! ```sh
//! daily_brief -k "人工智能 政策" -l 8 -j ./reports
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Normalization**: Clean the keyword, limit, and RSS sources
//! 2. **Fetching**: Pull every source concurrently, dedupe, rank by recency
//! 3. **Enrichment**: Gather evidence and extract facts (bounded worker pool)
//! 4. **Output**: Assemble the brief, write the report, submit and poll Gamma

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod enrich;
mod error;
mod feeds;
mod gamma;
mod models;
mod normalize;
mod outputs;
mod pipeline;
#[cfg(test)]
mod test_support;
mod translate;
mod utils;

use api::OpenAiClient;
use cli::Cli;
use config::{BriefConfig, FileSettings, brief_request, load_file_settings};
use error::BriefError;
use feeds::HttpFeedSource;
use gamma::{GammaClient, GenerationApi, fetch_og_image, poll_generation};
use outputs::json::write_run_report;
use pipeline::Pipeline;
use utils::{ensure_writable_dir, truncate_for_log};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_brief starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.json_output_dir, dry_run = args.dry_run, "Parsed CLI arguments");

    let file = match args.config.as_deref() {
        Some(path) => load_file_settings(path).await?,
        None => FileSettings::default(),
    };
    let config = BriefConfig::resolve(&args, &file);
    let request = brief_request(&args, &file);

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = args.json_output_dir.as_deref() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    let http = Client::builder()
        .user_agent(concat!("daily_brief/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let feeds = HttpFeedSource::new(config.feed_timeout)?;
    let llm = OpenAiClient::from_settings(&http, &config.llm);
    if llm.is_none() {
        warn!("OPENAI_API_KEY is not set; keyword translation and fact extraction will be skipped");
    }

    // ---- Fetch, enrich, assemble ----
    let pipeline = Pipeline::new(&config, llm.as_ref(), &feeds, &http);
    let run = match pipeline.run(&request).await {
        Ok(run) => run,
        Err(BriefError::NoHeadlines { warnings }) => {
            for warning in &warnings {
                eprintln!("warning: {warning}");
            }
            error!(warnings = warnings.len(), "No headlines fetched; nothing to publish");
            return Err(BriefError::NoHeadlines { warnings }.into());
        }
        Err(e) => return Err(e.into()),
    };

    for warning in &run.warnings {
        eprintln!("warning: {warning}");
    }
    info!(
        headlines = run.headlines.len(),
        enriched = run.enriched_count,
        warnings = run.warnings.len(),
        "Brief assembled"
    );
    debug!(preview = %truncate_for_log(&run.input_text, 600), "Brief input text");

    if let Some(dir) = args.json_output_dir.as_deref() {
        let path = write_run_report(&run, dir).await?;
        info!(path = %path.display(), "Wrote run report");
    }

    // ---- Publish ----
    match (config.gamma_api_key.as_deref(), args.dry_run) {
        (_, true) => println!("{}", run.input_text),
        (None, false) => {
            warn!("GAMMA_API_KEY is not set; printing the brief instead of submitting it");
            println!("{}", run.input_text);
        }
        (Some(key), false) => {
            let gamma = GammaClient::new(http.clone(), key);
            let generation_id = gamma.create(&run.input_text, &run.keyword).await?;
            let status = poll_generation(
                &gamma,
                &generation_id,
                config.poll_interval,
                config.poll_max_tries,
            )
            .await?;

            let cover = match status.gamma_url.as_deref() {
                Some(url) => fetch_og_image(&http, url, config.article_fetch_timeout).await,
                None => None,
            };

            println!("generation: {generation_id}");
            if let Some(url) = &status.gamma_url {
                println!("page: {url}");
            }
            if let Some(pdf) = &status.pdf_url {
                println!("pdf: {pdf}");
            }
            if let Some(cover) = &cover {
                println!("cover: {cover}");
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "daily_brief finished"
    );

    Ok(())
}
