//! `dlm add <url>` – add a new download job.

use anyhow::{Context, Result};
use dlm_core::extractor::Dispatcher;
use dlm_core::resume_db::{JobSettings, ResumeDb};
use std::path::Path;

/// Resolves `url` through the extractor dispatcher and queues one job per
/// descriptor it produces (the generic HTTP extractor always yields exactly
/// one; a future site extractor may split a page into several files).
pub async fn run_add(db: &ResumeDb, url: &str, download_dir: Option<&Path>) -> Result<()> {
    let dispatcher = Dispatcher::with_defaults();
    let descriptors = dispatcher
        .resolve(url)
        .await
        .with_context(|| format!("resolving {url}"))?;

    for descriptor in descriptors {
        let settings = JobSettings {
            download_dir: download_dir.map(|p| p.display().to_string()),
            custom_headers: (!descriptor.headers.is_empty()).then_some(descriptor.headers),
            max_threads: descriptor.max_threads,
            ..JobSettings::default()
        };
        let id = db.add_job(&descriptor.url, &settings).await?;
        println!("Added job {id} for URL: {}", descriptor.url);
    }
    Ok(())
}
