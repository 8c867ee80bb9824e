use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use reqwest::Client;
use tokio::time::sleep;

use crate::extract;
use crate::media;
use crate::record::{ObservationRecord, ReportReference};

/// Outcome of fetching one page. NotFound is a normal state (checklists get
/// deleted); TransientError carries the cause for the caller to log.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Page(String),
    NotFound,
    TransientError(String),
}

pub struct ChecklistScraper {
    client: Client,
    pub(crate) base_delay: Duration,
}

impl ChecklistScraper {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_delay: Duration::from_millis(500),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.base_delay = Duration::from_millis(delay_ms);
        self
    }

    /// Issue a single request. No retry loop: a transient failure is
    /// surfaced to the caller, not masked.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.client.get(url).send().await {
            Ok(response) => match response.status().as_u16() {
                404 | 410 => FetchOutcome::NotFound,
                200..=299 => match response.text().await {
                    Ok(html) => FetchOutcome::Page(html),
                    Err(e) => FetchOutcome::TransientError(e.to_string()),
                },
                status => FetchOutcome::TransientError(format!("http status {status}")),
            },
            Err(e) => FetchOutcome::TransientError(e.to_string()),
        }
    }

    /// Review status for one media asset. Anything short of a fetched page
    /// counts as unconfirmed.
    pub async fn check_confirmed(&self, media_id: &str) -> bool {
        match self.fetch(&media::asset_url(media_id)).await {
            FetchOutcome::Page(html) => media::confirmed_from_page(&html),
            FetchOutcome::NotFound | FetchOutcome::TransientError(_) => false,
        }
    }

    /// Scrape every report in order, one request at a time. A transient
    /// fetch failure skips that one report; an unparseable page date aborts
    /// the run.
    pub async fn scrape_reports(
        &self,
        reports: &[ReportReference],
    ) -> Result<Vec<ObservationRecord>> {
        let progress_bar = ProgressBar::new(reports.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent:>3}% ETA: {eta_precise} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        progress_bar.set_message("Scraping checklists");

        let mut records = Vec::with_capacity(reports.len());
        for report in reports {
            sleep(self.base_delay).await;
            match self.fetch(&report.url).await {
                FetchOutcome::TransientError(cause) => {
                    warn!("Skipping {} ({}): {}", report.url, report.species, cause);
                }
                outcome => {
                    if matches!(outcome, FetchOutcome::NotFound) {
                        info!("Checklist {} no longer exists", report.url);
                    }
                    let extraction = extract::extract(&outcome, &report.url, &report.species)
                        .with_context(|| {
                            format!("extracting {} from {}", report.species, report.url)
                        })?;
                    let mut record = extraction.record;
                    if record.has_media {
                        record.media_confirmed = match extraction.media_id.as_deref() {
                            Some(id) => self.check_confirmed(id).await,
                            None => false,
                        };
                    }
                    records.push(record);
                }
            }
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        info!(
            "Scraped {} out of {} report(s)",
            records.len(),
            reports.len()
        );
        Ok(records)
    }
}
