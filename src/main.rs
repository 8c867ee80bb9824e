mod digest;
mod error;
mod extract;
mod fetch;
mod media;
mod parse;
mod record;
mod store;
mod util;

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Parser;
use log::{info, warn};
use walkdir::WalkDir;

use crate::fetch::ChecklistScraper;
use crate::parse::Args;
use crate::record::{ObservationRecord, ReportReference};

enum FileAction {
    Overwrite,
    Append,
    Quit,
}

/// Reports from a batch of digests, plus the date range the digests cover.
struct DigestBatch {
    reports: Vec<ReportReference>,
    earliest: Option<NaiveDate>,
    latest: Option<NaiveDate>,
}

fn digest_files(dir: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Parse every digest. A digest that fails to reconcile aborts the run with
/// the offending file in the diagnostic; returning partial counts would
/// silently corrupt the table.
fn read_digests(paths: &[PathBuf]) -> Result<DigestBatch> {
    let mut batch = DigestBatch {
        reports: Vec::new(),
        earliest: None,
        latest: None,
    };
    for path in paths {
        let body = fs::read_to_string(path)
            .with_context(|| format!("reading digest {}", path.display()))?;
        if let Some(date) = digest::message_date(&body) {
            batch.earliest = Some(batch.earliest.map_or(date, |d| d.min(date)));
            batch.latest = Some(batch.latest.map_or(date, |d| d.max(date)));
        } else {
            warn!("No Date header in {}", path.display());
        }
        let reports =
            digest::parse(&body).with_context(|| format!("parsing digest {}", path.display()))?;
        info!("{}: {} report(s)", path.display(), reports.len());
        batch.reports.extend(reports);
    }
    Ok(batch)
}

fn default_filename(earliest: Option<NaiveDate>, latest: Option<NaiveDate>) -> String {
    match (earliest, latest) {
        (Some(early), Some(late)) => format!("records_{early}-{late}.csv"),
        _ => "records.csv".to_string(),
    }
}

fn media_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("media_{name}"))
}

fn prompt_existing(path: &Path) -> Result<FileAction> {
    print!(
        "{} already exists. [o]verwrite, [a]ppend, [q]uit: ",
        path.display()
    );
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(match line.trim().to_lowercase().as_str() {
        "o" | "overwrite" => FileAction::Overwrite,
        "a" | "append" => FileAction::Append,
        _ => FileAction::Quit,
    })
}

fn print_summary(
    records: &[ObservationRecord],
    skipped: usize,
    earliest: Option<NaiveDate>,
    latest: Option<NaiveDate>,
) {
    if records.is_empty() {
        println!("No records to summarize");
        return;
    }

    println!("\nSummary:");
    println!("Total records: {}", records.len());
    println!("Duplicates skipped: {}", skipped);

    let unique_species: HashSet<&String> = records.iter().map(|r| &r.species).collect();
    println!("Unique species: {}", unique_species.len());

    let with_media = records.iter().filter(|r| r.has_media).count();
    println!("Records with media: {}", with_media);

    if let (Some(early), Some(late)) = (earliest, latest) {
        println!("Digest date range: {} to {}", early, late);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::try_parse()?;
    // Initialize logger
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::init();
    }

    let paths = digest_files(&args.digests);
    if paths.is_empty() {
        bail!("no digest files found under {}", args.digests);
    }
    let batch = read_digests(&paths)?;
    info!(
        "Parsed {} digest(s) into {} report(s)",
        paths.len(),
        batch.reports.len()
    );

    println!("\nScraping checklists...");
    let scraper = ChecklistScraper::new().with_delay(args.delay);
    let start = Instant::now();
    let scraped = scraper.scrape_reports(&batch.reports).await?;
    util::print_hms(&start);

    let output = PathBuf::from(
        args.output
            .unwrap_or_else(|| default_filename(batch.earliest, batch.latest)),
    );

    let mut existing = Vec::new();
    let mut append = false;
    if output.exists() {
        match prompt_existing(&output)? {
            FileAction::Quit => {
                println!("Aborted; nothing written.");
                return Ok(());
            }
            FileAction::Append => {
                existing = store::read_records(&output)?;
                append = true;
            }
            FileAction::Overwrite => {}
        }
    }

    let keys = store::existing_keys(&existing);
    let (mut to_add, skipped) = store::merge(&keys, scraped);
    store::sort_records(&mut to_add);
    store::write_records(&output, &to_add, append)?;

    let mut all = existing;
    all.extend(to_add);
    if args.media {
        store::sort_records(&mut all);
        let media_rows = store::project_media_only(&all);
        store::write_records(&media_path(&output), &media_rows, false)?;
    }

    print_summary(&all, skipped, batch.earliest, batch.latest);

    Ok(())
}
