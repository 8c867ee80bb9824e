use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use log::info;

use crate::record::{ObservationRecord, ReportReference};

/// Split an incoming batch into rows to persist and a skipped-duplicate
/// count. Dedup is by (url, species), against the existing keys and within
/// the batch itself, so the store never holds two rows with the same key.
pub fn merge(
    existing: &HashSet<ReportReference>,
    incoming: Vec<ObservationRecord>,
) -> (Vec<ObservationRecord>, usize) {
    let mut seen = existing.clone();
    let mut to_add = Vec::new();
    let mut skipped = 0;
    for record in incoming {
        if seen.insert(record.key()) {
            to_add.push(record);
        } else {
            skipped += 1;
        }
    }
    (to_add, skipped)
}

/// Stable sort by (species, county, hotspot, date); absent values sort last
/// within their tier.
pub fn sort_records(records: &mut [ObservationRecord]) {
    records.sort_by(|a, b| {
        a.species
            .cmp(&b.species)
            .then_with(|| cmp_absent_last(&a.county, &b.county))
            .then_with(|| cmp_absent_last(&a.hotspot, &b.hotspot))
            .then_with(|| cmp_absent_last(&a.date, &b.date))
    });
}

fn cmp_absent_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn project_media_only(records: &[ObservationRecord]) -> Vec<ObservationRecord> {
    records
        .iter()
        .filter(|record| record.has_media)
        .cloned()
        .collect()
}

pub fn read_records(path: &Path) -> Result<Vec<ObservationRecord>> {
    let file =
        File::open(path).with_context(|| format!("opening {} for append", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ObservationRecord =
            row.with_context(|| format!("reading existing records from {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

pub fn existing_keys(records: &[ObservationRecord]) -> HashSet<ReportReference> {
    records.iter().map(ObservationRecord::key).collect()
}

/// Write rows to the output file. Append mode assumes the header row is
/// already in place.
pub fn write_records(path: &Path, records: &[ObservationRecord], append: bool) -> Result<()> {
    let file = if append {
        OpenOptions::new()
            .append(true)
            .open(path)
            .with_context(|| format!("appending to {}", path.display()))?
    } else {
        File::create(path).with_context(|| format!("creating {}", path.display()))?
    };
    let mut writer = WriterBuilder::new().has_headers(!append).from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(())
}
