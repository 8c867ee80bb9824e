use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A (checklist url, species) pair pulled out of one digest email. This is
/// the deduplication key for the record store: a checklist reported in two
/// digests is still one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportReference {
    pub url: String,
    pub species: String,
}

/// One scraped checklist observation. Field order is the CSV column order.
///
/// `individuals` stays a string because eBird accepts non-numeric counts
/// ("X" for present-but-uncounted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub species: String,
    pub url: String,
    pub individuals: Option<String>,
    pub county: Option<String>,
    pub hotspot: Option<String>,
    pub date: Option<NaiveDate>,
    pub submitter: Option<String>,
    pub has_media: bool,
    pub media_confirmed: bool,
}

impl ObservationRecord {
    /// The row for a checklist that no longer exists: species and url only,
    /// everything else absent. Never reuses data from another page.
    pub fn bare(species: &str, url: &str) -> Self {
        Self {
            species: species.to_string(),
            url: url.to_string(),
            individuals: None,
            county: None,
            hotspot: None,
            date: None,
            submitter: None,
            has_media: false,
            media_confirmed: false,
        }
    }

    pub fn key(&self) -> ReportReference {
        ReportReference {
            url: self.url.clone(),
            species: self.species.clone(),
        }
    }
}
