use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::fetch::FetchOutcome;
use crate::record::ObservationRecord;

/// Extractor output. The media asset id feeds the confirmation check and
/// never reaches the CSV.
#[derive(Debug)]
pub struct Extraction {
    pub record: ObservationRecord,
    pub media_id: Option<String>,
}

/// Derive an observation record from a fetch outcome.
///
/// A page that no longer exists yields a bare record (species and url only).
/// On a fetched page, checklist-wide fields (county, hotspot, date,
/// submitter) populate whether or not the species appears; the individuals
/// count and media flag come only from the list row whose heading matches
/// the species exactly, never from a neighboring row. A transient fetch
/// failure is an error here: it must stay a skipped report, not turn into a
/// row that looks like a deleted checklist.
pub fn extract(
    outcome: &FetchOutcome,
    url: &str,
    species: &str,
) -> Result<Extraction, ExtractError> {
    match outcome {
        FetchOutcome::Page(html) => extract_page(html, url, species),
        FetchOutcome::NotFound => Ok(Extraction {
            record: ObservationRecord::bare(species, url),
            media_id: None,
        }),
        FetchOutcome::TransientError(cause) => Err(ExtractError::TransientFetch {
            cause: cause.clone(),
        }),
    }
}

fn extract_page(html: &str, url: &str, species: &str) -> Result<Extraction, ExtractError> {
    let document = Html::parse_document(html);
    let mut record = ObservationRecord::bare(species, url);

    record.county = county(&document);
    record.hotspot = hotspot(&document);
    record.date = Some(observation_date(&document)?);
    record.submitter = submitter(&document);

    let mut media_id = None;
    if let Some(row) = species_row(&document, species) {
        record.individuals = individuals(row);
        if let Some(img) = media_element(row, species) {
            record.has_media = true;
            media_id = img.value().attr("data-asset-id").map(str::to_string);
        }
    }

    Ok(Extraction { record, media_id })
}

/// First anchor whose title marks it as a county region page; the county
/// name is the anchor's visible text.
fn county(document: &Html) -> Option<String> {
    let anchor_selector = Selector::parse("a[title]").ok()?;
    document.select(&anchor_selector).find_map(|anchor| {
        let title = anchor.value().attr("title")?;
        if title.starts_with("Region page for") && title.contains("County") {
            Some(element_text(anchor))
        } else {
            None
        }
    })
}

/// The location heading's embedded link. Absent when the location is not a
/// clickable hotspot.
fn hotspot(document: &Html) -> Option<String> {
    let link_selector = Selector::parse("h2 a[href]").ok()?;
    let link = document.select(&link_selector).next()?;
    Some(link.value().attr("href")?.to_string())
}

/// The page title ends in a "15 May 2018" style date. Failure to parse it
/// is a hard error: it means the page layout changed.
fn observation_date(document: &Html) -> Result<NaiveDate, ExtractError> {
    let title = Selector::parse("title")
        .ok()
        .and_then(|title_selector| document.select(&title_selector).next())
        .map(element_text)
        .unwrap_or_default();
    parse_trailing_date(&title)
}

fn parse_trailing_date(text: &str) -> Result<NaiveDate, ExtractError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ExtractError::DateParse {
            text: text.to_string(),
        });
    }
    let tail = tokens[tokens.len() - 3..].join(" ");
    NaiveDate::parse_from_str(&tail, "%d %B %Y").map_err(|_| ExtractError::DateParse { text: tail })
}

fn submitter(document: &Html) -> Option<String> {
    let meta_selector = Selector::parse(r#"meta[name="author"]"#).ok()?;
    let meta = document.select(&meta_selector).next()?;
    Some(meta.value().attr("content")?.trim().to_string())
}

/// The list row whose heading text equals the species exactly,
/// case-sensitive and full string.
fn species_row<'a>(document: &'a Html, species: &str) -> Option<ElementRef<'a>> {
    let row_selector = Selector::parse("li").ok()?;
    let heading_selector = Selector::parse("h5").ok()?;
    document.select(&row_selector).find(|row| {
        row.select(&heading_selector)
            .next()
            .is_some_and(|heading| element_text(heading) == species)
    })
}

/// The observed-count text inside the matched row, kept verbatim since
/// eBird allows "X" for present-but-uncounted.
fn individuals(row: ElementRef) -> Option<String> {
    let count_selector = Selector::parse("div.Observation-numberObserved span").ok()?;
    let value = row.select(&count_selector).last()?;
    let text = element_text(value);
    if text.is_empty() { None } else { Some(text) }
}

/// Media attached to the matched row, tagged with the species' common name.
fn media_element<'a>(row: ElementRef<'a>, species: &str) -> Option<ElementRef<'a>> {
    let img_selector = Selector::parse("img[alt]").ok()?;
    row.select(&img_selector)
        .find(|img| img.value().attr("alt") == Some(species))
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join("").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAZORBILL_URL: &str = "https://ebird.org/checklist/S45704143";

    const RAZORBILL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Great Saltee Island - 15 May 2018</title>
<meta name="author" content="Susan Mac">
</head>
<body>
<h2 class="Heading"><a href="/hotspot/L2154897">Great Saltee Island</a></h2>
<a title="Region page for Wexford County" href="/region/IE-WX">Wexford County</a>
<ul>
  <li>
    <h5>Great Black-backed Gull</h5>
    <div class="Observation-numberObserved"><span>Number observed:</span> <span>12</span></div>
  </li>
  <li>
    <h5>Razorbill</h5>
    <div class="Observation-numberObserved"><span>Number observed:</span> <span>200</span></div>
    <div class="Observation-media"><img alt="Razorbill" data-asset-id="98765432"></div>
  </li>
</ul>
</body>
</html>"#;

    const REDPOLL_URL: &str = "https://ebird.org/checklist/S78396122";

    const REDPOLL_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Bald Eagle Valley - 1 January 2021</title>
<meta name="author" content="Matt Kello">
</head>
<body>
<h2 class="Heading"><a href="/hotspot/L13086405">Bald Eagle Valley</a></h2>
<a title="Region page for Centre County" href="/region/US-PA-027">Centre County</a>
<ul>
  <li>
    <h5>Hoary Redpoll</h5>
    <div class="Observation-numberObserved"><span>Number observed:</span> <span>1</span></div>
    <div class="Observation-media"><img alt="Hoary Redpoll" data-asset-id="29000001"></div>
  </li>
</ul>
</body>
</html>"#;

    fn page(html: &str) -> FetchOutcome {
        FetchOutcome::Page(html.to_string())
    }

    #[test]
    fn extracts_every_field_for_matched_species() {
        let extraction = extract(&page(RAZORBILL_PAGE), RAZORBILL_URL, "Razorbill").unwrap();
        let record = extraction.record;
        assert_eq!(record.species, "Razorbill");
        assert_eq!(record.url, RAZORBILL_URL);
        assert_eq!(record.individuals.as_deref(), Some("200"));
        assert_eq!(record.county.as_deref(), Some("Wexford County"));
        assert_eq!(record.hotspot.as_deref(), Some("/hotspot/L2154897"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2018, 5, 15));
        assert_eq!(record.submitter.as_deref(), Some("Susan Mac"));
        assert!(record.has_media);
        // Confirmation is the checker's job, not the extractor's.
        assert!(!record.media_confirmed);
        assert_eq!(extraction.media_id.as_deref(), Some("98765432"));
    }

    #[test]
    fn extracts_single_digit_date() {
        let extraction = extract(&page(REDPOLL_PAGE), REDPOLL_URL, "Hoary Redpoll").unwrap();
        let record = extraction.record;
        assert_eq!(record.individuals.as_deref(), Some("1"));
        assert_eq!(record.county.as_deref(), Some("Centre County"));
        assert_eq!(record.hotspot.as_deref(), Some("/hotspot/L13086405"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(record.submitter.as_deref(), Some("Matt Kello"));
        assert!(record.has_media);
    }

    #[test]
    fn unmatched_species_keeps_page_wide_fields_only() {
        let extraction = extract(
            &page(REDPOLL_PAGE),
            REDPOLL_URL,
            "Andean Cock-of-the-rock",
        )
        .unwrap();
        let record = extraction.record;
        assert_eq!(record.species, "Andean Cock-of-the-rock");
        assert_eq!(record.individuals, None);
        assert!(!record.has_media);
        assert!(!record.media_confirmed);
        assert_eq!(extraction.media_id, None);
        // Checklist-wide fields still describe the page.
        assert_eq!(record.county.as_deref(), Some("Centre County"));
        assert_eq!(record.hotspot.as_deref(), Some("/hotspot/L13086405"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(record.submitter.as_deref(), Some("Matt Kello"));
    }

    #[test]
    fn heading_match_is_exact_and_case_sensitive() {
        let extraction = extract(&page(RAZORBILL_PAGE), RAZORBILL_URL, "razorbill").unwrap();
        assert_eq!(extraction.record.individuals, None);
        assert!(!extraction.record.has_media);
    }

    #[test]
    fn media_flag_requires_species_tagged_media() {
        let extraction = extract(&page(RAZORBILL_PAGE), RAZORBILL_URL, "Great Black-backed Gull")
            .unwrap();
        assert_eq!(extraction.record.individuals.as_deref(), Some("12"));
        assert!(!extraction.record.has_media);
        assert_eq!(extraction.media_id, None);
    }

    #[test]
    fn not_found_yields_bare_record() {
        let extraction = extract(&FetchOutcome::NotFound, RAZORBILL_URL, "Razorbill").unwrap();
        let record = extraction.record;
        assert_eq!(record, ObservationRecord::bare("Razorbill", RAZORBILL_URL));
        assert_eq!(extraction.media_id, None);
    }

    #[test]
    fn transient_failure_never_becomes_a_record() {
        let outcome = FetchOutcome::TransientError("http status 503".to_string());
        let err = extract(&outcome, RAZORBILL_URL, "Razorbill").unwrap_err();
        assert_eq!(
            err,
            ExtractError::TransientFetch {
                cause: "http status 503".to_string(),
            }
        );
    }

    #[test]
    fn unparseable_title_date_is_a_hard_error() {
        let html = RAZORBILL_PAGE.replace(
            "<title>Great Saltee Island - 15 May 2018</title>",
            "<title>Great Saltee Island</title>",
        );
        let err = extract(&page(&html), RAZORBILL_URL, "Razorbill").unwrap_err();
        assert!(matches!(err, ExtractError::DateParse { .. }));
    }

    #[test]
    fn location_without_link_has_no_hotspot() {
        let html = RAZORBILL_PAGE.replace(
            r#"<h2 class="Heading"><a href="/hotspot/L2154897">Great Saltee Island</a></h2>"#,
            r#"<h2 class="Heading">Roadside pull-off, R739</h2>"#,
        );
        let extraction = extract(&page(&html), RAZORBILL_URL, "Razorbill").unwrap();
        assert_eq!(extraction.record.hotspot, None);
        assert_eq!(extraction.record.county.as_deref(), Some("Wexford County"));
    }

    #[test]
    fn non_numeric_count_is_kept_verbatim() {
        let html = RAZORBILL_PAGE.replace("<span>200</span>", "<span>X</span>");
        let extraction = extract(&page(&html), RAZORBILL_URL, "Razorbill").unwrap();
        assert_eq!(extraction.record.individuals.as_deref(), Some("X"));
    }
}
