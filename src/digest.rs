use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use log::debug;

use crate::error::DigestError;
use crate::record::ReportReference;

/// Parse one rare bird alert digest into the checklist reports it mentions.
///
/// The digest body splits into paragraphs on blank lines. Paragraph 0 is the
/// message head, paragraph 1 is the species summary ("Razorbill (2 Wexford)"
/// per line, possibly with multi-county breakdowns), and each remaining
/// paragraph that starts with a summarized species name and contains
/// "Reported" is one checklist report with a "Checklist: <url>" line.
///
/// The summary counts and the report paragraphs are tallied independently
/// and must reconcile exactly; a mismatch means the digest format drifted
/// and the whole run should stop rather than emit partial data.
pub fn parse(body: &str) -> Result<Vec<ReportReference>, DigestError> {
    let paragraphs = split_paragraphs(body);
    let summary = paragraphs.get(1).ok_or(DigestError::MissingSummary)?;

    // First pass: expected report count per species from the summary block.
    let mut expected: HashMap<String, usize> = HashMap::new();
    for line in summary.lines() {
        let Some(open) = line.find('(') else { continue };
        let species = line[..open].trim();
        if species.is_empty() {
            continue;
        }
        // Only a ')' after the '(' closes the group; one earlier in the
        // line must not produce a reversed slice.
        let close = line[open + 1..]
            .rfind(')')
            .map_or(line.len(), |i| open + 1 + i);
        let count = sum_integer_tokens(&line[open + 1..close]);
        *expected.entry(species.to_string()).or_insert(0) += count;
    }
    if expected.is_empty() {
        return Err(DigestError::MissingSummary);
    }

    // Longest name first, so "Razorbill" never swallows a report for a
    // species whose name it prefixes.
    let mut species_names: Vec<&str> = expected.keys().map(String::as_str).collect();
    species_names.sort_by_key(|name| std::cmp::Reverse(name.len()));

    // Second pass: one report per paragraph that leads with a species name.
    let mut actual: HashMap<String, usize> = HashMap::new();
    let mut reports = Vec::new();
    for paragraph in paragraphs.iter().skip(2) {
        if !paragraph.contains("Reported") {
            continue;
        }
        let Some(species) = species_names
            .iter()
            .find(|name| paragraph.starts_with(*name))
        else {
            continue;
        };
        let url = checklist_url(paragraph).ok_or_else(|| DigestError::MissingChecklistLink {
            species: species.to_string(),
        })?;
        *actual.entry(species.to_string()).or_insert(0) += 1;
        reports.push(ReportReference {
            url,
            species: species.to_string(),
        });
    }

    for (species, &count) in &expected {
        let found = actual.get(species).copied().unwrap_or(0);
        if found != count {
            return Err(DigestError::Inconsistent {
                species: species.clone(),
                expected: count,
                found,
            });
        }
    }

    debug!("digest yielded {} report(s)", reports.len());
    Ok(reports)
}

/// The calendar date from the message's RFC 2822 "Date:" header, used for
/// the output filename's date range. None when the header is missing.
pub fn message_date(body: &str) -> Option<NaiveDate> {
    for line in body.lines() {
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Date:") {
            return DateTime::parse_from_rfc2822(value.trim())
                .ok()
                .map(|datetime| datetime.date_naive());
        }
    }
    None
}

fn split_paragraphs(body: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// Sum of every integer token in a summary parenthetical, so both "(3)" and
/// "(8 Chester, 2 Luzerne)" work. A group with no integer ("(X)") sums to 0.
fn sum_integer_tokens(text: &str) -> usize {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<usize>().ok())
        .sum()
}

/// The text after "Checklist" up to the end of its line, stripped of the
/// separating colon and whitespace.
fn checklist_url(paragraph: &str) -> Option<String> {
    let rest = &paragraph[paragraph.find("Checklist")? + "Checklist".len()..];
    let line = rest.lines().next()?;
    let url = line.trim_matches(|c: char| c == ':' || c.is_whitespace());
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}
