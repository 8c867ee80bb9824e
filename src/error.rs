use thiserror::Error;

/// Failures while parsing a rare bird alert digest. All of these abort the
/// run: a digest that does not reconcile means the parser and the email
/// format have drifted apart, and continuing would corrupt the counts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest has no species summary block")]
    MissingSummary,

    #[error("summary lists {expected} report(s) for {species}, found {found} report paragraph(s)")]
    Inconsistent {
        species: String,
        expected: usize,
        found: usize,
    },

    #[error("report paragraph for {species} has no checklist link")]
    MissingChecklistLink { species: String },
}

/// Failures while extracting fields from a fetched checklist page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The page title did not end in a "15 May 2018" style date. A page
    /// without a parseable date means the checklist layout changed, which
    /// needs investigation rather than a silently empty column.
    #[error("could not parse observation date from {text:?}")]
    DateParse { text: String },

    /// A transient fetch failure reached the extractor. Only a fetched page
    /// or a confirmed NotFound can become a row; a transient failure must be
    /// skipped by the caller, never persisted as a deleted checklist.
    #[error("cannot extract from a transient fetch failure: {cause}")]
    TransientFetch { cause: String },
}
