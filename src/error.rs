// =============================================================================
// error.rs — THE TAXONOMY OF THINGS THAT GO WRONG
// =============================================================================
//
// Nothing in this engine is fatal at the batch level. One filing with a
// mangled header never prevents processing of the other nine hundred.
// Every variant below is recoverable: it gets logged, counted in metrics,
// and represented in the output data model (confidence grades, UNKNOWN
// statuses, review flags) rather than thrown at the caller.
// =============================================================================

use thiserror::Error;

/// The four ways extraction and reconciliation can degrade.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Header or body text did not parse at all for a filing. The stage
    /// is treated as empty-result; the filing still flows through.
    #[error("malformed input in filing {accession}: {detail}")]
    MalformedInput { accession: String, detail: String },

    /// Multiple non-identical candidate values were found. Resolved by
    /// the documented tie-break rules, never by shrugging.
    #[error("ambiguous extraction in filing {accession} for series {series_id}: {detail}")]
    AmbiguousExtraction {
        accession: String,
        series_id: String,
        detail: String,
    },

    /// No priority rule produced an effective date. Surfaced as an
    /// explicit UNKNOWN with NONE confidence, never defaulted to today.
    #[error("unresolvable effective date for series {series_id} in filing {accession}")]
    UnresolvableEffectiveDate {
        accession: String,
        series_id: String,
    },

    /// Two filings claimed the same series id with wildly divergent
    /// names. Flagged for review; rollup still produces best-effort state.
    #[error("identifier collision on series {series_id}: '{existing}' vs '{incoming}'")]
    IdentifierCollision {
        series_id: String,
        existing: String,
        incoming: String,
    },
}
