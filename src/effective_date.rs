// =============================================================================
// effective_date.rs — THE EFFECTIVE-DATE PRIORITY LADDER
// =============================================================================
//
// One filing, one series, one answer: when does (or did) this fund become
// effective? The evidence is contradictory, scattered across header tags,
// checkbox prose, and regulatory defaults, so this module rules on it with
// a fixed priority ladder. Evaluated top to bottom, first match wins:
//
//   1. Checkbox/paragraph-citation date ("on DATE pursuant to paragraph (b)")  HIGH
//   2. Explicit designation prose (extension amendments)                       HIGH
//   3. Structured header EFFECTIVENESS DATE tag                                HIGH
//   4. Filing date of a post-effective amendment                               MEDIUM
//   5. Filing date + regulatory waiting period (no delaying amendment)         LOW
//   6. Unknown                                                                 NONE
//
// THE ONE RULE THAT MUST NEVER BE BROKEN: a post-effective amendment's
// filing date means "last material change to an already-trading fund",
// never "launch date". Rule 4 therefore populates last_material_change_date
// and ONLY that field. A previous generation of this pipeline shipped
// "485BPOS filing date as initial effectiveness" as a bug; the ladder above
// supersedes that design, permanently.
// =============================================================================

use tracing::debug;

use crate::config::Config;
use crate::error::ExtractionError;
use crate::models::{
    Confidence, DateSource, EffectiveDateFinding, FilingExtraction, FormType,
};

/// Resolve the effective date for one (filing, series) pair.
///
/// The finding is immutable once computed; later filings supersede it in
/// the rollup, they never edit it.
pub fn resolve(extraction: &FilingExtraction, series_id: &str, cfg: &Config) -> EffectiveDateFinding {
    let mut finding = EffectiveDateFinding {
        accession: extraction.accession.clone(),
        series_id: series_id.to_string(),
        initial_effective_date: None,
        last_material_change_date: None,
        source: DateSource::Unknown,
        confidence: Confidence::None,
    };

    // A post-effective amendment amends a live fund, so its filing date
    // is ALWAYS the last-material-change date, no matter which rung of
    // the ladder ends up supplying the initial date. Definitional, not
    // a competing rule.
    if extraction.form == FormType::PostEffectiveAmendment {
        finding.last_material_change_date = Some(extraction.filing_date);
    }

    // Rungs 1 and 2: explicit body prose, tagged by the strategy that
    // matched it. The extractor already evaluated its own strategies in
    // priority order, so the single best DateFind it handed us carries
    // the highest-priority source that matched.
    if let Some(body) = &extraction.body_date {
        match body.source {
            DateSource::ParagraphCitation
            | DateSource::DesignationProse
            | DateSource::ExplicitStatement => {
                finding.initial_effective_date = Some(body.date);
                finding.source = body.source;
                finding.confidence = Confidence::High;
                return finding;
            }
            // The extractor only emits the three prose sources above;
            // anything else would be a bug worth hearing about in tests.
            _ => {}
        }
    }

    // Rung 3: the header's EFFECTIVENESS DATE tag. Authoritative when
    // the SEC stamped one, which they rarely do.
    if let Some(hdr_date) = extraction.header_effectiveness {
        finding.initial_effective_date = Some(hdr_date);
        finding.source = DateSource::HeaderTag;
        finding.confidence = Confidence::High;
        return finding;
    }

    // Rung 4: the post-effective amendment's own filing date. MEDIUM,
    // and it lands in last_material_change_date (already set above).
    if extraction.form == FormType::PostEffectiveAmendment {
        finding.source = DateSource::PostEffectiveFiling;
        finding.confidence = Confidence::Medium;
        return finding;
    }

    // Rung 5: the regulatory waiting-period default, applicable only to
    // initial registrations and pre-effective amendments, and only when
    // the filer did NOT include delaying-amendment language. A delaying
    // amendment stops the automatic clock, so the default would be a lie.
    if !extraction.delaying_amendment {
        if let Some(days) = extraction.form.waiting_period_days(&extraction.raw_form, cfg) {
            finding.initial_effective_date =
                Some(extraction.filing_date + chrono::Duration::days(days));
            finding.source = DateSource::WaitingPeriodDefault;
            finding.confidence = Confidence::Low;
            return finding;
        }
    }

    // Rung 6: we don't know, and we say so. Never "today". Never a guess.
    let err = ExtractionError::UnresolvableEffectiveDate {
        accession: extraction.accession.clone(),
        series_id: series_id.to_string(),
    };
    debug!(error = %err, form = %extraction.raw_form, "no rung matched");
    finding
}
