// =============================================================================
// models.rs — THE SACRED DATA STRUCTURES OF FUND GENEALOGY
// =============================================================================
//
// These structs represent the fundamental building blocks of our filing
// reconciliation system. Each field has been carefully chosen to capture
// every conceivable piece of information about an exchange-traded product's
// long, bureaucratic crawl from registration statement to ticker tape.
//
// The cardinal rule of this module: permanent identifiers are PERMANENT.
// A fund can change its name four times, swap tickers twice, and delay
// its launch indefinitely, but its Series ID never changes. The Series ID
// is the fund's soul. Everything else is wardrobe.
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The SEC form type of a filing. The entire state machine of a fund's
/// life is encoded in which of these shows up next, so getting this
/// classification right matters more than almost anything else here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FormType {
    /// N-1A / S-1 / S-3 — the initial registration statement.
    /// The fund's birth certificate. Nothing is trading yet; someone
    /// just told the SEC they intend to exist.
    InitialRegistration,

    /// 485APOS — pre-effective amendment under Rule 485(a).
    /// "We changed the paperwork before launch." Restarts the
    /// regulatory waiting period clock.
    PreEffectiveAmendment,

    /// 485BPOS — post-effective amendment under Rule 485(b).
    /// The fund is ALREADY LIVE and is updating its prospectus.
    /// This form's filing date is a "last material change" date,
    /// never a launch date. Confusing the two was a real bug in a
    /// prior generation of this pipeline. Never again.
    PostEffectiveAmendment,

    /// 485BXT — extension of time. "We are not ready. Please hold."
    /// Designates a new effective date and pushes the launch out.
    ExtensionAmendment,

    /// 497 / 497K — definitive prospectus and summary variants.
    /// Informational. Does not drive status.
    Prospectus,

    /// EFFECT — the SEC's notice of effectiveness. Recorded in history
    /// but carries no extractable fund data of its own.
    NoticeOfEffectiveness,

    /// Something else entirely. We keep the raw string because the SEC
    /// has more form types than the IRS has penalties.
    Other(String),
}

impl FormType {
    /// Classify a raw EDGAR form string. Prefix-based, because EDGAR
    /// decorates forms with suffixes ("485BPOS", "N-1A/A", "497K") and
    /// we care about the family, not the garnish.
    ///
    /// Order matters: 485BXT must be checked before the 485B prefix,
    /// or every extension would masquerade as a post-effective amendment.
    pub fn parse(raw: &str) -> Self {
        let f = raw.trim().to_uppercase();
        if f.starts_with("485BXT") {
            FormType::ExtensionAmendment
        } else if f.starts_with("485A") {
            FormType::PreEffectiveAmendment
        } else if f.starts_with("485B") {
            FormType::PostEffectiveAmendment
        } else if f.starts_with("N-1A") || f.starts_with("S-1") || f.starts_with("S-3") {
            FormType::InitialRegistration
        } else if f.starts_with("497") {
            FormType::Prospectus
        } else if f == "EFFECT" {
            FormType::NoticeOfEffectiveness
        } else {
            FormType::Other(f)
        }
    }

    /// Does this form type participate in the status state machine?
    /// 497s and EFFECT notices are bystanders; the 485 family and the
    /// initial registration statements are the actors.
    pub fn is_status_relevant(&self) -> bool {
        matches!(
            self,
            FormType::InitialRegistration
                | FormType::PreEffectiveAmendment
                | FormType::PostEffectiveAmendment
                | FormType::ExtensionAmendment
        )
    }

    /// The Rule 485(a) style automatic waiting period for this form, in
    /// days, if one applies. N-1A registrations go automatically effective
    /// after 75 days; S-1/S-3 shelf-style registrations after 60. The rest
    /// of the form family has no automatic clock. The day counts come from
    /// config so the regulatory constants live in exactly one place.
    pub fn waiting_period_days(&self, raw_form: &str, cfg: &crate::config::Config) -> Option<i64> {
        match self {
            FormType::InitialRegistration => {
                let f = raw_form.trim().to_uppercase();
                if f.starts_with("S-1") || f.starts_with("S-3") {
                    Some(cfg.shelf_waiting_days)
                } else {
                    Some(cfg.n1a_waiting_days)
                }
            }
            FormType::PreEffectiveAmendment => Some(cfg.n1a_waiting_days),
            _ => None,
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormType::InitialRegistration => write!(f, "INITIAL"),
            FormType::PreEffectiveAmendment => write!(f, "485APOS"),
            FormType::PostEffectiveAmendment => write!(f, "485BPOS"),
            FormType::ExtensionAmendment => write!(f, "485BXT"),
            FormType::Prospectus => write!(f, "497"),
            FormType::NoticeOfEffectiveness => write!(f, "EFFECT"),
            FormType::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A trust: the legal registrant that files on behalf of one or more funds.
/// Created once from the injected registry. The core never mutates these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trust {
    /// The SEC Central Index Key. Immutable, numeric, eternal.
    pub cik: String,
    /// The trust's current legal name per the registry.
    pub name: String,
}

/// One filing bundle as delivered by the external fetch/cache collaborator.
/// This is the input contract of the whole engine: everything downstream
/// is a pure function of a pile of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingBundle {
    /// EDGAR accession number. Globally unique, assigned once, never reused.
    pub accession: String,
    /// CIK of the filing trust.
    pub cik: String,
    /// Raw form string as EDGAR reports it ("485BPOS", "N-1A", ...).
    pub form: String,
    /// The date the filing hit EDGAR.
    pub filing_date: NaiveDate,
    /// The machine-readable SGML header section of the submission.
    pub header_text: String,
    /// The rendered primary document, already reduced to plain text by
    /// the fetch collaborator (HTML stripped, PDF extracted).
    pub body_text: String,
}

/// One series/class registration block lifted from a filing's SGML header.
/// This is the AUTHORITATIVE source for identifiers. Body text can argue
/// about names and tickers all it wants; the header decides who is who.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBlock {
    /// Permanent series identifier, "S" + digits.
    pub series_id: String,
    /// The series legal name as registered in the header.
    pub series_name: String,
    /// Permanent class identifier, "C" + digits, if the block carried one.
    pub class_id: Option<String>,
    /// Class name. For ETPs this is almost always identical to the
    /// series name, because almost every ETF has exactly one share class.
    pub class_name: Option<String>,
    /// Ticker symbol from the header's ticker tag, when filed.
    /// Tickers formally live at the class level, not the series level.
    pub ticker: Option<String>,
    /// True if this came from a NEW-SERIES block (first registration)
    /// rather than an existing-series reference block.
    pub is_new: bool,
    /// Position within the header, preserved as a downstream tie-break.
    pub order: usize,
}

/// How a ticker was found. Every extracted value carries the strategy
/// that produced it, so downstream consumers can rank competing claims
/// instead of trusting whichever one showed up last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickerMethod {
    /// From the header's CLASS-CONTRACT-TICKER-SYMBOL tag. Authoritative.
    HeaderTag,
    /// Trailing parenthetical anchored to the exact fund name:
    /// "Tuttle Capital 2X Long AI ETF (QQQX)". Highest-precision body match.
    TitleParen,
    /// A "Ticker:" / "Trading Symbol:" label within a bounded character
    /// window of a fund-name occurrence. The fallback strategy.
    LabelWindow,
}

impl fmt::Display for TickerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickerMethod::HeaderTag => write!(f, "HEADER-TAG"),
            TickerMethod::TitleParen => write!(f, "TITLE-PAREN"),
            TickerMethod::LabelWindow => write!(f, "LABEL-WINDOW"),
        }
    }
}

/// A ticker extracted from body text, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerFind {
    pub ticker: String,
    pub method: TickerMethod,
}

/// Where a resolved effective date came from. This is the source tag
/// attached to every EffectiveDateFinding, mirroring the resolver's
/// priority ladder one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSource {
    /// Rule 485(b) checkbox language: "on (DATE) pursuant to paragraph (b)".
    ParagraphCitation,
    /// Extension prose: "designating (DATE) as the new effective date".
    DesignationProse,
    /// Generic explicit prose: "will become effective on (DATE)".
    ExplicitStatement,
    /// The header's EFFECTIVENESS DATE tag. Rare, but gospel when present.
    HeaderTag,
    /// The filing date of a post-effective amendment. This is a "last
    /// material change" date, NEVER a launch date.
    PostEffectiveFiling,
    /// Filing date plus the Rule 485(a) waiting period.
    WaitingPeriodDefault,
    /// Nothing matched. We say so out loud instead of guessing.
    Unknown,
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSource::ParagraphCitation => write!(f, "PARAGRAPH-CITATION"),
            DateSource::DesignationProse => write!(f, "DESIGNATION-PROSE"),
            DateSource::ExplicitStatement => write!(f, "EXPLICIT-STATEMENT"),
            DateSource::HeaderTag => write!(f, "HEADER-TAG"),
            DateSource::PostEffectiveFiling => write!(f, "POST-EFFECTIVE-FILING"),
            DateSource::WaitingPeriodDefault => write!(f, "WAITING-PERIOD-DEFAULT"),
            DateSource::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// An explicit date phrase found in body text, with the strategy that
/// matched it. Only the explicit-prose sources appear here; the derived
/// sources (header tag, filing-date rules) are applied by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFind {
    pub date: NaiveDate,
    pub source: DateSource,
}

/// Confidence grade on a resolved field. HIGH means an explicit statement
/// or authoritative tag. LOW means a regulatory default that a delaying
/// amendment could have invalidated. NONE means we honestly don't know,
/// which is a perfectly respectable answer and vastly superior to lying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "HIGH"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::Low => write!(f, "LOW"),
            Confidence::None => write!(f, "NONE"),
        }
    }
}

/// Everything we observed about one series within one filing.
/// Immutable once produced. The reconciler consumes piles of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesObservation {
    /// Permanent series identifier from the header. The primary key.
    pub series_id: String,
    /// Header legal name of the series.
    pub series_name: String,
    pub class_id: Option<String>,
    pub class_name: Option<String>,
    /// Ticker from the header tag, if filed.
    pub header_ticker: Option<String>,
    /// Ticker recovered from body text, with its strategy tag.
    pub body_ticker: Option<TickerFind>,
    /// Fund name as it appears in the prospectus body, when it could be
    /// attached to this series and differs from the header name. The
    /// prospectus usually updates before the legal registration does,
    /// so the reconciler prefers this over the header name.
    pub prospectus_name: Option<String>,
    /// Header document order, used as a tie-break.
    pub order: usize,
}

/// The complete, immutable extraction result for one filing.
/// Produced in the parallel phase; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingExtraction {
    pub accession: String,
    pub cik: String,
    pub raw_form: String,
    pub form: FormType,
    pub filing_date: NaiveDate,
    /// EFFECTIVENESS DATE tag from the header, if present.
    pub header_effectiveness: Option<NaiveDate>,
    /// The best explicit date phrase found in the body, if any.
    pub body_date: Option<DateFind>,
    /// True if the filing contains delaying-amendment language.
    pub delaying_amendment: bool,
    /// Per-series observations, in header document order.
    pub series: Vec<SeriesObservation>,
    /// True if the header section existed but did not parse. Expected
    /// for some form types; recorded, never fatal.
    pub malformed_header: bool,
}

/// One resolved effective-date determination for a (filing, series) pair.
/// Immutable once computed. Superseded by later findings, never edited.
///
/// The two date fields are deliberately separate and must stay that way:
/// `initial_effective_date` answers "when does/did this fund start
/// trading", `last_material_change_date` answers "when was the live
/// prospectus last amended". Conflating them was the original sin of a
/// previous incarnation of this pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveDateFinding {
    pub accession: String,
    pub series_id: String,
    pub initial_effective_date: Option<NaiveDate>,
    pub last_material_change_date: Option<NaiveDate>,
    pub source: DateSource,
    pub confidence: Confidence,
}

/// One (series, name, effective-from) entry in a fund's name history.
/// Ordered by filing date; the record with `effective_to == None` is
/// the current name. Adjacent records never share a normalized name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRecord {
    pub series_id: String,
    /// The name exactly as filed. Original casing and wording preserved;
    /// normalization is for comparison only.
    pub name: String,
    /// Normalized comparison key (casefolded, whitespace-collapsed,
    /// boilerplate-stripped).
    pub normalized: String,
    pub effective_from: NaiveDate,
    /// Set to the succeeding record's effective_from when superseded.
    pub effective_to: Option<NaiveDate>,
    /// HEADER or PROSPECTUS, depending on where the name was observed.
    pub name_origin: NameOrigin,
    pub source_form: String,
    pub source_accession: String,
}

/// Where a name observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameOrigin {
    Header,
    Prospectus,
}

impl fmt::Display for NameOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameOrigin::Header => write!(f, "HEADER"),
            NameOrigin::Prospectus => write!(f, "PROSPECTUS"),
        }
    }
}

/// The status state machine. Re-derived from scratch from full filing
/// history on every run. Transitions are one-directional in practice
/// (PENDING/DELAYED -> EFFECTIVE) but we never rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStatus {
    /// Registered but not yet live. Only initial/pre-effective paperwork
    /// exists, or the launch clock is still ticking.
    Pending,
    /// A post-effective amendment exists, which means the fund is (or
    /// was) live. The reported effective date is the earliest resolvable
    /// INITIAL date, never the amendment's filing date.
    Effective,
    /// The most recent relevant filing is an extension of time and no
    /// post-effective amendment has superseded it. The launch is on hold.
    Delayed,
    /// No relevant filing type recognized. Should be rare. Reported
    /// loudly, never silently dropped.
    Unknown,
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesStatus::Pending => write!(f, "PENDING"),
            SeriesStatus::Effective => write!(f, "EFFECTIVE"),
            SeriesStatus::Delayed => write!(f, "DELAYED"),
            SeriesStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// The current canonical state of one fund, as computed by the rollup
/// engine. This is output record (a) of the engine's contract: the
/// "latest known truth" that the presentation layers consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesState {
    pub series_id: String,
    pub trust_cik: String,
    pub trust_name: String,
    /// Current display name (most recent NameRecord).
    pub name: String,
    /// Issuer brand classified from the current name, or "Unknown".
    pub brand: String,
    pub class_id: Option<String>,
    pub ticker: Option<String>,
    pub ticker_method: Option<TickerMethod>,
    pub status: SeriesStatus,
    /// Human-readable explanation of which rule produced the status.
    pub status_reason: String,
    pub effective_date: Option<NaiveDate>,
    pub effective_date_confidence: Confidence,
    pub effective_date_source: DateSource,
    pub last_material_change_date: Option<NaiveDate>,
    pub latest_form: String,
    pub latest_filing_date: NaiveDate,
    pub latest_accession: String,
    pub first_seen_date: NaiveDate,
    pub first_seen_form: String,
    pub first_seen_accession: String,
    /// Set when two filings claimed this series id with wildly divergent
    /// names. Best-effort state is still produced; a human should look.
    pub flagged_for_review: bool,
}

/// Per-filing, per-series extraction audit record. Output record (c):
/// the traceability trail that lets a human answer "why does the engine
/// think this fund is called that and trades under this".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionAudit {
    /// Unique id for this audit row, minted per run.
    pub id: Uuid,
    pub accession: String,
    pub series_id: String,
    pub ticker_found: Option<String>,
    pub ticker_method: Option<TickerMethod>,
    pub date_found: Option<NaiveDate>,
    pub date_method: DateSource,
    pub delaying_amendment_flag: bool,
}
