// =============================================================================
// registry.rs — THE TRUST REGISTRY AND BRAND ORACLE
// =============================================================================
//
// A static, read-only lookup table of the trusts we reconcile filings for.
// The engine consumes this; it never computes or mutates it. CIKs sourced
// from SEC EDGAR and verified by hand, because a typo here silently
// orphans an entire trust's worth of filings.
//
// Also home to the issuer/brand classification rules: an ordered list of
// name-prefix rules first (the fund name usually wears its brand on its
// sleeve), then a trust-name fallback for the issuers who white-label
// through series trusts. Unmatched names classify as "Unknown", which is
// an answer, not an error.
// =============================================================================

use std::collections::HashMap;

use crate::models::Trust;

/// CIK -> trust legal name. The known universe of ETP registrants.
/// To add a trust: find the CIK on EDGAR full-text search, verify it at
/// data.sec.gov/submissions, add a row, re-run the pipeline.
const TRUST_CIKS: &[(&str, &str)] = &[
    ("2043954", "REX ETF Trust"),
    ("1424958", "Direxion Shares ETF Trust"),
    ("1040587", "Direxion Funds"),
    ("1174610", "ProShares Trust"),
    ("1689873", "GraniteShares ETF Trust"),
    ("1884021", "Volatility Shares Trust"),
    ("1976517", "Roundhill ETF Trust"),
    ("1924868", "Tidal Trust II"),
    ("1540305", "ETF Series Solutions"),
    ("1976322", "Themes ETF Trust"),
    ("1771146", "ETF Opportunities Trust"), // Tuttle/T-REX products
    ("1452937", "Exchange Traded Concepts Trust"),
    ("1587982", "Investment Managers Series Trust II"),
    ("1547950", "Exchange Listed Funds Trust"),
    ("1579881", "Calamos ETF Trust"),
    ("826732", "Calamos Investment Trust"),
    ("1782952", "Kurv ETF Trust"),
    ("1722388", "Tidal Trust III"),   // Battle Shares and other leveraged products
    ("1683471", "Listed Funds Trust"), // Teucrium 2x crypto products
    ("1396092", "World Funds Trust"),  // T-REX 2x products
];

/// Ordered brand rules applied to the CURRENT fund name. First match wins.
/// Literal prefixes, checked case-insensitively, most specific first:
/// "T-REX" must come before anything that would swallow it.
const BRAND_PREFIX_RULES: &[(&str, &str)] = &[
    ("T-REX", "T-REX"),
    ("TUTTLE", "Tuttle"),
    ("DIREXION", "Direxion"),
    ("PROSHARES", "ProShares"),
    ("GRANITESHARES", "GraniteShares"),
    ("DEFIANCE", "Defiance"),
    ("ROUNDHILL", "Roundhill"),
    ("VOLATILITY SHARES", "Vol Shares"),
    ("KURV", "Kurv"),
    ("TRADR", "Tradr"),
    ("TEUCRIUM", "Teucrium"),
    ("CALAMOS", "Calamos"),
    ("BATTLE SHARES", "Battle Shares"),
    ("REX", "REX"),
];

/// Trust-name fallback for funds whose names don't carry the brand.
/// Series trusts file on behalf of many boutique issuers; this maps the
/// registrant back to the brand humans actually recognize.
const TRUST_BRAND_FALLBACK: &[(&str, &str)] = &[
    ("ETF Opportunities Trust", "T-REX"),
    ("World Funds Trust", "T-REX"),
    ("Direxion Shares ETF Trust", "Direxion"),
    ("Direxion Funds", "Direxion"),
    ("ProShares Trust", "ProShares"),
    ("GraniteShares ETF Trust", "GraniteShares"),
    ("ETF Series Solutions", "Defiance"),
    ("Volatility Shares Trust", "Vol Shares"),
    ("Tidal Trust II", "LevMax"),
    ("Roundhill ETF Trust", "Roundhill"),
    ("Investment Managers Series Trust II", "Tradr"),
    ("Themes ETF Trust", "Lev Shares"),
    ("Kurv ETF Trust", "Kurv"),
    ("REX ETF Trust", "REX"),
];

/// The injected read-only registry collaborator. Built once at startup,
/// shared immutably across the whole run. No process-wide mutable state,
/// no surprises.
#[derive(Debug, Clone)]
pub struct TrustRegistry {
    by_cik: HashMap<String, Trust>,
}

impl TrustRegistry {
    /// Build the registry from the compiled-in table.
    pub fn builtin() -> Self {
        let by_cik = TRUST_CIKS
            .iter()
            .map(|(cik, name)| {
                (
                    (*cik).to_string(),
                    Trust {
                        cik: (*cik).to_string(),
                        name: (*name).to_string(),
                    },
                )
            })
            .collect();
        Self { by_cik }
    }

    /// Build a registry from arbitrary entries. Tests and future
    /// database-backed callers use this instead of the builtin table.
    pub fn from_entries(entries: impl IntoIterator<Item = Trust>) -> Self {
        let by_cik = entries
            .into_iter()
            .map(|t| (t.cik.clone(), t))
            .collect();
        Self { by_cik }
    }

    pub fn lookup(&self, cik: &str) -> Option<&Trust> {
        self.by_cik.get(cik.trim_start_matches('0'))
    }

    /// Trust name for a CIK, or a visible placeholder. Filings from
    /// unregistered trusts still get processed; they just wear a sign.
    pub fn trust_name(&self, cik: &str) -> String {
        self.lookup(cik)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("Unregistered trust CIK {}", cik))
    }

    pub fn len(&self) -> usize {
        self.by_cik.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cik.is_empty()
    }
}

/// Classify a fund into an issuer brand from its current name, falling
/// back to the trust name. Ordered prefix rules, first match wins,
/// "Unknown" when nothing matches. Never an error: a fund with a weird
/// name is still a fund.
pub fn classify_brand(fund_name: &str, trust_name: &str) -> String {
    let upper = fund_name.trim().to_uppercase();
    for (prefix, brand) in BRAND_PREFIX_RULES {
        if upper.starts_with(prefix) {
            return (*brand).to_string();
        }
    }
    for (trust, brand) in TRUST_BRAND_FALLBACK {
        if trust.eq_ignore_ascii_case(trust_name.trim()) {
            return (*brand).to_string();
        }
    }
    "Unknown".to_string()
}
