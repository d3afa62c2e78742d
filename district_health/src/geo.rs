//! Geographic-entity resolution.
//!
//! The raw datasets label the same state or district in dozens of ways:
//! case variants (`ODISHA`, `odisha`), historical names (`Orissa`,
//! `Pondicherry`), merged union territories, typos, encoding artifacts and
//! plain garbage (`Near Dhyana Ashram`, `100000`). Resolution is entirely
//! table-driven: a fixed title-case fold followed by exact-match lookups in
//! two curated rename tables and a keyword filter. There is no fuzzy
//! matching by design; a variant missing from the tables passes through
//! unchanged as its own canonical value.

use crate::config::PipelineErrors;

use std::collections::HashMap;

/// Sentinel district for strings that are street or landmark fragments
/// rather than administrative districts.
pub const OTHER_DISTRICT: &str = "Other";

/// Sentinel for values that are recognizably broken (numeric codes, `?`).
pub const UNKNOWN: &str = "Unknown";

/// The standardized state/district pair produced by canonicalization.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct CanonicalGeography {
    pub state: String,
    pub district: String,
}

// Handles UT mergers (the 2020 Dadra/Daman merger), historical renames,
// typos and symbol/spacing variants. Keys are in post-title-case form since
// the fold runs before the lookup. Every value must be a fixed point of
// fold-then-lookup, otherwise canonicalization is no longer idempotent; the
// title-cased spelling of each multi-word canonical name maps back to it.
const STATE_RENAMES: &[(&str, &str)] = &[
    // Union territory mergers & variations
    ("Daman And Diu", "Dadra and Nagar Haveli and Daman and Diu"),
    ("Daman & Diu", "Dadra and Nagar Haveli and Daman and Diu"),
    ("Dadra & Nagar Haveli", "Dadra and Nagar Haveli and Daman and Diu"),
    ("Dadra And Nagar Haveli", "Dadra and Nagar Haveli and Daman and Diu"),
    (
        "Dadra & Nagar Haveli And Daman & Diu",
        "Dadra and Nagar Haveli and Daman and Diu",
    ),
    (
        "Dadra And Nagar Haveli And Daman And Diu",
        "Dadra and Nagar Haveli and Daman and Diu",
    ),
    (
        "The Dadra And Nagar Haveli And Daman And Diu",
        "Dadra and Nagar Haveli and Daman and Diu",
    ),
    // Common state name typos & historical fixes
    ("Orissa", "Odisha"),
    ("Westbengal", "West Bengal"),
    ("West Bengli", "West Bengal"),
    ("West  Bengal", "West Bengal"),
    ("West Bangal", "West Bengal"),
    ("Tamilnadu", "Tamil Nadu"),
    ("Chhatisgarh", "Chhattisgarh"),
    ("Chattisgarh", "Chhattisgarh"),
    ("Uttaranchal", "Uttarakhand"),
    ("Pondicherry", "Puducherry"),
    ("Telengana", "Telangana"),
    // Symbols & spacing fixes
    ("Andaman & Nicobar Islands", "Andaman and Nicobar Islands"),
    ("Andaman And Nicobar Islands", "Andaman and Nicobar Islands"),
    ("Jammu & Kashmir", "Jammu and Kashmir"),
    ("Jammu And Kashmir", "Jammu and Kashmir"),
    ("Delhi (National Capital Territory)", "Delhi"),
    ("Nct Of Delhi", "Delhi"),
];

// Collapses localities and typos into the actual district names. Same
// exact-match semantics as the state table, separate namespace.
const DISTRICT_RENAMES: &[(&str, &str)] = &[
    // Bangalore & urban transitions
    ("Puttenahalli", "Bengaluru Urban"),
    ("Bengaluru South", "Bengaluru Urban"),
    ("Bangalore", "Bengaluru Urban"),
    // Hyderabad & Telangana fragmentation
    ("Balanagar", "Hyderabad"),
    ("Hanumakonda", "Hanamkonda"),
    ("Jangoan", "Jangaon"),
    ("Medchal Malkajgiri", "Medchal-Malkajgiri"),
    ("Medchal?Malkajgiri", "Medchal-Malkajgiri"),
    // U+2212 minus sign, and its latin-1 mojibake seen in the raw extracts
    ("Medchal\u{2212}Malkajgiri", "Medchal-Malkajgiri"),
    ("Medchal\u{e2}\u{88}\u{92}Malkajgiri", "Medchal-Malkajgiri"),
    // Tamil Nadu & Andhra updates
    ("Raja Annamalai Puram", "Chennai"),
    ("Madanapalle", "Chittoor"),
    ("Visakhapatanam", "Visakhapatnam"),
    ("Tuticorin", "Thoothukkudi"),
    // Recognizably broken values
    ("100000", UNKNOWN),
    ("?", UNKNOWN),
    ("Dist : Thane", "Thane"),
    // West Bengal unification
    ("West Bengli", "West Bengal"),
    ("Naihati Anandabazar", "North 24 Parganas"),
    ("Domjur", "Howrah"),
    ("Dinajpur Uttar", "Uttar Dinajpur"),
    ("Dinajpur Dakshin", "Dakshin Dinajpur"),
    ("South 24 Pargana", "South 24 Parganas"),
    // Maharashtra & Chhattisgarh formatting
    (
        "Manendragarhchirmiribharatpur",
        "Manendragarh-Chirmiri-Bharatpur",
    ),
    // en dashes
    (
        "Manendragarh\u{2013}Chirmiri\u{2013}Bharatpur",
        "Manendragarh-Chirmiri-Bharatpur",
    ),
    ("Raigarh(Mh)", "Raigarh"),
    ("Ahilyanagar", "Ahmednagar"),
];

// Substrings (lowercase) that mark a district string as a street or
// landmark fragment. Matched case-insensitively against the whole value
// after the rename tables have been applied.
const GARBAGE_KEYWORDS: &[&str] = &["near", "road", "hospital", "ashram", "lane", "cross"];

/// The immutable rename tables. Built once at startup and passed by
/// reference into the pipeline; nothing mutates them afterwards.
#[derive(Debug, Clone)]
pub struct GeoTables {
    states: HashMap<String, String>,
    districts: HashMap<String, String>,
    garbage_keywords: Vec<String>,
}

impl GeoTables {
    /// The curated tables for the national datasets.
    pub fn standard() -> GeoTables {
        let states = STATE_RENAMES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let districts = DISTRICT_RENAMES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let garbage_keywords = GARBAGE_KEYWORDS.iter().map(|k| k.to_string()).collect();
        GeoTables {
            states,
            districts,
            garbage_keywords,
        }
    }

    /// Builds tables from caller-provided mappings. Keys are looked up after
    /// the title-case fold, so they should be given in title-cased form.
    /// An empty mapping table is a structural error, not an empty dataset.
    pub fn new(
        states: HashMap<String, String>,
        districts: HashMap<String, String>,
        garbage_keywords: Vec<String>,
    ) -> Result<GeoTables, PipelineErrors> {
        if states.is_empty() || districts.is_empty() {
            return Err(PipelineErrors::EmptyMappingTable);
        }
        let garbage_keywords = garbage_keywords.iter().map(|k| k.to_lowercase()).collect();
        Ok(GeoTables {
            states,
            districts,
            garbage_keywords,
        })
    }

    /// Maps a raw state/district pair onto canonical labels.
    ///
    /// Total over all possible inputs: empty, numeric-looking or
    /// control-character strings all map to some canonical value, never to
    /// an error. Applying the function to its own output is a no-op.
    pub fn canonicalize(&self, raw_state: &str, raw_district: &str) -> CanonicalGeography {
        CanonicalGeography {
            state: self.canonical_state(raw_state),
            district: self.canonical_district(raw_district),
        }
    }

    fn canonical_state(&self, raw: &str) -> String {
        let folded = title_case(raw.trim());
        match self.states.get(&folded) {
            Some(canonical) => canonical.clone(),
            None => folded,
        }
    }

    fn canonical_district(&self, raw: &str) -> String {
        let folded = title_case(raw.trim());
        let renamed = match self.districts.get(&folded) {
            Some(canonical) => canonical.clone(),
            None => folded,
        };
        let lower = renamed.to_lowercase();
        if self
            .garbage_keywords
            .iter()
            .any(|keyword| lower.contains(keyword))
        {
            OTHER_DISTRICT.to_string()
        } else {
            renamed
        }
    }
}

/// Title-case fold: the first letter after any non-alphabetic boundary is
/// uppercased, every other letter lowercased. Boundaries include hyphens and
/// digits so that `Medchal-Malkajgiri` or `North 24 Parganas` are fixed
/// points of the fold.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alphabetic = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alphabetic {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alphabetic = true;
        } else {
            out.push(c);
            prev_alphabetic = false;
        }
    }
    out
}
