// Primitives for reading the source CSV extracts.

use log::warn;

use serde::Deserialize;
use snafu::prelude::*;

use district_health::{
    BiometricCounts, BiometricRow, DemographicCounts, DemographicRow, EnrolmentCounts,
    EnrolmentRow, SourceKind, SourceRow,
};

use crate::report::*;

// The raw rows as they appear in the extracts, before any cleanup. The
// trailing underscores in demo_age_17_ and bio_age_17_ come from the
// upstream export and are kept in the headers as-is.

#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
struct RawEnrolmentRow {
    date: String,
    state: String,
    district: String,
    pincode: u32,
    age_0_5: u64,
    age_5_17: u64,
    age_18_greater: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
struct RawDemographicRow {
    date: String,
    state: String,
    district: String,
    pincode: u32,
    demo_age_5_17: u64,
    #[serde(rename = "demo_age_17_")]
    demo_age_17_plus: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Deserialize)]
struct RawBiometricRow {
    date: String,
    state: String,
    district: String,
    pincode: u32,
    bio_age_5_17: u64,
    #[serde(rename = "bio_age_17_")]
    bio_age_17_plus: u64,
}

pub fn read_enrolment_csv(path: &str) -> ReportResult<Vec<EnrolmentRow>> {
    read_source_csv(path, SourceKind::Enrolment, |raw: RawEnrolmentRow| {
        SourceRow {
            date: raw.date,
            state: raw.state,
            district: raw.district,
            pincode: raw.pincode,
            counts: EnrolmentCounts {
                age_0_5: raw.age_0_5,
                age_5_17: raw.age_5_17,
                age_18_greater: raw.age_18_greater,
            },
        }
    })
}

pub fn read_demographic_csv(path: &str) -> ReportResult<Vec<DemographicRow>> {
    read_source_csv(path, SourceKind::Demographic, |raw: RawDemographicRow| {
        SourceRow {
            date: raw.date,
            state: raw.state,
            district: raw.district,
            pincode: raw.pincode,
            counts: DemographicCounts {
                demo_age_5_17: raw.demo_age_5_17,
                demo_age_17_plus: raw.demo_age_17_plus,
            },
        }
    })
}

pub fn read_biometric_csv(path: &str) -> ReportResult<Vec<BiometricRow>> {
    read_source_csv(path, SourceKind::Biometric, |raw: RawBiometricRow| {
        SourceRow {
            date: raw.date,
            state: raw.state,
            district: raw.district,
            pincode: raw.pincode,
            counts: BiometricCounts {
                bio_age_5_17: raw.bio_age_5_17,
                bio_age_17_plus: raw.bio_age_17_plus,
            },
        }
    })
}

// Rows that do not fit the schema (missing column, non-numeric counter) are
// skipped with a warning. A file whose every row is rejected is considered
// broken and fails the run; a file with only a header is fine.
fn read_source_csv<Raw, Row, F>(path: &str, kind: SourceKind, convert: F) -> ReportResult<Vec<Row>>
where
    Raw: for<'de> Deserialize<'de>,
    F: Fn(Raw) -> Row,
{
    let mut rdr = csv::Reader::from_path(path).context(CsvOpenSnafu { path })?;
    let mut rows: Vec<Row> = Vec::new();
    let mut rejected = 0usize;
    for (idx, record) in rdr.deserialize::<Raw>().enumerate() {
        let lineno = idx + 2;
        match record {
            Ok(raw) => rows.push(convert(raw)),
            Err(e) => {
                warn!(
                    "read_source_csv: {}: {}: skipping line {}: {}",
                    kind, path, lineno, e
                );
                rejected += 1;
            }
        }
    }
    if rows.is_empty() && rejected > 0 {
        return BrokenSourceSnafu { kind, path }.fail();
    }
    Ok(rows)
}
