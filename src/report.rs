use log::{info, warn};

use district_health::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::Write;

use text_diff::print_diff;

use crate::args::Args;
use crate::report::io_common::render_ranking;
use crate::report::io_csv::{read_biometric_csv, read_demographic_csv, read_enrolment_csv};

pub mod io_common;
pub mod io_csv;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReportError {
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("No usable row in {kind} file {path}: every row was rejected"))]
    BrokenSource { kind: SourceKind, path: String },
    #[snafu(display("Error writing the report to {path}"))]
    ReportWrite { source: std::io::Error, path: String },
    #[snafu(display("Error reading the reference report {path}"))]
    ReferenceRead { source: std::io::Error, path: String },
    #[snafu(display("Unknown grouping '{name}': expected state, district or pincode"))]
    UnknownGroupBy { name: String },
    #[snafu(display(
        "Unknown metric '{name}': expected health_score, mbu_compliance, mobility_index, saturation_ratio or late_adopter_ratio"
    ))]
    UnknownMetric { name: String },
    #[snafu(display("Difference detected between the generated report and the reference"))]
    ReferenceMismatch {},
}

pub type ReportResult<T> = Result<T, ReportError>;

fn parse_group_by(name: &str) -> ReportResult<GroupBy> {
    match name {
        "state" => Ok(GroupBy::State),
        "district" => Ok(GroupBy::StateDistrict),
        "pincode" => Ok(GroupBy::Pincode),
        _ => UnknownGroupBySnafu { name }.fail(),
    }
}

fn parse_metric(name: &str) -> ReportResult<RankMetric> {
    match name {
        "health_score" => Ok(RankMetric::HealthScore),
        "mbu_compliance" => Ok(RankMetric::MbuCompliance),
        "mobility_index" => Ok(RankMetric::MobilityIndex),
        "saturation_ratio" => Ok(RankMetric::SaturationRatio),
        "late_adopter_ratio" => Ok(RankMetric::LateAdopterRatio),
        _ => UnknownMetricSnafu { name }.fail(),
    }
}

// Reads and concatenates all the chunks of one source.
fn read_chunks<R, F>(paths: &[String], reader: F) -> ReportResult<Vec<R>>
where
    F: Fn(&str) -> ReportResult<Vec<R>>,
{
    let mut rows: Vec<R> = Vec::new();
    for path in paths {
        let mut chunk = reader(path)?;
        info!("read_chunks: {}: {} rows", path, chunk.len());
        rows.append(&mut chunk);
    }
    Ok(rows)
}

pub fn run_report(args: &Args) -> ReportResult<()> {
    let enrolment = read_chunks(&args.enrolment, |p| read_enrolment_csv(p))?;
    let demographic = read_chunks(&args.demographic, |p| read_demographic_csv(p))?;
    let biometric = read_chunks(&args.biometric, |p| read_biometric_csv(p))?;

    let group_by = parse_group_by(args.group_by.as_str())?;
    let metric = parse_metric(args.metric.as_str())?;

    let reconciled = reconcile(&enrolment, &demographic, &biometric, &GeoTables::standard());
    info!(
        "run_report: {} unified records, drop stats: {:?}",
        reconciled.records.len(),
        reconciled.stats
    );

    let scored = compute_indicators(&reconciled.records);
    let ranking = rank(&scored, group_by, metric);

    let report = render_ranking(&ranking, group_by, metric);

    match &args.out {
        Some(path) if path != "stdout" => {
            let mut f = fs::File::create(path).context(ReportWriteSnafu { path })?;
            f.write_all(report.as_bytes())
                .context(ReportWriteSnafu { path })?;
            info!("run_report: report written to {}", path);
        }
        _ => {
            println!("{}", report);
        }
    }

    // The reference report, if provided for comparison
    if let Some(reference_p) = &args.reference {
        let reference = fs::read_to_string(reference_p).context(ReferenceReadSnafu {
            path: reference_p.clone(),
        })?;
        if normalize_newlines(&reference) != normalize_newlines(&report) {
            warn!("Found differences with the reference report");
            print_diff(reference.as_str(), report.as_str(), "\n");
            return ReferenceMismatchSnafu {}.fail();
        }
        info!("run_report: report matches the reference {}", reference_p);
    }

    Ok(())
}

fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").trim_end().to_string()
}
