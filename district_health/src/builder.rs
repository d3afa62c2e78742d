pub use crate::config::*;
use crate::geo::GeoTables;
use crate::{compute_indicators_with_bounds, indicator_bounds, rank, reconcile};

/// A builder for assembling a dataset source by source.
///
/// It is the recommended entry point when rows arrive in several chunks
/// (one file per month, for example) rather than as three complete slices.
///
/// ```
/// pub use district_health::builder::Builder;
/// pub use district_health::{GroupBy, RankMetric, SourceRow, EnrolmentCounts};
/// # use district_health::PipelineErrors;
///
/// let mut builder = Builder::new()?;
/// builder.add_enrolment(&[SourceRow {
///     date: "01-03-2025".to_string(),
///     state: "Odisha".to_string(),
///     district: "Puri".to_string(),
///     pincode: 752001,
///     counts: EnrolmentCounts { age_0_5: 2, age_5_17: 3, age_18_greater: 1 },
/// }]);
///
/// let ranking = builder.rank(GroupBy::StateDistrict, RankMetric::HealthScore);
/// assert_eq!(ranking.len(), 1);
///
/// # Ok::<(), PipelineErrors>(())
/// ```
pub struct Builder {
    pub(crate) _tables: GeoTables,
    pub(crate) _enrolment: Vec<EnrolmentRow>,
    pub(crate) _demographic: Vec<DemographicRow>,
    pub(crate) _biometric: Vec<BiometricRow>,
}

impl Builder {
    /// A builder over the standard curated rename tables.
    pub fn new() -> Result<Builder, PipelineErrors> {
        Ok(Builder::with_tables(GeoTables::standard()))
    }

    /// A builder over caller-supplied rename tables.
    pub fn with_tables(tables: GeoTables) -> Builder {
        Builder {
            _tables: tables,
            _enrolment: Vec::new(),
            _demographic: Vec::new(),
            _biometric: Vec::new(),
        }
    }

    pub fn add_enrolment(&mut self, rows: &[EnrolmentRow]) {
        self._enrolment.extend_from_slice(rows);
    }

    pub fn add_demographic(&mut self, rows: &[DemographicRow]) {
        self._demographic.extend_from_slice(rows);
    }

    pub fn add_biometric(&mut self, rows: &[BiometricRow]) {
        self._biometric.extend_from_slice(rows);
    }

    /// Runs the reconciliation over everything added so far.
    pub fn reconcile(&self) -> Reconciled {
        reconcile(
            &self._enrolment,
            &self._demographic,
            &self._biometric,
            &self._tables,
        )
    }

    /// Reconciles, scores and ranks in one go.
    pub fn rank(&self, group_by: GroupBy, metric: RankMetric) -> Vec<RankEntry> {
        let reconciled = self.reconcile();
        let bounds = indicator_bounds(&reconciled.records);
        let scored = compute_indicators_with_bounds(&reconciled.records, &bounds);
        rank(&scored, group_by, metric)
    }
}
