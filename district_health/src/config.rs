// ********* Input data structures ***********

use chrono::NaiveDate;

use std::error::Error;
use std::fmt::Display;
use std::ops::AddAssign;

/// The three raw activity tables consumed by the pipeline.
///
/// They share the same composite-key columns (date, state, district, pincode)
/// but carry disjoint counter blocks.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum SourceKind {
    Enrolment,
    Demographic,
    Biometric,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Enrolment => "enrolment",
            SourceKind::Demographic => "demographic",
            SourceKind::Biometric => "biometric",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// New-enrolment counters, broken down by age band.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Default)]
pub struct EnrolmentCounts {
    pub age_0_5: u64,
    pub age_5_17: u64,
    pub age_18_greater: u64,
}

/// Demographic-update (address, mobile, ...) counters.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Default)]
pub struct DemographicCounts {
    pub demo_age_5_17: u64,
    pub demo_age_17_plus: u64,
}

/// Biometric-update counters.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Default)]
pub struct BiometricCounts {
    pub bio_age_5_17: u64,
    pub bio_age_17_plus: u64,
}

impl AddAssign for EnrolmentCounts {
    fn add_assign(&mut self, rhs: EnrolmentCounts) {
        self.age_0_5 += rhs.age_0_5;
        self.age_5_17 += rhs.age_5_17;
        self.age_18_greater += rhs.age_18_greater;
    }
}

impl AddAssign for DemographicCounts {
    fn add_assign(&mut self, rhs: DemographicCounts) {
        self.demo_age_5_17 += rhs.demo_age_5_17;
        self.demo_age_17_plus += rhs.demo_age_17_plus;
    }
}

impl AddAssign for BiometricCounts {
    fn add_assign(&mut self, rhs: BiometricCounts) {
        self.bio_age_5_17 += rhs.bio_age_5_17;
        self.bio_age_17_plus += rhs.bio_age_17_plus;
    }
}

/// One row of a raw source table, exactly as loaded.
///
/// The date is kept as the raw string: parsing happens inside the reconciler
/// so that malformed rows can be counted instead of aborting the load. The
/// geography fields are the raw, uncleaned labels.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct SourceRow<M> {
    pub date: String,
    pub state: String,
    pub district: String,
    pub pincode: u32,
    pub counts: M,
}

pub type EnrolmentRow = SourceRow<EnrolmentCounts>;
pub type DemographicRow = SourceRow<DemographicCounts>;
pub type BiometricRow = SourceRow<BiometricCounts>;

// ******** Output data structures *********

/// The result of outer-joining the three sources on the canonical composite
/// key. Counter blocks from sources with no matching row are zero, never
/// absent: downstream ratio arithmetic never sees a null.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct UnifiedRecord {
    pub date: NaiveDate,
    pub state: String,
    pub district: String,
    pub pincode: u32,
    pub enrolment: EnrolmentCounts,
    pub demographic: DemographicCounts,
    pub biometric: BiometricCounts,
}

/// Derived indicators for one unified record.
///
/// The ratio denominators carry a "+1" smoothing term. This is deliberate:
/// it keeps every ratio finite without a conditional zero-check and biases
/// low-activity records slightly toward zero. Do not "fix" it, the reference
/// outputs depend on it.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct DerivedMetrics {
    pub total_enrolment: u64,
    pub total_updates: u64,
    pub total_activity: u64,
    pub mbu_compliance: f64,
    pub mobility_index: f64,
    pub saturation_ratio: f64,
    pub late_adopter_ratio: f64,
    pub health_score: f64,
}

/// A unified record together with its derived indicators.
#[derive(PartialEq, Debug, Clone)]
pub struct ScoredRecord {
    pub record: UnifiedRecord,
    pub metrics: DerivedMetrics,
}

/// Rows removed from one source before the join.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct DropStats {
    /// Exact duplicates of an earlier row in the same source.
    pub exact_duplicates: usize,
    /// Rows whose date could not be parsed under the day-first assumption.
    pub malformed_dates: usize,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct ReconcileStats {
    pub enrolment: DropStats,
    pub demographic: DropStats,
    pub biometric: DropStats,
}

/// The reconciled table plus the per-source accounting of dropped rows.
#[derive(PartialEq, Debug, Clone)]
pub struct Reconciled {
    pub records: Vec<UnifiedRecord>,
    pub stats: ReconcileStats,
}

/// Min-max bounds for one indicator column.
///
/// Bounds are computed over the whole dataset of one invocation. A column
/// with zero variance (max == min) is degenerate and normalizes to 0 for
/// every row rather than dividing by zero.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct NormalizationBounds {
    pub min: f64,
    pub max: f64,
}

impl NormalizationBounds {
    pub fn normalize(&self, x: f64) -> f64 {
        if self.max > self.min {
            (x - self.min) / (self.max - self.min)
        } else {
            0.0
        }
    }
}

/// The bounds backing a health-score computation.
///
/// Recomputing indicators after filtering rows yields different bounds and
/// therefore different scores; callers that need scores comparable across
/// runs should capture these once and re-apply them with
/// [compute_indicators_with_bounds](crate::compute_indicators_with_bounds).
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct IndicatorBounds {
    pub mbu_compliance: NormalizationBounds,
    pub saturation_ratio: NormalizationBounds,
}

// ********* Ranking **********

/// The grouping level for rankings.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum GroupBy {
    State,
    StateDistrict,
    Pincode,
}

/// The indicator a ranking is sorted by.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RankMetric {
    HealthScore,
    MbuCompliance,
    MobilityIndex,
    SaturationRatio,
    LateAdopterRatio,
}

impl RankMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankMetric::HealthScore => "health_score",
            RankMetric::MbuCompliance => "mbu_compliance",
            RankMetric::MobilityIndex => "mobility_index",
            RankMetric::SaturationRatio => "saturation_ratio",
            RankMetric::LateAdopterRatio => "late_adopter_ratio",
        }
    }

    pub fn value(&self, metrics: &DerivedMetrics) -> f64 {
        match self {
            RankMetric::HealthScore => metrics.health_score,
            RankMetric::MbuCompliance => metrics.mbu_compliance,
            RankMetric::MobilityIndex => metrics.mobility_index,
            RankMetric::SaturationRatio => metrics.saturation_ratio,
            RankMetric::LateAdopterRatio => metrics.late_adopter_ratio,
        }
    }
}

/// The canonical identity of one ranked group.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum GroupKey {
    State(String),
    StateDistrict(String, String),
    Pincode(u32),
}

/// One row of a ranking: a group and the arithmetic mean of the ranked
/// indicator over all records in that group.
#[derive(PartialEq, Debug, Clone)]
pub struct RankEntry {
    pub key: GroupKey,
    pub mean: f64,
}

/// Errors that prevent the pipeline from completing successfully.
///
/// Malformed rows are not errors: they are dropped and counted in
/// [DropStats]. Only structural problems surface here.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PipelineErrors {
    /// A rename table was constructed with no entries.
    EmptyMappingTable,
}

impl Error for PipelineErrors {}

impl Display for PipelineErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineErrors::EmptyMappingTable => {
                write!(f, "PipelineError: empty geography mapping table")
            }
        }
    }
}
