use clap::Parser;

/// This is a district-level enrolment health reporting program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, repeatable) A CSV extract of new enrolments. The expected columns are
    /// date,state,district,pincode,age_0_5,age_5_17,age_18_greater. Several files are
    /// concatenated before deduplication.
    #[clap(short, long, value_parser)]
    pub enrolment: Vec<String>,

    /// (file path, repeatable) A CSV extract of demographic updates, with columns
    /// date,state,district,pincode,demo_age_5_17,demo_age_17_.
    #[clap(short, long, value_parser)]
    pub demographic: Vec<String>,

    /// (file path, repeatable) A CSV extract of biometric updates, with columns
    /// date,state,district,pincode,bio_age_5_17,bio_age_17_.
    #[clap(short, long, value_parser)]
    pub biometric: Vec<String>,

    /// (file path or empty) If specified, the ranked report will be written in CSV format to
    /// the given location instead of the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (default district) The grouping of the report: 'state', 'district' (state and district)
    /// or 'pincode'.
    #[clap(long, value_parser, default_value = "district")]
    pub group_by: String,

    /// (default health_score) The indicator the report is ranked on: 'health_score',
    /// 'mbu_compliance', 'mobility_index', 'saturation_ratio' or 'late_adopter_ratio'.
    #[clap(long, value_parser, default_value = "health_score")]
    pub metric: String,

    /// (file path) A reference report in CSV format. If provided, dhirank will check that the
    /// generated report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
