use clap::Parser;
use log::debug;
use snafu::ErrorCompat;

mod args;
mod report;

use crate::args::Args;
use crate::report::run_report;

fn main() {
    let args = Args::parse();
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
    debug!("arguments: {:?}", args);

    if let Err(e) = run_report(&args) {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
