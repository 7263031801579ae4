use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod waves;

use crate::args::Args;

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::init();
    }

    let config_path = match args.config {
        Some(p) => p,
        None => {
            eprintln!("A configuration file is required (--config). See --help.");
            std::process::exit(2);
        }
    };

    let res = waves::run_survey(config_path, args.reference, args.out);
    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&*e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
