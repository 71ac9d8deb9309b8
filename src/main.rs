//! soundlab CLI
//!
//! Interactive WAV effects processor.

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use soundlab::cli::{self, Cli};

fn main() -> ExitCode {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Sound Processing Lab v{}", env!("CARGO_PKG_VERSION"));

    let result = args.load_config().and_then(cli::run_interactive);

    match result {
        Ok(report) => {
            info!("Finished: {}", report.output_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:?}", err);
            eprintln!("error: {}", err.friendly_message());
            ExitCode::FAILURE
        }
    }
}
