//! CLI Module
//!
//! Command-line surface for soundlab. The whole workflow is interactive, so
//! the flags only tune logging and where filter defaults come from.

pub mod session;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::config::LabConfig;
use crate::error::Result;

pub use session::{default_output_path, ProcessingReport, Session, SessionState};

/// Sound Processing Lab - apply chorus, delay or distortion to a WAV file
#[derive(Parser, Debug)]
#[command(name = "soundlab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// JSON file with default filter parameters
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Resolve the session configuration
    pub fn load_config(&self) -> Result<LabConfig> {
        match &self.config {
            Some(path) => {
                info!("Using config file: {}", path.display());
                LabConfig::load(path)
            }
            None => Ok(LabConfig::default()),
        }
    }
}

/// Run one interactive session on stdin/stdout
pub fn run_interactive(config: LabConfig) -> Result<ProcessingReport> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Session::new(stdin.lock(), stdout.lock(), config).run()
}
