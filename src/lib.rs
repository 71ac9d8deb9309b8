//! soundlab - Sound Processing Lab
//!
//! Loads one WAV file, applies a chorus, delay or distortion filter and
//! writes the result to a new WAV file.
//!
//! # Pipeline
//!
//! The flow is strictly linear:
//! - [`engine::read`] loads the file into a [`engine::SampleBuffer`]
//! - a [`dsp::Filter`] builds a new buffer from it
//! - [`engine::write`] stores the result atomically
//!
//! The interactive driver in [`cli::session`] sequences these steps.

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use config::LabConfig;
pub use error::{Result, SoundLabError};
