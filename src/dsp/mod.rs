//! DSP Filters
//!
//! The three effects offered by soundlab. Each one is a pure function of its
//! parameters and the input buffer; none of them mutates its input.

mod chorus;
mod delay;
mod distortion;
mod filter;

pub use chorus::Chorus;
pub use delay::{Delay, MAX_TAIL_SECS, TAIL_FLOOR};
pub use distortion::{Distortion, DistortionMode};
pub use filter::{Filter, FilterKind, FilterSettings, ParamSpec};
