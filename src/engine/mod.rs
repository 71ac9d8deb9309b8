//! Audio Engine Module
//!
//! Sample buffer type and WAV file I/O.

pub mod buffer;
pub mod io;

pub use buffer::{clip_sample, ChannelLayout, SampleBuffer, SampleEncoding, SampleFormat};
pub use io::{generate_stereo_test_tone, generate_test_tone, read, write};
