//! Chorus Effect
//!
//! Mixes the dry signal with a copy read through a sine-modulated delay tap,
//! which sounds like several voices playing slightly out of time.

use std::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dsp::filter::{check_range, number_param, Filter, ParamSpec};
use crate::engine::{clip_sample, SampleBuffer};
use crate::error::{Result, SoundLabError};
use crate::impl_filter_common;

// ============================================================================
// Constants
// ============================================================================

/// Longest accepted base delay or modulation depth
const MAX_TIME_MS: f32 = 1000.0;

/// Fastest accepted LFO
const MAX_RATE_HZ: f32 = 20.0;

const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "delay_ms",
        description: "average delay of the chorus voice in ms",
    },
    ParamSpec {
        name: "depth_ms",
        description: "how far the delay swings around its average, in ms",
    },
    ParamSpec {
        name: "rate_hz",
        description: "modulation frequency in Hz",
    },
    ParamSpec {
        name: "mix",
        description: "wet/dry ratio, 0 = dry only, 1 = chorus voice only",
    },
];

/// Sine-modulated chorus
///
/// # Parameters
/// - `delay_ms`: base delay of the modulated tap
/// - `depth_ms`: peak deviation of the delay around `delay_ms`
/// - `rate_hz`: LFO frequency
/// - `mix`: wet ratio; output is `(1 - mix) * dry + mix * wet`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chorus {
    pub delay_ms: f32,
    pub depth_ms: f32,
    pub rate_hz: f32,
    pub mix: f32,
}

impl Default for Chorus {
    fn default() -> Self {
        Self {
            delay_ms: 25.0,
            depth_ms: 2.5,
            rate_hz: 0.25,
            mix: 0.5,
        }
    }
}

impl Chorus {
    pub fn new(delay_ms: f32, depth_ms: f32, rate_hz: f32, mix: f32) -> Self {
        Self {
            delay_ms,
            depth_ms,
            rate_hz,
            mix,
        }
    }

    /// Number of leading zeros prepended to the dry signal
    ///
    /// Covers the longest delay the LFO can reach plus one sample for the
    /// interpolation partner, so the read position never drops below 1.
    pub fn padding(&self, sample_rate: u32) -> usize {
        let max_delay = (self.delay_ms as f64 + self.depth_ms as f64) * sample_rate as f64 / 1000.0;
        max_delay.max(0.0).ceil() as usize + 1
    }

    /// Fractional read position into the padded dry signal for output index `i`
    pub fn read_position(&self, i: usize, sample_rate: u32, pad: usize) -> f64 {
        let sr = sample_rate as f64;
        let base = self.delay_ms as f64 * sr / 1000.0;
        let depth = self.depth_ms as f64 * sr / 1000.0;
        let lfo = (2.0 * PI * self.rate_hz as f64 * i as f64 / sr).sin();
        let delay = (base + depth * lfo).max(0.0);

        (i + pad) as f64 - delay
    }

    fn process_channel(&self, dry: &[f32], sample_rate: u32, pad: usize) -> Vec<f32> {
        let mut padded = vec![0.0_f32; pad];
        padded.extend_from_slice(dry);

        let mix = self.mix;

        dry.iter()
            .enumerate()
            .map(|(i, &x)| {
                let pos = self.read_position(i, sample_rate, pad);
                let idx = pos.floor() as usize;
                let frac = (pos - idx as f64) as f32;

                let a = padded[idx];
                let b = padded.get(idx + 1).copied().unwrap_or(0.0);
                let wet = a + (b - a) * frac;

                clip_sample((1.0 - mix) * x + mix * wet)
            })
            .collect()
    }
}

impl Filter for Chorus {
    impl_filter_common!("chorus", "Chorus");

    fn apply(&self, input: &SampleBuffer) -> Result<SampleBuffer> {
        self.validate()?;

        let pad = self.padding(input.sample_rate());
        debug!(
            "Chorus: delay={}ms depth={}ms rate={}Hz mix={} pad={} samples",
            self.delay_ms, self.depth_ms, self.rate_hz, self.mix, pad
        );

        let samples = input
            .samples()
            .iter()
            .map(|channel| self.process_channel(channel, input.sample_rate(), pad))
            .collect();

        Ok(input.with_samples(samples))
    }

    fn validate(&self) -> Result<()> {
        check_range("delay_ms", self.delay_ms, 0.0, MAX_TIME_MS)?;
        check_range("depth_ms", self.depth_ms, 0.0, MAX_TIME_MS)?;
        check_range("rate_hz", self.rate_hz, 0.0, MAX_RATE_HZ)?;
        check_range("mix", self.mix, 0.0, 1.0)
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let v = number_param(name, value)?;
        match name {
            "delay_ms" => {
                check_range(name, v, 0.0, MAX_TIME_MS)?;
                self.delay_ms = v;
            }
            "depth_ms" => {
                check_range(name, v, 0.0, MAX_TIME_MS)?;
                self.depth_ms = v;
            }
            "rate_hz" => {
                check_range(name, v, 0.0, MAX_RATE_HZ)?;
                self.rate_hz = v;
            }
            "mix" => {
                check_range(name, v, 0.0, 1.0)?;
                self.mix = v;
            }
            _ => {
                return Err(SoundLabError::invalid_param(name, "unknown chorus parameter"));
            }
        }
        Ok(())
    }
}
