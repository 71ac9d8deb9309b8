//! Distortion Effect
//!
//! Stateless per-sample waveshaping: hard clipping at a threshold, or a soft
//! exponential saturation curve that approaches the same threshold.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dsp::filter::{check_range, number_param, Filter, ParamSpec};
use crate::engine::SampleBuffer;
use crate::error::{Result, SoundLabError};
use crate::impl_filter_common;

// ============================================================================
// Constants
// ============================================================================

/// Minimum gain (exclusive)
const MIN_GAIN: f32 = 0.0;

/// Maximum gain
const MAX_GAIN: f32 = 100.0;

const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "gain",
        description: "amplification applied before shaping",
    },
    ParamSpec {
        name: "threshold",
        description: "clipping level in (0, 1]; lower values distort more",
    },
    ParamSpec {
        name: "mode",
        description: "'hard' clipping or 'soft' saturation",
    },
];

// ============================================================================
// Distortion Mode
// ============================================================================

/// Waveshaping curve
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistortionMode {
    /// `clamp(gain * x, -threshold, threshold)`
    #[default]
    Hard,
    /// `sign(x) * threshold * (1 - exp(-|gain * x| / threshold))`
    Soft,
}

impl DistortionMode {
    /// Parse mode from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hard" | "hardclip" | "hard_clip" | "hard-clip" => Some(DistortionMode::Hard),
            "soft" | "softclip" | "soft_clip" | "soft-clip" => Some(DistortionMode::Soft),
            _ => None,
        }
    }

    /// Get string identifier
    pub fn to_str(&self) -> &'static str {
        match self {
            DistortionMode::Hard => "hard",
            DistortionMode::Soft => "soft",
        }
    }
}

// ============================================================================
// Waveshaping Functions
// ============================================================================

#[inline]
fn waveshape_hard(x: f32, gain: f32, threshold: f32) -> f32 {
    (gain * x).clamp(-threshold, threshold)
}

/// Slope at the origin equals `gain`, so quiet passages match hard mode
#[inline]
fn waveshape_soft(x: f32, gain: f32, threshold: f32) -> f32 {
    let magnitude = threshold * (1.0 - (-(gain * x).abs() / threshold).exp());
    magnitude.copysign(x)
}

// ============================================================================
// Distortion Effect
// ============================================================================

/// Clipping / saturation distortion
///
/// # Parameters
/// - `gain`: amplification before shaping; more gain pushes more samples into the clipped region
/// - `threshold`: output ceiling in (0, 1]
/// - `mode`: hard or soft curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distortion {
    pub gain: f32,
    pub threshold: f32,
    pub mode: DistortionMode,
}

impl Default for Distortion {
    fn default() -> Self {
        Self {
            gain: 1.0,
            threshold: 0.2,
            mode: DistortionMode::Hard,
        }
    }
}

impl Distortion {
    pub fn new(gain: f32, threshold: f32, mode: DistortionMode) -> Self {
        Self {
            gain,
            threshold,
            mode,
        }
    }

    /// Shape a single sample
    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        match self.mode {
            DistortionMode::Hard => waveshape_hard(x, self.gain, self.threshold),
            DistortionMode::Soft => waveshape_soft(x, self.gain, self.threshold),
        }
    }
}

impl Filter for Distortion {
    impl_filter_common!("distortion", "Distortion");

    fn apply(&self, input: &SampleBuffer) -> Result<SampleBuffer> {
        self.validate()?;

        debug!(
            "Distortion: mode={} gain={} threshold={}",
            self.mode.to_str(),
            self.gain,
            self.threshold
        );

        let samples = input
            .samples()
            .iter()
            .map(|channel| channel.iter().map(|&x| self.shape(x)).collect())
            .collect();

        Ok(input.with_samples(samples))
    }

    fn validate(&self) -> Result<()> {
        if !self.gain.is_finite() || self.gain <= MIN_GAIN || self.gain > MAX_GAIN {
            return Err(SoundLabError::invalid_param(
                "gain",
                format!("{} must be in ({}, {}]", self.gain, MIN_GAIN, MAX_GAIN),
            ));
        }
        validate_threshold(self.threshold)
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "mode" => {
                let mode = value
                    .as_str()
                    .and_then(DistortionMode::from_str)
                    .ok_or_else(|| {
                        SoundLabError::invalid_param(name, format!("{} is not 'hard' or 'soft'", value))
                    })?;
                self.mode = mode;
            }
            "gain" => {
                let v = number_param(name, value)?;
                check_range(name, v, f32::MIN_POSITIVE, MAX_GAIN)?;
                self.gain = v;
            }
            "threshold" => {
                let v = number_param(name, value)?;
                validate_threshold(v)?;
                self.threshold = v;
            }
            _ => {
                return Err(SoundLabError::invalid_param(name, "unknown distortion parameter"));
            }
        }
        Ok(())
    }
}

fn validate_threshold(threshold: f32) -> Result<()> {
    if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
        return Err(SoundLabError::invalid_param(
            "threshold",
            format!("{} must be in (0, 1]", threshold),
        ));
    }
    Ok(())
}
