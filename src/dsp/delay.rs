//! Delay Effect
//!
//! Feedback echo: `out[i] = dry[i] + feedback * out[i - D]`.
//! The output is longer than the input so the decaying tail is not cut off.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dsp::filter::{check_range, number_param, Filter, ParamSpec};
use crate::engine::{clip_sample, SampleBuffer};
use crate::error::{Result, SoundLabError};
use crate::impl_filter_common;

// ============================================================================
// Constants
// ============================================================================

/// Echo level (-80 dB) below which the tail is no longer extended
pub const TAIL_FLOOR: f32 = 1e-4;

/// Longest tail appended to the output, in seconds of audio
///
/// Only reached when feedback sits very close to 1.0 with a long delay time.
pub const MAX_TAIL_SECS: f64 = 600.0;

/// Longest accepted delay time
const MAX_DELAY_MS: f32 = 5000.0;

const PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "delay_ms",
        description: "time between echoes in ms",
    },
    ParamSpec {
        name: "feedback",
        description: "echo decay factor, 0 <= feedback < 1",
    },
];

/// Recursive (IIR) feedback delay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delay {
    /// Delay time in milliseconds
    pub delay_ms: f32,
    /// Feedback gain, must stay below 1.0 so echoes decay
    pub feedback: f32,
}

impl Default for Delay {
    fn default() -> Self {
        Self {
            delay_ms: 430.0,
            feedback: 0.4,
        }
    }
}

impl Delay {
    pub fn new(delay_ms: f32, feedback: f32) -> Self {
        Self { delay_ms, feedback }
    }

    /// Delay time in samples at the given rate
    ///
    /// # Errors
    /// * `InvalidParameter` - if the delay rounds to zero samples
    pub fn delay_samples(&self, sample_rate: u32) -> Result<usize> {
        let samples = (self.delay_ms as f64 * sample_rate as f64 / 1000.0).round() as usize;
        if samples == 0 {
            return Err(SoundLabError::invalid_param(
                "delay_ms",
                format!("{} ms is shorter than one sample at {} Hz", self.delay_ms, sample_rate),
            ));
        }
        Ok(samples)
    }

    /// How many delay periods to append so the echo decays below [`TAIL_FLOOR`]
    pub fn tail_repeats(&self) -> usize {
        if self.feedback <= 0.0 {
            return 0;
        }

        let repeats = ((TAIL_FLOOR as f64).ln() / (self.feedback as f64).ln()).ceil();
        repeats.max(1.0) as usize
    }

    /// Frames appended after the input, bounded by [`MAX_TAIL_SECS`]
    pub fn tail_frames(&self, delay: usize, sample_rate: u32) -> usize {
        let wanted = self.tail_repeats().saturating_mul(delay);
        let budget = (MAX_TAIL_SECS * sample_rate as f64).ceil() as usize;

        if wanted > budget {
            warn!(
                "Delay tail of {} frames exceeds {} s, truncating to {} frames",
                wanted, MAX_TAIL_SECS, budget
            );
            return budget;
        }
        wanted
    }

    fn process_channel(&self, dry: &[f32], delay: usize, out_len: usize) -> Vec<f32> {
        let feedback = self.feedback;
        let mut out = vec![0.0_f32; out_len];

        for i in 0..out_len {
            let input = dry.get(i).copied().unwrap_or(0.0);
            let fed_back = if i >= delay { out[i - delay] } else { 0.0 };
            out[i] = clip_sample(input + feedback * fed_back);
        }

        out
    }
}

impl Filter for Delay {
    impl_filter_common!("delay", "Delay");

    fn apply(&self, input: &SampleBuffer) -> Result<SampleBuffer> {
        self.validate()?;

        let delay = self.delay_samples(input.sample_rate())?;
        let out_len = input.len() + self.tail_frames(delay, input.sample_rate());

        debug!(
            "Delay: {} samples, feedback={}, output {} -> {} frames",
            delay,
            self.feedback,
            input.len(),
            out_len
        );

        let samples = input
            .samples()
            .iter()
            .map(|channel| self.process_channel(channel, delay, out_len))
            .collect();

        Ok(input.with_samples(samples))
    }

    fn validate(&self) -> Result<()> {
        if !self.delay_ms.is_finite() || self.delay_ms <= 0.0 || self.delay_ms > MAX_DELAY_MS {
            return Err(SoundLabError::invalid_param(
                "delay_ms",
                format!("{} must be in (0, {}]", self.delay_ms, MAX_DELAY_MS),
            ));
        }
        validate_feedback(self.feedback)
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let v = number_param(name, value)?;
        match name {
            "delay_ms" => {
                check_range(name, v, f32::MIN_POSITIVE, MAX_DELAY_MS)?;
                self.delay_ms = v;
            }
            "feedback" => {
                validate_feedback(v)?;
                self.feedback = v;
            }
            _ => {
                return Err(SoundLabError::invalid_param(name, "unknown delay parameter"));
            }
        }
        Ok(())
    }
}

/// Feedback must lie in [0, 1); 1.0 or more would never decay
fn validate_feedback(feedback: f32) -> Result<()> {
    if !feedback.is_finite() || !(0.0..1.0).contains(&feedback) {
        return Err(SoundLabError::invalid_param(
            "feedback",
            format!("{} must be at least 0 and below 1.0", feedback),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SampleEncoding;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn impulse(len: usize, sample_rate: u32) -> SampleBuffer {
        let mut samples = vec![0.0; len];
        samples[0] = 1.0;
        SampleBuffer::from_channels(vec![samples], sample_rate, SampleEncoding::PCM_16).unwrap()
    }

    #[test]
    fn test_defaults() {
        let delay = Delay::default();
        assert_eq!(delay.delay_ms, 430.0);
        assert_eq!(delay.feedback, 0.4);
        assert!(delay.validate().is_ok());
    }

    #[test]
    fn test_feedback_validation() {
        assert!(Delay::new(100.0, 1.0).validate().is_err());
        assert!(Delay::new(100.0, 1.5).validate().is_err());
        assert!(Delay::new(100.0, -0.1).validate().is_err());
        assert!(Delay::new(100.0, 0.5).validate().is_ok());

        let err = Delay::new(100.0, 1.0).apply(&impulse(10, 1000)).unwrap_err();
        assert!(matches!(err, SoundLabError::InvalidParameter { ref name, .. } if name == "feedback"));
    }

    #[test]
    fn test_impulse_decays_geometrically() {
        // 10 ms at 1 kHz => D = 10
        for g in [0.5_f32, 0.6, 0.9] {
            let delay = Delay::new(10.0, g);
            let output = delay.apply(&impulse(1, 1000)).unwrap();
            let out = output.channel(0);

            for n in 0..=delay.tail_repeats() {
                let expected = g.powi(n as i32);
                if expected < TAIL_FLOOR {
                    break;
                }
                assert_relative_eq!(out[n * 10], expected, max_relative = 1e-5);
            }
            // Nothing between echoes
            assert_eq!(out[5], 0.0);
            assert_eq!(out[15], 0.0);
        }
    }

    #[test]
    fn test_output_extended_by_tail() {
        let delay = Delay::new(10.0, 0.5);
        let input = impulse(100, 1000);
        let output = delay.apply(&input).unwrap();

        assert_eq!(delay.tail_repeats(), 14);
        assert_eq!(output.len(), 100 + 14 * 10);
        assert!(*output.channel(0).last().unwrap() < TAIL_FLOOR);
    }

    #[test]
    fn test_zero_feedback_is_identity() {
        let delay = Delay::new(10.0, 0.0);
        assert_eq!(delay.tail_repeats(), 0);

        let input = impulse(50, 1000);
        assert_eq!(delay.apply(&input).unwrap(), input);
    }

    #[test]
    fn test_high_feedback_tail_decays_below_floor() {
        let delay = Delay::new(10.0, 0.9);
        assert_eq!(delay.tail_repeats(), 88);

        let output = delay.apply(&impulse(1, 1000)).unwrap();
        let out = output.channel(0);

        assert_eq!(output.len(), 1 + 88 * 10);
        // Echo 16 and later must still be present
        assert_relative_eq!(out[170], 0.9_f32.powi(17), max_relative = 1e-4);
        assert!(out[out.len() - 11] >= TAIL_FLOOR);
        assert!(*out.last().unwrap() < TAIL_FLOOR);
    }

    #[test]
    fn test_tail_frames_bounded_near_unity_feedback() {
        // 5 s delay at 48 kHz with g = 0.99 wants ~917 periods
        let delay = Delay::new(5000.0, 0.99);
        let d = delay.delay_samples(48000).unwrap();
        assert!(delay.tail_repeats() > 900);
        assert_eq!(delay.tail_frames(d, 48000), (MAX_TAIL_SECS * 48000.0) as usize);

        let short = Delay::new(10.0, 0.9);
        assert_eq!(short.tail_frames(10, 1000), 880);
    }

    #[test]
    fn test_feedback_accumulation_is_clipped() {
        let input =
            SampleBuffer::from_channels(vec![vec![0.9; 100]], 1000, SampleEncoding::PCM_16).unwrap();
        let output = Delay::new(5.0, 0.9).apply(&input).unwrap();
        assert!(output.channel(0).iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_delay_shorter_than_one_sample() {
        let err = Delay::new(0.1, 0.5).apply(&impulse(10, 1000)).unwrap_err();
        assert!(matches!(err, SoundLabError::InvalidParameter { .. }));
    }

    #[test]
    fn test_stereo_channels_independent() {
        let input = SampleBuffer::from_channels(
            vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0, 0.0]],
            1000,
            SampleEncoding::PCM_16,
        )
        .unwrap();
        let output = Delay::new(2.0, 0.5).apply(&input).unwrap();

        assert_eq!(output.channel(0)[2], 0.5);
        assert!(output.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_set_param() {
        let mut delay = Delay::default();
        delay.set_param("feedback", &json!(0.5)).unwrap();
        assert_eq!(delay.feedback, 0.5);

        assert!(delay.set_param("feedback", &json!(1.0)).is_err());
        assert!(delay.set_param("feedback", &json!(1.5)).is_err());
        assert!(delay.set_param("delay_ms", &json!(0.0)).is_err());
        assert!(delay.set_param("delay_ms", &json!("long")).is_err());
        assert_eq!(delay.feedback, 0.5);
    }
}
