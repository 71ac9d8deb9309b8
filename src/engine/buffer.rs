//! Sample Buffer
//!
//! The in-memory representation of one loaded WAV file. Samples are stored
//! de-interleaved as 32-bit floats, nominally within [-1.0, 1.0].

use serde::{Deserialize, Serialize};

use crate::error::{Result, SoundLabError};

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    #[default]
    Mono,
    /// Two channels (stereo: left, right)
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Sample Encoding
// ============================================================================

/// Numeric representation of PCM samples in the WAV container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Signed integer PCM (8-bit is stored unsigned on disk)
    Int,
    /// IEEE 754 float PCM
    Float,
}

/// Bit depth and format the buffer was loaded with
///
/// Purely informational for processing; the writer uses it to serialize
/// the buffer back in the same encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEncoding {
    pub bits_per_sample: u16,
    pub format: SampleFormat,
}

impl SampleEncoding {
    pub const PCM_8: Self = Self::int(8);
    pub const PCM_16: Self = Self::int(16);
    pub const PCM_24: Self = Self::int(24);
    pub const PCM_32: Self = Self::int(32);
    pub const FLOAT_32: Self = Self {
        bits_per_sample: 32,
        format: SampleFormat::Float,
    };

    const fn int(bits_per_sample: u16) -> Self {
        Self {
            bits_per_sample,
            format: SampleFormat::Int,
        }
    }

    /// Validate a bit depth / format pair
    ///
    /// # Errors
    /// * `UnsupportedFormat` - for anything but 8/16/24/32-bit int or 32-bit float
    pub fn new(bits_per_sample: u16, format: SampleFormat) -> Result<Self> {
        let supported = match format {
            SampleFormat::Int => matches!(bits_per_sample, 8 | 16 | 24 | 32),
            SampleFormat::Float => bits_per_sample == 32,
        };

        if !supported {
            return Err(SoundLabError::UnsupportedFormat {
                format: format!("{}-bit {:?} PCM", bits_per_sample, format).to_lowercase(),
            });
        }

        Ok(Self {
            bits_per_sample,
            format,
        })
    }

    /// Full-scale integer value (2^(bits-1)); 1.0 for float
    #[inline]
    pub fn full_scale(&self) -> f64 {
        match self.format {
            SampleFormat::Int => (1_i64 << (self.bits_per_sample - 1)) as f64,
            SampleFormat::Float => 1.0,
        }
    }
}

impl Default for SampleEncoding {
    fn default() -> Self {
        Self::PCM_16
    }
}

// ============================================================================
// Sample Buffer
// ============================================================================

/// One fully materialized audio file
///
/// Channels are kept as separate `Vec<f32>`s, so every channel always has
/// the same number of frames. Filters never mutate a buffer in place; they
/// build a new one with the same sample rate, layout and encoding.
///
/// # Example
/// ```
/// use soundlab::engine::{ChannelLayout, SampleBuffer};
///
/// let buffer = SampleBuffer::new(44100, ChannelLayout::Stereo, 44100);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
    /// Encoding of the source file
    encoding: SampleEncoding,
}

impl SampleBuffer {
    /// Create a silent buffer with the given number of frames
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; layout.num_channels()],
            sample_rate,
            encoding: SampleEncoding::default(),
        }
    }

    /// Build a buffer from per-channel vectors
    ///
    /// # Errors
    /// * `UnsupportedFormat` - if there are not 1 or 2 channels
    /// * `InvalidAudio` - if the channels differ in length or the rate is zero
    pub fn from_channels(
        samples: Vec<Vec<f32>>,
        sample_rate: u32,
        encoding: SampleEncoding,
    ) -> Result<Self> {
        if ChannelLayout::from_count(samples.len()).is_none() {
            return Err(SoundLabError::UnsupportedFormat {
                format: format!("{}-channel audio (only mono/stereo supported)", samples.len()),
            });
        }
        if sample_rate == 0 {
            return Err(SoundLabError::InvalidAudio {
                reason: "sample rate must be positive".to_string(),
            });
        }
        let len = samples[0].len();
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(SoundLabError::InvalidAudio {
                reason: "channels have different lengths".to_string(),
            });
        }

        Ok(Self {
            samples,
            sample_rate,
            encoding,
        })
    }

    /// Create a buffer from interleaved sample data
    ///
    /// # Errors
    /// * `InvalidAudio` - if the data length is not a multiple of the channel count
    pub fn from_interleaved(
        interleaved: &[f32],
        layout: ChannelLayout,
        sample_rate: u32,
        encoding: SampleEncoding,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(SoundLabError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Self::from_channels(samples, sample_rate, encoding)
    }

    /// Convert the buffer to interleaved format (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.channels() * self.len());

        for sample_idx in 0..self.len() {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Build a buffer with the same rate and encoding but new sample data
    ///
    /// Used by filters to produce their output.
    pub fn with_samples(&self, samples: Vec<Vec<f32>>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
            encoding: self.encoding,
        }
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Encoding the buffer was read with, reused when it is written back
    #[inline]
    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    /// All channels, outer slice indexed by channel
    #[inline]
    pub fn samples(&self) -> &[Vec<f32>] {
        &self.samples
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Get the channel layout
    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Maximum absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Copy scaled so the loudest sample sits at full scale
    ///
    /// A silent buffer is returned unchanged.
    pub fn normalized(&self) -> Self {
        let peak = self.peak();
        if peak <= f32::EPSILON {
            return self.clone();
        }

        let scale = 1.0 / peak;
        self.map_samples(|s| s * scale)
    }

    /// Copy with every sample clamped to [-1.0, 1.0]
    pub fn clipped(&self) -> Self {
        self.map_samples(clip_sample)
    }

    fn map_samples(&self, f: impl Fn(f32) -> f32) -> Self {
        let samples = self
            .samples
            .iter()
            .map(|channel| channel.iter().map(|&s| f(s)).collect())
            .collect();
        self.with_samples(samples)
    }
}

/// Clamp one sample to the valid range
#[inline]
pub fn clip_sample(sample: f32) -> f32 {
    sample.clamp(-1.0, 1.0)
}
