//! Filter trait definition
//!
//! Every effect is a pure transformation from one [`SampleBuffer`] to a new
//! one. Parameters are plain serde structs so they can come from a config
//! file, from the interactive prompts, or from tests.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::dsp::{Chorus, Delay, Distortion};
use crate::engine::SampleBuffer;
use crate::error::{Result, SoundLabError};

/// Describes one user-settable parameter for prompting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Base trait for all filters
pub trait Filter {
    /// Transform `input` into a new buffer
    ///
    /// Parameters are validated first, so an out-of-range setting fails
    /// with `InvalidParameter` before any sample is touched.
    fn apply(&self, input: &SampleBuffer) -> Result<SampleBuffer>;

    /// Check every parameter against its valid range
    fn validate(&self) -> Result<()>;

    /// Get the filter type identifier
    fn filter_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Parameters in prompt order
    fn param_specs(&self) -> &'static [ParamSpec];

    /// Serialize filter parameters to JSON
    fn to_json(&self) -> Result<Value>;

    /// Set a single parameter by name
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()>;
}

/// Helper macro to implement common Filter trait methods
#[macro_export]
macro_rules! impl_filter_common {
    ($filter_type:expr, $display_name:expr) => {
        fn filter_type(&self) -> &'static str {
            $filter_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn to_json(&self) -> $crate::error::Result<serde_json::Value> {
            serde_json::to_value(self).map_err($crate::error::SoundLabError::Serialization)
        }
    };
}

/// Extract a finite number from a JSON parameter value
pub(crate) fn number_param(name: &str, value: &Value) -> Result<f32> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .map(|v| v as f32)
        .ok_or_else(|| SoundLabError::invalid_param(name, format!("expected a number, got {}", value)))
}

/// Reject non-finite values and values outside `[min, max]`
pub(crate) fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(SoundLabError::invalid_param(
            name,
            format!("{} is outside the range [{}, {}]", value, min, max),
        ));
    }
    Ok(())
}

// ============================================================================
// Filter Kind
// ============================================================================

/// The three available effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Chorus,
    Delay,
    Distortion,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [FilterKind::Chorus, FilterKind::Delay, FilterKind::Distortion];

    /// Lowercase identifier, also used in default output file names
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Chorus => "chorus",
            FilterKind::Delay => "delay",
            FilterKind::Distortion => "distortion",
        }
    }

    /// Menu number shown at the filter prompt
    pub fn menu_number(&self) -> usize {
        match self {
            FilterKind::Chorus => 1,
            FilterKind::Delay => 2,
            FilterKind::Distortion => 3,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = SoundLabError;

    /// Accepts the filter name in any case, or its menu number
    fn from_str(s: &str) -> Result<Self> {
        let choice = s.trim().to_lowercase();
        FilterKind::ALL
            .into_iter()
            .find(|kind| choice == kind.as_str() || choice == kind.menu_number().to_string())
            .ok_or_else(|| {
                SoundLabError::invalid_param(
                    "filter",
                    format!("'{}' is not one of chorus, delay, distortion", s.trim()),
                )
            })
    }
}

// ============================================================================
// Filter Settings
// ============================================================================

/// A chosen filter together with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSettings {
    Chorus(Chorus),
    Delay(Delay),
    Distortion(Distortion),
}

impl FilterSettings {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterSettings::Chorus(_) => FilterKind::Chorus,
            FilterSettings::Delay(_) => FilterKind::Delay,
            FilterSettings::Distortion(_) => FilterKind::Distortion,
        }
    }

    pub fn as_filter(&self) -> &dyn Filter {
        match self {
            FilterSettings::Chorus(f) => f,
            FilterSettings::Delay(f) => f,
            FilterSettings::Distortion(f) => f,
        }
    }

    pub fn as_filter_mut(&mut self) -> &mut dyn Filter {
        match self {
            FilterSettings::Chorus(f) => f,
            FilterSettings::Delay(f) => f,
            FilterSettings::Distortion(f) => f,
        }
    }

    /// Apply the selected filter
    pub fn apply(&self, input: &SampleBuffer) -> Result<SampleBuffer> {
        self.as_filter().apply(input)
    }
}
