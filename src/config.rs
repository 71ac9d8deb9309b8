//! Configuration
//!
//! Default filter parameters and normalization switches. The built-in
//! defaults apply unless a JSON file is passed with `--config`; any field
//! missing from the file keeps its built-in value.
//!
//! ```json
//! {
//!   "delay": { "delay_ms": 250.0, "feedback": 0.5 },
//!   "distortion": { "mode": "soft" },
//!   "normalize_output": false
//! }
//! ```

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::{Chorus, Delay, Distortion, Filter, FilterKind, FilterSettings};
use crate::error::{Result, SoundLabError};

/// Runtime configuration for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Default chorus parameters offered at the prompt
    pub chorus: Chorus,
    /// Default delay parameters offered at the prompt
    pub delay: Delay,
    /// Default distortion parameters offered at the prompt
    pub distortion: Distortion,
    /// Peak-normalize the input before filtering
    pub normalize_input: bool,
    /// Peak-normalize the filtered result before writing
    pub normalize_output: bool,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            chorus: Chorus::default(),
            delay: Delay::default(),
            distortion: Distortion::default(),
            normalize_input: true,
            normalize_output: true,
        }
    }
}

impl LabConfig {
    /// Load and validate a JSON config file
    ///
    /// # Errors
    /// * `FileNotFound` - if the file does not exist
    /// * `Config` - if the JSON is malformed or has unknown fields
    /// * `InvalidParameter` - if a filter default is out of range
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SoundLabError::FileNotFound {
                path: path.display().to_string(),
                source: Some(e),
            },
            _ => SoundLabError::Io(e),
        })?;

        let config: LabConfig = serde_json::from_str(&text).map_err(|e| SoundLabError::Config {
            reason: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;

        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Check every filter default against its valid range
    pub fn validate(&self) -> Result<()> {
        self.chorus.validate()?;
        self.delay.validate()?;
        self.distortion.validate()
    }

    /// Starting settings for the chosen filter
    pub fn settings_for(&self, kind: FilterKind) -> FilterSettings {
        match kind {
            FilterKind::Chorus => FilterSettings::Chorus(self.chorus.clone()),
            FilterKind::Delay => FilterSettings::Delay(self.delay.clone()),
            FilterKind::Distortion => FilterSettings::Distortion(self.distortion.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::DistortionMode;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = LabConfig::default();
        assert!(config.normalize_input);
        assert!(config.normalize_output);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lab.json");
        fs::write(
            &path,
            r#"{ "delay": { "feedback": 0.7 }, "distortion": { "mode": "soft" }, "normalize_output": false }"#,
        )
        .unwrap();

        let config = LabConfig::load(&path).unwrap();
        assert_eq!(config.delay.feedback, 0.7);
        assert_eq!(config.delay.delay_ms, 430.0);
        assert_eq!(config.distortion.mode, DistortionMode::Soft);
        assert!(!config.normalize_output);
        assert!(config.normalize_input);
    }

    #[test]
    fn test_load_rejects_runaway_feedback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lab.json");
        fs::write(&path, r#"{ "delay": { "feedback": 1.0 } }"#).unwrap();

        assert!(matches!(
            LabConfig::load(&path).unwrap_err(),
            SoundLabError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn test_load_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lab.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(LabConfig::load(&path).unwrap_err(), SoundLabError::Config { .. }));

        fs::write(&path, r#"{ "reverb": {} }"#).unwrap();
        assert!(matches!(LabConfig::load(&path).unwrap_err(), SoundLabError::Config { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LabConfig::load(Path::new("/nonexistent/lab.json")).unwrap_err();
        assert!(matches!(err, SoundLabError::FileNotFound { .. }));
    }

    #[test]
    fn test_settings_for() {
        let mut config = LabConfig::default();
        config.chorus.mix = 0.9;

        match config.settings_for(FilterKind::Chorus) {
            FilterSettings::Chorus(chorus) => assert_eq!(chorus.mix, 0.9),
            other => panic!("unexpected settings {:?}", other),
        }
        assert_eq!(config.settings_for(FilterKind::Delay).kind(), FilterKind::Delay);
    }
}
