//! Render settings: defaults, optional TOML file, command-line overrides.
//!
//! ```toml
//! gain = 0.7
//! tone = 0.4
//! volume = 0.5
//! block_size = 512
//! oversampling_stages = 3
//! bit_depth = 24
//! ```
//!
//! Every key is optional. Precedence, lowest first: built-in defaults, the
//! settings file, command-line flags.

use std::path::{Path, PathBuf};

use crunch_core::MAX_OVERSAMPLING_STAGES;
use crunch_effects::{DEFAULT_OVERSAMPLING_STAGES, DistortionParameters};
use serde::Deserialize;
use thiserror::Error;

/// Errors from loading or validating render settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file
    #[error("failed to read settings file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse settings: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is outside its allowed range
    #[error("invalid {key} {value}: expected {expected}")]
    OutOfRange {
        /// Settings key.
        key: &'static str,
        /// Offending value, as given.
        value: String,
        /// Human-readable allowed range.
        expected: &'static str,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    fn out_of_range(key: &'static str, value: impl ToString, expected: &'static str) -> Self {
        ConfigError::OutOfRange {
            key,
            value: value.to_string(),
            expected,
        }
    }
}

/// Optional settings, as found in a file or on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsOverrides {
    /// Op-amp gain, 0 to 1.
    pub gain: Option<f32>,
    /// Tone blend, 0 to 1.
    pub tone: Option<f32>,
    /// Output volume, 0 to 1.
    pub volume: Option<f32>,
    /// Frames per processing block.
    pub block_size: Option<usize>,
    /// Number of 2x oversampling stages.
    pub oversampling_stages: Option<usize>,
    /// Output bit depth.
    pub bit_depth: Option<u16>,
}

impl SettingsOverrides {
    /// Parses a settings file body.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses a settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }
}

/// Fully resolved, validated render settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Op-amp gain, 0 to 1.
    pub gain: f32,
    /// Tone blend, 0 to 1.
    pub tone: f32,
    /// Output volume, 0 to 1.
    pub volume: f32,
    /// Frames per processing block.
    pub block_size: usize,
    /// Number of 2x oversampling stages.
    pub oversampling_stages: usize,
    /// Output bit depth (16, 24 or 32; 32 is IEEE float).
    pub bit_depth: u16,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let params = DistortionParameters::default();
        Self {
            gain: params.gain,
            tone: params.tone,
            volume: params.volume,
            block_size: 512,
            oversampling_stages: DEFAULT_OVERSAMPLING_STAGES,
            bit_depth: 32,
        }
    }
}

impl RenderSettings {
    /// Defaults, then the optional settings file, then `flags`; validated.
    pub fn resolve(file: Option<&Path>, flags: SettingsOverrides) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(path) = file {
            let from_file = SettingsOverrides::load(path)?;
            tracing::debug!(path = %path.display(), ?from_file, "loaded render settings");
            settings.apply(from_file);
        }
        settings.apply(flags);
        settings.validate()?;
        Ok(settings)
    }

    /// Replaces every field that `overrides` sets.
    pub fn apply(&mut self, overrides: SettingsOverrides) {
        if let Some(v) = overrides.gain {
            self.gain = v;
        }
        if let Some(v) = overrides.tone {
            self.tone = v;
        }
        if let Some(v) = overrides.volume {
            self.volume = v;
        }
        if let Some(v) = overrides.block_size {
            self.block_size = v;
        }
        if let Some(v) = overrides.oversampling_stages {
            self.oversampling_stages = v;
        }
        if let Some(v) = overrides.bit_depth {
            self.bit_depth = v;
        }
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("gain", self.gain),
            ("tone", self.tone),
            ("volume", self.volume),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::out_of_range(key, value, "a value from 0 to 1"));
            }
        }
        if self.block_size == 0 {
            return Err(ConfigError::out_of_range(
                "block_size",
                self.block_size,
                "at least 1",
            ));
        }
        if self.oversampling_stages > MAX_OVERSAMPLING_STAGES {
            return Err(ConfigError::out_of_range(
                "oversampling_stages",
                self.oversampling_stages,
                "0 to 4",
            ));
        }
        if !matches!(self.bit_depth, 16 | 24 | 32) {
            return Err(ConfigError::out_of_range(
                "bit_depth",
                self.bit_depth,
                "16, 24 or 32",
            ));
        }
        Ok(())
    }

    /// The control values as engine parameters.
    pub fn parameters(&self) -> DistortionParameters {
        DistortionParameters::new(self.gain, self.tone, self.volume)
    }
}
