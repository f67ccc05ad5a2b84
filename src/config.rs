//! Settings for analysis and wavetable output.
//!
//! Stored as JSON. Missing fields fall back to their defaults, so an empty
//! object is a valid configuration.

use super::{Float, Result, WtError};
use super::tuning;

use log::info;
use serde::{Serialize, Deserialize};

use std::fs;
use std::path::Path;

pub const FRAME_SIZE: usize = 2048;
pub const PEAK: Float = 32767.0;
pub const OUTPUT_SAMPLE_RATE: u32 = 44100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakerConfig {
    pub frame_size: usize,        // Samples per wavetable frame
    pub peak: Float,              // Largest absolute sample value of a frame
    pub output_sample_rate: u32,  // Sample rate written to the WAV header
    pub reference_freq: Float,    // Frequency of exponent 0 in the probe bank
    pub low_exponent: i32,        // Lowest semitone offset from the reference
    pub high_exponent: i32,       // Highest semitone offset from the reference
    pub max_probe_samples: usize, // Upper limit for probe matrix columns
    pub num_threads: u32,         // Worker threads for pitch estimation
    pub write_wav: bool,
    pub write_wt: bool,
}

impl Default for MakerConfig {
    fn default() -> Self {
        MakerConfig{
            frame_size: FRAME_SIZE,
            peak: PEAK,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            reference_freq: tuning::REFERENCE_FREQ,
            low_exponent: tuning::LOW_EXPONENT,
            high_exponent: tuning::HIGH_EXPONENT,
            max_probe_samples: 16384,
            num_threads: 4,
            write_wav: true,
            write_wt: true,
        }
    }
}

impl MakerConfig {
    /// Read the configuration from a JSON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MakerConfig> {
        let path = path.as_ref();
        info!("Reading configuration from [{}]", path.display());
        let content = fs::read_to_string(path)?;
        let config: MakerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_size < 2 {
            return Err(WtError::Config(format!("frame_size must be at least 2, is {}", self.frame_size)));
        }
        if self.frame_size > u32::MAX as usize {
            return Err(WtError::Config(format!("frame_size {} does not fit a WT header", self.frame_size)));
        }
        if !(self.peak > 0.0 && self.peak <= PEAK) {
            return Err(WtError::Config(format!("peak must be in (0, {}], is {}", PEAK, self.peak)));
        }
        if self.output_sample_rate == 0 {
            return Err(WtError::Config("output_sample_rate must not be 0".to_string()));
        }
        if !(self.reference_freq > 0.0) {
            return Err(WtError::Config(format!("reference_freq must be positive, is {}", self.reference_freq)));
        }
        if self.low_exponent > self.high_exponent {
            return Err(WtError::Config(format!("Exponent range {}..{} is empty",
                self.low_exponent, self.high_exponent)));
        }
        if self.max_probe_samples == 0 {
            return Err(WtError::Config("max_probe_samples must not be 0".to_string()));
        }
        Ok(())
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn empty_json_gives_defaults() {
    let config: MakerConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, MakerConfig::default());
    assert!(config.validate().is_ok());
}

#[test]
fn partial_json_overrides_fields() {
    let config: MakerConfig = serde_json::from_str(r#"{"frame_size": 256, "write_wav": false}"#).unwrap();
    assert_eq!(config.frame_size, 256);
    assert!(!config.write_wav);
    assert!(config.write_wt);
    assert_eq!(config.peak, PEAK);
}

#[test]
fn invalid_values_are_rejected() {
    let mut config = MakerConfig::default();
    config.frame_size = 1;
    assert!(matches!(config.validate(), Err(WtError::Config(_))));

    let mut config = MakerConfig::default();
    config.low_exponent = 10;
    config.high_exponent = 0;
    assert!(matches!(config.validate(), Err(WtError::Config(_))));

    let mut config = MakerConfig::default();
    config.peak = 0.0;
    assert!(matches!(config.validate(), Err(WtError::Config(_))));
}

#[test]
fn config_is_loaded_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"num_threads": 1, "max_probe_samples": 4096}"#).unwrap();
    let config = MakerConfig::load(&path).unwrap();
    assert_eq!(config.num_threads, 1);
    assert_eq!(config.max_probe_samples, 4096);

    fs::write(&path, "not json").unwrap();
    assert!(matches!(MakerConfig::load(&path), Err(WtError::ConfigParse(_))));
}
