//! Error type shared by all stages of the wavetable pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input could not be parsed as a supported RIFF/WAVE file.
    #[error("WAV format error: {0}")]
    WavFormat(String),

    /// The input could not be parsed as a WT file.
    #[error("WT format error: {0}")]
    WtFormat(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("No waveforms in batch")]
    EmptyBatch,

    /// All waveforms of a batch must share one sample rate.
    #[error("Sample rate mismatch in [{name}]: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch {
        name: String,
        expected: u32,
        found: u32,
    },

    /// Less than two zero crossings, no period can be located.
    #[error("Degenerate signal in [{name}]: {crossings} zero crossings, need at least 2")]
    DegenerateSignal { name: String, crossings: usize },

    #[error("Selected period of [{name}] is {len} samples long, need at least 2")]
    SliceTooShort { name: String, len: usize },

    #[error("Selected period of [{name}] is silent")]
    SilentFrame { name: String },

    #[error("Too many frames for a WT file: {0}")]
    TooManyFrames(usize),

    #[error("No waveform named [{0}] in batch")]
    UnknownRecord(String),
}

pub type Result<T> = std::result::Result<T, WtError>;
