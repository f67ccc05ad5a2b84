//! Builds wavetables from recordings of single notes.
//!
//! Every recording contributes one frame: its fundamental is estimated with a
//! bank of equal-tempered probe frequencies, one period is located between
//! two rising zero crossings, and that period is resampled to a fixed length
//! and peak-normalized. The frames are written as 16 bit WAV and as WT file.

mod analysis;
mod config;
mod error;
mod frame;
mod period_locator;
mod signal;
mod spectral;
pub mod tuning;
mod wav_data;
mod wav_handler;
mod wavetable;
mod wt_file;
mod wt_maker;

pub use analysis::{AnalysisContext, AnalysisRecord, Progress, RecordSummary};
pub use config::{MakerConfig, FRAME_SIZE, OUTPUT_SAMPLE_RATE, PEAK};
pub use error::{Result, WtError};
pub use frame::{extract, normalize, resample, Frame};
pub use period_locator::{find_crossings, PeriodLocator};
pub use signal::{harmonic_signal, mix_down, sinusoid, Waveform};
pub use spectral::{peaks, Probe, ProbeMatrix};
pub use tuning::FreqBank;
pub use wav_data::{FmtChunk, WavData, WavDataType};
pub use wav_handler::WavHandler;
pub use wavetable::{assembly_order, Harmonic, Wavetable};
pub use wt_file::{WtFile, WT_MAGIC};
pub use wt_maker::{WtMaker, WtPaths};

pub type Float = f64;
