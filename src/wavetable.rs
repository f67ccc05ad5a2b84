//! A wavetable assembled from a batch of analysed recordings.
//!
//! A wavetable consists of a collection of single-cycle waveshapes (frames),
//! all of the same length, usually 2048 samples. Every frame is cut out of
//! one recording and peak-normalized to the 16 bit range.
//!
//! The frames are ordered by the length of the recording they came from,
//! longest first. Recordings of equal length are ordered by their estimated
//! fundamental, lowest first, then by name. This makes the order
//! deterministic for any input.
//!
//! In memory, the table is stored as a vector of frames. The serialized
//! forms (16 bit PCM for WAV, floats for WT) are the frames concatenated in
//! order.

use super::{Float, Result, WtError};
use super::analysis::AnalysisRecord;
use super::frame::{self, Frame};

use log::{debug, info};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

use std::cmp::Ordering;

pub type Harmonic = Complex<Float>;

#[derive(Debug, Clone)]
pub struct Wavetable {
    pub wave_size: usize,   // Length of a single frame (usually 2048)
    pub wave_count: usize,  // Number of frames
    names: Vec<String>,     // Source recording of every frame
    table: Vec<Frame>,
}

impl Wavetable {
    /// Extract one frame from every record and combine them in assembly
    /// order.
    ///
    /// Fails if the batch is empty or any single frame can't be extracted.
    /// No partial table is returned in that case.
    pub fn assemble(records: &[AnalysisRecord], wave_size: usize, peak: Float) -> Result<Wavetable> {
        if records.is_empty() {
            return Err(WtError::EmptyBatch);
        }
        let mut ordered: Vec<&AnalysisRecord> = records.iter().collect();
        ordered.sort_by(|a, b| assembly_order(a, b));

        let mut names = Vec::with_capacity(ordered.len());
        let mut table = Vec::with_capacity(ordered.len());
        for record in ordered {
            debug!("Frame {}: [{}], {} Hz", table.len(), record.name(), record.fundamental());
            table.push(frame::extract(record, wave_size, peak)?);
            names.push(record.name().to_string());
        }
        info!("Assembled wavetable with {} frames of {} samples", table.len(), wave_size);
        Ok(Wavetable{wave_size, wave_count: table.len(), names, table})
    }

    /// Return the frame at the given index.
    pub fn get_wave(&self, wave_id: usize) -> &Frame {
        &self.table[wave_id]
    }

    pub fn frames(&self) -> &[Frame] {
        &self.table
    }

    /// Names of the source recordings, in frame order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// All frames as 16 bit samples.
    ///
    /// Values are truncated toward zero.
    pub fn to_pcm16(&self) -> Vec<i16> {
        self.table
            .iter()
            .flat_map(|f| f.samples().iter())
            .map(|s| *s as i16)
            .collect()
    }

    /// All frames as floats in the range [-1.0, 1.0).
    ///
    /// These are the 16 bit samples divided by 32768, the values a reader of
    /// the written WAV file gets.
    pub fn to_wt_floats(&self) -> Vec<f32> {
        self.to_pcm16()
            .iter()
            .map(|s| *s as f32 / 32768.0)
            .collect()
    }

    /// Calculate the frequency spectra of the frames in the table.
    ///
    /// Creates one spectrum for each frame. Each spectrum is the result of
    /// running an FFT over the samples of the frame, so bin n holds the n-th
    /// harmonic.
    pub fn get_freq_spectrum(&self) -> Vec<Vec<Harmonic>> {
        // Allocate memory
        let fft_len = self.wave_size;
        let mut spectrum = vec![vec![Harmonic::new(0.0, 0.0); fft_len]; self.table.len()];
        if fft_len == 0 {
            return spectrum;
        }

        // Prepare FFT
        let mut buffer: Vec<Complex<Float>> = vec![Complex::zero(); fft_len];
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);

        for (i, frame) in self.table.iter().enumerate() {
            for (j, sample) in frame.samples().iter().take(fft_len).enumerate() {
                buffer[j].re = *sample;
                buffer[j].im = 0.0;
            }
            fft.process(&mut buffer);
            spectrum[i].copy_from_slice(&buffer);
        }
        spectrum
    }

    /// Magnitudes of the first `num_harmonics` harmonics of every frame,
    /// relative to the strongest of them.
    pub fn harmonic_profile(&self, num_harmonics: usize) -> Vec<Vec<Float>> {
        let num_harmonics = num_harmonics.min(self.wave_size / 2);
        self.get_freq_spectrum()
            .iter()
            .map(|spectrum| {
                let mut magnitudes: Vec<Float> = spectrum.iter()
                    .skip(1)
                    .take(num_harmonics)
                    .map(|h| h.norm())
                    .collect();
                let max = magnitudes.iter().fold(0.0, |m: Float, v| m.max(*v));
                if max > 0.0 {
                    magnitudes.iter_mut().for_each(|m| *m /= max);
                }
                magnitudes
            })
            .collect()
    }
}

/// Order of frames in the wavetable.
///
/// Longer recordings first, then lower fundamental, then name.
pub fn assembly_order(a: &AnalysisRecord, b: &AnalysisRecord) -> Ordering {
    b.waveform().len().cmp(&a.waveform().len())
        .then_with(|| a.fundamental().total_cmp(&b.fundamental()))
        .then_with(|| a.name().cmp(b.name()))
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::signal::{self, Waveform};

#[cfg(test)]
fn locked_sine(name: &str, freq: Float, len: usize) -> AnalysisRecord {
    let rate = 48000;
    let mut record = AnalysisRecord::new(Waveform::new(name, rate, signal::sinusoid(len, rate, freq, 0.0, 0.8)));
    record.set_fundamental(freq);
    record
}

#[test]
fn frames_are_ordered_by_length_then_frequency() {
    let records = vec![
        locked_sine("short", 220.0, 4800),
        locked_sine("high", 880.0, 9600),
        locked_sine("low", 220.0, 9600),
        locked_sine("mid", 440.0, 9600),
    ];
    let wt = Wavetable::assemble(&records, 256, 32767.0).unwrap();
    assert_eq!(wt.wave_count, 4);
    assert_eq!(wt.wave_size, 256);
    assert_eq!(wt.names(), &["low", "mid", "high", "short"]);
}

#[test]
fn equal_records_are_ordered_by_name() {
    let records = vec![
        locked_sine("b", 440.0, 4800),
        locked_sine("a", 440.0, 4800),
    ];
    let wt = Wavetable::assemble(&records, 64, 32767.0).unwrap();
    assert_eq!(wt.names(), &["a", "b"]);
}

#[test]
fn single_failure_aborts_assembly() {
    let records = vec![
        locked_sine("good", 440.0, 4800),
        AnalysisRecord::new(Waveform::new("silent", 48000, vec![0.0; 4800])),
    ];
    let result = Wavetable::assemble(&records, 2048, 32767.0);
    assert!(matches!(result, Err(WtError::DegenerateSignal{ref name, ..}) if name == "silent"));
    assert!(matches!(Wavetable::assemble(&[], 2048, 32767.0), Err(WtError::EmptyBatch)));
}

#[test]
fn samples_are_truncated_to_i16() {
    let records = vec![locked_sine("a", 440.0, 4800)];
    let wt = Wavetable::assemble(&records, 2048, 32767.0).unwrap();
    let pcm = wt.to_pcm16();
    let floats = wt.to_wt_floats();
    assert_eq!(pcm.len(), 2048);
    assert_eq!(floats.len(), 2048);
    for (i, s) in wt.get_wave(0).samples().iter().enumerate() {
        assert_eq!(pcm[i], s.trunc() as i16);
        assert_eq!(floats[i], pcm[i] as f32 / 32768.0);
    }
    let max = pcm.iter().map(|s| (*s as i32).abs()).max().unwrap();
    assert!(max >= 32766 && max <= 32767);
}

#[test]
fn spectrum_shows_harmonics() {
    let rate = 48000;
    let samples = signal::harmonic_signal(9600, rate, 100.0, 1.0, &[(1.0, 1.0), (3.0, 0.5)]);
    let mut record = AnalysisRecord::new(Waveform::new("harmonics", rate, samples));
    record.set_fundamental(100.0);
    let wt = Wavetable::assemble(&[record], 2048, 32767.0).unwrap();

    let spectrum = wt.get_freq_spectrum();
    assert_eq!(spectrum.len(), 1);
    assert_eq!(spectrum[0].len(), 2048);

    let profile = wt.harmonic_profile(8);
    assert_eq!(profile[0].len(), 8);
    assert!((profile[0][0] - 1.0).abs() < 1e-9);
    assert!((profile[0][2] - 0.5).abs() < 0.05);
    assert!(profile[0][1] < 0.05);
    assert!(profile[0][3] < 0.05);
}
