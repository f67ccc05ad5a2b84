//! Cutting one period out of a recording and stretching it to a fixed
//! length.
//!
//! The period runs from the start crossing up to, but not including, the end
//! crossing. The end crossing is the first sample of the next period.

use super::{Float, Result, WtError};
use super::analysis::AnalysisRecord;

use log::debug;

/// A single wave cycle of fixed length, peak-normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    samples: Vec<Float>,
}

impl Frame {
    pub fn samples(&self) -> &[Float] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Extract the selected period of a record as frame of `target_length`
/// samples, scaled so that the largest absolute value equals `peak`.
pub fn extract(record: &AnalysisRecord, target_length: usize, peak: Float) -> Result<Frame> {
    record.check_crossings()?;
    let locator = record.locator();
    let start = locator.current_start_sample();
    let end = locator.current_end_sample();
    let slice = &record.waveform().samples()[start..end.max(start)];
    debug!("[{}]: Extracting samples {}..{} ({} samples)", record.name(), start, end, slice.len());
    if slice.len() < 2 {
        return Err(WtError::SliceTooShort{name: record.name().to_string(), len: slice.len()});
    }
    let mut samples = resample(slice, target_length);
    if !normalize(&mut samples, peak) {
        return Err(WtError::SilentFrame{name: record.name().to_string()});
    }
    Ok(Frame{samples})
}

/// Stretch or squeeze the source to `target_length` samples.
///
/// The first and last target samples hit the first and last source samples,
/// the samples in between are linearly interpolated at evenly spaced source
/// positions. A source of exactly `target_length` samples is returned
/// unchanged.
pub fn resample(source: &[Float], target_length: usize) -> Vec<Float> {
    let num_samples = source.len();
    if num_samples == 0 || target_length == 0 {
        return vec![0.0; target_length];
    }
    if target_length == 1 {
        return vec![source[0]];
    }
    let source_inc = (num_samples - 1) as Float / (target_length - 1) as Float;
    let mut table = vec![0.0; target_length];
    for (j, value) in table.iter_mut().enumerate() {
        let index_f = j as Float * source_inc;
        let lower_index = (index_f as usize).min(num_samples - 1);
        let upper_index = (lower_index + 1).min(num_samples - 1);
        let fract = index_f - lower_index as Float;
        *value = source[lower_index] + (source[upper_index] - source[lower_index]) * fract;
    }
    table
}

/// Scale the table so that the largest absolute value equals `peak`.
///
/// Returns false if the table is silent and can't be scaled.
pub fn normalize(table: &mut [Float], peak: Float) -> bool {
    let max = table.iter().fold(0.0, |m: Float, s| m.max(s.abs()));
    if max == 0.0 || !max.is_finite() {
        return false;
    }
    let scale = peak / max;
    for sample in table.iter_mut() {
        *sample *= scale;
    }
    true
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::signal::{self, Waveform};

#[cfg(test)]
fn values_match(actual: &[Float], expected: &[Float], delta: Float) -> bool {
    if actual.len() != expected.len() {
        return false;
    }
    for i in 0..actual.len() {
        let diff = actual[i] - expected[i];
        if diff > delta || diff < -delta {
            println!("Missmatch at {}, actual {}, expected {}", i, actual[i], expected[i]);
            return false;
        }
    }
    true
}

#[test]
fn same_length_is_unchanged() {
    let source = vec![0.1, 0.5, -0.25, -1.0, 0.3];
    assert_eq!(resample(&source, 5), source);
}

#[test]
fn samples_are_interpolated_correctly() {
    let source = vec![0.0, 1.5];
    assert!(values_match(&resample(&source, 4), &[0.0, 0.5, 1.0, 1.5], 1e-12));
    let source = vec![0.0, 2.0, 4.0, 6.0];
    assert!(values_match(&resample(&source, 2), &[0.0, 6.0], 1e-12));
    assert!(values_match(&resample(&source, 1), &[0.0], 1e-12));
}

#[test]
fn stretched_cycle_has_no_flat_tail() {
    let cycle = signal::sinusoid(100, 100, 1.0, 0.0, 1.0);
    let table = resample(&cycle, 2048);
    assert!((table[2047] - cycle[99]).abs() < 1e-9);
    // Every step of the stretched sine moves
    for pair in table.windows(2) {
        assert!(pair[0] != pair[1]);
    }
}

#[test]
fn table_is_normalized_to_peak() {
    let mut table = vec![0.5, -2.0, 1.0];
    assert!(normalize(&mut table, 32767.0));
    assert!(values_match(&table, &[8191.75, -32767.0, 16383.5], 1e-9));

    let mut silent = vec![0.0; 4];
    assert!(!normalize(&mut silent, 32767.0));
}

#[test]
fn frame_of_exact_period_is_only_normalized() {
    // 8 samples per period, crossings every 8 samples after the peak
    let cycle = vec![0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -0.5, 0.0];
    let mut samples = vec![0.0];
    for _ in 0..4 {
        samples.extend_from_slice(&cycle);
    }
    samples[2] = 2.0; // Peak to scan from
    let mut record = AnalysisRecord::new(Waveform::new("cycle", 8, samples.clone()));
    record.set_fundamental(1.0);
    let start = record.locator().current_start_sample();
    let end = record.locator().current_end_sample();
    assert_eq!(end - start, 8);

    let frame = extract(&record, 8, 1.0).unwrap();
    assert_eq!(frame.samples(), &samples[start..end]);
}

#[test]
fn sine_period_gives_full_frame() {
    let sine = signal::sinusoid(48000, 48000, 440.0, 0.0, 0.3);
    let mut record = AnalysisRecord::new(Waveform::new("sine", 48000, sine));
    record.set_fundamental(440.0);
    let frame = extract(&record, 2048, 32767.0).unwrap();
    assert_eq!(frame.len(), 2048);
    let max = frame.samples().iter().fold(0.0, |m: Float, s| m.max(s.abs()));
    assert!((max - 32767.0).abs() < 1e-6);
    // Starts at a rising crossing, positive half first
    assert!(frame.samples()[0] >= 0.0);
    assert!(frame.samples()[512] > 30000.0);
    assert!(frame.samples()[1536] < -30000.0);
}

#[test]
fn silence_fails_explicitly() {
    let record = AnalysisRecord::new(Waveform::new("silence", 44100, vec![0.0; 4096]));
    let result = extract(&record, 2048, 32767.0);
    assert!(matches!(result, Err(WtError::DegenerateSignal{..})));
}

#[test]
fn empty_period_fails_explicitly() {
    let sine = signal::sinusoid(4800, 48000, 440.0, 0.0, 1.0);
    let record = AnalysisRecord::new(Waveform::new("sine", 48000, sine));
    // Cursor not moved, start == end
    let result = extract(&record, 2048, 32767.0);
    assert!(matches!(result, Err(WtError::SliceTooShort{len: 0, ..})));
}
