//! Pitch estimation against a fixed set of probe frequencies.
//!
//! Instead of an FFT with linearly spaced bins, the signal is correlated with
//! one complex sinusoid per probe frequency. The probes are equal-tempered
//! semitones, so every bin maps directly to a note. The amplitude of a bin is
//! the magnitude of the dot product of probe and signal, divided by the number
//! of samples used.
//!
//! Building the probe matrix is the expensive part (bank size times sample
//! count complex values), so a matrix is built once per batch and shared by
//! all waveforms of that batch.

use super::Float;

use log::{debug, trace};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

use std::f64::consts::PI;
use std::ops::Range;

pub type Probe = Complex<Float>;

#[derive(Debug)]
pub struct ProbeMatrix {
    sample_rate: u32,
    num_samples: usize,
    freqs: Vec<Float>,
    rows: Vec<Vec<Probe>>,
}

impl ProbeMatrix {
    /// Build one row of `num_samples` complex samples per frequency.
    ///
    /// Row i holds exp(j * 2pi * f_i * t) for t = k / sample_rate, starting
    /// with zero phase at k = 0.
    pub fn new(num_samples: usize, sample_rate: u32, freqs: &[Float]) -> Self {
        debug!("Building probe matrix: {} frequencies, {} samples at {} Hz",
            freqs.len(), num_samples, sample_rate);
        let rate = sample_rate as Float;
        let rows = freqs
            .iter()
            .map(|f| {
                let omega = 2.0 * PI * f / rate;
                (0..num_samples)
                    .map(|k| Complex::from_polar(1.0, omega * k as Float))
                    .collect()
            })
            .collect();
        ProbeMatrix{sample_rate, num_samples, freqs: freqs.to_vec(), rows}
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn freqs(&self) -> &[Float] {
        &self.freqs
    }

    /// True if this matrix can be reused for the given dimensions.
    pub fn matches(&self, num_samples: usize, sample_rate: u32) -> bool {
        self.num_samples == num_samples && self.sample_rate == sample_rate
    }

    /// Amplitude of every probe frequency in the signal.
    pub fn transform(&self, signal: &[Float]) -> Vec<Float> {
        self.transform_range(signal, 0..self.rows.len(), 0..signal.len())
    }

    /// Amplitudes for a subset of probe rows over a subset of the signal.
    ///
    /// Both the column range and the signal are cut to the shorter of the two
    /// lengths, a signal longer than the matrix is silently truncated.
    pub fn transform_range(&self, signal: &[Float], rows: Range<usize>, cols: Range<usize>) -> Vec<Float> {
        let last_row = rows.end.min(self.rows.len());
        let rows = rows.start.min(last_row)..last_row;
        let end = cols.end.min(signal.len()).min(self.num_samples);
        let start = cols.start.min(end);
        let sig = &signal[start..end];
        let len = sig.len();
        self.rows[rows]
            .iter()
            .map(|row| {
                if len == 0 {
                    return 0.0;
                }
                let mut coeff = Probe::zero();
                for (p, s) in row[start..end].iter().zip(sig.iter()) {
                    coeff += *p * *s;
                }
                coeff.norm() / len as Float
            })
            .collect()
    }

    /// Estimate the fundamental frequency of the signal.
    ///
    /// Returns the probe frequency with the largest amplitude. On equal
    /// amplitudes the lowest frequency wins.
    pub fn estimate_fundamental(&self, signal: &[Float]) -> Float {
        let amplitudes = self.transform(signal);
        let mut best = 0;
        for (i, a) in amplitudes.iter().enumerate() {
            if *a > amplitudes[best] {
                best = i;
            }
        }
        let freq = self.freqs.get(best).copied().unwrap_or(0.0);
        trace!("Best match {} Hz with amplitude {:?}", freq, amplitudes.get(best));
        freq
    }
}

/// Mark local maxima in a smooth amplitude spectrum.
///
/// Interior bins are marked if they are strictly greater than both
/// neighbours. The first bin is marked if it is greater than the second, the
/// last bin is never marked.
pub fn peaks(amplitudes: &[Float]) -> Vec<bool> {
    let len = amplitudes.len();
    let mut output = vec![false; len];
    if len < 2 {
        return output;
    }
    for i in 1..len - 1 {
        output[i] = amplitudes[i - 1] < amplitudes[i] && amplitudes[i] > amplitudes[i + 1];
    }
    output[0] = amplitudes[0] > amplitudes[1];
    output
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::{signal, tuning::FreqBank};

#[test]
fn probe_rows_start_with_zero_phase() {
    let matrix = ProbeMatrix::new(8, 8, &[1.0, 2.0]);
    assert_eq!(matrix.rows.len(), 2);
    assert_eq!(matrix.rows[0].len(), 8);
    assert_eq!(matrix.rows[0][0], Complex::new(1.0, 0.0));
    // Quarter period of 1 Hz at 8 Hz sample rate
    assert!((matrix.rows[0][2].im - 1.0).abs() < 1e-12);
    assert!(matrix.rows[0][2].re.abs() < 1e-12);
}

#[test]
fn sine_is_matched_to_exact_bank_entry() {
    let bank = FreqBank::default();
    let matrix = ProbeMatrix::new(4096, 48000, bank.freqs());
    let sine = signal::sinusoid(4096, 48000, 440.0, 0.0, 1.0);
    assert_eq!(matrix.estimate_fundamental(&sine), 440.0);
}

#[test]
fn detuned_sine_is_matched_to_nearest_entry() {
    let bank = FreqBank::default();
    let matrix = ProbeMatrix::new(4096, 44100, bank.freqs());
    let sine = signal::sinusoid(4096, 44100, 222.0, 30.0, 0.5);
    assert!((matrix.estimate_fundamental(&sine) - 220.0).abs() < 1e-9);
}

#[test]
fn harmonics_do_not_hide_fundamental() {
    let bank = FreqBank::default();
    let matrix = ProbeMatrix::new(8192, 48000, bank.freqs());
    let tone = signal::harmonic_signal(8192, 48000, 110.0, 1.0, &[(1.0, 10.0), (2.0, 5.0), (3.0, 1.0)]);
    assert!((matrix.estimate_fundamental(&tone) - 110.0).abs() < 1e-9);
}

#[test]
fn length_mismatch_truncates() {
    let matrix = ProbeMatrix::new(100, 1000, &[10.0, 50.0]);
    let sine = signal::sinusoid(1000, 1000, 50.0, 0.0, 1.0);
    let amplitudes = matrix.transform(&sine);
    assert_eq!(amplitudes.len(), 2);
    // 100 samples of a 50 Hz sine at 1 kHz is exactly 5 periods
    assert!((amplitudes[1] - 0.5).abs() < 1e-9);

    let short = &sine[..10];
    let amplitudes = matrix.transform(short);
    assert!(amplitudes.iter().all(|a| a.is_finite()));
}

#[test]
fn silence_selects_first_probe() {
    let matrix = ProbeMatrix::new(64, 1000, &[10.0, 20.0, 30.0]);
    assert_eq!(matrix.estimate_fundamental(&vec![0.0; 64]), 10.0);
    assert_eq!(matrix.estimate_fundamental(&[]), 10.0);
}

#[test]
fn range_transform_selects_rows() {
    let matrix = ProbeMatrix::new(100, 1000, &[10.0, 50.0, 100.0]);
    let sine = signal::sinusoid(100, 1000, 50.0, 0.0, 1.0);
    let full = matrix.transform(&sine);
    let partial = matrix.transform_range(&sine, 1..3, 0..100);
    assert_eq!(partial.len(), 2);
    assert_eq!(partial[0], full[1]);
    assert_eq!(partial[1], full[2]);
}

#[test]
fn peaks_are_marked() {
    let marks = peaks(&[3.0, 1.0, 2.0, 1.0, 0.5, 4.0]);
    assert_eq!(marks, vec![true, false, true, false, false, false]);
    assert!(peaks(&[1.0]).iter().all(|m| !m));
}
