//! Mono sample buffers and synthetic test signals.

use super::Float;

use std::f64::consts::PI;

// Relative distance to the maximum below which a sample counts as peak.
// Periodic signals repeat their peak with rounding noise in every cycle.
const PEAK_TOLERANCE: Float = 1e-9;

/// A mono recording with its sample rate.
///
/// Never changed after construction. Multi-channel sources are mixed down
/// by the loader before a Waveform is created.
#[derive(Debug, Clone)]
pub struct Waveform {
    name: String,
    sample_rate: u32,
    samples: Vec<Float>,
}

impl Waveform {
    pub fn new(name: &str, sample_rate: u32, samples: Vec<Float>) -> Self {
        Waveform{name: name.to_string(), sample_rate, samples}
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[Float] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the first sample with the largest absolute value.
    ///
    /// Samples within a relative tolerance of the maximum count as equal, so
    /// a steady periodic signal peaks in its first cycle.
    pub fn peak_index(&self) -> usize {
        let max = self.samples.iter().fold(0.0, |m: Float, s| m.max(s.abs()));
        if max == 0.0 {
            return 0;
        }
        let threshold = max * (1.0 - PEAK_TOLERANCE);
        self.samples
            .iter()
            .position(|s| s.abs() >= threshold)
            .unwrap_or(0)
    }
}

/// Mix interleaved frames down to mono by summing all channels.
///
/// The sum is not divided by the channel count, amplitude is normalized
/// later when frames are extracted.
pub fn mix_down(interleaved: &[Float], num_channels: usize) -> Vec<Float> {
    if num_channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(num_channels)
        .map(|frame| frame.iter().sum())
        .collect()
}

/// Sine wave of `num_samples` samples.
///
/// Phase is given in degrees.
pub fn sinusoid(num_samples: usize, sample_rate: u32, freq: Float, phase: Float, amplitude: Float) -> Vec<Float> {
    let rate = sample_rate as Float;
    let theta = phase * PI / 180.0;
    (0..num_samples)
        .map(|i| amplitude * (2.0 * PI * freq * i as Float / rate + theta).sin())
        .collect()
}

/// Sum of sines at multiples of the fundamental, scaled so that the largest
/// absolute value equals `peak`.
///
/// `harmonics` holds (multiple, weight) pairs, 1 being the fundamental.
pub fn harmonic_signal(num_samples: usize, sample_rate: u32, fundamental: Float, peak: Float, harmonics: &[(Float, Float)]) -> Vec<Float> {
    let mut signal = vec![0.0; num_samples];
    for &(multiple, weight) in harmonics {
        let partial = sinusoid(num_samples, sample_rate, fundamental * multiple, 0.0, weight);
        for (s, p) in signal.iter_mut().zip(partial.iter()) {
            *s += p;
        }
    }
    let max = signal.iter().fold(0.0, |m: Float, s| m.max(s.abs()));
    if max > 0.0 {
        for s in signal.iter_mut() {
            *s *= peak / max;
        }
    }
    signal
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn channels_are_summed() {
    let stereo = vec![1.0, 2.0, -1.0, -0.5, 0.25, 0.25];
    assert_eq!(mix_down(&stereo, 2), vec![3.0, -1.5, 0.5]);
    assert_eq!(mix_down(&stereo, 1), stereo);
}

#[test]
fn peak_index_finds_first_maximum() {
    let wave = Waveform::new("test", 100, vec![0.0, 0.5, -1.0, 1.0, 0.2]);
    assert_eq!(wave.peak_index(), 2);
}

#[test]
fn repeated_peak_is_found_in_first_cycle() {
    // 20 cycles of 480 samples, the peak repeats with rounding noise
    let samples = harmonic_signal(9600, 48000, 100.0, 1.0, &[(1.0, 1.0), (3.0, 0.5)]);
    let wave = Waveform::new("cycles", 48000, samples);
    assert!(wave.peak_index() < 480);

    let wave = Waveform::new("silence", 48000, vec![0.0; 100]);
    assert_eq!(wave.peak_index(), 0);
}

#[test]
fn harmonic_signal_is_scaled_to_peak() {
    let signal = harmonic_signal(1000, 48000, 220.0, 0.8, &[(1.0, 10.0), (2.0, 10.0), (3.0, 1.0)]);
    let max = signal.iter().fold(0.0, |m: Float, s| m.max(s.abs()));
    assert!((max - 0.8).abs() < 1e-9);
}
