//! Equal-tempered frequency bank used as probe set for pitch estimation.
//!
//! Every entry is `reference * ratio^n` for an integer exponent n. With the
//! default range of -57 to 42 around A4 = 440 Hz the bank covers C0 to F#8,
//! one probe per semitone.

use super::Float;

pub const REFERENCE_FREQ: Float = 440.0;
pub const LOW_EXPONENT: i32 = -57;
pub const HIGH_EXPONENT: i32 = 42;

pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Ratio between two neighbouring semitones.
pub fn semitone() -> Float {
    (2.0 as Float).powf(1.0 / 12.0)
}

/// Generate the frequencies for all exponents in `[low_exp, high_exp]`.
///
/// ```
/// use wtmaker::tuning;
///
/// let freqs = tuning::generate(-1, 1, 440.0, tuning::semitone());
/// assert_eq!(freqs.len(), 3);
/// assert_eq!(freqs[1], 440.0);
/// ```
pub fn generate(low_exp: i32, high_exp: i32, reference: Float, ratio: Float) -> Vec<Float> {
    (low_exp..=high_exp).map(|n| reference * ratio.powi(n)).collect()
}

#[derive(Debug, Clone)]
pub struct FreqBank {
    reference: Float,
    ratio: Float,
    low_exp: i32,
    freqs: Vec<Float>,
}

impl FreqBank {
    pub fn new(low_exp: i32, high_exp: i32, reference: Float) -> Self {
        let ratio = semitone();
        let freqs = generate(low_exp, high_exp, reference, ratio);
        FreqBank{reference, ratio, low_exp, freqs}
    }

    pub fn freqs(&self) -> &[Float] {
        &self.freqs
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Offset of the nearest bank entry for the given frequency.
    ///
    /// Frequencies below the lowest entry map to 0. The result is not clamped
    /// at the top, callers indexing into the bank must check the length.
    pub fn note_index(&self, freq: Float) -> usize {
        if freq <= 0.0 {
            return 0;
        }
        let exponent = (freq / self.reference).ln() / self.ratio.ln();
        let exponent = exponent.max(self.low_exp as Float);
        (0.5 + exponent - self.low_exp as Float) as usize
    }

    /// Pitch class of the frequency, 0 = C with the default range.
    pub fn pitch_class(&self, freq: Float) -> usize {
        self.note_index(freq) % 12
    }

    pub fn octave(&self, freq: Float) -> usize {
        self.note_index(freq) / 12
    }

    pub fn freq_for(&self, octave: usize, class: usize) -> Option<Float> {
        self.freqs.get(octave * 12 + class).copied()
    }

    /// Printable note name like "A4" or "C#2".
    pub fn note_name(&self, freq: Float) -> String {
        format!("{}{}", NOTE_NAMES[self.pitch_class(freq)], self.octave(freq))
    }
}

impl Default for FreqBank {
    fn default() -> Self {
        FreqBank::new(LOW_EXPONENT, HIGH_EXPONENT, REFERENCE_FREQ)
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn bank_has_one_entry_per_exponent() {
    let freqs = generate(-5, 7, REFERENCE_FREQ, semitone());
    assert_eq!(freqs.len(), 13);
    for pair in freqs.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[test]
fn default_bank_covers_midi_range() {
    let bank = FreqBank::default();
    assert_eq!(bank.len(), 100);
    assert!((bank.freqs()[0] - 16.3516).abs() < 0.001);
    assert_eq!(bank.freqs()[57], 440.0);
}

#[test]
fn note_index_finds_nearest_semitone() {
    let bank = FreqBank::default();
    assert_eq!(bank.note_index(440.0), 57);
    assert_eq!(bank.note_index(445.0), 57);
    assert_eq!(bank.note_index(460.0), 58);
    assert_eq!(bank.note_index(1.0), 0);
    assert_eq!(bank.note_index(0.0), 0);
}

#[test]
fn note_names_are_derived_from_index() {
    let bank = FreqBank::default();
    assert_eq!(bank.note_name(440.0), "A4");
    assert_eq!(bank.note_name(261.63), "C4");
    assert_eq!(bank.note_name(116.54), "A#2");
    assert_eq!(bank.octave(55.0), 1);
    assert_eq!(bank.pitch_class(55.0), 9);
    assert_eq!(bank.freq_for(4, 9), Some(440.0));
    assert_eq!(bank.freq_for(20, 0), None);
}
