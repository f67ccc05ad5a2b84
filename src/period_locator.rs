//! Zero crossing table and start/end cursor for selecting one wave period.
//!
//! The locator stores the positions of all rising zero crossings (the sample
//! where the signal goes from <= 0 to > 0) in an ascending table. The start
//! and end of the selected period are indices into that table, not sample
//! positions, so stepping to the neighbouring crossing is a plain increment
//! or decrement.
//!
//! The scan for crossings starts at the loudest sample of the recording. This
//! skips leading silence and the attack noise in front of it, which would
//! otherwise produce spurious crossings. If fewer than two crossings follow
//! the loudest sample, the whole recording is scanned instead.
//!
//! All cursor operations clamp to the table bounds and never fail. They are
//! driven by repeated user gestures that naturally run into the ends.

use super::Float;

use log::{debug, trace};

#[derive(Debug, Clone)]
pub struct PeriodLocator {
    sample_rate: u32,
    crossings: Vec<usize>,
    start_index: usize,
    end_index: usize,
}

impl PeriodLocator {
    /// Find all rising zero crossings after the sample `scan_from`.
    ///
    /// Falls back to scanning from the first sample if that leaves less than
    /// one full period.
    pub fn new(samples: &[Float], sample_rate: u32, scan_from: usize) -> Self {
        let mut crossings = find_crossings(samples, scan_from);
        if crossings.len() < 2 && scan_from > 0 {
            debug!("Only {} zero crossings after sample {}, scanning whole buffer",
                crossings.len(), scan_from);
            crossings = find_crossings(samples, 0);
        }
        debug!("Found {} zero crossings after sample {}", crossings.len(), scan_from);
        PeriodLocator{sample_rate, crossings, start_index: 0, end_index: 0}
    }

    pub fn crossings(&self) -> &[usize] {
        &self.crossings
    }

    pub fn num_crossings(&self) -> usize {
        self.crossings.len()
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn end_index(&self) -> usize {
        self.end_index
    }

    // Highest valid cursor position, 0 for an empty table.
    fn last_index(&self) -> usize {
        self.crossings.len().saturating_sub(1)
    }

    pub fn step_start_left(&mut self) {
        self.start_index = self.start_index.saturating_sub(1);
    }

    /// Move the start one crossing right, but never past the end.
    pub fn step_start_right(&mut self) {
        self.start_index = (self.start_index + 1).min(self.last_index()).min(self.end_index);
    }

    /// Move the end one crossing left, but never below the start.
    pub fn step_end_left(&mut self) {
        self.end_index = self.end_index.saturating_sub(1).max(self.start_index);
    }

    pub fn step_end_right(&mut self) {
        self.end_index = (self.end_index + 1).min(self.last_index());
    }

    /// Sample position of the start crossing, 0 if there are no crossings.
    pub fn current_start_sample(&self) -> usize {
        self.crossings.get(self.start_index).copied().unwrap_or(0)
    }

    /// Sample position of the end crossing, 0 if there are no crossings.
    pub fn current_end_sample(&self) -> usize {
        self.crossings.get(self.end_index.min(self.last_index())).copied().unwrap_or(0)
    }

    /// Expected number of samples in one period of the given frequency.
    ///
    /// Frequencies below 1 Hz count as 1 Hz.
    pub fn period_samples(&self, fundamental: Float) -> usize {
        (self.sample_rate as Float / fundamental.max(1.0)).floor() as usize
    }

    /// Lock the end to the crossing closest to one period after the start.
    ///
    /// Only crossings at or after the start are eligible. On equal distance
    /// the earlier crossing wins. Returns the resulting end sample, which is
    /// never before the start sample.
    pub fn locate_nearest_period_end(&mut self, fundamental: Float) -> usize {
        let period = self.period_samples(fundamental);
        let start = self.current_start_sample();
        let mut best: Option<(usize, usize)> = None;
        for (i, &c) in self.crossings.iter().enumerate() {
            if c < start {
                continue;
            }
            let distance = ((c - start) as i64 - period as i64).unsigned_abs() as usize;
            match best {
                Some((_, d)) if d <= distance => {}
                _ => best = Some((i, distance)),
            }
        }
        if let Some((index, distance)) = best {
            self.end_index = index.min(self.last_index()).max(self.start_index);
            trace!("Period of {} samples, end at crossing {} ({} samples off)",
                period, index, distance);
        }
        self.current_end_sample().max(self.current_start_sample())
    }
}

/// Positions of all rising zero crossings after `scan_from`.
///
/// Sample i is a crossing if sample i - 1 is <= 0 and sample i is > 0. The
/// scan treats `scan_from` as the first sample, so it is never a crossing
/// itself.
pub fn find_crossings(samples: &[Float], scan_from: usize) -> Vec<usize> {
    let first = scan_from + 1;
    if first >= samples.len() {
        return vec![];
    }
    (first..samples.len())
        .filter(|&i| samples[i - 1] <= 0.0 && samples[i] > 0.0)
        .collect()
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::signal;

#[cfg(test)]
fn square(period: usize, num_periods: usize) -> Vec<Float> {
    (0..period * num_periods)
        .map(|i| if i % period < period / 2 { -1.0 } else { 1.0 })
        .collect()
}

#[test]
fn rising_crossings_are_found() {
    let samples = vec![0.0, 1.0, -1.0, 0.0, 2.0, 3.0, -0.5, 0.5];
    assert_eq!(find_crossings(&samples, 0), vec![1, 4, 7]);
    assert_eq!(find_crossings(&samples, 2), vec![4, 7]);
    assert_eq!(find_crossings(&samples, 8), Vec::<usize>::new());
}

#[test]
fn cursor_starts_at_zero() {
    let locator = PeriodLocator::new(&square(10, 5), 1000, 0);
    assert_eq!(locator.crossings(), &[5, 15, 25, 35, 45]);
    assert_eq!(locator.start_index(), 0);
    assert_eq!(locator.end_index(), 0);
    assert_eq!(locator.current_start_sample(), 5);
    assert_eq!(locator.current_end_sample(), 5);
}

#[test]
fn start_left_clamps_at_zero() {
    let mut locator = PeriodLocator::new(&square(10, 5), 1000, 0);
    for _ in 0..5 {
        locator.step_start_left();
        assert_eq!(locator.start_index(), 0);
    }
}

#[test]
fn end_right_clamps_at_last_crossing() {
    let mut locator = PeriodLocator::new(&square(10, 5), 1000, 0);
    for _ in 0..10 {
        locator.step_end_right();
    }
    assert_eq!(locator.end_index(), 4);
    locator.step_end_right();
    assert_eq!(locator.end_index(), 4);
    assert_eq!(locator.current_end_sample(), 45);
}

#[test]
fn end_cannot_pass_start() {
    let mut locator = PeriodLocator::new(&square(10, 5), 1000, 0);
    locator.step_end_right();
    locator.step_end_right();
    locator.step_start_right();
    assert_eq!((locator.start_index(), locator.end_index()), (1, 2));
    locator.step_end_left();
    locator.step_end_left();
    locator.step_end_left();
    assert_eq!((locator.start_index(), locator.end_index()), (1, 1));
}

#[test]
fn start_cannot_pass_end() {
    let mut locator = PeriodLocator::new(&square(10, 5), 1000, 0);
    locator.step_end_right();
    locator.step_start_right();
    assert_eq!((locator.start_index(), locator.end_index()), (1, 1));
    // Stepping the start never moves the end
    locator.step_start_right();
    assert_eq!((locator.start_index(), locator.end_index()), (1, 1));
    for _ in 0..10 {
        locator.step_end_right();
    }
    for _ in 0..10 {
        locator.step_start_right();
    }
    assert_eq!((locator.start_index(), locator.end_index()), (4, 4));
}

#[test]
fn empty_table_is_handled() {
    let mut locator = PeriodLocator::new(&vec![0.0; 100], 1000, 0);
    locator.step_start_right();
    locator.step_end_right();
    locator.step_end_left();
    locator.step_start_left();
    assert_eq!(locator.num_crossings(), 0);
    assert_eq!(locator.current_start_sample(), 0);
    assert_eq!(locator.current_end_sample(), 0);
    assert_eq!(locator.locate_nearest_period_end(100.0), 0);
}

#[test]
fn period_samples_is_floored() {
    let locator = PeriodLocator::new(&[], 48000, 0);
    assert_eq!(locator.period_samples(440.0), 109);
    assert_eq!(locator.period_samples(0.0), 48000);
    assert_eq!(locator.period_samples(0.5), 48000);
}

#[test]
fn period_end_is_locked_on_sine() {
    let rate = 48000;
    let freq = 440.0;
    let sine = signal::sinusoid(4800, rate, freq, 0.0, 1.0);
    let mut locator = PeriodLocator::new(&sine, rate, 0);
    let start = locator.current_start_sample();
    let end = locator.locate_nearest_period_end(freq);
    let period = rate as Float / freq;
    assert!((end as Float - (start as Float + period)).abs() <= 1.0);
    assert_eq!(locator.end_index(), 1);

    // Works from a later start as well
    locator.step_end_right();
    locator.step_start_right();
    locator.step_start_right();
    let start = locator.current_start_sample();
    let end = locator.locate_nearest_period_end(freq);
    assert!((end as Float - (start as Float + period)).abs() <= 1.0);
    assert_eq!(locator.end_index(), 3);
}

#[test]
fn period_end_finds_multiple_periods() {
    // An octave too low, the expected period spans two signal periods
    let mut locator = PeriodLocator::new(&square(100, 10), 10000, 0);
    let end = locator.locate_nearest_period_end(50.0);
    assert_eq!(end, 250);
    assert_eq!(locator.end_index(), 2);
}

#[test]
fn late_peak_falls_back_to_whole_buffer() {
    let mut samples = square(10, 5);
    samples[48] = 5.0;
    let locator = PeriodLocator::new(&samples, 1000, 48);
    assert_eq!(locator.crossings(), &[5, 15, 25, 35, 45]);

    // Enough crossings after the peak, no fallback
    let locator = PeriodLocator::new(&samples, 1000, 20);
    assert_eq!(locator.crossings(), &[25, 35, 45]);
}

#[test]
fn period_end_never_before_start() {
    let mut locator = PeriodLocator::new(&square(100, 10), 10000, 0);
    locator.step_end_right();
    locator.step_end_right();
    locator.step_start_right();
    locator.step_start_right();
    assert_eq!(locator.start_index(), 2);
    let end = locator.locate_nearest_period_end(100000.0);
    assert_eq!(end, locator.current_start_sample());
    assert_eq!(locator.end_index(), locator.start_index());
}
