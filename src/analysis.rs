//! Per-recording analysis state and the shared batch context.
//!
//! Every loaded recording gets an AnalysisRecord holding the waveform, the
//! estimated fundamental and the period cursor. The AnalysisContext owns the
//! probe frequencies and the probe matrix shared by all records of a batch.
//! It only rebuilds the matrix when the sample count or rate changes.
//!
//! Pitch estimation of the records is independent, so it is spread over a
//! scoped thread pool. The matrix is only read from the workers.

use super::{Float, Result, WtError};
use super::MakerConfig;
use super::period_locator::PeriodLocator;
use super::signal::Waveform;
use super::spectral::ProbeMatrix;
use super::tuning::FreqBank;

use crossbeam::channel::Sender;
use log::{debug, info, warn};
use scoped_threadpool::Pool;
use serde::Serialize;

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    waveform: Waveform,
    fundamental: Float, // 0.0 until estimated
    locator: PeriodLocator,
}

/// Observable state of a record, as shown to the user.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordSummary {
    pub name: String,
    pub sample_rate: u32,
    pub num_samples: usize,
    pub fundamental: Float,
    pub note: String,
    pub num_crossings: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub start_sample: usize,
    pub end_sample: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>, // Why no frame can be extracted
}

/// Sent once for every record that finished pitch estimation.
#[derive(Clone, Debug, PartialEq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub name: String,
    pub fundamental: Float,
}

impl AnalysisRecord {
    pub fn new(waveform: Waveform) -> Self {
        let locator = PeriodLocator::new(waveform.samples(), waveform.sample_rate(), waveform.peak_index());
        AnalysisRecord{waveform, fundamental: 0.0, locator}
    }

    pub fn name(&self) -> &str {
        self.waveform.name()
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn fundamental(&self) -> Float {
        self.fundamental
    }

    pub fn locator(&self) -> &PeriodLocator {
        &self.locator
    }

    /// Mutable access to the cursor for manual adjustments.
    pub fn locator_mut(&mut self) -> &mut PeriodLocator {
        &mut self.locator
    }

    /// Estimate the fundamental and lock the period end to it.
    pub fn estimate(&mut self, matrix: &ProbeMatrix) -> Float {
        let freq = matrix.estimate_fundamental(self.waveform.samples());
        self.set_fundamental(freq);
        freq
    }

    /// Replace the fundamental and lock the period end to the new value.
    pub fn set_fundamental(&mut self, freq: Float) {
        self.fundamental = freq;
        let end = self.locator.locate_nearest_period_end(freq);
        debug!("[{}]: {} Hz, period {}..{}", self.name(), freq,
            self.locator.current_start_sample(), end);
    }

    /// Fails if fewer than two crossings were found.
    pub fn check_crossings(&self) -> Result<()> {
        let crossings = self.locator.num_crossings();
        if crossings < 2 {
            return Err(WtError::DegenerateSignal{name: self.name().to_string(), crossings});
        }
        Ok(())
    }

    pub fn summary(&self, bank: &FreqBank) -> RecordSummary {
        RecordSummary{
            name: self.name().to_string(),
            sample_rate: self.waveform.sample_rate(),
            num_samples: self.waveform.len(),
            fundamental: self.fundamental,
            note: bank.note_name(self.fundamental),
            num_crossings: self.locator.num_crossings(),
            start_index: self.locator.start_index(),
            end_index: self.locator.end_index(),
            start_sample: self.locator.current_start_sample(),
            end_sample: self.locator.current_end_sample(),
            error: self.check_crossings().err().map(|e| e.to_string()),
        }
    }
}

pub struct AnalysisContext {
    bank: FreqBank,
    matrix: Option<ProbeMatrix>,
    max_probe_samples: usize,
    num_threads: u32,
}

impl AnalysisContext {
    pub fn new(config: &MakerConfig) -> Self {
        let bank = FreqBank::new(config.low_exponent, config.high_exponent, config.reference_freq);
        AnalysisContext{
            bank,
            matrix: None,
            max_probe_samples: config.max_probe_samples,
            num_threads: config.num_threads.max(1),
        }
    }

    pub fn bank(&self) -> &FreqBank {
        &self.bank
    }

    pub fn matrix(&self) -> Option<&ProbeMatrix> {
        self.matrix.as_ref()
    }

    /// Return the common sample rate of all records.
    pub fn check_sample_rates(records: &[AnalysisRecord]) -> Result<u32> {
        let first = records.first().ok_or(WtError::EmptyBatch)?;
        let expected = first.waveform().sample_rate();
        for r in records.iter().skip(1) {
            let found = r.waveform().sample_rate();
            if found != expected {
                return Err(WtError::SampleRateMismatch{name: r.name().to_string(), expected, found});
            }
        }
        Ok(expected)
    }

    /// Get a probe matrix for the given dimensions, reusing the cached one
    /// if it matches.
    pub fn prepare(&mut self, num_samples: usize, sample_rate: u32) -> &ProbeMatrix {
        if let Some(m) = &self.matrix {
            if !m.matches(num_samples, sample_rate) {
                self.matrix = None;
            }
        }
        let bank = &self.bank;
        self.matrix.get_or_insert_with(|| {
            info!("Creating probe matrix for {} samples at {} Hz", num_samples, sample_rate);
            ProbeMatrix::new(num_samples, sample_rate, bank.freqs())
        })
    }

    /// Estimate the fundamental of every record and lock its period.
    ///
    /// Fails without touching any record if the batch is empty or the sample
    /// rates differ. Progress is reported on the optional channel.
    pub fn analyze(&mut self, records: &mut [AnalysisRecord], progress: Option<&Sender<Progress>>) -> Result<()> {
        let sample_rate = AnalysisContext::check_sample_rates(records)?;
        let longest = records.iter().map(|r| r.waveform().len()).max().unwrap_or(0);
        let num_samples = longest.min(self.max_probe_samples);
        let num_threads = self.num_threads;
        let total = records.len();
        let matrix = self.prepare(num_samples, sample_rate);
        let done = AtomicUsize::new(0);

        info!("Analyzing {} recordings with {} threads", total, num_threads);
        let mut pool = Pool::new(num_threads);
        pool.scoped(|scope| {
            for record in records.iter_mut() {
                let done = &done;
                let progress = progress.cloned();
                scope.execute(move || {
                    let fundamental = record.estimate(matrix);
                    let done = done.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(tx) = progress {
                        // Nobody listening is not an error
                        let _ = tx.send(Progress{done, total, name: record.name().to_string(), fundamental});
                    }
                });
            }
        });

        for r in records.iter() {
            if let Err(e) = r.check_crossings() {
                warn!("{}", e);
            }
        }
        Ok(())
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::signal;

#[cfg(test)]
fn sine_record(name: &str, rate: u32, freq: Float, len: usize) -> AnalysisRecord {
    AnalysisRecord::new(Waveform::new(name, rate, signal::sinusoid(len, rate, freq, 0.0, 1.0)))
}

#[test]
fn new_record_is_not_estimated() {
    let record = sine_record("a", 48000, 440.0, 4800);
    assert_eq!(record.fundamental(), 0.0);
    assert_eq!(record.locator().start_index(), 0);
    assert_eq!(record.locator().end_index(), 0);
    assert!(record.locator().num_crossings() > 2);
}

#[test]
fn crossings_start_after_peak() {
    let mut samples = signal::sinusoid(1000, 1000, 10.0, 10.0, 0.5);
    samples[500] = 2.0;
    let record = AnalysisRecord::new(Waveform::new("peak", 1000, samples));
    assert!(record.locator().crossings().iter().all(|&c| c > 500));
    assert_eq!(record.locator().current_start_sample(), 598);
}

#[test]
fn steady_note_keeps_its_crossings() {
    // The rounded peak of this signal repeats in all 20 cycles
    let samples = signal::harmonic_signal(9600, 48000, 100.0, 1.0, &[(1.0, 1.0), (3.0, 0.5)]);
    let mut record = AnalysisRecord::new(Waveform::new("steady", 48000, samples));
    assert!(record.locator().num_crossings() >= 19);
    assert!(record.check_crossings().is_ok());
    record.set_fundamental(100.0);
    let length = record.locator().current_end_sample() - record.locator().current_start_sample();
    assert!((length as i64 - 480).abs() <= 1);
}

#[test]
fn batch_is_analyzed() {
    let config = MakerConfig::default();
    let mut context = AnalysisContext::new(&config);
    let mut records = vec![
        sine_record("a", 48000, 220.0, 8192),
        sine_record("b", 48000, 440.0, 8192),
        sine_record("c", 48000, 880.0, 8192),
    ];
    let (tx, rx) = crossbeam::channel::unbounded();
    context.analyze(&mut records, Some(&tx)).unwrap();
    drop(tx);
    assert!((records[0].fundamental() - 220.0).abs() < 1e-9);
    assert!((records[1].fundamental() - 440.0).abs() < 1e-9);
    assert!((records[2].fundamental() - 880.0).abs() < 1e-9);

    let mut reports: Vec<Progress> = rx.iter().collect();
    assert_eq!(reports.len(), 3);
    reports.sort_by_key(|p| p.done);
    assert_eq!(reports.iter().map(|p| p.done).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(reports.iter().all(|p| p.total == 3));

    // Period end is locked after estimation
    for r in &records {
        let period = 48000.0 / r.fundamental();
        let length = (r.locator().current_end_sample() - r.locator().current_start_sample()) as Float;
        assert!((length - period).abs() <= 1.0);
    }
}

#[test]
fn matrix_is_reused_for_same_dimensions() {
    let mut config = MakerConfig::default();
    config.max_probe_samples = 1024;
    let mut context = AnalysisContext::new(&config);
    let mut records = vec![sine_record("a", 44100, 440.0, 4096)];
    context.analyze(&mut records, None).unwrap();
    let first = context.matrix().map(|m| m as *const ProbeMatrix);
    context.analyze(&mut records, None).unwrap();
    let second = context.matrix().map(|m| m as *const ProbeMatrix);
    assert_eq!(first, second);
    assert_eq!(context.matrix().unwrap().num_samples(), 1024);

    let mut records = vec![sine_record("b", 48000, 440.0, 4096)];
    context.analyze(&mut records, None).unwrap();
    assert_eq!(context.matrix().unwrap().sample_rate(), 48000);
}

#[test]
fn mixed_sample_rates_are_rejected() {
    let mut context = AnalysisContext::new(&MakerConfig::default());
    let mut records = vec![
        sine_record("a", 44100, 440.0, 4096),
        sine_record("b", 48000, 440.0, 4096),
    ];
    let result = context.analyze(&mut records, None);
    assert!(matches!(result, Err(WtError::SampleRateMismatch{expected: 44100, found: 48000, ..})));
    assert!(context.matrix().is_none());
    assert_eq!(records[0].fundamental(), 0.0);
}

#[test]
fn empty_batch_is_rejected() {
    let mut context = AnalysisContext::new(&MakerConfig::default());
    assert!(matches!(context.analyze(&mut [], None), Err(WtError::EmptyBatch)));
}

#[test]
fn manual_frequency_relocks_period() {
    let mut record = sine_record("a", 48000, 440.0, 4800);
    record.set_fundamental(220.0);
    assert_eq!(record.locator().end_index(), 2);
    record.set_fundamental(440.0);
    assert_eq!(record.locator().end_index(), 1);
}

#[test]
fn silence_is_degenerate() {
    let record = AnalysisRecord::new(Waveform::new("quiet", 44100, vec![0.0; 1000]));
    assert!(matches!(record.check_crossings(), Err(WtError::DegenerateSignal{crossings: 0, ..})));
    let summary = record.summary(&FreqBank::default());
    assert_eq!(summary.num_crossings, 0);
    assert_eq!(summary.start_sample, 0);
    assert!(summary.error.unwrap().contains("0 zero crossings"));

    let summary = sine_record("a", 48000, 440.0, 4800).summary(&FreqBank::default());
    assert_eq!(summary.error, None);
}
