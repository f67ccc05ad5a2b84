//! Drives a batch of recordings from loading to the written wavetable.
//!
//! Holds the analysis records of all loaded recordings and the analysis
//! context they share. Clients load recordings, run the analysis, optionally
//! correct the result per recording and finally write the wavetable.

use super::{Float, Result, WtError};
use super::MakerConfig;
use super::analysis::{AnalysisContext, AnalysisRecord, Progress, RecordSummary};
use super::signal::Waveform;
use super::wav_data::{WavData, WavDataType};
use super::wav_handler::WavHandler;
use super::wavetable::Wavetable;
use super::wt_file::WtFile;

use crossbeam::channel::Sender;
use log::{info, warn};
use serde::Serialize;

use std::fs;
use std::path::{Path, PathBuf};

/// Paths of the files written by [`WtMaker::create`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WtPaths {
    pub wav: Option<PathBuf>,
    pub wt: Option<PathBuf>,
}

pub struct WtMaker {
    config: MakerConfig,
    context: AnalysisContext,
    records: Vec<AnalysisRecord>,
}

impl WtMaker {
    /// Generate a new WtMaker instance.
    ///
    /// Fails if the configuration is invalid.
    ///
    /// ```
    /// use wtmaker::{MakerConfig, WtMaker};
    ///
    /// let maker = WtMaker::new(MakerConfig::default()).unwrap();
    /// assert!(maker.records().is_empty());
    /// ```
    pub fn new(config: MakerConfig) -> Result<WtMaker> {
        config.validate()?;
        let context = AnalysisContext::new(&config);
        Ok(WtMaker{config, context, records: vec![]})
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    /// Read a WAV file as mono waveform named after the file stem.
    pub fn load_waveform<P: AsRef<Path>>(path: P) -> Result<Waveform> {
        let path = path.as_ref();
        let wav = WavHandler::read_file(path)?;
        let name = path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("[{}]: {} channels, {} Hz, {} frames", name,
            wav.get_fmt().get_num_channels(), wav.get_sample_rate(), wav.get_num_frames());
        Ok(Waveform::new(&name, wav.get_sample_rate(), wav.get_mono_samples()))
    }

    /// Load all .wav files of a directory, sorted by filename.
    ///
    /// Returns the number of files loaded.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        info!("Loading recordings from [{}]", dir.display());
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_wav(p))
            .collect();
        paths.sort();
        for p in &paths {
            self.add_waveform(WtMaker::load_waveform(p)?);
        }
        Ok(paths.len())
    }

    pub fn add_waveform(&mut self, waveform: Waveform) {
        self.records.push(AnalysisRecord::new(waveform));
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    /// Find the record loaded from the recording with the given name.
    pub fn record_mut(&mut self, name: &str) -> Result<&mut AnalysisRecord> {
        find_record(&mut self.records, name)
    }

    /// Estimate the fundamental of all records and lock their periods.
    pub fn analyze(&mut self, progress: Option<&Sender<Progress>>) -> Result<()> {
        self.context.analyze(&mut self.records, progress)
    }

    /// Fail on the first record no frame can be extracted from.
    ///
    /// The crossing table never changes after loading, so this holds for
    /// every later cursor adjustment as well.
    pub fn check(&self) -> Result<()> {
        self.records.iter().try_for_each(|r| r.check_crossings())
    }

    /// Replace the fundamental of a record and lock its period to it.
    pub fn set_fundamental(&mut self, name: &str, freq: Float) -> Result<RecordSummary> {
        let record = find_record(&mut self.records, name)?;
        record.set_fundamental(freq);
        let summary = record.summary(self.context.bank());
        Ok(summary)
    }

    /// Move the start and end cursor of a record by the given number of
    /// crossings. Negative values move left.
    ///
    /// The start is moved first.
    pub fn adjust(&mut self, name: &str, start_delta: i32, end_delta: i32) -> Result<RecordSummary> {
        let record = find_record(&mut self.records, name)?;
        let locator = record.locator_mut();
        for _ in 0..start_delta.unsigned_abs() {
            if start_delta > 0 {
                locator.step_start_right();
            } else {
                locator.step_start_left();
            }
        }
        for _ in 0..end_delta.unsigned_abs() {
            if end_delta > 0 {
                locator.step_end_right();
            } else {
                locator.step_end_left();
            }
        }
        let summary = record.summary(self.context.bank());
        Ok(summary)
    }

    /// Current state of all records.
    pub fn report(&self) -> Vec<RecordSummary> {
        let bank = self.context.bank();
        self.records.iter().map(|r| r.summary(bank)).collect()
    }

    /// Build the wavetable from the current period selections.
    pub fn assemble(&self) -> Result<Wavetable> {
        AnalysisContext::check_sample_rates(&self.records)?;
        Wavetable::assemble(&self.records, self.config.frame_size, self.config.peak)
    }

    /// Write `<stem>.wav` and `<stem>.wt` into the output directory.
    ///
    /// Both files are encoded completely before the first file is opened. If
    /// any record fails validation, no file is written. The files are written
    /// under temporary names and only renamed once both writes succeeded.
    pub fn create<P: AsRef<Path>>(&self, out_dir: P, stem: &str) -> Result<WtPaths> {
        let wt = self.assemble()?;
        let wav_bytes = if self.config.write_wav {
            let data = WavData::new_from_data(WavDataType::PCM16(wt.to_pcm16()), self.config.output_sample_rate);
            Some(WavHandler::encode(&data))
        } else {
            None
        };
        let wt_bytes = if self.config.write_wt {
            Some(WtFile::from_wavetable(&wt)?.encode())
        } else {
            None
        };
        if wav_bytes.is_none() && wt_bytes.is_none() {
            warn!("Neither WAV nor WT output enabled, nothing written");
        }

        let out_dir = out_dir.as_ref();
        fs::create_dir_all(out_dir)?;
        let mut paths = WtPaths::default();
        let mut outputs = vec![];
        if let Some(bytes) = wav_bytes {
            let path = out_dir.join(format!("{}.wav", stem));
            outputs.push((path.clone(), bytes));
            paths.wav = Some(path);
        }
        if let Some(bytes) = wt_bytes {
            let path = out_dir.join(format!("{}.wt", stem));
            outputs.push((path.clone(), bytes));
            paths.wt = Some(path);
        }
        write_all(&outputs)?;
        info!("Wavetable [{}] written, {} frames", stem, wt.wave_count);
        Ok(paths)
    }
}

fn find_record<'a>(records: &'a mut [AnalysisRecord], name: &str) -> Result<&'a mut AnalysisRecord> {
    records
        .iter_mut()
        .find(|r| r.name() == name)
        .ok_or_else(|| WtError::UnknownRecord(name.to_string()))
}

// Write every file under a temporary name first and rename them once all
// writes succeeded. On failure every file written so far is removed.
fn write_all(outputs: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut created: Vec<PathBuf> = vec![];
    let result = write_and_rename(outputs, &mut created);
    if result.is_err() {
        for path in &created {
            if let Err(e) = fs::remove_file(path) {
                warn!("Unable to remove [{}]: {}", path.display(), e);
            }
        }
    }
    result
}

fn write_and_rename(outputs: &[(PathBuf, Vec<u8>)], created: &mut Vec<PathBuf>) -> Result<()> {
    let mut temp_paths = vec![];
    for (path, bytes) in outputs {
        let temp = temp_path(path);
        info!("Writing [{}]", path.display());
        fs::write(&temp, bytes)?;
        created.push(temp.clone());
        temp_paths.push(temp);
    }
    for ((path, _), temp) in outputs.iter().zip(&temp_paths) {
        fs::rename(temp, path)?;
        created.retain(|p| p != temp);
        created.push(path.clone());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::signal;

#[cfg(test)]
fn sine(name: &str, rate: u32, freq: Float) -> Waveform {
    Waveform::new(name, rate, signal::sinusoid(8192, rate, freq, 0.0, 0.5))
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = MakerConfig::default();
    config.frame_size = 0;
    assert!(matches!(WtMaker::new(config), Err(WtError::Config(_))));
}

#[test]
fn records_are_found_by_name() {
    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    maker.add_waveform(sine("a", 48000, 440.0));
    assert!(maker.record_mut("a").is_ok());
    assert!(matches!(maker.record_mut("b"), Err(WtError::UnknownRecord(ref n)) if n == "b"));
    assert!(matches!(maker.adjust("b", 1, 1), Err(WtError::UnknownRecord(_))));
}

#[test]
fn cursor_can_be_adjusted() {
    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    maker.add_waveform(sine("a", 48000, 440.0));
    maker.analyze(None).unwrap();
    assert_eq!(maker.report()[0].end_index, 1);
    // The start stops at the end
    let summary = maker.adjust("a", 2, 0).unwrap();
    assert_eq!(summary.start_index, 1);
    assert_eq!(summary.end_index, 1);
    let summary = maker.adjust("a", -1, 3).unwrap();
    assert_eq!(summary.start_index, 0);
    assert_eq!(summary.end_index, 4);
    // The end is moved after the start
    let summary = maker.adjust("a", 2, 1).unwrap();
    assert_eq!(summary.start_index, 2);
    assert_eq!(summary.end_index, 5);
}

#[test]
fn frequency_can_be_overridden() {
    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    maker.add_waveform(sine("a", 48000, 440.0));
    maker.analyze(None).unwrap();
    let summary = maker.set_fundamental("a", 220.0).unwrap();
    assert_eq!(summary.fundamental, 220.0);
    assert_eq!(summary.end_index, 2);
    assert_eq!(summary.note, "A3");
}

#[test]
fn files_are_loaded_sorted_by_name() {
    let dir = tempfile::tempdir().unwrap();
    for (name, freq) in &[("b.wav", 440.0), ("a.WAV", 220.0)] {
        let samples: Vec<i16> = signal::sinusoid(4096, 44100, *freq, 0.0, 16000.0)
            .iter().map(|s| *s as i16).collect();
        let data = WavData::new_from_data(WavDataType::PCM16(samples), 44100);
        WavHandler::write_file(&data, dir.path().join(name)).unwrap();
    }
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    assert_eq!(maker.load_dir(dir.path()).unwrap(), 2);
    let names: Vec<&str> = maker.records().iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(maker.records()[0].waveform().sample_rate(), 44100);
}

#[test]
fn failed_write_leaves_no_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    // A directory in the way makes writing the WT file fail
    fs::create_dir(dir.path().join("table.wt.tmp")).unwrap();
    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    maker.add_waveform(sine("a", 48000, 440.0));
    maker.analyze(None).unwrap();
    assert!(matches!(maker.create(dir.path(), "table"), Err(WtError::Io(_))));
    assert!(!dir.path().join("table.wav").exists());
    assert!(!dir.path().join("table.wav.tmp").exists());
}

#[test]
fn outputs_are_written_under_final_names() {
    let dir = tempfile::tempdir().unwrap();
    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    maker.add_waveform(sine("a", 48000, 440.0));
    maker.analyze(None).unwrap();
    let paths = maker.create(dir.path(), "table").unwrap();
    assert_eq!(paths.wav, Some(dir.path().join("table.wav")));
    assert_eq!(paths.wt, Some(dir.path().join("table.wt")));
    let mut names: Vec<String> = fs::read_dir(dir.path()).unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["table.wav", "table.wt"]);
}

#[test]
fn nothing_is_written_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    maker.add_waveform(sine("a", 48000, 440.0));
    maker.add_waveform(Waveform::new("silent", 48000, vec![0.0; 8192]));
    maker.analyze(None).unwrap();
    assert!(matches!(maker.check(), Err(WtError::DegenerateSignal{ref name, ..}) if name == "silent"));
    assert!(maker.report()[1].error.is_some());
    assert!(matches!(maker.create(&out, "table"), Err(WtError::DegenerateSignal{..})));
    assert!(!out.exists());
}
