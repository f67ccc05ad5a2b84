use wtmaker::{
    harmonic_signal, MakerConfig, WavData, WavDataType, WavHandler, WtError, WtFile, WtMaker,
};

use std::path::Path;

fn write_note(dir: &Path, name: &str, rate: u32, freq: f64, harmonics: &[(f64, f64)]) {
    let samples: Vec<i16> = harmonic_signal(16384, rate, freq, 20000.0, harmonics)
        .iter()
        .map(|s| *s as i16)
        .collect();
    let data = WavData::new_from_data(WavDataType::PCM16(samples), rate);
    WavHandler::write_file(&data, dir.join(format!("{}.wav", name))).unwrap();
}

#[test]
fn three_notes_make_three_frames() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    // Names sort opposite to the frequencies
    write_note(input.path(), "a_880", 44100, 880.0, &[(1.0, 1.0), (2.0, 0.3)]);
    write_note(input.path(), "b_440", 44100, 440.0, &[(1.0, 1.0)]);
    write_note(input.path(), "c_220", 44100, 220.0, &[(1.0, 1.0), (3.0, 0.5)]);

    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    assert_eq!(maker.load_dir(input.path()).unwrap(), 3);
    maker.analyze(None).unwrap();

    let report = maker.report();
    for (summary, freq) in report.iter().zip(&[880.0, 440.0, 220.0]) {
        assert!((summary.fundamental - freq).abs() < 1e-9);
    }
    let notes: Vec<&str> = report.iter().map(|r| r.note.as_str()).collect();
    assert_eq!(notes, vec!["A5", "A4", "A3"]);
    assert!(report.iter().all(|r| r.end_sample > r.start_sample));

    let wt = maker.assemble().unwrap();
    assert_eq!(wt.names(), &["c_220", "b_440", "a_880"]);
    let profile = wt.harmonic_profile(4);
    assert!((profile[0][2] - 0.5).abs() < 0.05); // Third harmonic of the 220 Hz note
    assert!((profile[2][1] - 0.3).abs() < 0.05); // Second harmonic of the 880 Hz note

    let paths = maker.create(output.path(), "table").unwrap();
    let wt_path = paths.wt.unwrap();
    let wav_path = paths.wav.unwrap();
    assert_eq!(wt_path, output.path().join("table.wt"));
    assert_eq!(wav_path, output.path().join("table.wav"));

    let wt_file = WtFile::read_file(&wt_path).unwrap();
    assert_eq!(wt_file.wave_size, 2048);
    assert_eq!(wt_file.wave_count, 3);

    let wav = WavHandler::read_file(&wav_path).unwrap();
    assert_eq!(wav.get_sample_rate(), 44100);
    assert_eq!(wav.get_fmt().get_num_channels(), 1);
    assert_eq!(wav.get_num_samples(), 3 * 2048);
    if let WavDataType::PCM16(samples) = wav.get_samples() {
        assert_eq!(samples, &wt.to_pcm16());
    } else {
        panic!("Expected 16 bit samples, found {}", wav.get_samples().get_type());
    }

    // The WT payload is what the written WAV reads back as
    let converted = WtFile::convert_wav(&wav, 2048).unwrap();
    assert_eq!(converted, wt_file);
}

#[test]
fn mismatched_rates_write_nothing() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("tables");
    write_note(input.path(), "a", 44100, 440.0, &[(1.0, 1.0)]);
    write_note(input.path(), "b", 48000, 440.0, &[(1.0, 1.0)]);

    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    maker.load_dir(input.path()).unwrap();
    let result = maker.analyze(None);
    assert!(matches!(result, Err(WtError::SampleRateMismatch{expected: 44100, found: 48000, ..})));

    let result = maker.create(&out_dir, "table");
    assert!(matches!(result, Err(WtError::SampleRateMismatch{..})));
    assert!(!out_dir.exists());
}

#[test]
fn empty_directory_is_rejected() {
    let input = tempfile::tempdir().unwrap();
    let mut maker = WtMaker::new(MakerConfig::default()).unwrap();
    assert_eq!(maker.load_dir(input.path()).unwrap(), 0);
    assert!(matches!(maker.analyze(None), Err(WtError::EmptyBatch)));
}

#[test]
fn output_can_be_limited_to_wt() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_note(input.path(), "a", 48000, 440.0, &[(1.0, 1.0)]);

    let mut config = MakerConfig::default();
    config.write_wav = false;
    config.frame_size = 256;
    let mut maker = WtMaker::new(config).unwrap();
    maker.load_dir(input.path()).unwrap();
    maker.analyze(None).unwrap();
    let paths = maker.create(output.path(), "single").unwrap();
    assert!(paths.wav.is_none());
    assert!(!output.path().join("single.wav").exists());
    let wt_file = WtFile::read_file(paths.wt.unwrap()).unwrap();
    assert_eq!((wt_file.wave_size, wt_file.wave_count), (256, 1));
}
