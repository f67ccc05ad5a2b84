use wtmaker::{Float, MakerConfig, Progress, RecordSummary, Result, WavHandler, WtFile, WtMaker, WtPaths};

use clap::{Parser, Subcommand};
use flexi_logger::{Logger, opt_format};
use log::{error, info};
use serde::Serialize;

use std::path::{Path, PathBuf};
use std::process;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "wtmaker", version, about = "Creates wavetables from recordings of single notes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze all .wav files in a directory and write <name>.wav and <name>.wt
    Create {
        input_dir: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// File stem of the written files
        #[arg(short, long)]
        name: String,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Move the cursor of a recording: name:start_delta:end_delta
        #[arg(long, value_parser = parse_adjustment)]
        adjust: Vec<Adjustment>,

        /// Override the estimated frequency of a recording: name:hz
        #[arg(long, value_parser = parse_freq)]
        freq: Vec<FreqOverride>,

        /// Number of harmonics to report per frame
        #[arg(long, default_value_t = 8)]
        harmonics: usize,
    },

    /// Analyze all .wav files in a directory and print the result
    Inspect {
        input_dir: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Convert a WAV file holding consecutive waves to WT
    Convert {
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Samples per wave
        #[arg(long, default_value_t = wtmaker::FRAME_SIZE)]
        wave_size: usize,
    },
}

#[derive(Clone, Debug)]
struct Adjustment {
    name: String,
    start_delta: i32,
    end_delta: i32,
}

#[derive(Clone, Debug)]
struct FreqOverride {
    name: String,
    freq: Float,
}

#[derive(Serialize)]
struct FrameReport {
    name: String,
    harmonics: Vec<Float>,
}

#[derive(Serialize)]
struct CreateReport {
    records: Vec<RecordSummary>,
    frames: Vec<FrameReport>,
    files: WtPaths,
}

// Names may contain ':', so the numbers are split off from the right.
fn parse_adjustment(arg: &str) -> std::result::Result<Adjustment, String> {
    let mut parts = arg.rsplitn(3, ':');
    let end = parts.next();
    let start = parts.next();
    let name = parts.next();
    match (name, start, end) {
        (Some(name), Some(start), Some(end)) => Ok(Adjustment{
            name: name.to_string(),
            start_delta: start.parse().map_err(|e| format!("Invalid start delta [{}]: {}", start, e))?,
            end_delta: end.parse().map_err(|e| format!("Invalid end delta [{}]: {}", end, e))?,
        }),
        _ => Err(format!("Expected name:start_delta:end_delta, got [{}]", arg)),
    }
}

fn parse_freq(arg: &str) -> std::result::Result<FreqOverride, String> {
    let (name, freq) = arg.rsplit_once(':')
        .ok_or_else(|| format!("Expected name:hz, got [{}]", arg))?;
    let freq: Float = freq.parse().map_err(|e| format!("Invalid frequency [{}]: {}", freq, e))?;
    if !(freq > 0.0) {
        return Err(format!("Frequency must be positive, got {}", freq));
    }
    Ok(FreqOverride{name: name.to_string(), freq})
}

fn load_config(path: Option<&Path>) -> Result<MakerConfig> {
    match path {
        Some(p) => MakerConfig::load(p),
        None => Ok(MakerConfig::default()),
    }
}

// Load and analyze a directory, printing progress to stderr.
fn analyze_dir(input_dir: &Path, config: MakerConfig) -> Result<WtMaker> {
    let mut maker = WtMaker::new(config)?;
    maker.load_dir(input_dir)?;

    let (tx, rx) = crossbeam::channel::unbounded::<Progress>();
    let printer = thread::spawn(move || {
        for p in rx.iter() {
            eprintln!("[{}/{}] {}: {:.2} Hz", p.done, p.total, p.name, p.fundamental);
        }
    });
    let result = maker.analyze(Some(&tx));
    drop(tx);
    if printer.join().is_err() {
        error!("Progress printer failed");
    }
    result?;
    Ok(maker)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Create{input_dir, output, name, config, adjust, freq, harmonics} => {
            let config = load_config(config.as_deref())?;
            let mut maker = analyze_dir(&input_dir, config)?;
            maker.check()?;
            for f in &freq {
                let summary = maker.set_fundamental(&f.name, f.freq)?;
                info!("[{}]: Frequency set to {} Hz, period {}..{}",
                    f.name, f.freq, summary.start_sample, summary.end_sample);
            }
            for a in &adjust {
                let summary = maker.adjust(&a.name, a.start_delta, a.end_delta)?;
                info!("[{}]: Cursor at {}..{}, period {}..{}",
                    a.name, summary.start_index, summary.end_index, summary.start_sample, summary.end_sample);
            }
            let wt = maker.assemble()?;
            let frames = wt.names()
                .iter()
                .zip(wt.harmonic_profile(harmonics))
                .map(|(name, harmonics)| FrameReport{name: name.clone(), harmonics})
                .collect();
            let files = maker.create(&output, &name)?;
            let report = CreateReport{records: maker.report(), frames, files};
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Inspect{input_dir, config} => {
            let config = load_config(config.as_deref())?;
            let maker = analyze_dir(&input_dir, config)?;
            println!("{}", serde_json::to_string_pretty(&maker.report())?);
        }
        Command::Convert{input, output, wave_size} => {
            let wav = WavHandler::read_file(&input)?;
            let wt = WtFile::convert_wav(&wav, wave_size)?;
            wt.write_file(&output)?;
            println!("{}: {} waves of {} samples", output.display(), wt.wave_count, wt.wave_size);
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = Logger::with_env_or_str("wtmaker=info")
                            .format(opt_format)
                            .start() {
        eprintln!("Unable to start logger: {}", e);
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
