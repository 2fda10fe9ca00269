//! Command-line interface for the SampleRNN data pipeline and generator.
//!
//! The CLI wraps the library to split and inspect training data, fit the
//! baseline symbol-prior model, generate audio from a checkpoint, and convert
//! audio files.

use anyhow::Result;
use burn_ndarray::{NdArray, NdArrayDevice};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use samplernn::audio::io::WavIo;
use samplernn::audio::resample::AudioResampler;
use samplernn::config::{
    load_config, DatasetOptions, GenerationConfig, DEFAULT_AUDIO_PATTERN, DEFAULT_DURATION_SECS,
    DEFAULT_NUM_SEQS, DEFAULT_SAMPLE_RATE, DEFAULT_TEMPERATURE,
};
use samplernn::dataset::{build_dataset, split_files};
use samplernn::model::{fit_symbol_prior, save_symbol_prior, SymbolPriorModel};
use samplernn::perf;
use samplernn::GenerationDriver;
use std::path::PathBuf;

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "samplernn")]
#[command(about = "SampleRNN dataset pipeline and audio generator", long_about = None)]
struct Cli {
    /// Print performance summary at the end of the run.
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Partition a data directory into training and validation files.
    Split {
        /// Directory searched recursively for audio files.
        data_dir: PathBuf,
        /// fnmatch-style file-name pattern.
        #[arg(long, default_value = DEFAULT_AUDIO_PATTERN)]
        pattern: String,
        /// Share of files held out for validation.
        #[arg(long, default_value_t = 0.1)]
        validation_fraction: f64,
        /// Seed for the shuffle.
        #[arg(long)]
        rng_seed: Option<u64>,
        /// Write the split as JSON instead of printing it.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Stream training windows and report how many a configuration yields.
    Windows(DatasetArgs),
    /// Fit the baseline symbol-prior model and write a checkpoint.
    FitPrior {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Directory receiving `model.ckpt-{epochs}.safetensors`.
        #[arg(long, alias = "logdir")]
        output_dir: PathBuf,
    },
    /// Generate audio from a trained checkpoint.
    Generate(GenerateArgs),
    /// Audio utility subcommands.
    Audio {
        /// Audio subcommand to execute.
        #[command(subcommand)]
        command: AudioCommands,
    },
}

/// Options shared by commands that read the training set.
#[derive(clap::Args, Debug, Clone)]
struct DatasetArgs {
    /// Directory searched recursively for audio files.
    data_dir: PathBuf,
    /// Path to the JSON config for the model.
    #[arg(long, alias = "config_file")]
    config_file: PathBuf,
    /// Sequences per batch.
    #[arg(long, alias = "batch_size", default_value_t = 1, value_parser = parse_positive)]
    batch_size: usize,
    /// Passes over the data.
    #[arg(long, alias = "num_epochs", default_value_t = 1, value_parser = parse_positive)]
    num_epochs: usize,
    /// Drop the final under-full batch of each run.
    #[arg(long)]
    drop_remainder: bool,
    /// fnmatch-style file-name pattern.
    #[arg(long, default_value = DEFAULT_AUDIO_PATTERN)]
    pattern: String,
    /// Resample decoded audio to this rate.
    #[arg(long, alias = "sample_rate", value_parser = parse_positive)]
    sample_rate: Option<usize>,
    /// Seed for the per-epoch shuffle.
    #[arg(long)]
    rng_seed: Option<u64>,
}

/// Options of the `generate` command.
#[derive(clap::Args, Debug, Clone)]
struct GenerateArgs {
    /// Path to the generated .wav file.
    #[arg(long, alias = "output_path")]
    output_path: PathBuf,
    /// Path to a saved checkpoint for the model.
    #[arg(long, alias = "checkpoint_path")]
    checkpoint_path: PathBuf,
    /// Path to the JSON config for the model.
    #[arg(long, alias = "config_file")]
    config_file: PathBuf,
    /// Duration of generated audio in seconds.
    #[arg(long, default_value_t = DEFAULT_DURATION_SECS, value_parser = parse_positive)]
    dur: usize,
    /// Number of audio sequences to generate.
    #[arg(
        long,
        alias = "num_seqs",
        default_value_t = DEFAULT_NUM_SEQS,
        value_parser = parse_positive
    )]
    num_seqs: usize,
    /// Sample rate of the generated audio.
    #[arg(
        long,
        alias = "sample_rate",
        default_value_t = DEFAULT_SAMPLE_RATE as usize,
        value_parser = parse_positive
    )]
    sample_rate: usize,
    /// Sampling temperature per sequence: a number or `([x...], [y...])`.
    #[arg(long, num_args = 1.., default_value = DEFAULT_TEMPERATURE)]
    temperature: Vec<String>,
    /// Path to audio for seeding.
    #[arg(long)]
    seed: Option<PathBuf>,
    /// Starting offset of the seed audio.
    #[arg(long, alias = "seed_offset", default_value_t = 0)]
    seed_offset: usize,
    /// Seed for the sampler of the baseline model.
    #[arg(long)]
    rng_seed: Option<u64>,
}

/// Audio utility commands.
#[derive(Subcommand)]
enum AudioCommands {
    /// Convert sample rate and channel count.
    Convert {
        /// Input audio file path.
        #[arg(long)]
        input: PathBuf,
        /// Output WAV path.
        #[arg(long)]
        output: PathBuf,
        /// Target sample rate in Hz.
        #[arg(long)]
        to_rate: u32,
        /// Target channel count.
        #[arg(long)]
        to_channels: usize,
    },
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(parsed) if parsed >= 1 => Ok(parsed),
        _ => Err(format!("{value} is not positive")),
    }
}

/// Entry point for the CLI.
fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    match cli.command {
        Commands::Split {
            data_dir,
            pattern,
            validation_fraction,
            rng_seed,
            output,
        } => {
            let mut rng = match rng_seed {
                Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
                None => rand::rngs::StdRng::from_entropy(),
            };
            let split = split_files(&data_dir, &pattern, validation_fraction, &mut rng)?;
            let listing = serde_json::json!({
                "train": split.train,
                "validation": split.validation,
            });
            match output {
                Some(path) => {
                    std::fs::write(&path, serde_json::to_string_pretty(&listing)?)?;
                    log::info!(
                        "wrote {} train / {} validation files to {}",
                        split.train.len(),
                        split.validation.len(),
                        path.display()
                    );
                }
                None => println!("{}", serde_json::to_string_pretty(&listing)?),
            }
        }
        Commands::Windows(args) => {
            let (options, _) = dataset_options(&args)?;
            let mut windows = 0usize;
            let mut samples = 0usize;
            for window in build_dataset(&args.data_dir, &options)? {
                let window = window?;
                windows += 1;
                samples += window.batch_size() * window.seq_len();
            }
            println!("windows: {windows}");
            println!("target samples: {samples}");
        }
        Commands::FitPrior {
            dataset,
            output_dir,
        } => {
            let (options, q_levels) = dataset_options(&dataset)?;
            let (logits, windows) =
                fit_symbol_prior(build_dataset(&dataset.data_dir, &options)?, q_levels)?;
            std::fs::create_dir_all(&output_dir)?;
            let path = output_dir.join(format!("model.ckpt-{}.safetensors", dataset.num_epochs));
            save_symbol_prior(&path, &logits)?;
            log::info!("fitted prior on {windows} windows, saved to {}", path.display());
        }
        Commands::Generate(args) => run_generate(args)?,
        Commands::Audio { command } => match command {
            AudioCommands::Convert {
                input,
                output,
                to_rate,
                to_channels,
            } => {
                let (samples, sample_rate) = WavIo::read_wav(input)?;
                let converted =
                    AudioResampler::convert_audio(samples, sample_rate, to_rate, to_channels)?;
                WavIo::write_wav(output, &converted, to_rate)?;
            }
        },
    }

    if verbose {
        eprintln!("{}", perf::report());
    }

    Ok(())
}

fn dataset_options(args: &DatasetArgs) -> Result<(DatasetOptions, usize)> {
    let config = load_config(&args.config_file)?;
    let mut options = DatasetOptions::for_model(&config, args.batch_size)?;
    options.num_epochs = Some(args.num_epochs);
    options.drop_remainder = args.drop_remainder;
    options.pattern = args.pattern.clone();
    options.target_sample_rate = args.sample_rate.map(|rate| rate as u32);
    options.shuffle_seed = args.rng_seed;
    Ok((options, config.q_levels))
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let config = load_config(&args.config_file)?;
    let device = NdArrayDevice::default();

    let mut generation = GenerationConfig::new(args.output_path, args.checkpoint_path);
    generation.num_seqs = args.num_seqs;
    generation.dur_secs = args.dur;
    generation.sample_rate = u32::try_from(args.sample_rate)?;
    generation.temperature = args.temperature;
    generation.seed = args.seed;
    generation.seed_offset = args.seed_offset;

    let mut model = SymbolPriorModel::<NdArray<f32>>::from_config(&config, args.num_seqs, &device)?;
    if let Some(seed) = args.rng_seed {
        model = model.with_seed(seed);
    }
    let driver = GenerationDriver::<NdArray<f32>, _>::new(model, &config, generation, &device)?;
    let generation = driver.generate()?;
    if generation.stopped_early {
        log::info!(
            "generated {} of {} frames",
            generation.frames_generated,
            generation.frames_requested
        );
    }
    generation.write_wav_files()?;
    log::info!("Done");
    Ok(())
}
