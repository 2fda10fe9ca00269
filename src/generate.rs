//! Autoregressive generation driver.
//!
//! A driver takes a [`FrameModel`] through one generation run:
//!
//! 1. **init**: check the model batch matches `num_seqs`, warm it up on zeros
//!    and restore weights (partial matches allowed);
//! 2. **seeding**: build the first frame from quantized silence, or from a
//!    slice of seed audio;
//! 3. **stepping**: one model call per big frame, each with its own
//!    per-sequence temperature vector;
//! 4. **finalize**: drop the seed frame, dequantize and name the outputs.
//!
//! [`GenerationDriver::generate`] consumes the driver, so a finished run cannot
//! be stepped again.

use crate::audio::io::WavIo;
use crate::config::{GenerationConfig, ModelConfig};
use crate::error::Error;
use crate::model::FrameModel;
use crate::output::{checkpoint_epoch, output_file_name, UNKNOWN_EPOCH};
use crate::perf::{self, Metric};
use crate::quantize::Quantizer;
use crate::state::GenerationState;
use crate::temperature::{frame_temperatures, parse_temperatures, TemperatureSpec};
use anyhow::Result;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use std::path::PathBuf;
use std::time::Instant;

/// Progress is logged once per this many frames.
pub const FRAMES_PER_PROGRESS: usize = 4;

/// One finished sequence, not yet written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSequence {
    /// Where [`Generation::write_wav_files`] puts it.
    pub path: PathBuf,
    pub samples: Vec<f32>,
    /// Terminal temperature of the sequence's schedule.
    pub temperature: f64,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub sequences: Vec<GeneratedSequence>,
    pub sample_rate: u32,
    /// `total_samples / big_frame_size`.
    pub frames_requested: usize,
    pub frames_generated: usize,
    /// The temperature schedule ran out before `frames_requested`.
    pub stopped_early: bool,
}

impl Generation {
    /// Write every sequence as a mono 16-bit WAV file.
    pub fn write_wav_files(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.sequences.len());
        for sequence in &self.sequences {
            if let Some(parent) = sequence.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| Error::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            WavIo::write_mono(&sequence.path, &sequence.samples, self.sample_rate)?;
            log::info!("Generated sample output to {}", sequence.path.display());
            written.push(sequence.path.clone());
        }
        Ok(written)
    }
}

/// Drives a [`FrameModel`] through a single generation run.
pub struct GenerationDriver<B: Backend, M: FrameModel<B>> {
    model: M,
    config: GenerationConfig,
    quantizer: Quantizer,
    temperatures: Vec<TemperatureSpec>,
    seed_frame: Tensor<B, 3, Int>,
    epoch: String,
    device: B::Device,
}

impl<B: Backend, M: FrameModel<B>> GenerationDriver<B, M> {
    /// Prepare `model` for generation: warm-up, weight restore and seeding.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when the model does not match `model_config` or
    /// `config`, [`Error::InvalidTemperature`] for malformed schedules and
    /// [`Error::SeedTooShort`] when the seed audio cannot fill one frame at
    /// `seed_offset`. Checkpoint and audio failures propagate as-is.
    pub fn new(
        mut model: M,
        model_config: &ModelConfig,
        config: GenerationConfig,
        device: &B::Device,
    ) -> Result<Self> {
        let _span = perf::span(Metric::GenerationInit);
        check_config::<B, M>(&model, model_config, &config)?;

        let num_seqs = config.num_seqs;
        let big_frame_size = model.big_frame_size();
        let quantizer = Quantizer::new(model.quant_type(), model.q_levels())?;
        let temperatures =
            parse_temperatures(&config.temperature, num_seqs, config.total_samples()?)?;

        model.warm_up(Tensor::zeros(
            [num_seqs, model_config.seq_len + big_frame_size, 1],
            device,
        ))?;
        let report = model.load_weights(&config.checkpoint_path, true)?;
        log::info!(
            "restored {} parameters from '{}'",
            report.loaded.len(),
            config.checkpoint_path.display()
        );

        let epoch = checkpoint_epoch(&config.checkpoint_path).unwrap_or_else(|| {
            log::warn!(
                "no epoch number in checkpoint name '{}'",
                config.checkpoint_path.display()
            );
            UNKNOWN_EPOCH.to_string()
        });

        let seed_frame = seed_frame::<B>(&config, quantizer, big_frame_size, device)?;
        Ok(Self {
            model,
            config,
            quantizer,
            temperatures,
            seed_frame,
            epoch,
            device: device.clone(),
        })
    }

    /// Parsed temperature schedule, one entry per sequence.
    pub fn temperatures(&self) -> &[TemperatureSpec] {
        &self.temperatures
    }

    /// Epoch marker used in output names.
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Step the model until `total_samples / big_frame_size` frames exist or the
    /// temperature schedule runs out, then decode the sequences.
    pub fn generate(mut self) -> Result<Generation> {
        let num_seqs = self.config.num_seqs;
        let big_frame_size = self.model.big_frame_size();
        let total_samples = self.config.total_samples()?;
        let num_frames = total_samples / big_frame_size;
        let progress_every = FRAMES_PER_PROGRESS * big_frame_size;

        let mut schedule = frame_temperatures(&self.temperatures, num_frames);
        let mut state = GenerationState::new(self.seed_frame);
        let start = Instant::now();
        let mut stopped_early = false;

        for frame in 0..num_frames {
            let Some(values) = schedule.next() else {
                log::info!("temperature schedule ended after {frame} of {num_frames} frames");
                stopped_early = true;
                break;
            };
            let values: Vec<f32> = values.into_iter().map(|t| t as f32).collect();
            let temperature =
                Tensor::<B, 2>::from_data(TensorData::new(values, [num_seqs, 1]), &self.device);

            let next = {
                let _span = perf::span(Metric::GenerationStep);
                self.model.advance_frame(state.frames(), temperature)?
            };
            state.push(next)?;
            perf::add_count(Metric::GeneratedFrames, 1);

            let t = frame * big_frame_size;
            if t % progress_every == 0 {
                let end = (t + progress_every).min(total_samples);
                log::info!(
                    "Generated samples {} - {end} of {total_samples} (time elapsed: {:.3} seconds)",
                    t + 1,
                    start.elapsed().as_secs_f64()
                );
            }
        }

        let _span = perf::span(Metric::GenerationFinalize);
        let frames_generated = state.generated_frames();
        let sequences = state
            .into_sequences()?
            .into_iter()
            .zip(&self.temperatures)
            .enumerate()
            .map(|(i, (codes, spec))| {
                let temperature = spec.terminal();
                GeneratedSequence {
                    path: output_file_name(
                        &self.config.output_path,
                        &self.epoch,
                        (num_seqs > 1).then_some(i),
                        temperature,
                    ),
                    samples: self.quantizer.dequantize(&codes),
                    temperature,
                }
            })
            .collect();

        Ok(Generation {
            sequences,
            sample_rate: self.config.sample_rate,
            frames_requested: num_frames,
            frames_generated,
            stopped_early,
        })
    }
}

fn check_config<B: Backend, M: FrameModel<B>>(
    model: &M,
    model_config: &ModelConfig,
    config: &GenerationConfig,
) -> Result<()> {
    model_config.validate()?;
    if config.num_seqs == 0 || config.dur_secs == 0 || config.sample_rate == 0 {
        return Err(Error::InvalidConfig(
            "num_seqs, dur and sample_rate must be positive".into(),
        )
        .into());
    }
    config.total_samples()?;
    if model.batch_size() != config.num_seqs {
        return Err(Error::InvalidConfig(format!(
            "model batch size {} does not match num_seqs {}",
            model.batch_size(),
            config.num_seqs
        ))
        .into());
    }
    if model.big_frame_size() != model_config.big_frame_size() {
        return Err(Error::InvalidConfig(format!(
            "model frame size {} does not match configured big frame size {}",
            model.big_frame_size(),
            model_config.big_frame_size()
        ))
        .into());
    }
    Ok(())
}

/// First frame of every sequence: quantized silence, or the seed slice
/// `[seed_offset, seed_offset + big_frame_size)` repeated across the batch.
fn seed_frame<B: Backend>(
    config: &GenerationConfig,
    quantizer: Quantizer,
    big_frame_size: usize,
    device: &B::Device,
) -> Result<Tensor<B, 3, Int>> {
    let num_seqs = config.num_seqs;
    let codes = match &config.seed {
        None => vec![quantizer.midpoint(); num_seqs * big_frame_size],
        Some(path) => {
            let (audio, _) = WavIo::read_mono(path, None)?;
            let offset = config.seed_offset;
            let end = offset
                .checked_add(big_frame_size)
                .filter(|&end| end <= audio.len())
                .ok_or(Error::SeedTooShort {
                    offset,
                    length: big_frame_size,
                    available: audio.len(),
                })?;
            log::debug!("seeding from '{}' at offset {offset}", path.display());
            quantizer.quantize(&audio[offset..end]).repeat(num_seqs)
        }
    };
    Ok(Tensor::from_data(
        TensorData::new(codes, [num_seqs, big_frame_size, 1]),
        device,
    ))
}
