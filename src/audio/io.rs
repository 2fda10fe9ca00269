use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use super::resample::AudioResampler;

/// WAV reader/writer used for training files, seed audio and generated output.
#[derive(Debug, Default)]
pub struct WavIo;

impl WavIo {
    /// Decode a WAV file into per-channel float samples in `[-1, 1]`.
    pub fn read_wav(path: impl AsRef<Path>) -> Result<(Vec<Vec<f32>>, u32)> {
        let path = path.as_ref();
        let mut reader = WavReader::open(path)
            .with_context(|| format!("failed to open WAV file '{}'", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        let sample_rate = spec.sample_rate;
        let mut samples = vec![Vec::new(); channels];

        match spec.sample_format {
            SampleFormat::Float => {
                for (idx, sample) in reader.samples::<f32>().enumerate() {
                    let value = sample
                        .with_context(|| format!("corrupt sample data in '{}'", path.display()))?;
                    samples[idx % channels].push(value);
                }
            }
            SampleFormat::Int => {
                let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                for (idx, sample) in reader.samples::<i32>().enumerate() {
                    let value = sample
                        .with_context(|| format!("corrupt sample data in '{}'", path.display()))?;
                    samples[idx % channels].push(value as f32 / max);
                }
            }
        }

        Ok((samples, sample_rate))
    }

    /// Decode a WAV file into a single mono buffer.
    ///
    /// Multichannel audio is averaged down. With `target_rate` set, the buffer is
    /// resampled; otherwise the native rate is preserved and returned.
    pub fn read_mono(path: impl AsRef<Path>, target_rate: Option<u32>) -> Result<(Vec<f32>, u32)> {
        let (samples, sample_rate) = Self::read_wav(path)?;
        if samples.is_empty() {
            return Ok((Vec::new(), sample_rate));
        }
        let to_rate = target_rate.unwrap_or(sample_rate);
        let mut mono = AudioResampler::convert_audio(samples, sample_rate, to_rate, 1)?;
        Ok((mono.pop().unwrap_or_default(), to_rate))
    }

    /// Write per-channel float samples as 16-bit PCM.
    pub fn write_wav(path: impl AsRef<Path>, samples: &[Vec<f32>], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            anyhow::bail!("No audio channels provided");
        }
        let channels = samples.len() as u16;
        let len = samples[0].len();
        for channel in samples.iter().skip(1) {
            if channel.len() != len {
                anyhow::bail!("Channel length mismatch in WAV write");
            }
        }

        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let path = path.as_ref();
        let mut writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file '{}'", path.display()))?;

        for idx in 0..len {
            for channel in samples {
                let value = channel[idx].clamp(-1.0, 1.0);
                let scaled = (value * i16::MAX as f32).round() as i16;
                writer.write_sample(scaled)?;
            }
        }

        writer.finalize()?;
        Ok(())
    }

    /// Write a single mono buffer as 16-bit PCM.
    pub fn write_mono(path: impl AsRef<Path>, samples: &[f32], sample_rate: u32) -> Result<()> {
        Self::write_wav(path, &[samples.to_vec()], sample_rate)
    }
}
