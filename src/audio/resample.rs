use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Channel-count and sample-rate conversion for decoded audio.
#[derive(Debug, Default)]
pub struct AudioResampler;

impl AudioResampler {
    /// Convert `samples` (one `Vec` per channel) to `to_channels` channels at `to_rate`.
    pub fn convert_audio(
        mut samples: Vec<Vec<f32>>,
        from_rate: u32,
        to_rate: u32,
        to_channels: usize,
    ) -> Result<Vec<Vec<f32>>> {
        if from_rate == 0 || to_rate == 0 {
            anyhow::bail!("Sample rates must be positive (got {from_rate} -> {to_rate})");
        }
        samples = convert_channels(samples, to_channels)?;
        if from_rate == to_rate || samples.is_empty() || samples[0].is_empty() {
            return Ok(samples);
        }

        let channels = samples.len();
        let input_len = samples[0].len();
        let ratio = to_rate as f64 / from_rate as f64;
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input_len, channels)?;
        let expected = (input_len as f64 * ratio).round() as usize;
        let delay = resampler.output_delay();

        // The filter lags by `delay` frames: flush until the tail is out, then trim the lead.
        let mut output = resampler.process(&samples, None)?;
        while output.first().map_or(0, Vec::len) < delay + expected {
            let tail = resampler.process_partial(None::<&[Vec<f32>]>, None)?;
            if tail.first().is_none_or(Vec::is_empty) {
                break;
            }
            for (channel, flushed) in output.iter_mut().zip(tail) {
                channel.extend(flushed);
            }
        }
        for channel in &mut output {
            channel.drain(..delay.min(channel.len()));
            channel.truncate(expected);
        }
        log::debug!(
            "resampled {input_len} samples at {from_rate} Hz to {} samples at {to_rate} Hz",
            output.first().map_or(0, Vec::len)
        );
        Ok(output)
    }
}

fn convert_channels(samples: Vec<Vec<f32>>, to_channels: usize) -> Result<Vec<Vec<f32>>> {
    if samples.is_empty() {
        return Ok(samples);
    }
    let from_channels = samples.len();
    if from_channels == to_channels {
        return Ok(samples);
    }
    if to_channels == 1 {
        let len = samples[0].len();
        let mut mixed = vec![0.0_f32; len];
        for channel in &samples {
            if channel.len() != len {
                anyhow::bail!("Channel length mismatch in audio conversion");
            }
            for (acc, value) in mixed.iter_mut().zip(channel) {
                *acc += *value;
            }
        }
        let scale = 1.0 / from_channels as f32;
        for value in &mut mixed {
            *value *= scale;
        }
        return Ok(vec![mixed]);
    }
    if from_channels == 1 && to_channels > 1 {
        return Ok(vec![samples[0].clone(); to_channels]);
    }
    anyhow::bail!("Unsupported channel conversion from {from_channels} to {to_channels}")
}

#[cfg(test)]
mod tests {
    use super::AudioResampler;

    #[test]
    fn converts_channels_and_resamples() {
        let samples = vec![vec![0.0_f32; 480]];
        let output =
            AudioResampler::convert_audio(samples, 48000, 24000, 2).expect("convert audio");
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].len(), 240);
        assert_eq!(output[1].len(), 240);
    }

    #[test]
    fn resampled_length_follows_the_rate_ratio() {
        let tone: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let up = AudioResampler::convert_audio(vec![tone.clone()], 8000, 16000, 1).expect("up");
        assert_eq!(up[0].len(), 2000);

        let down = AudioResampler::convert_audio(vec![tone], 22050, 16000, 1).expect("down");
        assert_eq!(down[0].len(), 726);
    }

    #[test]
    fn resampling_keeps_the_signal_aligned() {
        // A slow sine survives resampling without a time shift.
        let tone: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let up = AudioResampler::convert_audio(vec![tone.clone()], 8000, 16000, 1).expect("up");
        for i in (400..1600).step_by(100) {
            assert!((up[0][2 * i] - tone[i]).abs() < 0.05, "sample {i}");
        }
    }

    #[test]
    fn same_rate_mono_is_untouched() {
        let samples = vec![vec![0.1_f32, 0.2, 0.3]];
        let output =
            AudioResampler::convert_audio(samples.clone(), 22050, 22050, 1).expect("convert");
        assert_eq!(output, samples);
    }

    #[test]
    fn averages_stereo_to_mono() {
        let samples = vec![vec![1.0_f32, 0.0], vec![0.0_f32, -1.0]];
        let output = AudioResampler::convert_audio(samples, 8000, 8000, 1).expect("convert");
        assert_eq!(output, vec![vec![0.5, -0.5]]);
    }

    #[test]
    fn rejects_zero_rates() {
        assert!(AudioResampler::convert_audio(vec![vec![0.0]], 0, 8000, 1).is_err());
    }
}
