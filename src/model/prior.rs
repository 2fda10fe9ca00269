//! Baseline frame model: independent draws from a learned symbol prior.
//!
//! Every sample of every frame is drawn from `softmax(logits / t)`, where `t`
//! is the temperature of the sequence it belongs to. The logits are add-one
//! smoothed log frequencies of the training targets, so the model reproduces
//! the amplitude distribution of the corpus but none of its structure.

use super::{FrameModel, LoadReport};
use crate::config::ModelConfig;
use crate::dataset::Window;
use crate::quantize::QuantType;
use crate::weights::{self, load_checkpoint};
use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Checkpoint tensor holding the `[q_levels]` logits.
pub const PRIOR_LOGITS: &str = "prior.logits";

/// Temperature-scaled categorical sampler over quantized symbols.
#[derive(Debug)]
pub struct SymbolPriorModel<B: Backend> {
    batch_size: usize,
    big_frame_size: usize,
    quant_type: QuantType,
    logits: Vec<f32>,
    rng: StdRng,
    device: B::Device,
}

impl<B: Backend> SymbolPriorModel<B> {
    /// Uniform prior sized from `config`.
    pub fn from_config(
        config: &ModelConfig,
        batch_size: usize,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            batch_size,
            big_frame_size: config.big_frame_size(),
            quant_type: config.q_type,
            logits: vec![0.0; config.q_levels],
            rng: StdRng::from_entropy(),
            device: device.clone(),
        })
    }

    /// Make sampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn logits(&self) -> &[f32] {
        &self.logits
    }

    pub fn set_logits(&mut self, logits: Vec<f32>) -> Result<()> {
        if logits.len() != self.logits.len() {
            anyhow::bail!(
                "expected {} logits, got {}",
                self.logits.len(),
                logits.len()
            );
        }
        self.logits = logits;
        Ok(())
    }

    fn distribution(&self, temperature: f64) -> Result<WeightedIndex<f64>> {
        let scaled: Vec<f64> = self
            .logits
            .iter()
            .map(|&logit| f64::from(logit) / temperature)
            .collect();
        let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights = scaled.iter().map(|&s| (s - max).exp());
        WeightedIndex::new(weights)
            .with_context(|| format!("degenerate symbol distribution at temperature {temperature}"))
    }
}

impl<B: Backend> FrameModel<B> for SymbolPriorModel<B> {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn big_frame_size(&self) -> usize {
        self.big_frame_size
    }

    fn quant_type(&self) -> QuantType {
        self.quant_type
    }

    fn q_levels(&self) -> usize {
        self.logits.len()
    }

    fn warm_up(&mut self, input: Tensor<B, 3, Int>) -> Result<()> {
        let [batch, _, channels] = input.dims();
        if batch != self.batch_size || channels != 1 {
            anyhow::bail!(
                "warm-up input {:?} does not match batch size {}",
                input.dims(),
                self.batch_size
            );
        }
        Ok(())
    }

    fn load_weights(&mut self, path: &Path, allow_partial: bool) -> Result<LoadReport> {
        let checkpoint = load_checkpoint(path, &[PRIOR_LOGITS], allow_partial)?;
        let mut report = LoadReport {
            missing: checkpoint.missing.clone(),
            ..LoadReport::default()
        };
        if let Some(tensor) = checkpoint.get(PRIOR_LOGITS) {
            self.set_logits(tensor.to_f32_vec()?)
                .with_context(|| format!("bad '{PRIOR_LOGITS}' in '{}'", path.display()))?;
            report.loaded.push(PRIOR_LOGITS.to_string());
        }
        Ok(report)
    }

    fn advance_frame(
        &mut self,
        _context: &[Tensor<B, 3, Int>],
        temperature: Tensor<B, 2>,
    ) -> Result<Tensor<B, 3, Int>> {
        let temperatures = temperature
            .into_data()
            .convert::<f64>()
            .to_vec::<f64>()
            .map_err(|err| anyhow::anyhow!("failed to read temperatures: {err:?}"))?;
        if temperatures.len() != self.batch_size {
            anyhow::bail!(
                "got {} temperatures for {} sequences",
                temperatures.len(),
                self.batch_size
            );
        }

        let mut codes = Vec::with_capacity(self.batch_size * self.big_frame_size);
        for &t in &temperatures {
            let distribution = self.distribution(t)?;
            codes.extend(
                (0..self.big_frame_size).map(|_| distribution.sample(&mut self.rng) as i64),
            );
        }
        Ok(Tensor::from_data(
            TensorData::new(codes, [self.batch_size, self.big_frame_size, 1]),
            &self.device,
        ))
    }
}

/// Estimate prior logits from the targets of `windows`.
///
/// Returns `ln(count + 1)` per symbol and the number of windows consumed.
pub fn fit_symbol_prior<I>(windows: I, q_levels: usize) -> Result<(Vec<f32>, usize)>
where
    I: IntoIterator<Item = Result<Window>>,
{
    let mut counts = vec![0u64; q_levels];
    let mut seen = 0usize;
    for window in windows {
        let window = window?;
        for b in 0..window.batch_size() {
            for &code in window.y(b) {
                let slot = usize::try_from(code)
                    .ok()
                    .and_then(|idx| counts.get_mut(idx))
                    .with_context(|| format!("code {code} outside {q_levels} levels"))?;
                *slot += 1;
            }
        }
        seen += 1;
        if seen % 1000 == 0 {
            log::debug!("fitted {seen} windows");
        }
    }
    let logits = counts.iter().map(|&c| ((c + 1) as f64).ln() as f32).collect();
    Ok((logits, seen))
}

/// Write `logits` as a checkpoint readable by [`SymbolPriorModel::load_weights`].
pub fn save_symbol_prior(path: impl AsRef<Path>, logits: &[f32]) -> Result<()> {
    let mut tensors = BTreeMap::new();
    tensors.insert(PRIOR_LOGITS.to_string(), (vec![logits.len()], logits.to_vec()));
    weights::save_checkpoint(path, &tensors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{pad_batch, window_batch};
    use crate::quantize::Quantizer;
    use burn_ndarray::{NdArray, NdArrayDevice};
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    fn config() -> ModelConfig {
        serde_json::from_str(
            r#"{"frame_sizes": [2, 4], "seq_len": 8, "q_type": "linear", "q_levels": 16,
                "dim": 8, "num_rnn_layers": 1, "emb_size": 4}"#,
        )
        .unwrap()
    }

    fn model(batch: usize) -> SymbolPriorModel<TestBackend> {
        SymbolPriorModel::from_config(&config(), batch, &NdArrayDevice::default())
            .unwrap()
            .with_seed(7)
    }

    fn temperatures(values: &[f32]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(
            TensorData::new(values.to_vec(), [values.len(), 1]),
            &NdArrayDevice::default(),
        )
    }

    #[test]
    fn frames_have_model_shape_and_valid_codes() {
        let mut model = model(3);
        let frame = model.advance_frame(&[], temperatures(&[0.5, 1.0, 2.0])).unwrap();
        assert_eq!(frame.dims(), [3, 4, 1]);
        let codes = frame.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert!(codes.iter().all(|&c| (0..16).contains(&c)));
    }

    #[test]
    fn sharp_prior_at_low_temperature_is_deterministic() {
        let mut model = model(1);
        let mut logits = vec![0.0; 16];
        logits[5] = 10.0;
        model.set_logits(logits).unwrap();
        let frame = model.advance_frame(&[], temperatures(&[0.01])).unwrap();
        let codes = frame.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(codes, vec![5; 4]);
    }

    #[test]
    fn temperature_count_must_match_batch() {
        let mut model = model(2);
        assert!(model.advance_frame(&[], temperatures(&[1.0])).is_err());
    }

    #[test]
    fn fit_counts_targets_with_smoothing() {
        let q = Quantizer::new(QuantType::Linear, 16).unwrap();
        let padded = pad_batch(vec![vec![0.0; 16]], 8, 4);
        let windows = window_batch(padded, 8, q).map(Ok);
        let (logits, seen) = fit_symbol_prior(windows, 16).unwrap();
        assert_eq!(seen, 2);
        let silence = q.encode(0.0) as usize;
        assert!((logits[silence] - 17.0_f32.ln()).abs() < 1e-6);
        assert_eq!(logits.iter().filter(|&&l| l == 0.0).count(), 15);
    }

    #[test]
    fn saved_prior_round_trips_through_load_weights() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("model.ckpt-1.safetensors");
        let logits: Vec<f32> = (0..16).map(|i| i as f32 * 0.1).collect();
        save_symbol_prior(&path, &logits).unwrap();

        let mut model = model(1);
        let report = model.load_weights(&path, false).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.loaded, vec![PRIOR_LOGITS.to_string()]);
        assert_eq!(model.logits(), logits.as_slice());
    }

    #[test]
    fn wrong_sized_logits_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("small.safetensors");
        save_symbol_prior(&path, &[0.0; 4]).unwrap();
        assert!(model(1).load_weights(&path, true).is_err());
    }
}
