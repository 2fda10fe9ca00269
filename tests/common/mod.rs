//! Shared test utilities: WAV fixtures, configs and stub frame models.
#![allow(dead_code)]

use anyhow::Result;
use burn::tensor::{Int, Tensor, TensorData};
use burn_ndarray::{NdArray, NdArrayDevice};
use samplernn::audio::io::WavIo;
use samplernn::{FrameModel, LoadReport, ModelConfig, QuantType};
use std::path::{Path, PathBuf};

pub type TestBackend = NdArray<f32>;

/// Model config with `frame_sizes = [2, 8]` (big frame 8), `seq_len = 16`.
pub const SMALL_CONFIG_JSON: &str = r#"{
    "seq_len": 16,
    "frame_sizes": [2, 8],
    "q_type": "mu-law",
    "q_levels": 256,
    "dim": 32,
    "num_rnn_layers": 1,
    "emb_size": 16,
    "rnn_type": "gru",
    "skip_conn": false,
    "rnn_dropout": 0.0,
    "num_epochs": 10,
    "learning_rate": 0.001
}"#;

pub fn small_config() -> ModelConfig {
    serde_json::from_str(SMALL_CONFIG_JSON).expect("config")
}

pub fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("model.json");
    std::fs::write(&path, SMALL_CONFIG_JSON).expect("write config");
    path
}

/// Deterministic test tone in `[-0.8, 0.8]`.
pub fn tone(len: usize, phase: f32) -> Vec<f32> {
    (0..len)
        .map(|i| (i as f32 * 0.07 + phase).sin() * 0.8)
        .collect()
}

/// Write a mono tone of `len` samples at `sample_rate`.
pub fn write_tone(path: &Path, len: usize, sample_rate: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dir");
    }
    WavIo::write_mono(path, &tone(len, len as f32), sample_rate).expect("write wav");
}

/// Populate `dir` with `count` WAV files of varying lengths, some nested.
pub fn write_corpus(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|idx| {
            let path = if idx % 3 == 2 {
                dir.join("nested").join(format!("clip_{idx}.wav"))
            } else {
                dir.join(format!("clip_{idx}.wav"))
            };
            write_tone(&path, 40 + idx * 13, 8000);
            path
        })
        .collect()
}

/// Stub model emitting quantized silence and counting its calls.
pub struct MidpointModel {
    pub batch: usize,
    pub big_frame_size: usize,
    pub q_levels: usize,
    pub warmed_up: bool,
    pub steps: usize,
}

impl MidpointModel {
    pub fn new(batch: usize, big_frame_size: usize) -> Self {
        Self {
            batch,
            big_frame_size,
            q_levels: 256,
            warmed_up: false,
            steps: 0,
        }
    }
}

impl FrameModel<TestBackend> for MidpointModel {
    fn batch_size(&self) -> usize {
        self.batch
    }

    fn big_frame_size(&self) -> usize {
        self.big_frame_size
    }

    fn quant_type(&self) -> QuantType {
        QuantType::MuLaw
    }

    fn q_levels(&self) -> usize {
        self.q_levels
    }

    fn warm_up(&mut self, _input: Tensor<TestBackend, 3, Int>) -> Result<()> {
        self.warmed_up = true;
        Ok(())
    }

    fn load_weights(&mut self, _path: &Path, _allow_partial: bool) -> Result<LoadReport> {
        Ok(LoadReport::default())
    }

    fn advance_frame(
        &mut self,
        context: &[Tensor<TestBackend, 3, Int>],
        _temperature: Tensor<TestBackend, 2>,
    ) -> Result<Tensor<TestBackend, 3, Int>> {
        assert!(self.warmed_up, "stepped before warm-up");
        assert_eq!(context.len(), self.steps + 1);
        self.steps += 1;
        let midpoint = (self.q_levels / 2) as i64;
        Ok(Tensor::from_data(
            TensorData::new(
                vec![midpoint; self.batch * self.big_frame_size],
                [self.batch, self.big_frame_size, 1],
            ),
            &NdArrayDevice::default(),
        ))
    }
}
