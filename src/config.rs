//! Configuration types for the model collaborator, the dataset pipeline and
//! the generation driver.
//!
//! Model hyperparameters are loaded from JSON files (or YAML, by extension) using
//! [`load_config`]. Generation and dataset defaults live in explicit structs that
//! are passed at call boundaries.

use crate::error::Error;
use crate::quantize::{QuantType, Quantizer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Model hyperparameters.
///
/// Only `frame_sizes`, `seq_len`, `q_type` and `q_levels` are interpreted by this
/// crate; the rest is passed through to the model constructor. Training-only
/// keys present in the same file (learning rate, epochs, ...) are ignored.
///
/// # Example JSON
///
/// ```json
/// {
///   "seq_len": 1024,
///   "frame_sizes": [16, 64],
///   "q_type": "mu-law",
///   "q_levels": 256,
///   "dim": 1024,
///   "num_rnn_layers": 4,
///   "emb_size": 256,
///   "skip_conn": false,
///   "rnn_dropout": 0.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Frame sizes of the tiers, smallest first. The last entry is the big frame.
    pub frame_sizes: Vec<usize>,
    /// Training window length in samples.
    pub seq_len: usize,
    /// Quantization transform.
    pub q_type: QuantType,
    /// Quantization alphabet size.
    pub q_levels: usize,
    /// Hidden size of the recurrent tiers.
    pub dim: usize,
    /// Number of stacked RNN layers per tier.
    pub num_rnn_layers: usize,
    /// Embedding size of the sample-level tier.
    pub emb_size: usize,
    /// Recurrent cell type (e.g. "gru", "lstm").
    #[serde(default)]
    pub rnn_type: Option<String>,
    /// Whether tiers use skip connections.
    #[serde(default)]
    pub skip_conn: Option<bool>,
    /// Dropout applied between recurrent layers.
    #[serde(default)]
    pub rnn_dropout: Option<f32>,
}

impl ModelConfig {
    /// Largest receptive frame, i.e. the number of samples produced per generation step.
    pub fn big_frame_size(&self) -> usize {
        self.frame_sizes.last().copied().unwrap_or(0)
    }

    /// Codec matching the model's quantization settings.
    pub fn quantizer(&self) -> crate::Result<Quantizer> {
        Quantizer::new(self.q_type, self.q_levels)
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> crate::Result<()> {
        if self.frame_sizes.is_empty() {
            return Err(Error::InvalidConfig("frame_sizes must not be empty".into()));
        }
        if self.frame_sizes.contains(&0) {
            return Err(Error::InvalidConfig("frame_sizes must be positive".into()));
        }
        let big = self.big_frame_size();
        if self.seq_len == 0 || self.seq_len % big != 0 {
            return Err(Error::InvalidConfig(format!(
                "seq_len ({}) must be a positive multiple of the big frame size ({big})",
                self.seq_len
            )));
        }
        self.quantizer()?;
        Ok(())
    }
}

/// Load a model configuration from a JSON or YAML file.
///
/// Files ending in `.yaml`/`.yml` are parsed as YAML, everything else as JSON.
///
/// # Errors
///
/// Returns an error if the file doesn't exist, cannot be parsed, or fails
/// [`ModelConfig::validate`].
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<ModelConfig> {
    let path = path.as_ref();
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let data = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let config: ModelConfig = if is_yaml {
        serde_yaml::from_str(&data)?
    } else {
        serde_json::from_str(&data)?
    };
    config.validate()?;
    Ok(config)
}

/// Default duration of generated audio in seconds.
pub const DEFAULT_DURATION_SECS: usize = 3;
/// Default sample rate of generated audio.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
/// Default number of sequences generated in one batch.
pub const DEFAULT_NUM_SEQS: usize = 1;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: &str = "0.95";

/// Parameters of one `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Base path of the generated `.wav` files.
    pub output_path: PathBuf,
    /// Checkpoint to load weights from.
    pub checkpoint_path: PathBuf,
    /// Number of sequences generated side by side.
    pub num_seqs: usize,
    /// Duration of each sequence in seconds.
    pub dur_secs: usize,
    /// Output sample rate.
    pub sample_rate: u32,
    /// Raw temperature specifications, one per sequence (broadcast as needed).
    pub temperature: Vec<String>,
    /// Optional audio used to seed the first frame.
    pub seed: Option<PathBuf>,
    /// Offset into the seed audio, in samples.
    pub seed_offset: usize,
}

impl GenerationConfig {
    pub fn new(output_path: impl Into<PathBuf>, checkpoint_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            checkpoint_path: checkpoint_path.into(),
            num_seqs: DEFAULT_NUM_SEQS,
            dur_secs: DEFAULT_DURATION_SECS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            temperature: vec![DEFAULT_TEMPERATURE.to_string()],
            seed: None,
            seed_offset: 0,
        }
    }

    /// Total samples requested per sequence.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when `dur_secs * sample_rate` overflows.
    pub fn total_samples(&self) -> crate::Result<usize> {
        self.dur_secs
            .checked_mul(self.sample_rate as usize)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "{} s at {} Hz is too many samples",
                    self.dur_secs, self.sample_rate
                ))
            })
    }
}

/// Options for [`crate::dataset::build_dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOptions {
    /// Sequences per batch.
    pub batch_size: usize,
    /// Target window length.
    pub seq_len: usize,
    /// Leading context carried over from the previous window.
    pub overlap: usize,
    /// Passes over the file list; `None` repeats forever.
    pub num_epochs: Option<usize>,
    /// Drop a final batch with fewer than `batch_size` files.
    pub drop_remainder: bool,
    /// Codec applied to every window.
    pub quantizer: Quantizer,
    /// fnmatch-style file-name pattern.
    pub pattern: String,
    /// Resample decoded files to this rate; `None` keeps native rates.
    pub target_sample_rate: Option<u32>,
    /// Seed for the per-epoch shuffle; `None` draws from entropy.
    pub shuffle_seed: Option<u64>,
}

/// Default pattern for audio discovery.
pub const DEFAULT_AUDIO_PATTERN: &str = "*.wav";

impl DatasetOptions {
    pub fn new(batch_size: usize, seq_len: usize, overlap: usize, quantizer: Quantizer) -> Self {
        Self {
            batch_size,
            seq_len,
            overlap,
            num_epochs: Some(1),
            drop_remainder: false,
            quantizer,
            pattern: DEFAULT_AUDIO_PATTERN.to_string(),
            target_sample_rate: None,
            shuffle_seed: None,
        }
    }

    /// Windowing options for training `config`: overlap is the big frame size.
    pub fn for_model(config: &ModelConfig, batch_size: usize) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::new(
            batch_size,
            config.seq_len,
            config.big_frame_size(),
            config.quantizer()?,
        ))
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".into()));
        }
        if self.seq_len == 0 {
            return Err(Error::InvalidConfig("seq_len must be positive".into()));
        }
        if self.num_epochs == Some(0) {
            return Err(Error::InvalidConfig("num_epochs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONFIG_JSON: &str = r#"{
        "seq_len": 1024,
        "frame_sizes": [16, 64],
        "q_type": "mu-law",
        "q_levels": 256,
        "dim": 1024,
        "num_rnn_layers": 4,
        "emb_size": 256,
        "skip_conn": false,
        "learning_rate": 0.001
    }"#;

    #[test]
    fn loads_json_and_ignores_training_keys() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("model.json");
        fs::write(&path, CONFIG_JSON).expect("write config");

        let config = load_config(&path).expect("load config");
        assert_eq!(config.big_frame_size(), 64);
        assert_eq!(config.q_type, QuantType::MuLaw);
        assert_eq!(config.rnn_type, None);
        assert_eq!(config.skip_conn, Some(false));
    }

    #[test]
    fn loads_yaml_by_extension() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("model.yaml");
        fs::write(
            &path,
            "seq_len: 512\nframe_sizes: [8, 32]\nq_type: linear\nq_levels: 65536\n\
             dim: 128\nnum_rnn_layers: 1\nemb_size: 64\nrnn_type: lstm\n",
        )
        .expect("write config");

        let config = load_config(&path).expect("load config");
        assert_eq!(config.q_type, QuantType::Linear);
        assert_eq!(config.rnn_type.as_deref(), Some("lstm"));
    }

    #[test]
    fn missing_file_errors() {
        let err = load_config("nowhere/model.json").unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn seq_len_must_align_with_big_frame() {
        let mut config: ModelConfig = serde_json::from_str(CONFIG_JSON).expect("parse");
        config.seq_len = 1000;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        config.frame_sizes.clear();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn oversized_duration_is_invalid_config() {
        let mut config = GenerationConfig::new("out.wav", "model.ckpt-1");
        config.dur_secs = usize::MAX / 2;
        assert!(matches!(config.total_samples(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn generation_defaults() {
        let config = GenerationConfig::new("out.wav", "logdir/model.ckpt-10");
        assert_eq!(config.num_seqs, 1);
        assert_eq!(config.total_samples().unwrap(), 3 * 22050);
        assert_eq!(config.temperature, vec!["0.95".to_string()]);
        assert_eq!(config.seed_offset, 0);
    }

    #[test]
    fn dataset_options_follow_model() {
        let config: ModelConfig = serde_json::from_str(CONFIG_JSON).expect("parse");
        let options = DatasetOptions::for_model(&config, 8).expect("options");
        assert_eq!(options.overlap, 64);
        assert_eq!(options.seq_len, 1024);
        assert_eq!(options.num_epochs, Some(1));
        assert_eq!(options.pattern, "*.wav");
    }
}
