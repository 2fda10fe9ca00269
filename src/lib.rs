//! # samplernn - SampleRNN data pipeline and generation driver
//!
//! Prepares raw audio for training an autoregressive sample-level model and
//! drives a trained model through generation.
//!
//! ## Architecture Overview
//!
//! 1. **Quantization** ([`Quantizer`]): maps float samples to integer symbol codes
//!    with mu-law or linear companding, and back.
//!
//! 2. **Dataset** ([`build_dataset`]): a lazy stream of fixed-length, overlapping,
//!    quantized `(x, y)` training windows built from a directory of audio files.
//!
//! 3. **Temperature schedules** ([`temperature`]): per-sequence sampling
//!    temperatures, constant or piecewise-linear over the output.
//!
//! 4. **Generation** ([`GenerationDriver`]): steps a [`FrameModel`] one big frame at
//!    a time and decodes the result into audio.
//!
//! ## Quick Start
//!
//! ```no_run
//! use burn_ndarray::{NdArray, NdArrayDevice};
//! use samplernn::model::SymbolPriorModel;
//! use samplernn::{load_config, GenerationConfig, GenerationDriver};
//!
//! let config = load_config("model.json").unwrap();
//! let device = NdArrayDevice::default();
//! let mut generation = GenerationConfig::new("out/sample.wav", "logs/model.ckpt-10.safetensors");
//! generation.num_seqs = 2;
//! generation.temperature = vec!["([0, 0.5, 1], [0.9, 0.5, 0.9])".into()];
//!
//! let model = SymbolPriorModel::<NdArray<f32>>::from_config(&config, 2, &device).unwrap();
//! let driver =
//!     GenerationDriver::<NdArray<f32>, _>::new(model, &config, generation, &device).unwrap();
//! driver.generate().unwrap().write_wav_files().unwrap();
//! ```
//!
//! ## Training Windows
//!
//! ```no_run
//! use samplernn::{build_dataset, load_config, DatasetOptions};
//!
//! let config = load_config("model.json").unwrap();
//! let mut options = DatasetOptions::for_model(&config, 16).unwrap();
//! options.num_epochs = Some(10);
//! for window in build_dataset("data/", &options).unwrap() {
//!     let window = window.unwrap();
//!     assert_eq!(window.x(0).len(), config.seq_len + config.big_frame_size());
//! }
//! ```
//!
//! ## Configuration
//!
//! Model hyperparameters are read from JSON (or YAML) files, see [`ModelConfig`].
//! Generation and dataset settings are plain structs with documented defaults.

// Public modules - these are part of the stable API
pub mod audio;
pub mod config;
pub mod dataset;
pub mod error;
pub mod generate;
pub mod model;
pub mod output;
pub mod quantize;
pub mod temperature;

// Internal modules - exposed for integration tests but not part of stable API.
#[doc(hidden)]
pub mod perf;
#[doc(hidden)]
pub mod state;
#[doc(hidden)]
pub mod weights;

// Re-exports forming the public API
pub use config::{load_config, DatasetOptions, GenerationConfig, ModelConfig};
pub use dataset::{build_dataset, build_dataset_from_files, split_files, Dataset, Window};
pub use error::{Error, Result};
pub use generate::{GeneratedSequence, Generation, GenerationDriver};
pub use model::{FrameModel, LoadReport};
pub use quantize::{dequantize, quantize, QuantType, Quantizer};
pub use temperature::{frame_temperatures, interpolate, parse_temperatures, TemperatureSpec};
