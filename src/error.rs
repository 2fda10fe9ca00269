//! Domain errors raised by the dataset pipeline and the generation driver.
//!
//! Collaborator failures (WAV decoding, checkpoints, config parsing) travel as
//! [`anyhow::Error`]; the variants here are the conditions callers are expected
//! to match on, recoverable with `anyhow::Error::downcast_ref::<Error>()`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors with a defined meaning in the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// No file under the data directory matched the audio pattern.
    #[error("no audio files matching '{pattern}' found in '{}'", dir.display())]
    EmptyDataset {
        /// Directory that was searched.
        dir: PathBuf,
        /// File-name pattern used for discovery.
        pattern: String,
    },

    /// The seed audio cannot provide a full initial frame at the requested offset.
    #[error("seed offset {offset} plus length {length} exceeds seed audio length {available}")]
    SeedTooShort {
        /// Requested starting sample.
        offset: usize,
        /// Number of samples required (the model's big frame size).
        length: usize,
        /// Number of samples in the seed audio.
        available: usize,
    },

    /// A temperature string could not be parsed into a schedule.
    #[error("invalid temperature '{input}': {reason}")]
    InvalidTemperature {
        /// The raw string as supplied.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Hyperparameters or options that cannot be honoured.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// File system failure tied to a specific path.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn invalid_temperature(input: &str, reason: impl Into<String>) -> Self {
        Error::InvalidTemperature {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for operations that only fail with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
