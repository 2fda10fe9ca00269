//! Streaming training-data pipeline.
//!
//! Raw audio files are decoded lazily, repeated for a number of epochs, grouped
//! into batches, zero-padded with `overlap` leading samples and cut into
//! overlapping quantized windows:
//!
//! ```text
//! files -> repeat(num_epochs) -> batch(batch_size) -> pad -> window -> Window
//! ```
//!
//! Each call to [`build_dataset`] returns a fresh iterator; nothing is cached
//! between calls.

pub mod files;
pub mod stream;
pub mod window;

pub use files::{find_files, matches_pattern, split_files, DatasetSplit};
pub use stream::{load_audio_stream, AudioStream, Batches, EpochAudio, EpochFiles};
pub use window::{pad_batch, window_batch, BatchWindows, PaddedBatch, Window};

use crate::config::DatasetOptions;
use crate::error::Error;
use crate::quantize::Quantizer;
use std::path::{Path, PathBuf};

/// Lazy stream of training windows.
///
/// Yields `Err` at most once (the first decoding failure) and then ends.
#[derive(Debug, Clone)]
pub struct Dataset {
    batches: Batches<EpochAudio>,
    current: Option<BatchWindows>,
    seq_len: usize,
    overlap: usize,
    quantizer: Quantizer,
}

impl Iterator for Dataset {
    type Item = anyhow::Result<Window>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(window) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(window));
            }
            match self.batches.next()? {
                Ok(batch) => {
                    let padded = pad_batch(batch, self.seq_len, self.overlap);
                    log::debug!(
                        "batch of {} sequences padded to {} samples",
                        padded.batch_size(),
                        padded.num_samples()
                    );
                    self.current = Some(window_batch(padded, self.seq_len, self.quantizer));
                }
                Err(err) => {
                    self.current = None;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Build the window stream over every matching file under `data_dir`.
///
/// # Errors
///
/// [`Error::EmptyDataset`] when no file matches `options.pattern`, raised here
/// rather than during iteration; [`Error::InvalidConfig`] for unusable options.
pub fn build_dataset(
    data_dir: impl AsRef<Path>,
    options: &DatasetOptions,
) -> crate::Result<Dataset> {
    options.validate()?;
    let files = files::discover(data_dir.as_ref(), &options.pattern)?;
    Ok(assemble(files, options))
}

/// Build the window stream over an explicit file list, e.g. one side of a [`DatasetSplit`].
pub fn build_dataset_from_files(
    files: Vec<PathBuf>,
    options: &DatasetOptions,
) -> crate::Result<Dataset> {
    options.validate()?;
    if files.is_empty() {
        return Err(Error::InvalidConfig("dataset file list is empty".into()));
    }
    Ok(assemble(files, options))
}

fn assemble(files: Vec<PathBuf>, options: &DatasetOptions) -> Dataset {
    log::debug!(
        "dataset over {} files: batch_size={} seq_len={} overlap={} epochs={:?}",
        files.len(),
        options.batch_size,
        options.seq_len,
        options.overlap,
        options.num_epochs
    );
    let epochs = EpochFiles::new(files, options.num_epochs, options.shuffle_seed);
    let audio = EpochAudio::new(epochs, options.target_sample_rate);
    Dataset {
        batches: Batches::new(audio, options.batch_size, options.drop_remainder),
        current: None,
        seq_len: options.seq_len,
        overlap: options.overlap,
        quantizer: options.quantizer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::io::WavIo;
    use crate::quantize::QuantType;
    use tempfile::tempdir;

    fn options(batch_size: usize) -> DatasetOptions {
        let quantizer = Quantizer::new(QuantType::MuLaw, 256).unwrap();
        let mut options = DatasetOptions::new(batch_size, 8, 2, quantizer);
        options.shuffle_seed = Some(11);
        options
    }

    #[test]
    fn empty_directory_fails_before_iteration() {
        let dir = tempdir().expect("tempdir");
        let err = build_dataset(dir.path(), &options(1)).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset { .. }));
    }

    #[test]
    fn counts_windows_across_epochs() {
        let dir = tempdir().expect("tempdir");
        for (idx, len) in [33usize, 40, 17].iter().enumerate() {
            let samples = vec![0.1_f32; *len];
            WavIo::write_mono(dir.path().join(format!("{idx}.wav")), &samples, 8000)
                .expect("write");
        }
        // batch_size 1: windows per file are len / 8 = 4, 5, 2.
        let mut opts = options(1);
        opts.num_epochs = Some(2);
        let windows: Vec<_> = build_dataset(dir.path(), &opts)
            .expect("dataset")
            .collect::<anyhow::Result<_>>()
            .expect("windows");
        assert_eq!(windows.len(), 2 * (4 + 5 + 2));
    }

    #[test]
    fn decode_failure_surfaces_as_error() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.wav"), b"not a wav").expect("write");
        let mut dataset = build_dataset(dir.path(), &options(1)).expect("dataset");
        assert!(dataset.next().unwrap().is_err());
        assert!(dataset.next().is_none());
    }

    #[test]
    fn empty_file_list_is_rejected() {
        let err = build_dataset_from_files(Vec::new(), &options(2)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
