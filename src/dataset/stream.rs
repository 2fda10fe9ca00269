//! Lazy audio sources: per-file decoding, epoch repetition and batching.
//!
//! Every stage is a pull-based iterator; nothing is decoded until a consumer asks
//! for the next element. A decoding error is yielded once and ends the stream.

use crate::audio::io::WavIo;
use crate::perf::{self, Metric};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use super::files;

/// Decode one file into a mono buffer, optionally resampled.
fn decode(path: &Path, target_rate: Option<u32>) -> Result<Vec<f32>> {
    let _span = perf::span(Metric::DatasetDecode);
    let (samples, rate) = WavIo::read_mono(path, target_rate)?;
    log::debug!(
        "decoded '{}' ({} samples at {rate} Hz)",
        path.display(),
        samples.len()
    );
    perf::add_count(Metric::DatasetFiles, 1);
    Ok(samples)
}

/// One decoded buffer per path, in the order the path iterator yields them.
///
/// Defaults to a fixed file list; over [`EpochFiles`] it becomes [`EpochAudio`].
#[derive(Debug, Clone)]
pub struct AudioStream<I = std::vec::IntoIter<PathBuf>> {
    files: I,
    target_rate: Option<u32>,
    failed: bool,
}

impl<I> AudioStream<I>
where
    I: Iterator<Item = PathBuf>,
{
    pub fn new(files: I, target_rate: Option<u32>) -> Self {
        Self {
            files,
            target_rate,
            failed: false,
        }
    }
}

impl AudioStream {
    pub fn from_files(files: Vec<PathBuf>, target_rate: Option<u32>) -> Self {
        Self::new(files.into_iter(), target_rate)
    }
}

impl<I> Iterator for AudioStream<I>
where
    I: Iterator<Item = PathBuf>,
{
    type Item = Result<Vec<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let path = self.files.next()?;
        let decoded = decode(&path, self.target_rate);
        self.failed = decoded.is_err();
        Some(decoded)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            self.files.size_hint()
        }
    }
}

/// Discover the files under `directory`, shuffle them, and decode them lazily.
///
/// # Errors
///
/// Fails immediately with [`crate::Error::EmptyDataset`] when nothing matches.
pub fn load_audio_stream(
    directory: impl AsRef<Path>,
    pattern: &str,
    target_rate: Option<u32>,
    shuffle_seed: Option<u64>,
) -> crate::Result<AudioStream> {
    let mut files = files::discover(directory.as_ref(), pattern)?;
    files.shuffle(&mut make_rng(shuffle_seed));
    Ok(AudioStream::from_files(files, target_rate))
}

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Repeats a file list for a number of epochs, reshuffling at each epoch start.
#[derive(Debug, Clone)]
pub struct EpochFiles {
    files: Vec<PathBuf>,
    num_epochs: Option<usize>,
    epoch: usize,
    position: usize,
    rng: StdRng,
}

impl EpochFiles {
    /// `num_epochs = None` repeats forever.
    pub fn new(files: Vec<PathBuf>, num_epochs: Option<usize>, shuffle_seed: Option<u64>) -> Self {
        Self {
            files,
            num_epochs,
            epoch: 0,
            position: 0,
            rng: make_rng(shuffle_seed),
        }
    }

    /// Zero-based index of the epoch the next file belongs to.
    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

impl Iterator for EpochFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if self.files.is_empty() {
            return None;
        }
        if self.position == self.files.len() {
            self.epoch += 1;
            self.position = 0;
        }
        if self.num_epochs.is_some_and(|limit| self.epoch >= limit) {
            return None;
        }
        if self.position == 0 {
            log::debug!("starting epoch {} over {} files", self.epoch + 1, self.files.len());
            self.files.shuffle(&mut self.rng);
        }
        let path = self.files[self.position].clone();
        self.position += 1;
        Some(path)
    }
}

/// Decodes the files of an [`EpochFiles`] sequence on demand.
pub type EpochAudio = AudioStream<EpochFiles>;

/// Groups buffers into batches of `batch_size`.
///
/// The final batch may be under-full; it is dropped when `drop_remainder` is set.
#[derive(Debug, Clone)]
pub struct Batches<I> {
    inner: I,
    batch_size: usize,
    drop_remainder: bool,
    done: bool,
}

impl<I> Batches<I> {
    pub fn new(inner: I, batch_size: usize, drop_remainder: bool) -> Self {
        Self {
            inner,
            batch_size,
            drop_remainder,
            done: batch_size == 0,
        }
    }
}

impl<I> Iterator for Batches<I>
where
    I: Iterator<Item = Result<Vec<f32>>>,
{
    type Item = Result<Vec<Vec<f32>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.inner.next() {
                Some(Ok(buffer)) => batch.push(buffer),
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if batch.is_empty() || (self.drop_remainder && batch.len() < self.batch_size) {
            if !batch.is_empty() {
                log::debug!("dropping under-full final batch of {} sequences", batch.len());
            }
            return None;
        }
        Some(Ok(batch))
    }
}
