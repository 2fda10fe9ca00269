//! Padding and overlapping-window extraction for training batches.

use crate::perf::{self, Metric};
use crate::quantize::Quantizer;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

/// A batch of sequences sharing one length, with `overlap` leading zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedBatch {
    sequences: Vec<Vec<f32>>,
    overlap: usize,
}

impl PaddedBatch {
    pub fn sequences(&self) -> &[Vec<f32>] {
        &self.sequences
    }

    /// Number of sequences in the batch.
    pub fn batch_size(&self) -> usize {
        self.sequences.len()
    }

    /// Samples per sequence, padding included.
    pub fn num_samples(&self) -> usize {
        self.sequences.first().map_or(0, Vec::len)
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Truncate every sequence to a common multiple of `seq_len` and prepend `overlap` zeros.
///
/// The usable length is the shortest member's length rounded down to a multiple of
/// `seq_len`, so all members end up the same size.
pub fn pad_batch(batch: Vec<Vec<f32>>, seq_len: usize, overlap: usize) -> PaddedBatch {
    let shortest = batch.iter().map(Vec::len).min().unwrap_or(0);
    let usable = if seq_len == 0 {
        0
    } else {
        shortest / seq_len * seq_len
    };
    let sequences = batch
        .into_iter()
        .map(|samples| {
            let mut padded = Vec::with_capacity(overlap + usable);
            padded.resize(overlap, 0.0);
            padded.extend_from_slice(&samples[..usable]);
            padded
        })
        .collect();
    PaddedBatch { sequences, overlap }
}

/// Quantized training pair. `y` is the trailing `seq_len` codes of `x`.
///
/// Both are stored row-major with one row per batch member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    batch_size: usize,
    seq_len: usize,
    overlap: usize,
    x: Vec<i64>,
    y: Vec<i64>,
}

impl Window {
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Input codes of batch member `index` (`seq_len + overlap` long).
    pub fn x(&self, index: usize) -> &[i64] {
        let len = self.seq_len + self.overlap;
        &self.x[index * len..(index + 1) * len]
    }

    /// Target codes of batch member `index` (`seq_len` long).
    pub fn y(&self, index: usize) -> &[i64] {
        &self.y[index * self.seq_len..(index + 1) * self.seq_len]
    }

    /// Convert to `[batch, seq_len + overlap, 1]` and `[batch, seq_len, 1]` tensors.
    pub fn to_tensors<B: Backend>(
        &self,
        device: &B::Device,
    ) -> (Tensor<B, 3, Int>, Tensor<B, 3, Int>) {
        let x = Tensor::from_data(
            TensorData::new(
                self.x.clone(),
                [self.batch_size, self.seq_len + self.overlap, 1],
            ),
            device,
        );
        let y = Tensor::from_data(
            TensorData::new(self.y.clone(), [self.batch_size, self.seq_len, 1]),
            device,
        );
        (x, y)
    }
}

/// Windows of one padded batch, produced on demand.
#[derive(Debug, Clone)]
pub struct BatchWindows {
    batch: PaddedBatch,
    seq_len: usize,
    quantizer: Quantizer,
    position: usize,
}

/// Slide over `batch` in steps of `seq_len`, starting at its `overlap` offset.
///
/// Window `k` covers `[overlap + k * seq_len - overlap, overlap + (k + 1) * seq_len)`.
/// A tail shorter than `seq_len` produces no window.
pub fn window_batch(batch: PaddedBatch, seq_len: usize, quantizer: Quantizer) -> BatchWindows {
    let position = batch.overlap;
    BatchWindows {
        batch,
        seq_len,
        quantizer,
        position,
    }
}

impl Iterator for BatchWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let overlap = self.batch.overlap;
        let start = self.position;
        let end = start + self.seq_len;
        if self.seq_len == 0 || self.batch.batch_size() == 0 || end > self.batch.num_samples() {
            return None;
        }
        self.position = end;

        let batch_size = self.batch.batch_size();
        let mut x = Vec::with_capacity(batch_size * (self.seq_len + overlap));
        let mut y = Vec::with_capacity(batch_size * self.seq_len);
        for sequence in &self.batch.sequences {
            let codes = self.quantizer.quantize(&sequence[start - overlap..end]);
            y.extend_from_slice(&codes[overlap..]);
            x.extend(codes);
        }
        perf::add_count(Metric::DatasetWindows, 1);
        Some(Window {
            batch_size,
            seq_len: self.seq_len,
            overlap,
            x,
            y,
        })
    }
}
