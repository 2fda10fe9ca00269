//! Frame accumulator owned by the generation driver.
//!
//! Frames are `[batch, big_frame_size, 1]` integer code tensors. The first
//! frame is the seed (quantized silence or seed audio); every later frame is
//! model output. The whole history is handed to the model as context.

use anyhow::Result;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// Ordered frames of one `generate` call.
#[derive(Debug)]
pub struct GenerationState<B: Backend> {
    frames: Vec<Tensor<B, 3, Int>>,
    batch_size: usize,
    big_frame_size: usize,
}

impl<B: Backend> GenerationState<B> {
    /// Start a history from the seed frame.
    pub fn new(seed: Tensor<B, 3, Int>) -> Self {
        let [batch_size, big_frame_size, _] = seed.dims();
        Self {
            frames: vec![seed],
            batch_size,
            big_frame_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn big_frame_size(&self) -> usize {
        self.big_frame_size
    }

    /// All frames so far, seed first.
    pub fn frames(&self) -> &[Tensor<B, 3, Int>] {
        &self.frames
    }

    /// Frames produced by the model (the seed excluded).
    pub fn generated_frames(&self) -> usize {
        self.frames.len() - 1
    }

    /// Append a model frame after checking it has the seed's shape.
    pub fn push(&mut self, frame: Tensor<B, 3, Int>) -> Result<()> {
        let dims = frame.dims();
        let expected = [self.batch_size, self.big_frame_size, 1];
        if dims != expected {
            anyhow::bail!("model produced a frame of shape {dims:?}, expected {expected:?}");
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Concatenate along time and split into one code sequence per batch member.
    ///
    /// The seed frame is dropped, so each sequence holds
    /// `generated_frames() * big_frame_size` codes.
    pub fn into_sequences(self) -> Result<Vec<Vec<i64>>> {
        let Self {
            frames,
            batch_size,
            big_frame_size,
        } = self;
        let total = frames.len() * big_frame_size;
        let codes = Tensor::cat(frames, 1)
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .map_err(|err| anyhow::anyhow!("failed to read generated codes: {err:?}"))?;
        if codes.len() != batch_size * total {
            anyhow::bail!(
                "expected {} generated codes, found {}",
                batch_size * total,
                codes.len()
            );
        }
        Ok(codes
            .chunks(total)
            .map(|row| row[big_frame_size..].to_vec())
            .collect())
    }
}
