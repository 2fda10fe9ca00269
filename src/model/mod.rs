//! The frame-stepping model seen by the generation driver.
//!
//! The driver never looks inside the network: it warms it up, loads weights
//! and asks for one frame at a time. [`prior::SymbolPriorModel`] is the
//! baseline implementation shipped with the crate.

pub mod prior;

pub use prior::{fit_symbol_prior, save_symbol_prior, SymbolPriorModel, PRIOR_LOGITS};

use crate::quantize::QuantType;
use anyhow::Result;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use std::path::Path;

/// What a weight restore matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Parameters restored from the checkpoint.
    pub loaded: Vec<String>,
    /// Parameters left at their initial values.
    pub missing: Vec<String>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Autoregressive model advancing `batch_size` sequences by one big frame per call.
pub trait FrameModel<B: Backend> {
    /// Number of sequences stepped together.
    fn batch_size(&self) -> usize;

    /// Samples produced per step.
    fn big_frame_size(&self) -> usize;

    fn quant_type(&self) -> QuantType;

    fn q_levels(&self) -> usize;

    /// Run once on `[batch, seq_len + big_frame_size, 1]` zeros so lazily built
    /// parameters exist before weights are restored.
    fn warm_up(&mut self, input: Tensor<B, 3, Int>) -> Result<()>;

    /// Restore weights from `path`. With `allow_partial` parameters absent from
    /// the checkpoint keep their current values and are listed in the report.
    fn load_weights(&mut self, path: &Path, allow_partial: bool) -> Result<LoadReport>;

    /// Produce the next `[batch, big_frame_size, 1]` frame.
    ///
    /// `context` holds every frame so far, seed first; `temperature` is
    /// `[batch, 1]` with one sampling temperature per sequence.
    fn advance_frame(
        &mut self,
        context: &[Tensor<B, 3, Int>],
        temperature: Tensor<B, 2>,
    ) -> Result<Tensor<B, 3, Int>>;
}
