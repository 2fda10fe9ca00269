//! SafeTensors checkpoint loading and saving.
//!
//! Checkpoints are flat name -> tensor maps. Loading is matched against the
//! tensor names a model expects; optimizer slots stored alongside the weights
//! are ignored, and missing weights can be tolerated for partial restores.

use crate::perf::{self, Metric};
use anyhow::{Context, Result};
use safetensors::{Dtype, SafeTensors};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Prefix of tensors that only matter to the training optimizer.
pub const OPTIMIZER_PREFIX: &str = "optimizer.";

/// Raw tensor payload extracted from a SafeTensors file.
#[derive(Debug, Clone)]
pub struct TensorData {
    /// Scalar dtype in the file.
    pub dtype: Dtype,
    /// Shape as a list of dimensions.
    pub shape: Vec<usize>,
    /// Raw byte buffer in row-major order.
    pub data: Vec<u8>,
}

impl TensorData {
    /// Create TensorData from a safetensors TensorView.
    pub fn from_safetensor(tensor: safetensors::tensor::TensorView<'_>) -> Self {
        Self {
            dtype: tensor.dtype(),
            shape: tensor.shape().to_vec(),
            data: tensor.data().to_vec(),
        }
    }

    /// Number of scalar elements.
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Decode the payload as `f32`, widening half-precision formats.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        let values = match self.dtype {
            Dtype::F32 => self
                .data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            Dtype::F64 => self
                .data
                .chunks_exact(8)
                .map(|c| {
                    f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
                })
                .collect(),
            Dtype::BF16 => self
                .data
                .chunks_exact(2)
                .map(|c| f32::from_bits(u32::from(u16::from_le_bytes([c[0], c[1]])) << 16))
                .collect(),
            other => anyhow::bail!("Unsupported tensor dtype {other:?}"),
        };
        Ok(values)
    }
}

/// Tensors read from a checkpoint plus how they matched the expected names.
#[derive(Debug, Default)]
pub struct Checkpoint {
    /// Expected tensors that were found.
    pub tensors: HashMap<String, TensorData>,
    /// Expected tensors absent from the file.
    pub missing: Vec<String>,
    /// Tensors in the file that nothing asked for (optimizer state excluded).
    pub unexpected: Vec<String>,
}

impl Checkpoint {
    pub fn get(&self, name: &str) -> Option<&TensorData> {
        self.tensors.get(name)
    }

    /// True when every expected tensor was present.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Load the `expected` tensors from a SafeTensors checkpoint.
///
/// With `allow_partial` a checkpoint missing some expected tensors still loads
/// and the gaps are reported in [`Checkpoint::missing`]; otherwise it is an error.
pub fn load_checkpoint(
    path: impl AsRef<Path>,
    expected: &[&str],
    allow_partial: bool,
) -> Result<Checkpoint> {
    let _span = perf::span(Metric::CheckpointLoad);
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("failed to read checkpoint '{}'", path.display()))?;
    let tensors = SafeTensors::deserialize(&bytes)
        .with_context(|| format!("invalid safetensors checkpoint '{}'", path.display()))?;

    let mut checkpoint = Checkpoint::default();
    for name in tensors.names() {
        if expected.contains(&name.as_str()) {
            let tensor = tensors.tensor(name)?;
            checkpoint
                .tensors
                .insert(name.to_string(), TensorData::from_safetensor(tensor));
        } else if !name.starts_with(OPTIMIZER_PREFIX) {
            checkpoint.unexpected.push(name.to_string());
        }
    }
    checkpoint.missing = expected
        .iter()
        .filter(|name| !checkpoint.tensors.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    checkpoint.unexpected.sort();

    for name in &checkpoint.unexpected {
        log::warn!("ignoring unexpected tensor '{name}' in '{}'", path.display());
    }
    if !checkpoint.is_complete() {
        if !allow_partial {
            anyhow::bail!(
                "checkpoint '{}' is missing tensors: {}",
                path.display(),
                checkpoint.missing.join(", ")
            );
        }
        log::warn!(
            "partial restore from '{}'; missing: {}",
            path.display(),
            checkpoint.missing.join(", ")
        );
    }
    Ok(checkpoint)
}

/// Write `f32` tensors (name -> (shape, values)) to a SafeTensors file.
pub fn save_checkpoint(
    path: impl AsRef<Path>,
    tensors: &BTreeMap<String, (Vec<usize>, Vec<f32>)>,
) -> Result<()> {
    let mut buffers = Vec::with_capacity(tensors.len());
    for (name, (shape, values)) in tensors {
        if shape.iter().product::<usize>() != values.len() {
            anyhow::bail!(
                "tensor '{name}' has {} values but shape {shape:?}",
                values.len()
            );
        }
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        buffers.push((name.as_str(), shape.clone(), bytes));
    }
    let mut views = HashMap::new();
    for (name, shape, bytes) in &buffers {
        let view = safetensors::tensor::TensorView::new(Dtype::F32, shape.clone(), bytes)?;
        views.insert(name.to_string(), view);
    }
    let serialized = safetensors::serialize(&views, &None)?;
    let path = path.as_ref();
    fs::write(path, serialized)
        .with_context(|| format!("failed to write checkpoint '{}'", path.display()))?;
    Ok(())
}
