//! Reversible mapping between float audio samples and integer symbol codes.
//!
//! Samples in `[-1, 1]` are mapped to codes in `[0, levels)`. Two transforms are
//! supported: mu-law companding (logarithmic, finer resolution near zero) and a
//! uniform linear mapping. Both quantize by rounding to the nearest of `levels`
//! evenly spaced bins over the (companded) range, so dequantizing returns the
//! bin centre and the round trip error stays within one step.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quantization transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantType {
    /// Logarithmic companding with `mu = levels - 1`.
    #[serde(rename = "mu-law")]
    MuLaw,
    /// Uniform bins over `[-1, 1]`.
    #[serde(rename = "linear")]
    Linear,
}

impl QuantType {
    /// Name used in configs and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            QuantType::MuLaw => "mu-law",
            QuantType::Linear => "linear",
        }
    }
}

impl fmt::Display for QuantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mu-law" | "mulaw" | "mu_law" => Ok(QuantType::MuLaw),
            "linear" => Ok(QuantType::Linear),
            other => Err(Error::InvalidConfig(format!(
                "unknown quantization type '{other}' (expected 'mu-law' or 'linear')"
            ))),
        }
    }
}

/// Codec for a fixed transform and alphabet size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    q_type: QuantType,
    levels: usize,
}

impl Quantizer {
    /// Create a codec. `levels` must be at least 2.
    pub fn new(q_type: QuantType, levels: usize) -> Result<Self> {
        if levels < 2 {
            return Err(Error::InvalidConfig(format!(
                "quantization levels must be >= 2, got {levels}"
            )));
        }
        Ok(Self { q_type, levels })
    }

    pub fn q_type(&self) -> QuantType {
        self.q_type
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Code for quantized silence, used to fill the bootstrap frame.
    pub fn midpoint(&self) -> i64 {
        (self.levels / 2) as i64
    }

    fn max_code(&self) -> f64 {
        (self.levels - 1) as f64
    }

    /// Quantize one sample. Out-of-range input is clamped to `[-1, 1]`.
    pub fn encode(&self, sample: f32) -> i64 {
        let x = if sample.is_nan() {
            0.0
        } else {
            f64::from(sample).clamp(-1.0, 1.0)
        };
        let mu = self.max_code();
        let companded = match self.q_type {
            QuantType::MuLaw => x.signum() * (mu * x.abs()).ln_1p() / mu.ln_1p(),
            QuantType::Linear => x,
        };
        let code = ((companded + 1.0) / 2.0 * mu + 0.5).floor();
        code.clamp(0.0, mu) as i64
    }

    /// Map a code back to its bin centre. Codes outside the alphabet are clamped.
    pub fn decode(&self, code: i64) -> f32 {
        let mu = self.max_code();
        let y = (code.clamp(0, self.levels as i64 - 1) as f64) / mu * 2.0 - 1.0;
        let x = match self.q_type {
            QuantType::MuLaw => y.signum() * ((1.0 + mu).powf(y.abs()) - 1.0) / mu,
            QuantType::Linear => y,
        };
        x as f32
    }

    pub fn quantize(&self, samples: &[f32]) -> Vec<i64> {
        samples.iter().map(|&s| self.encode(s)).collect()
    }

    pub fn dequantize(&self, codes: &[i64]) -> Vec<f32> {
        codes.iter().map(|&c| self.decode(c)).collect()
    }
}

/// Quantize `samples` with the given transform and alphabet size.
pub fn quantize(samples: &[f32], q_type: QuantType, levels: usize) -> Result<Vec<i64>> {
    Ok(Quantizer::new(q_type, levels)?.quantize(samples))
}

/// Inverse of [`quantize`].
pub fn dequantize(codes: &[i64], q_type: QuantType, levels: usize) -> Result<Vec<f32>> {
    Ok(Quantizer::new(q_type, levels)?.dequantize(codes))
}
