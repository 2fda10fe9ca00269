//! Naming of generated audio files.

use std::path::{Path, PathBuf};

/// Marker used when a checkpoint name carries no epoch number.
pub const UNKNOWN_EPOCH: &str = "unknown";

/// Epoch number encoded as the trailing digits of a checkpoint file name.
///
/// `model.ckpt-42.safetensors` gives `Some("42")`; a `.safetensors` extension
/// is stripped first.
pub fn checkpoint_epoch(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(".safetensors").unwrap_or(name);
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    (digits > 0).then(|| stem[stem.len() - digits..].to_string())
}

/// Output file for one sequence: `{base}_e={epoch}[({index})]_t={temperature}.wav`.
///
/// `base` is `output_path` up to its first `.wav`. The index is only written
/// when several sequences are generated together.
pub fn output_file_name(
    output_path: &Path,
    epoch: &str,
    seq_index: Option<usize>,
    temperature: f64,
) -> PathBuf {
    let raw = output_path.to_string_lossy();
    let base = raw.split(".wav").next().unwrap_or_default();
    let index = seq_index.map(|i| format!("({i})")).unwrap_or_default();
    let temperature = python_float(temperature);
    PathBuf::from(format!("{base}_e={epoch}{index}_t={temperature}.wav"))
}

/// Shortest round-trip text of `value` with Python's float layout: `1.0`, `0.95`,
/// and a signed two-digit exponent outside `[1e-4, 1e16)` (`1e-05`, `2.5e+16`).
fn python_float(value: f64) -> String {
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format!("{value:?}");
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return format!("{value:?}");
    };
    if value == 0.0 || !value.is_finite() || (-4..16).contains(&exponent) {
        return format!("{value:?}");
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}
