//! Audio file collaborators for the dataset pipeline and the generator.
//!
//! These helpers keep waveform handling separate from the core pipeline:
//! decoding WAV files into mono float buffers, writing generated sequences back
//! out, and converting sample rates or channel counts on request.

pub mod io;
pub mod resample;

pub use io::WavIo;
pub use resample::AudioResampler;
