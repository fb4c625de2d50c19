//! `mc-audio`: Opus packets in, 16-bit little-endian PCM out.
//!
//! One packet per call. A packet that fails to decode yields an empty
//! buffer rather than an error, so a lossy network stream keeps playing.

pub mod decoder;

pub use decoder::{pcm_le_bytes, AudioDecoder};
