//! Construction parameters for video sessions and audio decoders.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Packed 3-bytes-per-pixel channel order of converted video frames.
///
/// Parsed leniently: any name other than `RGB` selects [`OutputFormat::Bgr`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    Rgb,
    #[default]
    Bgr,
}

impl OutputFormat {
    /// Bytes per packed pixel (one per channel).
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Resolve a host-supplied name. Unrecognized names fall back to BGR.
    pub fn from_name(name: &str) -> Self {
        match name {
            "RGB" => Self::Rgb,
            "BGR" => Self::Bgr,
            other => {
                tracing::debug!(name = other, "Unknown output format, using BGR");
                Self::Bgr
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
        }
    }

    /// Row stride in bytes of a tightly packed frame.
    pub fn row_stride(self, width: u32) -> usize {
        width as usize * Self::BYTES_PER_PIXEL
    }

    /// Exact buffer size in bytes for a `width` x `height` frame.
    pub fn buffer_size(self, width: u32, height: u32) -> usize {
        self.row_stride(width) * height as usize
    }
}

impl From<String> for OutputFormat {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<OutputFormat> for String {
    fn from(format: OutputFormat) -> Self {
        format.name().to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Video decode session configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub output_format: OutputFormat,
    /// Keep the native decoder quiet. When false its log level is raised.
    pub suppress_native_logs: bool,
    /// Upper bound on bytes carried over to the next call when no packet
    /// boundary could be established in the tail of a chunk.
    pub max_retained_bytes: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Bgr,
            suppress_native_logs: true,
            max_retained_bytes: 1 << 20,
        }
    }
}

impl VideoConfig {
    pub fn new(output_format: &str, suppress_native_logs: bool) -> Self {
        Self {
            output_format: OutputFormat::from_name(output_format),
            suppress_native_logs,
            ..Self::default()
        }
    }
}

/// Audio decoder configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Maximum samples per channel decodable from one packet.
    pub frame_size: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_size: 960,
            sample_rate: 48_000,
            channels: 1,
        }
    }
}

impl AudioConfig {
    pub fn new(frame_size: u32, sample_rate: u32, channels: u32) -> Self {
        Self {
            frame_size,
            sample_rate,
            channels,
        }
    }

    /// Reject zero-valued parameters before any codec context is created.
    pub fn validate(&self) -> Result<()> {
        if self.frame_size == 0 {
            return Err(CodecError::InvalidConfig("frame_size must be positive".into()));
        }
        if self.sample_rate == 0 {
            return Err(CodecError::InvalidConfig("sample_rate must be positive".into()));
        }
        if self.channels == 0 {
            return Err(CodecError::InvalidConfig("channels must be positive".into()));
        }
        Ok(())
    }

    /// Capacity of the interleaved sample buffer.
    pub fn max_samples(&self) -> usize {
        self.frame_size as usize * self.channels as usize
    }
}
