//! Conversion of decoded pictures into packed RGB/BGR buffers.
//!
//! Building a swscale context is expensive, so the converter keeps the last
//! one and rebuilds only when the source `(width, height, format)` changes.
//! Output is always tightly packed: `stride == width * 3` and
//! `data.len() == stride * height`.

use std::os::raw::c_int;
use std::ptr;

use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as ScalingContext, Flags as ScalingFlags};
use tracing::debug;

use mc_common::{CodecError, OutputFormat, Result};

use crate::picture::Picture;

/// A caller-owned packed frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertedFrame {
    /// `stride * height` bytes of packed pixels.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes.
    pub stride: usize,
}

/// Turns a lent picture into an owned frame before the decoder reuses its planes.
pub trait FrameConverter {
    fn convert(&mut self, picture: &Picture<'_>) -> Result<ConvertedFrame>;
}

/// Source shape a scaling context was built for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct ScalerKey {
    width: u32,
    height: u32,
    format: Pixel,
}

struct CachedScaler {
    key: ScalerKey,
    context: ScalingContext,
}

/// swscale-backed converter with a single cached context.
pub struct PixelFormatConverter {
    output: OutputFormat,
    cached: Option<CachedScaler>,
    rebuilds: u64,
}

// SAFETY: the swscale context is owned exclusively and only used through
// &mut self; swscale contexts carry no thread affinity.
unsafe impl Send for PixelFormatConverter {}

impl std::fmt::Debug for PixelFormatConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelFormatConverter")
            .field("output", &self.output)
            .field("cached", &self.cached.as_ref().map(|c| c.key))
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

impl PixelFormatConverter {
    pub fn new(output: OutputFormat) -> Self {
        Self {
            output,
            cached: None,
            rebuilds: 0,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
    }

    /// Number of scaling contexts built so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    fn target_pixel(&self) -> Pixel {
        match self.output {
            OutputFormat::Rgb => Pixel::RGB24,
            OutputFormat::Bgr => Pixel::BGR24,
        }
    }

    /// Return a context for `key`, rebuilding only on a shape change.
    fn scaler(&mut self, key: ScalerKey) -> Result<&mut ScalingContext> {
        let stale = self.cached.as_ref().map_or(true, |cached| cached.key != key);

        if stale {
            // Free the old context before building its replacement.
            self.cached = None;

            let context = ScalingContext::get(
                key.format,
                key.width,
                key.height,
                self.target_pixel(),
                key.width,
                key.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|e| {
                CodecError::convert(format!(
                    "sws_getContext {:?} {}x{} -> {}: {e}",
                    key.format, key.width, key.height, self.output
                ))
            })?;

            self.rebuilds += 1;
            debug!(
                width = key.width,
                height = key.height,
                format = ?key.format,
                output = %self.output,
                "Built scaling context"
            );

            self.cached = Some(CachedScaler { key, context });
        }

        self.cached
            .as_mut()
            .map(|cached| &mut cached.context)
            .ok_or_else(|| CodecError::convert("scaling context missing"))
    }
}

impl FrameConverter for PixelFormatConverter {
    fn convert(&mut self, picture: &Picture<'_>) -> Result<ConvertedFrame> {
        picture.validate()?;

        let key = ScalerKey {
            width: picture.width,
            height: picture.height,
            format: picture.format,
        };

        let stride = self.output.row_stride(picture.width);
        let size = self.output.buffer_size(picture.width, picture.height);
        let dst_stride = c_int::try_from(stride)
            .map_err(|_| CodecError::convert(format!("row stride {stride} too large")))?;

        let mut src_data = [ptr::null::<u8>(); 4];
        let mut src_stride: [c_int; 4] = [0; 4];
        for (index, plane) in picture.planes.iter().take(4).enumerate() {
            src_data[index] = plane.data.as_ptr();
            // validate() has checked every stride fits in c_int.
            src_stride[index] = plane.stride as c_int;
        }

        let scaler = self.scaler(key)?;

        // Fresh buffer per frame; ownership moves to the caller.
        let mut data = vec![0u8; size];
        let dst_data = [data.as_mut_ptr(), ptr::null_mut(), ptr::null_mut(), ptr::null_mut()];
        let dst_stride = [dst_stride, 0, 0, 0];

        // SAFETY: source planes were validated against the format and height;
        // the destination holds exactly `stride * height` bytes for one
        // packed plane; the context was built for this exact shape.
        let rows = unsafe {
            ffi::sws_scale(
                scaler.as_mut_ptr(),
                src_data.as_ptr(),
                src_stride.as_ptr(),
                0,
                picture.height as c_int,
                dst_data.as_ptr(),
                dst_stride.as_ptr(),
            )
        };

        if rows != picture.height as c_int {
            return Err(CodecError::convert(format!(
                "sws_scale produced {rows} of {} rows",
                picture.height
            )));
        }

        Ok(ConvertedFrame {
            data,
            width: picture.width,
            height: picture.height,
            stride,
        })
    }
}
