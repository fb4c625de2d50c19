//! Borrowed views of decoded pictures.
//!
//! A [`Picture`] points at planes owned by the decoder. The next decode call
//! overwrites them, so the lifetime ties every view to the borrow of the
//! decoder that produced it. Converters copy out before returning; nothing
//! handed to a caller ever references these planes.

use std::os::raw::c_int;

use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use mc_common::{CodecError, Result};

/// One plane of pixel data.
#[derive(Copy, Clone, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    /// Bytes between the starts of consecutive rows (may include padding).
    pub stride: usize,
}

/// Native decoder output for one packet.
#[derive(Clone, Debug)]
pub struct Picture<'a> {
    pub width: u32,
    pub height: u32,
    pub format: Pixel,
    pub planes: Vec<Plane<'a>>,
}

impl<'a> Picture<'a> {
    /// View the planes of an FFmpeg frame.
    pub fn from_frame(frame: &'a VideoFrame) -> Self {
        let planes = (0..frame.planes())
            .map(|index| Plane {
                data: frame.data(index),
                stride: frame.stride(index),
            })
            .collect();

        Self {
            width: frame.width(),
            height: frame.height(),
            format: frame.format(),
            planes,
        }
    }

    /// Check that every plane the format needs is present and large enough.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "empty dimensions {}x{}",
                self.width, self.height
            )));
        }

        let native = ffi::AVPixelFormat::from(self.format);
        // SAFETY: both calls only read FFmpeg's static pixel format table.
        let (descriptor, plane_count) = unsafe {
            (
                ffi::av_pix_fmt_desc_get(native),
                ffi::av_pix_fmt_count_planes(native),
            )
        };
        if descriptor.is_null() || plane_count <= 0 {
            return Err(invalid(format!("unknown pixel format {:?}", self.format)));
        }

        let plane_count = plane_count as usize;
        if self.planes.len() < plane_count {
            return Err(invalid(format!(
                "{:?} needs {plane_count} planes, got {}",
                self.format,
                self.planes.len()
            )));
        }

        // SAFETY: descriptor is non-null and points into the static table.
        let chroma_shift = unsafe { (*descriptor).log2_chroma_h } as u32;

        for (index, plane) in self.planes.iter().take(plane_count).enumerate() {
            if c_int::try_from(plane.stride).is_err() {
                return Err(invalid(format!("plane {index} stride {} too large", plane.stride)));
            }

            // Planes 1 and 2 carry subsampled chroma in planar and semi-planar layouts.
            let rows = if index == 1 || index == 2 {
                (self.height + (1 << chroma_shift) - 1) >> chroma_shift
            } else {
                self.height
            };

            let needed = plane.stride * rows as usize;
            if plane.data.len() < needed {
                return Err(invalid(format!(
                    "plane {index} too small: need {needed}, got {}",
                    plane.data.len()
                )));
            }
        }

        Ok(())
    }
}

fn invalid(reason: String) -> CodecError {
    CodecError::InvalidPicture { reason }
}
