//! Incremental NAL-unit boundary detection.
//!
//! A parser is fed whatever bytes the caller has and reports how many it
//! consumed and, when a unit boundary was established, the complete unit.
//! Units that straddle chunk boundaries are buffered inside the parser, so
//! a reported packet may be a view into parser-owned memory rather than into
//! the input.

use std::os::raw::c_int;
use std::ptr;
use std::slice;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::ffi;
use tracing::warn;

use mc_common::{CodecError, Result};

/// Outcome of one parse call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseStep<'a> {
    /// Input bytes the parser took (buffered or emitted).
    pub consumed: usize,
    /// A complete unit, when one is ready.
    pub packet: Option<&'a [u8]>,
}

/// Stateful bitstream splitter. Persists across decode calls.
pub trait BitstreamParser {
    /// Locate the next complete unit given all bytes from the cursor onwards.
    fn parse<'a>(&'a mut self, input: &'a [u8]) -> ParseStep<'a>;

    /// Release whatever unit is still buffered at end of stream.
    fn finish(&mut self) -> ParseStep<'_> {
        self.parse(&[])
    }
}

// ---------------------------------------------------------------------------
// H264Parser
// ---------------------------------------------------------------------------

/// FFmpeg's H.264 annex-B parser (`av_parser_parse2`).
///
/// Owns a dedicated codec context the parser records stream properties into,
/// so parsing never touches the decode context.
pub struct H264Parser {
    parser: *mut ffi::AVCodecParserContext,
    context: ffmpeg::codec::context::Context,
    units: u64,
}

// SAFETY: the parser context is only reached through &mut self and FFmpeg
// keeps no thread affinity for it.
unsafe impl Send for H264Parser {}

impl std::fmt::Debug for H264Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("H264Parser")
            .field("units", &self.units)
            .finish()
    }
}

impl H264Parser {
    pub fn new() -> Result<Self> {
        ffmpeg::init().map_err(|e| CodecError::init("H264Parser", e))?;

        // The parser reads codec_id from this context, so it must be H.264.
        let codec = ffmpeg::codec::decoder::find(ffmpeg::codec::Id::H264)
            .ok_or_else(|| CodecError::init("H264Parser", "no H.264 decoder in libavcodec"))?;
        let context = ffmpeg::codec::context::Context::new_with_codec(codec);

        // SAFETY: av_parser_init returns null on failure, checked below.
        let parser = unsafe { ffi::av_parser_init(ffi::AVCodecID::AV_CODEC_ID_H264 as c_int) };
        if parser.is_null() {
            return Err(CodecError::init("H264Parser", "av_parser_init failed"));
        }

        Ok(Self {
            parser,
            context,
            units: 0,
        })
    }

    /// Units emitted since construction.
    pub fn units(&self) -> u64 {
        self.units
    }
}

impl BitstreamParser for H264Parser {
    fn parse<'a>(&'a mut self, input: &'a [u8]) -> ParseStep<'a> {
        // Oversized inputs are taken in c_int-sized pieces by the caller's loop.
        let len = input.len().min(c_int::MAX as usize) as c_int;
        let data = if input.is_empty() {
            ptr::null()
        } else {
            input.as_ptr()
        };

        let mut out_data: *mut u8 = ptr::null_mut();
        let mut out_size: c_int = 0;

        // SAFETY: parser and context are valid for the life of self; `data`
        // is readable for `len` bytes (or null with len 0, the flush form).
        let read = unsafe {
            ffi::av_parser_parse2(
                self.parser,
                self.context.as_mut_ptr(),
                &mut out_data,
                &mut out_size,
                data,
                len,
                ffi::AV_NOPTS_VALUE,
                ffi::AV_NOPTS_VALUE,
                0,
            )
        };

        let consumed = usize::try_from(read).unwrap_or_else(|_| {
            warn!(code = read, "av_parser_parse2 returned an error");
            0
        });

        let packet = if out_size > 0 && !out_data.is_null() {
            self.units += 1;
            // SAFETY: FFmpeg guarantees out_data is valid for out_size bytes
            // until the next parse call, which requires &mut self again.
            Some(unsafe { slice::from_raw_parts(out_data, out_size as usize) })
        } else {
            None
        };

        ParseStep { consumed, packet }
    }
}

impl Drop for H264Parser {
    fn drop(&mut self) {
        // SAFETY: parser came from av_parser_init and is closed exactly once.
        unsafe { ffi::av_parser_close(self.parser) };
    }
}
