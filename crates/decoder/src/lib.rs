//! `mc-decoder`: Incremental H.264 stream decoding to packed RGB/BGR frames.
//!
//! # Architecture
//!
//! ```text
//! chunk -> BitstreamCursor -> BitstreamParser -> PictureDecoder -> FrameConverter -> Vec<ConvertedFrame>
//!                                  (persistent)       (persistent)      (cached scaler)
//! ```
//!
//! Callers hand [`DecodeSession::decode`] arbitrarily sized slices of an
//! annex-B byte stream. All framing state lives in the parser and decoder, so
//! feeding the stream one byte at a time or all at once yields the same
//! frames (a final in-flight frame is released by the next call or by
//! [`DecodeSession::flush`]).
//!
//! ## Module Overview
//!
//! - [`cursor`]: consumed/remaining bookkeeping within one chunk
//! - [`parser`]: NAL-unit boundary detection (`av_parser_parse2`)
//! - [`decoder`]: FFmpeg H.264 decode context
//! - [`picture`]: borrowed views of decoder-owned planes
//! - [`convert`]: swscale conversion with a cached context
//! - [`session`]: the per-call loop and its error policy
//!
//! ## Usage
//!
//! ```ignore
//! use mc_common::VideoConfig;
//! use mc_decoder::DecodeSession;
//!
//! let mut session = DecodeSession::new(&VideoConfig::new("RGB", true))?;
//! for datagram in datagrams {
//!     for frame in session.decode(&datagram)? {
//!         // frame.data is width * height * 3 bytes, rows frame.stride apart
//!     }
//! }
//! ```

pub mod convert;
pub mod cursor;
pub mod decoder;
pub mod parser;
pub mod picture;
pub mod session;

mod native_log;

pub use convert::{ConvertedFrame, FrameConverter, PixelFormatConverter};
pub use cursor::BitstreamCursor;
pub use decoder::{H264Decoder, PictureDecoder, PictureSink};
pub use native_log::configure_native_logging;
pub use parser::{BitstreamParser, H264Parser, ParseStep};
pub use picture::{Picture, Plane};
pub use session::{DecodeFailure, DecodeSession, SessionStats};

/// Re-exported so hosts and tests can name native pixel formats.
pub use ffmpeg_next::format::Pixel;
