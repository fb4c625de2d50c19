//! FFmpeg H.264 decode context.

use std::os::raw::c_uint;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use tracing::{debug, trace};

use mc_common::{CodecError, Result};

use crate::picture::Picture;

/// Receives each decoded picture while its planes are still valid.
pub type PictureSink<'s> = dyn FnMut(&Picture<'_>) -> Result<()> + 's;

/// Stateful decoder for parsed units. Persists across decode calls.
///
/// Pictures are only lent to `sink`; their planes are overwritten by the
/// next decode call, so the sink must copy out anything it keeps.
pub trait PictureDecoder {
    /// Decode one parsed unit, handing zero or more pictures to `sink`.
    fn decode(&mut self, packet: &[u8], sink: &mut PictureSink<'_>) -> Result<()>;

    /// Emit pictures held back by reordering delay at end of stream.
    fn drain(&mut self, sink: &mut PictureSink<'_>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// H264Decoder
// ---------------------------------------------------------------------------

/// H.264 decoder backed by libavcodec.
pub struct H264Decoder {
    decoder: ffmpeg::decoder::Video,
    /// Reused output frame. Its planes back every lent [`Picture`].
    frame: VideoFrame,
    pictures: u64,
}

impl std::fmt::Debug for H264Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("H264Decoder")
            .field("pictures", &self.pictures)
            .finish()
    }
}

impl H264Decoder {
    pub fn new() -> Result<Self> {
        // Initialize FFmpeg (idempotent)
        ffmpeg::init().map_err(|e| CodecError::init("H264Decoder", e))?;

        let codec = ffmpeg::codec::decoder::find(ffmpeg::codec::Id::H264)
            .ok_or_else(|| CodecError::init("H264Decoder", "no H.264 decoder in libavcodec"))?;

        let codec_name = codec.name().to_string();

        // Default flags keep the decoder's reorder buffer, so streams with
        // B-frames come out in display order; drain() releases the held tail.
        let context = ffmpeg::codec::context::Context::new_with_codec(codec);

        let decoder = context
            .decoder()
            .open_as(codec)
            .and_then(|opened| opened.video())
            .map_err(|e| CodecError::init("H264Decoder", format!("avcodec_open2 failed: {e}")))?;

        debug!(codec = %codec_name, "Opened H.264 decoder");

        Ok(Self {
            decoder,
            frame: VideoFrame::empty(),
            pictures: 0,
        })
    }

    /// Pictures produced since construction.
    pub fn pictures(&self) -> u64 {
        self.pictures
    }

    /// Whether the context was opened with `AV_CODEC_FLAG_LOW_DELAY`.
    pub fn low_delay(&self) -> bool {
        // SAFETY: the context pointer is valid for the life of self.
        let flags = unsafe { (*self.decoder.as_ptr()).flags };
        ffmpeg::codec::Flags::from_bits_truncate(flags as c_uint)
            .contains(ffmpeg::codec::Flags::LOW_DELAY)
    }

    /// Pull every picture the decoder has ready.
    fn receive_all(&mut self, sink: &mut PictureSink<'_>) -> Result<()> {
        loop {
            match self.decoder.receive_frame(&mut self.frame) {
                Ok(()) => {
                    self.pictures += 1;
                    trace!(
                        width = self.frame.width(),
                        height = self.frame.height(),
                        format = ?self.frame.format(),
                        "Decoded picture"
                    );
                    sink(&Picture::from_frame(&self.frame))?;
                }
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {
                    return Ok(())
                }
                Err(ffmpeg::Error::Eof) => return Ok(()),
                Err(e) => return Err(CodecError::decode(format!("receive_frame failed: {e}"))),
            }
        }
    }
}

impl PictureDecoder for H264Decoder {
    fn decode(&mut self, packet: &[u8], sink: &mut PictureSink<'_>) -> Result<()> {
        let packet = ffmpeg::codec::packet::Packet::copy(packet);

        self.decoder
            .send_packet(&packet)
            .map_err(|e| CodecError::decode(format!("send_packet failed: {e}")))?;

        self.receive_all(sink)
    }

    fn drain(&mut self, sink: &mut PictureSink<'_>) -> Result<()> {
        self.decoder
            .send_eof()
            .map_err(|e| CodecError::decode(format!("flush failed: {e}")))?;

        let result = self.receive_all(sink);

        // Reset so the same stream can keep decoding after a drain.
        self.decoder.flush();
        result
    }
}
