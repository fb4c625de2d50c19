//! The per-call decode loop.
//!
//! Each call walks the chunk with a [`BitstreamCursor`], asking the parser
//! for the next unit and handing complete units to the decoder. Pictures are
//! converted immediately, while the decoder still owns their planes.
//!
//! Error policy for one step, decided by the decode result and the bytes
//! the parser consumed in that same step:
//!
//! | decode    | consumed | outcome                                      |
//! |-----------|----------|----------------------------------------------|
//! | ok        | any      | keep frames, advance (possibly by zero)      |
//! | none      | > 0      | advance                                      |
//! | none      | 0        | stop and retain the tail                     |
//! | failed    | > 0      | skip the unit, advance                       |
//! | failed    | 0        | fatal for the call: [`DecodeFailure`]        |
//!
//! A parser may emit a unit without consuming input when the boundary that
//! ends it arrived in an earlier call. That is progress, so the same bytes
//! are offered again, up to a small bound on consecutive such units.

use std::borrow::Cow;
use std::mem;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use mc_common::{CodecError, HostLock, NoHostLock, Result, VideoConfig};

use crate::convert::{ConvertedFrame, FrameConverter, PixelFormatConverter};
use crate::cursor::BitstreamCursor;
use crate::decoder::{H264Decoder, PictureDecoder};
use crate::native_log::configure_native_logging;
use crate::parser::{BitstreamParser, H264Parser, ParseStep};

/// Units a parser may emit in a row without consuming input before the
/// loop treats it as stalled.
const MAX_IDLE_UNITS: usize = 8;

/// A call ended on an unrecoverable step.
///
/// `frames` holds everything converted earlier in the same call; nothing
/// from the failing step is included.
#[derive(Error, Debug)]
#[error("{error} after {} frame(s)", .frames.len())]
pub struct DecodeFailure {
    pub frames: Vec<ConvertedFrame>,
    #[source]
    pub error: CodecError,
}

/// Running counters for one session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Decode calls made.
    pub chunks: u64,
    /// Bytes the parser has taken.
    pub bytes_consumed: u64,
    /// Complete units handed to the decoder.
    pub packets: u64,
    /// Frames returned to the caller.
    pub frames: u64,
    /// Units dropped after a decode or conversion failure.
    pub skipped_packets: u64,
}

/// What one parse/decode/convert step produced.
struct StepOutcome {
    consumed: usize,
    decoded: Option<Result<Vec<ConvertedFrame>>>,
}

/// One video stream: a persistent parser/decoder pair and a converter.
#[derive(Debug)]
pub struct DecodeSession<P = H264Parser, D = H264Decoder, C = PixelFormatConverter> {
    parser: P,
    decoder: D,
    converter: C,
    /// Tail of the previous chunk the parser made no progress on.
    retained: Vec<u8>,
    max_retained_bytes: usize,
    stats: SessionStats,
}

impl DecodeSession {
    /// Open an H.264 session backed by FFmpeg.
    ///
    /// Sets the process-wide native log level as a side effect.
    pub fn new(config: &VideoConfig) -> Result<Self> {
        configure_native_logging(config.suppress_native_logs);

        let parser = H264Parser::new()?;
        let decoder = H264Decoder::new()?;
        let converter = PixelFormatConverter::new(config.output_format);

        info!(
            output_format = %config.output_format,
            suppress_native_logs = config.suppress_native_logs,
            max_retained_bytes = config.max_retained_bytes,
            "Opened video decode session"
        );

        Ok(Self::with_components(
            parser,
            decoder,
            converter,
            config.max_retained_bytes,
        ))
    }
}

impl<P, D, C> DecodeSession<P, D, C>
where
    P: BitstreamParser,
    D: PictureDecoder,
    C: FrameConverter,
{
    pub fn with_components(parser: P, decoder: D, converter: C, max_retained_bytes: usize) -> Self {
        Self {
            parser,
            decoder,
            converter,
            retained: Vec::new(),
            max_retained_bytes,
            stats: SessionStats::default(),
        }
    }

    /// Decode one chunk of the stream.
    pub fn decode(
        &mut self,
        chunk: &[u8],
    ) -> std::result::Result<Vec<ConvertedFrame>, DecodeFailure> {
        self.decode_with(chunk, &mut NoHostLock)
    }

    /// Decode one chunk, releasing `host` around every native step.
    pub fn decode_with<H: HostLock>(
        &mut self,
        chunk: &[u8],
        host: &mut H,
    ) -> std::result::Result<Vec<ConvertedFrame>, DecodeFailure> {
        self.stats.chunks += 1;
        self.run(chunk, host)
    }

    /// Release everything still in flight at end of stream.
    pub fn flush(&mut self) -> Vec<ConvertedFrame> {
        self.flush_with(&mut NoHostLock)
    }

    /// End-of-stream drain: retained bytes, the parser's buffered unit,
    /// then pictures held back by the decoder.
    ///
    /// Failures here only lose the affected unit; the session stays usable.
    pub fn flush_with<H: HostLock>(&mut self, host: &mut H) -> Vec<ConvertedFrame> {
        let mut frames = match self.run(&[], host) {
            Ok(frames) => frames,
            Err(failure) => {
                warn!(error = %failure.error, "Dropping retained bytes during flush");
                failure.frames
            }
        };
        self.retained.clear();

        let Self {
            parser,
            decoder,
            converter,
            stats,
            ..
        } = self;

        let tail = host.unlocked(|| {
            let ParseStep { packet, .. } = parser.finish();
            packet.map(|packet| decode_packet(decoder, converter, packet))
        });
        if let Some(decoded) = tail {
            stats.packets += 1;
            collect(decoded, stats, &mut frames, "flush");
        }

        let drained = host.unlocked(|| drain_pictures(decoder, converter));
        collect(drained, stats, &mut frames, "drain");

        debug!(frames = frames.len(), "Flushed decode session");
        frames
    }

    /// Bytes carried over to the next call.
    pub fn retained_len(&self) -> usize {
        self.retained.len()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    fn run<H: HostLock>(
        &mut self,
        chunk: &[u8],
        host: &mut H,
    ) -> std::result::Result<Vec<ConvertedFrame>, DecodeFailure> {
        let input: Cow<'_, [u8]> = if self.retained.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = mem::take(&mut self.retained);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut cursor = BitstreamCursor::new(&input);
        let mut frames = Vec::new();
        let mut idle_units = 0;

        while !cursor.is_exhausted() {
            let remaining = cursor.remaining();
            let parser = &mut self.parser;
            let decoder = &mut self.decoder;
            let converter = &mut self.converter;

            let StepOutcome { consumed, decoded } =
                host.unlocked(|| step(parser, decoder, converter, remaining));

            trace!(
                offset = cursor.consumed(),
                consumed,
                packet = decoded.is_some(),
                "Parse step"
            );

            let emitted = decoded.is_some();
            idle_units = if consumed == 0 && emitted { idle_units + 1 } else { 0 };

            match decoded {
                Some(Ok(step_frames)) => {
                    self.stats.packets += 1;
                    self.stats.frames += step_frames.len() as u64;
                    frames.extend(step_frames);
                }
                Some(Err(error)) if consumed == 0 => {
                    self.stats.packets += 1;
                    return Err(DecodeFailure { frames, error });
                }
                Some(Err(error)) => {
                    self.stats.packets += 1;
                    self.stats.skipped_packets += 1;
                    debug!(%error, consumed, "Skipping undecodable packet");
                }
                None => {}
            }

            if consumed == 0 && (!emitted || idle_units >= MAX_IDLE_UNITS) {
                let tail = cursor.remaining();
                debug!(remaining = tail.len(), "No packet boundary in remaining bytes");
                self.retain(tail, chunk.len());
                break;
            }

            let advanced = cursor.advance(consumed);
            self.stats.bytes_consumed += advanced as u64;
        }

        Ok(frames)
    }

    /// Keep `tail` for the next call.
    ///
    /// Bytes from the current chunk are always kept. The bound only evicts
    /// bytes already carried over from earlier calls, oldest first.
    fn retain(&mut self, tail: &[u8], chunk_len: usize) {
        let fresh = tail.len().min(chunk_len);
        let keep = tail.len().min(self.max_retained_bytes.max(fresh));
        let dropped = tail.len() - keep;
        if dropped > 0 {
            warn!(
                dropped,
                kept = keep,
                limit = self.max_retained_bytes,
                "Carried-over bytes over limit, discarding oldest"
            );
        }
        self.retained = tail[dropped..].to_vec();
    }
}

/// Parse once and, when a unit is ready, decode and convert it.
fn step<P, D, C>(parser: &mut P, decoder: &mut D, converter: &mut C, input: &[u8]) -> StepOutcome
where
    P: BitstreamParser,
    D: PictureDecoder,
    C: FrameConverter,
{
    let ParseStep { consumed, packet } = parser.parse(input);
    let decoded = packet.map(|packet| decode_packet(decoder, converter, packet));
    StepOutcome { consumed, decoded }
}

fn decode_packet<D, C>(decoder: &mut D, converter: &mut C, packet: &[u8]) -> Result<Vec<ConvertedFrame>>
where
    D: PictureDecoder,
    C: FrameConverter,
{
    let mut frames = Vec::new();
    decoder.decode(packet, &mut |picture| {
        frames.push(converter.convert(picture)?);
        Ok(())
    })?;
    Ok(frames)
}

fn drain_pictures<D, C>(decoder: &mut D, converter: &mut C) -> Result<Vec<ConvertedFrame>>
where
    D: PictureDecoder,
    C: FrameConverter,
{
    let mut frames = Vec::new();
    decoder.drain(&mut |picture| {
        frames.push(converter.convert(picture)?);
        Ok(())
    })?;
    Ok(frames)
}

fn collect(
    decoded: Result<Vec<ConvertedFrame>>,
    stats: &mut SessionStats,
    frames: &mut Vec<ConvertedFrame>,
    stage: &'static str,
) {
    match decoded {
        Ok(more) => {
            stats.frames += more.len() as u64;
            frames.extend(more);
        }
        Err(error) => {
            stats.skipped_packets += 1;
            debug!(%error, stage, "Skipping undecodable tail");
        }
    }
}
