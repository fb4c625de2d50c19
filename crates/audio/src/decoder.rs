//! Opus decoder wrapper.

use opus::{Channels, Decoder as OpusDecoder};
use tracing::{debug, info, trace};

use mc_common::{AudioConfig, CodecError, HostLock, NoHostLock, Result};

/// A persistent Opus decode context with a fixed output bound.
pub struct AudioDecoder {
    decoder: OpusDecoder,
    config: AudioConfig,
    /// Interleaved scratch buffer, `frame_size * channels` samples.
    samples: Vec<i16>,
    packets_decoded: u64,
    packets_failed: u64,
}

impl std::fmt::Debug for AudioDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDecoder")
            .field("config", &self.config)
            .field("packets_decoded", &self.packets_decoded)
            .field("packets_failed", &self.packets_failed)
            .finish()
    }
}

impl AudioDecoder {
    pub fn new(config: AudioConfig) -> Result<Self> {
        config.validate()?;

        let channels = match config.channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            other => {
                return Err(CodecError::init(
                    "AudioDecoder",
                    format!("unsupported channel count {other}"),
                ))
            }
        };

        let decoder = OpusDecoder::new(config.sample_rate, channels).map_err(|e| {
            CodecError::init(
                "AudioDecoder",
                format!("opus_decoder_create at {} Hz: {e}", config.sample_rate),
            )
        })?;

        info!(
            frame_size = config.frame_size,
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Opened audio decoder"
        );

        Ok(Self {
            decoder,
            samples: vec![0; config.max_samples()],
            config,
            packets_decoded: 0,
            packets_failed: 0,
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Largest PCM buffer one packet can produce, in bytes.
    pub fn max_output_bytes(&self) -> usize {
        self.config.max_samples() * 2
    }

    pub fn packets_decoded(&self) -> u64 {
        self.packets_decoded
    }

    pub fn packets_failed(&self) -> u64 {
        self.packets_failed
    }

    /// Decode one packet. Empty when the packet produced no samples.
    pub fn decode(&mut self, packet: &[u8]) -> Vec<u8> {
        self.decode_with(packet, &mut NoHostLock)
    }

    /// Decode one packet with `host` released for the native call.
    pub fn decode_with<H: HostLock>(&mut self, packet: &[u8], host: &mut H) -> Vec<u8> {
        let channels = self.config.channels as usize;
        let decoder = &mut self.decoder;
        let samples = &mut self.samples;

        let decoded = host.unlocked(|| {
            decoder
                .decode(packet, samples, false)
                .map(|per_channel| pcm_le_bytes(&samples[..per_channel * channels]))
        });

        match decoded {
            Ok(pcm) => {
                self.packets_decoded += 1;
                trace!(bytes = pcm.len(), "Decoded audio packet");
                pcm
            }
            Err(error) => {
                self.packets_failed += 1;
                debug!(%error, len = packet.len(), "Audio packet produced no samples");
                Vec::new()
            }
        }
    }
}

/// Serialize samples as little-endian bytes regardless of host byte order.
pub fn pcm_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
}
