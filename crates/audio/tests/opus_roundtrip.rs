//! Decode real Opus packets produced by libopus.

use opus::{Application, Channels, Encoder};
use parking_lot::Mutex;

use mc_audio::{pcm_le_bytes, AudioDecoder};
use mc_common::AudioConfig;

const RATE: u32 = 48_000;
/// 20 ms at 48 kHz.
const FRAME: usize = 960;

fn tone(frames: usize, channels: usize) -> Vec<i16> {
    (0..frames)
        .flat_map(|i| {
            let t = i as f32 / RATE as f32;
            let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 8000.0) as i16;
            std::iter::repeat(sample).take(channels)
        })
        .collect()
}

fn encode(channels: Channels, count: usize) -> Vec<u8> {
    let mut encoder = Encoder::new(RATE, channels, Application::Voip).unwrap();
    encoder.encode_vec(&tone(FRAME, count), 4000).unwrap()
}

#[test]
fn mono_packet_fills_one_frame() {
    let packet = encode(Channels::Mono, 1);
    let mut decoder = AudioDecoder::new(AudioConfig::new(960, RATE, 1)).unwrap();

    let pcm = decoder.decode(&packet);
    assert_eq!(pcm.len(), FRAME * 2);
    assert_eq!(decoder.packets_decoded(), 1);
}

#[test]
fn stereo_packet_interleaves_both_channels() {
    let packet = encode(Channels::Stereo, 2);
    let mut decoder = AudioDecoder::new(AudioConfig::new(960, RATE, 2)).unwrap();

    let pcm = decoder.decode(&packet);
    assert_eq!(pcm.len(), FRAME * 2 * 2);
}

#[test]
fn packet_longer_than_frame_size_is_empty() {
    let packet = encode(Channels::Mono, 1);
    let mut decoder = AudioDecoder::new(AudioConfig::new(480, RATE, 1)).unwrap();

    assert!(decoder.decode(&packet).is_empty());
    assert_eq!(decoder.packets_failed(), 1);
}

#[test]
fn output_matches_native_decoder() {
    let packets: Vec<_> = (0..3).map(|_| encode(Channels::Mono, 1)).collect();

    let mut reference = opus::Decoder::new(RATE, Channels::Mono).unwrap();
    let mut decoder = AudioDecoder::new(AudioConfig::default()).unwrap();

    for packet in &packets {
        let mut samples = vec![0i16; FRAME];
        let count = reference.decode(packet, &mut samples, false).unwrap();
        assert_eq!(decoder.decode(packet), pcm_le_bytes(&samples[..count]));
    }
}

#[test]
fn stream_survives_bad_packets() {
    let good = encode(Channels::Mono, 1);
    let mut decoder = AudioDecoder::new(AudioConfig::default()).unwrap();

    assert_eq!(decoder.decode(&good).len(), FRAME * 2);
    assert!(decoder.decode(&[0x03, 0x00]).is_empty());
    assert_eq!(decoder.decode(&good).len(), FRAME * 2);
    assert_eq!((decoder.packets_decoded(), decoder.packets_failed()), (2, 1));
}

#[test]
fn host_mutex_released_during_decode() {
    let packet = encode(Channels::Mono, 1);
    let host = Mutex::new(());
    let mut decoder = AudioDecoder::new(AudioConfig::default()).unwrap();

    let mut guard = host.lock();
    let pcm = decoder.decode_with(&packet, &mut guard);
    assert_eq!(pcm.len(), FRAME * 2);
    assert!(host.try_lock().is_none());
}
