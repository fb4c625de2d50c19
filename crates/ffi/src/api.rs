use std::ffi::{c_char, c_void};

use mc_audio::AudioDecoder;
use mc_common::{AudioConfig, LogConfig, VideoConfig};
use mc_decoder::{ConvertedFrame, DecodeFailure, DecodeSession};

use crate::ffi::{self, OnFrame};
use crate::host::CallbackLock;
use crate::{Error, McHostLock};

/// A converted frame lent to the host.
///
/// `data` holds `len == stride * height` bytes of packed RGB or BGR and is
/// only valid for the duration of the callback.
#[repr(C)]
pub struct McFrame {
    pub data: *const u8,
    pub len: usize,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
}

/// Opaque video decode session.
pub struct McVideo {
    session: DecodeSession,
}

/// Opaque audio decoder.
pub struct McAudio {
    decoder: AudioDecoder,
}

/// Install the log subscriber.
///
/// The level is a string: "error", "warn", "info", "debug", "trace".
/// Null or empty selects "info". Calling more than once is harmless.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that level is null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn mc_log_level(level: *const c_char) -> i32 {
    ffi::return_code(move || {
        match ffi::parse_str(level)? {
            "" => LogConfig::default(),
            level => LogConfig::from_name(level),
        }
        .init();

        Ok(())
    })
}

/// Open an H.264 decode session.
///
/// `output_format` is "RGB" or "BGR"; anything else, including null, selects BGR.
/// When `suppress_native_logs` is false FFmpeg logs at info level.
///
/// Returns a zero on success and writes the handle to `out`, or a negative
/// code on failure. Release the handle with [mc_video_close].
///
/// # Safety
/// - The caller must ensure that output_format is null or a valid null-terminated C string.
/// - The caller must ensure that out is a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn mc_video_open(
    output_format: *const c_char,
    suppress_native_logs: bool,
    out: *mut *mut McVideo,
) -> i32 {
    ffi::return_code(move || {
        let out = out.as_mut().ok_or(Error::InvalidPointer)?;
        let config = VideoConfig::new(ffi::parse_str(output_format)?, suppress_native_logs);
        let session = DecodeSession::new(&config)?;
        *out = Box::into_raw(Box::new(McVideo { session }));
        Ok(())
    })
}

/// Decode the next chunk of an annex-B stream.
///
/// Each completed frame is passed to `on_frame` in stream order, with the
/// host lock held. If `lock` is non-null it is released around native work.
///
/// Returns the number of frames delivered, or a negative code if the chunk
/// hit an unrecoverable unit. Frames decoded before that unit are still
/// delivered.
///
/// # Safety
/// - The caller must ensure that video is a live handle from [mc_video_open].
/// - The caller must ensure that data is valid for size bytes.
/// - The caller must ensure that lock is null or a valid [McHostLock] held by this thread.
/// - The caller must ensure that on_frame is a valid function pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mc_video_decode(
    video: *mut McVideo,
    data: *const u8,
    size: usize,
    lock: *const McHostLock,
    on_frame: Option<unsafe extern "C" fn(user_data: *mut c_void, frame: *const McFrame)>,
    user_data: *mut c_void,
) -> i32 {
    ffi::return_code(move || {
        let video = ffi::parse_handle(video)?;
        let data = ffi::parse_slice(data, size)?;
        let host = CallbackLock::from_raw(lock)?;
        let mut on_frame = OnFrame::new(user_data, on_frame);

        let result = match host {
            Some(mut host) => video.session.decode_with(data, &mut host),
            None => video.session.decode(data),
        };

        deliver(result, &mut on_frame)
    })
}

/// Release frames still in flight at end of stream.
///
/// Returns the number of frames delivered, or a negative code on failure.
///
/// # Safety
/// Same requirements as [mc_video_decode].
#[no_mangle]
pub unsafe extern "C" fn mc_video_flush(
    video: *mut McVideo,
    lock: *const McHostLock,
    on_frame: Option<unsafe extern "C" fn(user_data: *mut c_void, frame: *const McFrame)>,
    user_data: *mut c_void,
) -> i32 {
    ffi::return_code(move || {
        let video = ffi::parse_handle(video)?;
        let host = CallbackLock::from_raw(lock)?;
        let mut on_frame = OnFrame::new(user_data, on_frame);

        let frames = match host {
            Some(mut host) => video.session.flush_with(&mut host),
            None => video.session.flush(),
        };

        Ok(on_frame.deliver(&frames))
    })
}

/// Close a video session and free its native resources.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that video came from [mc_video_open] and is not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn mc_video_close(video: *mut McVideo) -> i32 {
    ffi::return_code(move || {
        if video.is_null() {
            return Err(Error::InvalidPointer);
        }
        drop(Box::from_raw(video));
        Ok(())
    })
}

/// Open an Opus decoder.
///
/// Returns a zero on success and writes the handle to `out`, or a negative
/// code if the parameters are rejected. Release the handle with [mc_audio_close].
///
/// # Safety
/// - The caller must ensure that out is a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn mc_audio_open(
    frame_size: u32,
    sample_rate: u32,
    channels: u32,
    out: *mut *mut McAudio,
) -> i32 {
    ffi::return_code(move || {
        let out = out.as_mut().ok_or(Error::InvalidPointer)?;
        let decoder = AudioDecoder::new(AudioConfig::new(frame_size, sample_rate, channels))?;
        *out = Box::into_raw(Box::new(McAudio { decoder }));
        Ok(())
    })
}

/// Buffer size in bytes that always fits one decoded packet.
///
/// # Safety
/// - The caller must ensure that audio is a live handle from [mc_audio_open].
#[no_mangle]
pub unsafe extern "C" fn mc_audio_max_output_size(audio: *mut McAudio) -> i32 {
    ffi::return_code(move || {
        let audio = ffi::parse_handle(audio)?;
        Ok(audio.decoder.max_output_bytes())
    })
}

/// Decode one packet into `dst` as 16-bit little-endian PCM.
///
/// Returns the number of bytes written. Zero means the packet produced no
/// samples, which is not an error. Negative codes report bad arguments.
///
/// # Safety
/// - The caller must ensure that audio is a live handle from [mc_audio_open].
/// - The caller must ensure that data is valid for size bytes.
/// - The caller must ensure that dst is valid for writes of capacity bytes.
/// - The caller must ensure that lock is null or a valid [McHostLock] held by this thread.
#[no_mangle]
pub unsafe extern "C" fn mc_audio_decode(
    audio: *mut McAudio,
    data: *const u8,
    size: usize,
    lock: *const McHostLock,
    dst: *mut u8,
    capacity: usize,
) -> i32 {
    ffi::return_code(move || {
        let audio = ffi::parse_handle(audio)?;
        let data = ffi::parse_slice(data, size)?;
        let dst = ffi::parse_slice_mut(dst, capacity)?;
        let host = CallbackLock::from_raw(lock)?;

        let pcm = match host {
            Some(mut host) => audio.decoder.decode_with(data, &mut host),
            None => audio.decoder.decode(data),
        };

        let out = dst.get_mut(..pcm.len()).ok_or(Error::BufferTooSmall {
            needed: pcm.len(),
            capacity,
        })?;
        out.copy_from_slice(&pcm);
        Ok(pcm.len())
    })
}

/// Close an audio decoder.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that audio came from [mc_audio_open] and is not used afterwards.
#[no_mangle]
pub unsafe extern "C" fn mc_audio_close(audio: *mut McAudio) -> i32 {
    ffi::return_code(move || {
        if audio.is_null() {
            return Err(Error::InvalidPointer);
        }
        drop(Box::from_raw(audio));
        Ok(())
    })
}

fn deliver(
    result: Result<Vec<ConvertedFrame>, DecodeFailure>,
    on_frame: &mut OnFrame,
) -> Result<usize, Error> {
    match result {
        Ok(frames) => Ok(on_frame.deliver(&frames)),
        Err(DecodeFailure { frames, error }) => {
            on_frame.deliver(&frames);
            tracing::debug!(%error, delivered = frames.len(), "Video chunk failed");
            Err(error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    unsafe extern "C" fn count_frame(user_data: *mut c_void, frame: *const McFrame) {
        let count = unsafe { &mut *(user_data as *mut usize) };
        let frame = unsafe { &*frame };
        assert_eq!(frame.len, frame.stride * frame.height as usize);
        *count += 1;
    }

    unsafe extern "C" fn toggle(user_data: *mut c_void) {
        let calls = unsafe { &mut *(user_data as *mut u32) };
        *calls += 1;
    }

    #[test]
    fn video_session_lifecycle() {
        unsafe {
            let mut video = ptr::null_mut();
            assert_eq!(mc_video_open(c"RGB".as_ptr(), true, &mut video), 0);
            assert!(!video.is_null());

            let mut frames = 0usize;
            let noise = [0x12u8, 0x34, 0x56];
            let delivered = mc_video_decode(
                video,
                noise.as_ptr(),
                noise.len(),
                ptr::null(),
                Some(count_frame),
                &mut frames as *mut usize as *mut c_void,
            );
            assert_eq!(delivered, 0);

            let flushed = mc_video_flush(
                video,
                ptr::null(),
                Some(count_frame),
                &mut frames as *mut usize as *mut c_void,
            );
            assert_eq!(flushed, 0);
            assert_eq!(frames, 0);

            assert_eq!(mc_video_close(video), 0);
        }
    }

    #[test]
    fn video_decode_releases_host_lock() {
        unsafe {
            let mut video = ptr::null_mut();
            assert_eq!(mc_video_open(ptr::null(), true, &mut video), 0);

            let mut calls = 0u32;
            let lock = McHostLock {
                user_data: &mut calls as *mut u32 as *mut c_void,
                release: Some(toggle),
                acquire: Some(toggle),
            };
            let chunk = [0xabu8; 16];
            let code = mc_video_decode(video, chunk.as_ptr(), chunk.len(), &lock, None, ptr::null_mut());
            assert_eq!(code, 0);
            // Every release is paired with an acquire.
            assert!(calls > 0);
            assert_eq!(calls % 2, 0);

            assert_eq!(mc_video_close(video), 0);
        }
    }

    #[test]
    fn null_handles_are_rejected() {
        unsafe {
            let code = mc_video_decode(ptr::null_mut(), ptr::null(), 0, ptr::null(), None, ptr::null_mut());
            assert_eq!(code, Error::InvalidPointer.code());
            assert_eq!(mc_video_close(ptr::null_mut()), Error::InvalidPointer.code());
            assert_eq!(mc_audio_close(ptr::null_mut()), Error::InvalidPointer.code());
            assert_eq!(
                mc_video_open(ptr::null(), true, ptr::null_mut()),
                Error::InvalidPointer.code()
            );
        }
    }

    #[test]
    fn audio_open_rejects_bad_parameters() {
        unsafe {
            let mut audio = ptr::null_mut();
            let code = mc_audio_open(960, 48_000, 0, &mut audio);
            assert_eq!(code, Error::from(mc_common::CodecError::InvalidConfig(String::new())).code());
            assert!(audio.is_null());

            let code = mc_audio_open(960, 44_100, 1, &mut audio);
            assert_eq!(code, Error::from(mc_common::CodecError::init("AudioDecoder", "")).code());
        }
    }

    #[test]
    fn audio_bad_packet_writes_nothing() {
        unsafe {
            let mut audio = ptr::null_mut();
            assert_eq!(mc_audio_open(960, 48_000, 2, &mut audio), 0);
            assert_eq!(mc_audio_max_output_size(audio), 3840);

            let mut dst = vec![0u8; 3840];
            let packet = [0x03u8, 0x00];
            let written = mc_audio_decode(
                audio,
                packet.as_ptr(),
                packet.len(),
                ptr::null(),
                dst.as_mut_ptr(),
                dst.len(),
            );
            assert_eq!(written, 0);

            assert_eq!(mc_audio_close(audio), 0);
        }
    }

    #[test]
    fn incomplete_host_lock_is_rejected() {
        unsafe {
            let mut audio = ptr::null_mut();
            assert_eq!(mc_audio_open(960, 48_000, 1, &mut audio), 0);

            let lock = McHostLock {
                user_data: ptr::null_mut(),
                release: None,
                acquire: Some(toggle),
            };
            let packet = [0x03u8, 0x00];
            let code = mc_audio_decode(audio, packet.as_ptr(), 2, &lock, ptr::null_mut(), 0);
            assert_eq!(code, Error::InvalidHostLock.code());

            assert_eq!(mc_audio_close(audio), 0);
        }
    }
}
