//! FFmpeg log verbosity toggle.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::log::Level;

/// Set FFmpeg's process-wide log level.
///
/// `suppress` silences the native decoder; otherwise it logs at `info`.
/// Safe to call any number of times from any thread; the last call wins.
pub fn configure_native_logging(suppress: bool) {
    let level = if suppress { Level::Quiet } else { Level::Info };
    ffmpeg::util::log::set_level(level);
    tracing::trace!(suppress, "Native log level configured");
}
