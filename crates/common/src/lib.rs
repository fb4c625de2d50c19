//! `mc-common`: Shared types for the media codec crates.
//!
//! This crate is the foundation the decoder, audio and FFI crates depend on:
//!
//! - **Errors**: `CodecError` (thiserror-based) and the `Result` alias
//! - **Config**: `VideoConfig`, `AudioConfig`, `OutputFormat`
//! - **Host lock**: `HostLock`, the release/reacquire discipline used around
//!   blocking native work when a host runtime serializes its own threads
//! - **Logging**: `LogConfig`, an idempotent `tracing` subscriber setup

pub mod config;
pub mod error;
pub mod host;
pub mod logging;

// Re-export commonly used items at crate root
pub use config::{AudioConfig, OutputFormat, VideoConfig};
pub use error::{CodecError, Result};
pub use host::{HostLock, NoHostLock};
pub use logging::LogConfig;
