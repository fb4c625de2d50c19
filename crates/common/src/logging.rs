//! Process-wide `tracing` subscriber setup.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log settings for hosts embedding the codec crates.
#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LogConfig {
    /// Parse a level name (trace, debug, info, warn, error). Unknown names map to info.
    pub fn from_name(name: &str) -> Self {
        let level = match name.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        Self { level }
    }

    /// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
    ///
    /// Returns false when a subscriber was already installed; calling this
    /// more than once is harmless.
    pub fn init(&self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
            .is_ok()
    }
}
