//! Central error types (thiserror-based).

use thiserror::Error;

/// Error raised by the video and audio decode paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A codec, context, parser or scaler could not be created.
    #[error("{component} init failed: {reason}")]
    Init {
        component: &'static str,
        reason: String,
    },

    /// The native decoder rejected a packet.
    #[error("Decode failed: {reason}")]
    Decode { reason: String },

    /// A decoded picture could not be converted to the output layout.
    #[error("Conversion failed: {reason}")]
    Convert { reason: String },

    /// A picture view does not match its declared format or dimensions.
    #[error("Invalid picture: {reason}")]
    InvalidPicture { reason: String },

    /// A construction parameter is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CodecError {
    pub fn init(component: &'static str, reason: impl ToString) -> Self {
        Self::Init {
            component,
            reason: reason.to_string(),
        }
    }

    pub fn decode(reason: impl ToString) -> Self {
        Self::Decode {
            reason: reason.to_string(),
        }
    }

    pub fn convert(reason: impl ToString) -> Self {
        Self::Convert {
            reason: reason.to_string(),
        }
    }

    /// Whether the error happened while constructing a component.
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Init { .. } | Self::InvalidConfig(_))
    }
}

/// Convenience Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
