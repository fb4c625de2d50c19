use mc_common::CodecError;

#[derive(Debug, thiserror::Error, Clone)]
pub enum Error {
    #[error("panic")]
    Panic,

    #[error("invalid pointer")]
    InvalidPointer,

    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid code")]
    InvalidCode,

    #[error("incomplete host lock")]
    InvalidHostLock,

    #[error("buffer too small: need {needed}, got {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Error {
    /// Negative status code reported across the C boundary.
    ///
    /// Codec errors from opening a handle fall in `-10..=-19`; codec errors
    /// from a decode call on an open handle fall at `-20` and below.
    pub fn code(&self) -> i32 {
        match self {
            Self::Panic => -1,
            Self::InvalidPointer => -2,
            Self::InvalidUtf8(_) => -3,
            Self::InvalidCode => -4,
            Self::InvalidHostLock => -5,
            Self::BufferTooSmall { .. } => -6,
            Self::Codec(error) if error.is_construction() => match error {
                CodecError::InvalidConfig(_) => -10,
                _ => -11,
            },
            Self::Codec(error) => match error {
                CodecError::Decode { .. } => -20,
                CodecError::Convert { .. } => -21,
                _ => -22,
            },
        }
    }
}
