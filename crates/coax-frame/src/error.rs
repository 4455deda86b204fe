use coax_signal::ErrorKind;

/// Errors that can occur during transport encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The transport body is not a whole number of 16-bit words.
    #[error("invalid frame length ({len} bytes, must be even)")]
    InvalidLength { len: usize },

    /// The repeat descriptor does not describe a tail of the frame.
    #[error("invalid repeat descriptor (count {count}, offset {offset}, {len} words)")]
    InvalidRepeat { count: i32, offset: usize, len: usize },

    /// A received frame carried the reserved end-of-frame marker as a word.
    #[error("frame contains the reserved terminator at word {index}")]
    ContainsTerminator { index: usize },
}

impl FrameError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FrameError::InvalidRepeat { .. } => ErrorKind::InvalidInput,
            FrameError::InvalidLength { .. } | FrameError::ContainsTerminator { .. } => {
                ErrorKind::InvalidFrame
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
