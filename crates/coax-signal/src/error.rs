/// Coarse classification shared by every error type in the workspace.
///
/// Callers branch on this instead of matching error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller-supplied data violates a precondition. Detected before any I/O.
    InvalidInput,
    /// Received or transported bytes cannot be decoded.
    InvalidFrame,
    /// No end-of-frame marker was observed before the deadline.
    ReceiveTimeout,
    /// The tunnel or transport reported a failure unrelated to timeout.
    Interface,
    /// Teardown could not be confirmed; the channel is unusable.
    Fatal,
}

/// Errors that can occur while encoding or decoding coax signals.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The value does not fit in the 10 bits carried on the wire.
    #[error("word value 0x{value:04x} exceeds the 10-bit word domain")]
    InvalidWordValue { value: u16 },

    /// A 32-bit container does not hold a well-formed encoded word.
    #[error("invalid encoded word 0x{pattern:08x}: {reason}")]
    InvalidPattern { pattern: u32, reason: &'static str },

    /// A frame must carry at least one word.
    #[error("cannot transmit an empty frame")]
    EmptyFrame,
}

impl SignalError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignalError::InvalidWordValue { .. } | SignalError::EmptyFrame => {
                ErrorKind::InvalidInput
            }
            SignalError::InvalidPattern { .. } => ErrorKind::InvalidFrame,
        }
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
