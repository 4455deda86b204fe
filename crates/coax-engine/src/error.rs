use std::time::Duration;

use coax_frame::FrameError;
use coax_signal::{ErrorKind, SignalError};

/// Errors that can occur while running a transaction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The outbound request violates a precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Signal-level encoding failed.
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),

    /// Transport-level encoding failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No end-of-frame marker arrived before the deadline.
    #[error("no response within {0:?}")]
    ReceiveTimeout(Duration),

    /// Another transaction holds the port.
    #[error("transaction already in flight")]
    Busy,

    /// An earlier teardown could not be confirmed; the engine refuses work.
    #[error("engine faulted; restart required")]
    Faulted,

    /// The bus did not report idle after an abort.
    #[error("abort not acknowledged after {0:?}")]
    AbortUnconfirmed(Duration),

    /// The bus refused to start an exchange.
    #[error("bus error: {0}")]
    Bus(#[from] std::io::Error),
}

impl EngineError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::Signal(err) => err.kind(),
            EngineError::Frame(err) => err.kind(),
            EngineError::ReceiveTimeout(_) => ErrorKind::ReceiveTimeout,
            EngineError::Busy | EngineError::Bus(_) => ErrorKind::Interface,
            EngineError::Faulted | EngineError::AbortUnconfirmed(_) => ErrorKind::Fatal,
        }
    }

    /// Returns true for the expected no-response outcome.
    pub fn is_receive_timeout(&self) -> bool {
        matches!(self, EngineError::ReceiveTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
