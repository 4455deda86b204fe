use std::fmt;

use coax3270::frame::FrameError;
use coax3270::signal::{ErrorKind, SignalError};
use coax3270::tunnel::TunnelError;

// Process exit codes. TIMEOUT matches timeout(1).
pub const SUCCESS: i32 = 0;
pub const INTERFACE_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Exit code for an error classification.
pub fn code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::InvalidFrame => DATA_INVALID,
        ErrorKind::ReceiveTimeout => TIMEOUT,
        ErrorKind::Interface => INTERFACE_ERROR,
        ErrorKind::Fatal => INTERNAL,
    }
}

fn classified(context: &str, kind: ErrorKind, err: impl fmt::Display) -> CliError {
    CliError::new(code_for(kind), format!("{context}: {err}"))
}

pub fn signal_error(context: &str, err: SignalError) -> CliError {
    classified(context, err.kind(), err)
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    classified(context, err.kind(), err)
}

pub fn tunnel_error(context: &str, err: TunnelError) -> CliError {
    classified(context, err.kind(), err)
}
