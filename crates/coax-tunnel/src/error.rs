use coax_frame::FrameError;
use coax_signal::ErrorKind;

/// Errors that can occur on either side of the tunnel.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    /// A recognised header carried a value that does not parse.
    #[error("invalid {name} header: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    /// The outbound or inbound frame could not be encoded or decoded.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The tunnel answered with a status other than success or timeout.
    #[error("HTTP status code {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl TunnelError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TunnelError::InvalidHeader { .. } => ErrorKind::InvalidInput,
            TunnelError::Frame(err) => err.kind(),
            TunnelError::Status { .. } | TunnelError::Transport(_) => ErrorKind::Interface,
        }
    }
}

pub type Result<T> = std::result::Result<T, TunnelError>;
