use std::time::Duration;

use bytes::{Bytes, BytesMut};
use coax_frame::{decode_inbound, encode_frame, OutboundFrame};
use coax_signal::Word;

use crate::error::{Result, TunnelError};
use crate::meta::{RequestMeta, DEFAULT_TIMEOUT};

/// Status carrying an inbound frame.
pub const STATUS_OK: u16 = 200;

/// Status reporting that the terminal did not answer in time.
pub const STATUS_REQUEST_TIMEOUT: u16 = 408;

/// One request as handed to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// How long the HTTP layer may wait for a response.
    pub deadline: Duration,
}

/// The response as reported by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Failure to obtain any response at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// No response before the request deadline.
    #[error("request timed out")]
    TimedOut,
    /// Connection or protocol failure.
    #[error("{0}")]
    Failed(String),
}

/// Performs a single HTTP round trip.
///
/// Implementations must give up once [`TunnelRequest::deadline`] has elapsed
/// and report it as [`ExchangeError::TimedOut`].
pub trait Exchange {
    fn exchange(
        &self,
        request: &TunnelRequest,
    ) -> std::result::Result<TunnelResponse, ExchangeError>;
}

/// Result of one tunnelled transaction that reached the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The terminal answered with this frame.
    Received(Vec<Word>),
    /// The terminal did not answer before the deadline.
    ReceiveTimeout,
}

impl Outcome {
    /// The received frame, if any.
    pub fn frame(&self) -> Option<&[Word]> {
        match self {
            Outcome::Received(words) => Some(words),
            Outcome::ReceiveTimeout => None,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Device endpoint, e.g. `http://interface.local/transact`.
    pub url: String,
    /// Extra time the HTTP layer waits beyond the transaction deadline.
    /// Default: 250 ms.
    pub response_grace: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            response_grace: Duration::from_millis(250),
        }
    }
}

/// Host side of the tunnel: one request per transaction.
///
/// Stateless per call, so one client may serve several sessions; it is the
/// device that serializes the physical transactions.
#[derive(Debug)]
pub struct TunnelClient<E> {
    exchange: E,
    config: ClientConfig,
}

impl<E: Exchange> TunnelClient<E> {
    pub fn new(exchange: E, config: ClientConfig) -> Self {
        Self { exchange, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one transaction through the tunnel.
    ///
    /// A `408` and a request that outlives its deadline both yield
    /// [`Outcome::ReceiveTimeout`].
    pub fn transact(
        &self,
        address: Option<u8>,
        frame: &OutboundFrame,
        timeout: Option<Duration>,
    ) -> Result<Outcome> {
        let request = build_request(&self.config, address, frame, timeout)?;
        interpret(self.exchange.exchange(&request))
    }

    /// Run several transactions, one request each, in order.
    ///
    /// Every frame gets its own outcome; a failure does not stop the batch.
    pub fn transact_many(
        &self,
        frames: &[(Option<u8>, OutboundFrame)],
        timeout: Option<Duration>,
    ) -> Vec<Result<Outcome>> {
        frames
            .iter()
            .map(|(address, frame)| self.transact(*address, frame, timeout))
            .collect()
    }
}

pub(crate) fn build_request(
    config: &ClientConfig,
    address: Option<u8>,
    frame: &OutboundFrame,
    timeout: Option<Duration>,
) -> Result<TunnelRequest> {
    let mut body = BytesMut::new();
    encode_frame(frame, &mut body)?;

    let meta = RequestMeta {
        content_length: None,
        timeout,
        station_address: address,
    };

    Ok(TunnelRequest {
        url: config.url.clone(),
        headers: meta.to_headers(),
        body: body.freeze(),
        deadline: timeout.unwrap_or(DEFAULT_TIMEOUT) + config.response_grace,
    })
}

pub(crate) fn interpret(
    response: std::result::Result<TunnelResponse, ExchangeError>,
) -> Result<Outcome> {
    let response = match response {
        Ok(response) => response,
        Err(ExchangeError::TimedOut) => {
            tracing::debug!("tunnel request timed out");
            return Ok(Outcome::ReceiveTimeout);
        }
        Err(ExchangeError::Failed(message)) => {
            tracing::warn!(%message, "tunnel request failed");
            return Err(TunnelError::Transport(message));
        }
    };

    match response.status {
        STATUS_OK => Ok(Outcome::Received(decode_inbound(&response.body)?)),
        STATUS_REQUEST_TIMEOUT => Ok(Outcome::ReceiveTimeout),
        status => {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            tracing::warn!(status, %body, "tunnel returned error status");
            Err(TunnelError::Status { status, body })
        }
    }
}
