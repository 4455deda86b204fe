//! Device side of the tunnel.
//!
//! Routes a parsed HTTP request to the coax port and maps the engine outcome
//! to a status. Parsing the request line and headers off the socket belongs
//! to the HTTP server; this module starts from method, path, headers and body.

use std::time::Duration;

use bytes::Bytes;
use coax_engine::{Clock, CoaxBus, EngineError, Port};
use coax_signal::ErrorKind;

use crate::client::{STATUS_OK, STATUS_REQUEST_TIMEOUT};
use crate::meta::RequestMeta;

/// Path serving coax transactions.
pub const TRANSACT_PATH: &str = "/transact";

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
pub const STATUS_INTERNAL_ERROR: u16 = 500;
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain";

/// A response ready to be written by the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl ServiceResponse {
    fn frame(body: Bytes) -> Self {
        Self {
            status: STATUS_OK,
            content_type: OCTET_STREAM,
            body,
        }
    }

    fn text(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: Bytes::from(message.into()),
        }
    }

    /// Standard reason phrase for the status.
    pub fn reason(&self) -> &'static str {
        match self.status {
            STATUS_OK => "OK",
            STATUS_BAD_REQUEST => "Bad Request",
            STATUS_NOT_FOUND => "Not Found",
            STATUS_METHOD_NOT_ALLOWED => "Method Not Allowed",
            STATUS_REQUEST_TIMEOUT => "Request Timeout",
            STATUS_SERVICE_UNAVAILABLE => "Service Unavailable",
            _ => "Internal Server Error",
        }
    }
}

/// Configuration for [`TransactService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Queue behind a transaction in flight instead of answering `503`.
    /// Default: true.
    pub wait_for_port: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            wait_for_port: true,
        }
    }
}

/// Serves `POST /transact` against one coax port.
pub struct TransactService<B, C> {
    port: Port<B, C>,
    config: ServiceConfig,
}

impl<B: CoaxBus, C: Clock> TransactService<B, C> {
    pub fn new(port: Port<B, C>) -> Self {
        Self::with_config(port, ServiceConfig::default())
    }

    pub fn with_config(port: Port<B, C>, config: ServiceConfig) -> Self {
        Self { port, config }
    }

    /// Handle one request.
    pub fn handle<I, K, V>(
        &self,
        method: &str,
        path: &str,
        headers: I,
        body: &[u8],
    ) -> ServiceResponse
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if path != TRANSACT_PATH {
            return ServiceResponse::text(
                STATUS_NOT_FOUND,
                "The requested resource was not found",
            );
        }
        if method != "POST" {
            return ServiceResponse::text(STATUS_METHOD_NOT_ALLOWED, "Only POST is supported");
        }

        let meta = match RequestMeta::from_headers(headers) {
            Ok(meta) => meta,
            Err(err) => return ServiceResponse::text(STATUS_BAD_REQUEST, err.to_string()),
        };

        match meta.content_length {
            Some(len) if len > 0 && len % 2 == 0 && len == body.len() => {}
            _ => {
                return ServiceResponse::text(
                    STATUS_BAD_REQUEST,
                    "Invalid Content-Length header, needs to be even number of bytes",
                )
            }
        }

        let timeout = match self.resolve_timeout(&meta) {
            Ok(timeout) => timeout,
            Err(err) => return error_response(&err),
        };

        tracing::debug!(
            bytes = body.len(),
            ?timeout,
            station = ?meta.station_address,
            "transact request"
        );

        let result = if self.config.wait_for_port {
            self.port.transact(body, timeout)
        } else {
            self.port.try_transact(body, timeout)
        };

        match result {
            Ok(inbound) => ServiceResponse::frame(inbound),
            Err(err) => error_response(&err),
        }
    }

    fn resolve_timeout(&self, meta: &RequestMeta) -> Result<Duration, EngineError> {
        match meta.timeout {
            Some(timeout) => Ok(timeout),
            None => self.port.default_timeout(),
        }
    }
}

/// Status for an engine failure.
pub fn status_for(err: &EngineError) -> u16 {
    if matches!(err, EngineError::Busy) {
        return STATUS_SERVICE_UNAVAILABLE;
    }
    match err.kind() {
        ErrorKind::InvalidInput => STATUS_BAD_REQUEST,
        ErrorKind::ReceiveTimeout => STATUS_REQUEST_TIMEOUT,
        ErrorKind::InvalidFrame | ErrorKind::Interface | ErrorKind::Fatal => STATUS_INTERNAL_ERROR,
    }
}

fn error_response(err: &EngineError) -> ServiceResponse {
    let status = status_for(err);
    if err.kind() == ErrorKind::Fatal {
        tracing::error!(error = %err, "coax port unusable");
    }
    ServiceResponse::text(status, err.to_string())
}
