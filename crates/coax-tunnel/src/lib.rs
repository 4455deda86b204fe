//! HTTP tunnel for 3270 coax transactions.
//!
//! Both ends of one contract:
//! - [`TunnelClient`] (and [`AsyncTunnelClient`] with the `async` feature)
//!   sends one request per transaction and classifies the response: `200`
//!   carries the inbound frame, `408` or a missed deadline is
//!   [`Outcome::ReceiveTimeout`], anything else is an interface error.
//! - [`TransactService`] runs on the device, turning `POST /transact` into a
//!   transaction on a [`coax_engine::Port`] and the result into a status.
//!
//! The HTTP protocol itself stays outside: requests go through the
//! [`Exchange`] seam and the service starts from already-parsed parts.
//! [`LoopbackExchange`] joins the two ends in one process.

#[cfg(feature = "async")]
pub mod async_client;
pub mod client;
pub mod error;
pub mod loopback;
pub mod meta;
pub mod service;

#[cfg(feature = "async")]
pub use async_client::{AsyncExchange, AsyncTunnelClient};
pub use client::{
    ClientConfig, Exchange, ExchangeError, Outcome, TunnelClient, TunnelRequest, TunnelResponse,
    STATUS_OK, STATUS_REQUEST_TIMEOUT,
};
pub use error::{Result, TunnelError};
pub use loopback::LoopbackExchange;
pub use meta::{
    RequestMeta, CONTENT_LENGTH, DEFAULT_TIMEOUT, STATION_ADDRESS_HEADER, TIMEOUT_HEADER,
};
pub use service::{status_for, ServiceConfig, ServiceResponse, TransactService, TRANSACT_PATH};

pub use coax_signal::ErrorKind;
