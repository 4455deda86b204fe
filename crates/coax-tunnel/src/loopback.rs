//! In-process exchange that hands requests straight to a [`TransactService`].
//!
//! Stands in for the network when host and device run in one process, as in
//! simulation and tests.

use coax_engine::{Clock, CoaxBus};

use crate::client::{Exchange, ExchangeError, TunnelRequest, TunnelResponse};
use crate::meta::CONTENT_LENGTH;
use crate::service::{TransactService, TRANSACT_PATH};

pub struct LoopbackExchange<B, C> {
    service: TransactService<B, C>,
}

impl<B: CoaxBus, C: Clock> LoopbackExchange<B, C> {
    pub fn new(service: TransactService<B, C>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TransactService<B, C> {
        &self.service
    }
}

impl<B: CoaxBus, C: Clock> Exchange for LoopbackExchange<B, C> {
    fn exchange(&self, request: &TunnelRequest) -> Result<TunnelResponse, ExchangeError> {
        // The HTTP layer supplies the length from the body it sends.
        let length = (CONTENT_LENGTH.to_string(), request.body.len().to_string());
        let headers = request.headers.iter().cloned().chain(Some(length));

        let response = self
            .service
            .handle("POST", TRANSACT_PATH, headers, &request.body);
        Ok(TunnelResponse {
            status: response.status,
            body: response.body,
        })
    }
}
