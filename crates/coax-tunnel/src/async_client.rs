use std::future::Future;
use std::time::Duration;

use coax_frame::OutboundFrame;

use crate::client::{
    build_request, interpret, ClientConfig, ExchangeError, Outcome, TunnelRequest, TunnelResponse,
};
use crate::error::Result;

/// Performs a single HTTP round trip asynchronously.
///
/// The client enforces the request deadline itself, so implementations may
/// ignore [`TunnelRequest::deadline`].
pub trait AsyncExchange: Send + Sync {
    fn exchange(
        &self,
        request: TunnelRequest,
    ) -> impl Future<Output = std::result::Result<TunnelResponse, ExchangeError>> + Send;
}

/// Async counterpart of [`TunnelClient`](crate::TunnelClient).
#[derive(Debug)]
pub struct AsyncTunnelClient<E> {
    exchange: E,
    config: ClientConfig,
}

impl<E: AsyncExchange> AsyncTunnelClient<E> {
    pub fn new(exchange: E, config: ClientConfig) -> Self {
        Self { exchange, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one transaction through the tunnel.
    pub async fn transact(
        &self,
        address: Option<u8>,
        frame: &OutboundFrame,
        timeout: Option<Duration>,
    ) -> Result<Outcome> {
        let request = build_request(&self.config, address, frame, timeout)?;
        let deadline = request.deadline;
        match tokio::time::timeout(deadline, self.exchange.exchange(request)).await {
            Ok(response) => interpret(response),
            Err(_) => {
                tracing::debug!(?deadline, "tunnel request exceeded deadline");
                Ok(Outcome::ReceiveTimeout)
            }
        }
    }

    /// Run several transactions in order, one outcome per frame.
    pub async fn transact_many(
        &self,
        frames: &[(Option<u8>, OutboundFrame)],
        timeout: Option<Duration>,
    ) -> Vec<Result<Outcome>> {
        let mut outcomes = Vec::with_capacity(frames.len());
        for (address, frame) in frames {
            outcomes.push(self.transact(*address, frame, timeout).await);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use bytes::Bytes;

    use super::*;
    use crate::error::TunnelError;
    use coax_signal::{Word, POLL};

    /// Answers with `status` after `delay`.
    struct SlowExchange {
        delay: Duration,
        status: u16,
        body: Bytes,
        seen: Mutex<Vec<TunnelRequest>>,
    }

    impl SlowExchange {
        fn new(delay: Duration, status: u16, body: &'static [u8]) -> Self {
            Self {
                delay,
                status,
                body: Bytes::from_static(body),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl AsyncExchange for SlowExchange {
        async fn exchange(
            &self,
            request: TunnelRequest,
        ) -> std::result::Result<TunnelResponse, ExchangeError> {
            self.seen.lock().unwrap().push(request);
            tokio::time::sleep(self.delay).await;
            Ok(TunnelResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn client(exchange: SlowExchange) -> AsyncTunnelClient<SlowExchange> {
        let config = ClientConfig {
            response_grace: Duration::from_millis(10),
            ..ClientConfig::new("http://interface.local/transact")
        };
        AsyncTunnelClient::new(exchange, config)
    }

    fn poll() -> OutboundFrame {
        OutboundFrame::new(vec![Word::command(POLL)])
    }

    #[tokio::test]
    async fn response_within_deadline_decoded() {
        let client = client(SlowExchange::new(Duration::ZERO, 200, &[0x04, 0x00]));
        let outcome = client
            .transact(Some(0), &poll(), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Received(vec![Word::from_raw(4)]));
        assert_eq!(client.exchange.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn slow_response_becomes_receive_timeout() {
        let client = client(SlowExchange::new(Duration::from_secs(5), 200, &[]));
        let started = Instant::now();
        let outcome = client
            .transact(None, &poll(), Some(Duration::from_millis(20)))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::ReceiveTimeout);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn error_status_classified() {
        let client = client(SlowExchange::new(
            Duration::ZERO,
            404,
            b"The requested resource was not found",
        ));
        let outcomes = client
            .transact_many(&[(None, poll()), (None, poll())], None)
            .await;
        assert_eq!(outcomes.len(), 2);
        for outcome in outcomes {
            assert!(matches!(outcome, Err(TunnelError::Status { status: 404, .. })));
        }
    }
}
