use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use bytes::Bytes;
use coax_signal::Word;

use crate::bus::CoaxBus;
use crate::clock::{Clock, SystemClock};
use crate::engine::{EngineState, EngineStats, TransactionEngine};
use crate::error::{EngineError, Result};

/// A shareable handle to one physical coax port.
///
/// Clones refer to the same engine. Transactions are serialized: at most one
/// is in flight per port, and it is fully torn down before the next starts.
pub struct Port<B, C = SystemClock> {
    engine: Arc<Mutex<TransactionEngine<B, C>>>,
}

impl<B, C> Clone for Port<B, C> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<B: CoaxBus, C: Clock> Port<B, C> {
    pub fn new(engine: TransactionEngine<B, C>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run a transaction, waiting for any transaction in flight to finish.
    pub fn transact(&self, outbound: &[u8], timeout: Duration) -> Result<Bytes> {
        self.lock()?.transact(outbound, timeout)
    }

    /// Run a transaction on words, waiting for the port.
    pub fn transact_words(&self, outbound: &[Word], timeout: Duration) -> Result<Vec<Word>> {
        self.lock()?.transact_words(outbound, timeout)
    }

    /// Run a transaction only if the port is free; fails with
    /// [`EngineError::Busy`] otherwise.
    pub fn try_transact(&self, outbound: &[u8], timeout: Duration) -> Result<Bytes> {
        match self.engine.try_lock() {
            Ok(mut engine) => engine.transact(outbound, timeout),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("port busy; rejecting transaction");
                Err(EngineError::Busy)
            }
            Err(TryLockError::Poisoned(_)) => Err(EngineError::Faulted),
        }
    }

    /// Engine state, waiting for any transaction in flight to finish.
    pub fn state(&self) -> Result<EngineState> {
        Ok(self.lock()?.state())
    }

    /// How the most recent transaction on this port finished.
    pub fn last_outcome(&self) -> Result<Option<EngineState>> {
        Ok(self.lock()?.last_outcome())
    }

    pub fn stats(&self) -> Result<EngineStats> {
        Ok(self.lock()?.stats())
    }

    /// Deadline applied when a request carries none.
    pub fn default_timeout(&self) -> Result<Duration> {
        Ok(self.lock()?.config().default_timeout)
    }

    /// A poisoned lock means a transaction panicked mid-flight; the bus state
    /// is unknown, so the port is treated as faulted.
    fn lock(&self) -> Result<MutexGuard<'_, TransactionEngine<B, C>>> {
        self.engine.lock().map_err(|_| EngineError::Faulted)
    }
}
