use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use coax_frame::{decode_frame, encode_words};
use coax_signal::{TxProgram, Word};

use crate::buffer::ReceiveBuffer;
use crate::bus::CoaxBus;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::completion::{FrameCompletion, TerminatorCompletion};

/// Lifecycle of one transaction.
///
/// Between calls the engine is always `Idle` or `Faulted`. Every transition
/// is logged at `trace`, and the state a transaction finished in is kept as
/// [`TransactionEngine::last_outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Armed,
    InFlight,
    Completed,
    TimedOut,
    /// Teardown could not be confirmed. Terminal until the engine is rebuilt.
    Faulted,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::Armed => "armed",
            EngineState::InFlight => "in-flight",
            EngineState::Completed => "completed",
            EngineState::TimedOut => "timed-out",
            EngineState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Transaction counters since the engine was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub completed: u64,
    pub timed_out: u64,
    /// Requests refused before touching the bus.
    pub rejected: u64,
    pub faults: u64,
}

/// Runs one full-duplex exchange at a time over a [`CoaxBus`].
///
/// Every transaction arms the receive buffer, starts transmit and receive
/// together, polls for the end-of-frame marker until `timeout`, and then
/// tears the bus down before returning, whatever the outcome.
pub struct TransactionEngine<B, C = SystemClock> {
    bus: B,
    clock: C,
    completion: Box<dyn FrameCompletion>,
    config: EngineConfig,
    buffer: ReceiveBuffer,
    state: EngineState,
    last_outcome: Option<EngineState>,
    stats: EngineStats,
}

impl<B: CoaxBus> TransactionEngine<B> {
    /// Create an engine with default configuration.
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, EngineConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(bus: B, config: EngineConfig) -> Self {
        Self::with_clock(bus, SystemClock, config)
    }
}

impl<B: CoaxBus, C: Clock> TransactionEngine<B, C> {
    /// Create an engine driven by `clock`.
    pub fn with_clock(bus: B, clock: C, config: EngineConfig) -> Self {
        let buffer = ReceiveBuffer::new(config.max_frame_words + 1);
        Self {
            bus,
            clock,
            completion: Box::new(TerminatorCompletion),
            config,
            buffer,
            state: EngineState::Idle,
            last_outcome: None,
            stats: EngineStats::default(),
        }
    }

    /// Replace the end-of-frame check.
    pub fn with_completion(mut self, completion: impl FrameCompletion + 'static) -> Self {
        self.completion = Box::new(completion);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// `Completed`, `TimedOut` or `Faulted` for the most recent transaction
    /// that reached the bus. `None` if the bus refused to start.
    pub fn last_outcome(&self) -> Option<EngineState> {
        self.last_outcome
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Run one transaction on a transport-encoded outbound frame.
    ///
    /// `outbound` is a flat little-endian sequence of 16-bit words; the
    /// inbound frame is returned in the same format, without the terminator.
    pub fn transact(&mut self, outbound: &[u8], timeout: Duration) -> Result<Bytes> {
        self.ensure_usable()?;
        if outbound.len() % 2 != 0 {
            self.stats.rejected += 1;
            return Err(EngineError::InvalidInput(format!(
                "outbound frame is {} bytes, not a whole number of words",
                outbound.len()
            )));
        }

        let words = decode_frame(outbound)?;
        let inbound = self.transact_words(&words, timeout)?;

        let mut buf = BytesMut::new();
        encode_words(&inbound, &mut buf);
        Ok(buf.freeze())
    }

    /// Run one transaction on a sequence of words.
    pub fn transact_words(&mut self, outbound: &[Word], timeout: Duration) -> Result<Vec<Word>> {
        self.ensure_usable()?;
        let program = match TxProgram::encode(outbound) {
            Ok(program) => program,
            Err(err) => {
                self.stats.rejected += 1;
                return Err(err.into());
            }
        };

        self.enter(EngineState::Armed);
        self.buffer.clear();
        tracing::debug!(words = program.word_count(), ?timeout, "transaction armed");

        let outcome = self.exchange(&program, timeout);
        self.last_outcome = matches!(self.state, EngineState::Completed | EngineState::TimedOut)
            .then_some(self.state);

        if let Err(err) = self.teardown() {
            self.enter(EngineState::Faulted);
            self.last_outcome = Some(EngineState::Faulted);
            self.stats.faults += 1;
            return Err(err);
        }
        self.enter(EngineState::Idle);

        match outcome {
            Ok(len) => {
                self.stats.completed += 1;
                let inbound: Vec<Word> = self
                    .buffer
                    .snapshot(len)
                    .into_iter()
                    .map(Word::from_raw)
                    .collect();
                tracing::debug!(words = inbound.len(), "transaction completed");
                Ok(inbound)
            }
            Err(err) => {
                if err.is_receive_timeout() {
                    self.stats.timed_out += 1;
                    tracing::debug!(?timeout, "transaction timed out");
                }
                Err(err)
            }
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.state == EngineState::Faulted {
            return Err(EngineError::Faulted);
        }
        Ok(())
    }

    /// Start the bus and poll until the frame completes or `timeout` elapses.
    fn exchange(&mut self, program: &TxProgram, timeout: Duration) -> Result<usize> {
        let started = self.clock.now();
        self.bus.start(program, self.buffer.writer())?;
        self.enter(EngineState::InFlight);

        loop {
            if let Some(len) = self.completion.frame_len(&self.buffer) {
                self.enter(EngineState::Completed);
                return Ok(len.min(self.buffer.capacity()));
            }

            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= timeout {
                self.enter(EngineState::TimedOut);
                return Err(EngineError::ReceiveTimeout(timeout));
            }

            tracing::trace!(?elapsed, "waiting for end of frame");
            self.clock.sleep(self.config.poll_interval.min(timeout - elapsed));
        }
    }

    fn enter(&mut self, state: EngineState) {
        tracing::trace!(from = %self.state, to = %state, "engine state");
        self.state = state;
    }

    /// Abort the bus and wait for both paths to report idle.
    fn teardown(&mut self) -> Result<()> {
        self.bus.abort();

        let started = self.clock.now();
        loop {
            let status = self.bus.status();
            if status.is_idle() {
                return Ok(());
            }

            let waited = self.clock.now().saturating_duration_since(started);
            if waited >= self.config.abort_ack_timeout {
                tracing::error!(
                    tx_active = status.tx_active,
                    rx_active = status.rx_active,
                    ?waited,
                    "bus did not acknowledge abort; refusing further transactions"
                );
                return Err(EngineError::AbortUnconfirmed(waited));
            }
            self.clock.sleep(self.config.poll_interval);
        }
    }
}

impl<B, C> fmt::Debug for TransactionEngine<B, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("state", &self.state)
            .field("last_outcome", &self.last_outcome)
            .field("stats", &self.stats)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::buffer::RxWriter;
    use crate::bus::BusStatus;
    use crate::clock::ManualClock;
    use coax_signal::{ErrorKind, POLL, TERMINATOR};

    /// Bus that writes a canned reply the moment it is started.
    #[derive(Default)]
    struct MockBus {
        reply: Option<Vec<u16>>,
        ignore_abort: bool,
        fail_start: bool,
        starts: usize,
        aborts: usize,
        last_program: Option<TxProgram>,
        writer: Option<RxWriter>,
    }

    impl MockBus {
        fn replying(values: &[u16]) -> Self {
            Self {
                reply: Some(values.to_vec()),
                ..Self::default()
            }
        }

        fn silent() -> Self {
            Self::default()
        }
    }

    impl CoaxBus for MockBus {
        fn start(&mut self, program: &TxProgram, mut rx: RxWriter) -> std::io::Result<()> {
            self.starts += 1;
            if self.fail_start {
                return Err(std::io::Error::other("state machine unavailable"));
            }
            self.last_program = Some(program.clone());
            if let Some(reply) = &self.reply {
                for &value in reply {
                    rx.push(value);
                }
            }
            self.writer = Some(rx);
            Ok(())
        }

        fn abort(&mut self) {
            self.aborts += 1;
            if !self.ignore_abort {
                self.writer = None;
            }
        }

        fn status(&self) -> BusStatus {
            BusStatus {
                tx_active: false,
                rx_active: self.writer.is_some(),
            }
        }
    }

    fn engine(bus: MockBus) -> (TransactionEngine<MockBus, Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let engine = TransactionEngine::with_clock(bus, Arc::clone(&clock), EngineConfig::default());
        (engine, clock)
    }

    fn poll_bytes() -> Vec<u8> {
        Word::command(POLL).raw().to_le_bytes().to_vec()
    }

    #[test]
    fn completed_frame_excludes_terminator() {
        let (mut engine, _) = engine(MockBus::replying(&[0x004, 0x0A0, TERMINATOR]));
        let inbound = engine.transact(&poll_bytes(), Duration::from_millis(100)).unwrap();

        assert_eq!(&inbound[..], &[0x04, 0x00, 0xA0, 0x00]);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.last_outcome(), Some(EngineState::Completed));
        assert_eq!(engine.stats().completed, 1);
        assert_eq!(engine.bus().aborts, 1);
        assert_eq!(
            engine.bus().last_program.as_ref().unwrap().count_minus_one(),
            0
        );
    }

    #[test]
    fn odd_length_rejected_before_bus() {
        let (mut engine, _) = engine(MockBus::replying(&[TERMINATOR]));
        let err = engine.transact(&[0x05, 0x00, 0x01], Duration::from_millis(100)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(engine.bus().starts, 0);
        assert_eq!(engine.stats().rejected, 1);
    }

    #[test]
    fn empty_and_oversized_frames_rejected_before_bus() {
        let (mut engine, _) = engine(MockBus::replying(&[TERMINATOR]));
        let empty = engine.transact(&[], Duration::from_millis(100)).unwrap_err();
        let wide = engine
            .transact_words(&[Word::from_raw(0x0400)], Duration::from_millis(100))
            .unwrap_err();

        assert_eq!(empty.kind(), ErrorKind::InvalidInput);
        assert_eq!(wide.kind(), ErrorKind::InvalidInput);
        assert_eq!(engine.bus().starts, 0);
        assert_eq!(engine.stats().rejected, 2);
    }

    #[test]
    fn silent_line_times_out_at_deadline() {
        let (mut engine, clock) = engine(MockBus::silent());
        let timeout = Duration::from_millis(100);
        let err = engine.transact(&poll_bytes(), timeout).unwrap_err();

        assert!(matches!(err, EngineError::ReceiveTimeout(t) if t == timeout));
        assert_eq!(err.kind(), ErrorKind::ReceiveTimeout);
        assert_eq!(clock.elapsed(), timeout);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.last_outcome(), Some(EngineState::TimedOut));
        assert_eq!(engine.bus().aborts, 1);
        assert!(engine.bus().status().is_idle());
        assert_eq!(engine.stats().timed_out, 1);
    }

    #[test]
    fn engine_reusable_after_timeout() {
        let (mut engine, _) = engine(MockBus::silent());
        let err = engine.transact(&poll_bytes(), Duration::from_millis(10)).unwrap_err();
        assert!(err.is_receive_timeout());

        engine.bus_mut().reply = Some(vec![0x004, TERMINATOR]);
        let inbound = engine.transact(&poll_bytes(), Duration::from_millis(10)).unwrap();
        assert_eq!(&inbound[..], &[0x04, 0x00]);
        assert_eq!(engine.last_outcome(), Some(EngineState::Completed));
        assert_eq!(engine.bus().starts, 2);
        assert_eq!(engine.bus().aborts, 2);
    }

    #[test]
    fn zero_timeout_still_checks_once() {
        let (mut engine, clock) = engine(MockBus::replying(&[0x010, TERMINATOR]));
        let inbound = engine.transact_words(&[Word::command(POLL)], Duration::ZERO).unwrap();
        assert_eq!(inbound, vec![Word::from_raw(0x010)]);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn unacknowledged_abort_faults_engine() {
        let bus = MockBus {
            ignore_abort: true,
            ..MockBus::silent()
        };
        let (mut engine, clock) = engine(bus);
        let err = engine.transact(&poll_bytes(), Duration::from_millis(20)).unwrap_err();

        assert!(matches!(err, EngineError::AbortUnconfirmed(_)));
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(engine.state(), EngineState::Faulted);
        assert_eq!(engine.last_outcome(), Some(EngineState::Faulted));
        assert_eq!(clock.elapsed(), Duration::from_millis(120));

        let again = engine.transact(&poll_bytes(), Duration::from_millis(20)).unwrap_err();
        assert!(matches!(again, EngineError::Faulted));
        assert_eq!(engine.bus().starts, 1);
        assert_eq!(engine.stats().faults, 1);
    }

    #[test]
    fn failed_start_still_tears_down() {
        let bus = MockBus {
            fail_start: true,
            ..MockBus::silent()
        };
        let (mut engine, _) = engine(bus);
        let err = engine.transact(&poll_bytes(), Duration::from_millis(20)).unwrap_err();

        assert!(matches!(err, EngineError::Bus(_)));
        assert_eq!(err.kind(), ErrorKind::Interface);
        assert_eq!(engine.bus().aborts, 1);
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.last_outcome(), None);
    }

    #[test]
    fn maximum_length_frame_recovered() {
        let config = EngineConfig {
            max_frame_words: 4,
            ..EngineConfig::default()
        };
        let clock = Arc::new(ManualClock::new());
        let bus = MockBus::replying(&[1, 2, 3, 4, TERMINATOR]);
        let mut engine = TransactionEngine::with_clock(bus, clock, config);

        let inbound = engine
            .transact_words(&[Word::command(POLL)], Duration::from_millis(10))
            .unwrap();
        assert_eq!(inbound.len(), 4);
    }

    #[test]
    fn overlong_frame_times_out() {
        let config = EngineConfig {
            max_frame_words: 2,
            ..EngineConfig::default()
        };
        let clock = Arc::new(ManualClock::new());
        let bus = MockBus::replying(&[1, 2, 3, 4, TERMINATOR]);
        let mut engine = TransactionEngine::with_clock(bus, clock, config);

        let err = engine
            .transact_words(&[Word::command(POLL)], Duration::from_millis(10))
            .unwrap_err();
        assert!(err.is_receive_timeout());
    }

    #[test]
    fn stale_terminator_cleared_between_transactions() {
        let (mut engine, _) = engine(MockBus::replying(&[0x020, TERMINATOR]));
        engine.transact(&poll_bytes(), Duration::from_millis(10)).unwrap();

        // Now silent: the previous terminator must not complete it.
        engine.bus_mut().reply = None;
        let err = engine.transact(&poll_bytes(), Duration::from_millis(10)).unwrap_err();
        assert!(err.is_receive_timeout());
    }

    #[test]
    fn custom_completion_decides_frame_end() {
        struct FirstWordCompletion;
        impl FrameCompletion for FirstWordCompletion {
            fn frame_len(&self, buffer: &ReceiveBuffer) -> Option<usize> {
                (buffer.get(0) != Some(0)).then_some(1)
            }
        }

        let (engine, _) = engine(MockBus::replying(&[0x030, 0x040]));
        let mut engine = engine.with_completion(FirstWordCompletion);
        let inbound = engine
            .transact_words(&[Word::command(POLL)], Duration::from_millis(10))
            .unwrap();
        assert_eq!(inbound, vec![Word::from_raw(0x030)]);
    }
}
