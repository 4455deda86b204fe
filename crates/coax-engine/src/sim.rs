//! A coax port simulated in software.
//!
//! [`SimulatedBus`] runs the real signal engine in both directions: the
//! outbound program is rendered to a line waveform and decoded by a
//! terminal-side receiver, the [`Terminal`] answers, and its reply is rendered
//! and decoded again by the controller-side receiver, which writes into the
//! receive buffer exactly as the DMA channel would.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use coax_signal::{Receiver, RxEvent, TxProgram, Word};

use crate::buffer::RxWriter;
use crate::bus::{BusStatus, CoaxBus};

/// Ticks handed to the receiver per step, so an abort lands mid-frame.
const FEED_CHUNK_TICKS: usize = 256;

/// What a simulated terminal does with a frame addressed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer with `words` after `delay`.
    Frame { delay: Duration, words: Vec<Word> },
    /// Leave the line silent.
    Silent,
}

impl Reply {
    /// Answer immediately.
    pub fn now(words: impl Into<Vec<Word>>) -> Self {
        Reply::Frame {
            delay: Duration::ZERO,
            words: words.into(),
        }
    }

    /// Answer after `delay`.
    pub fn after(delay: Duration, words: impl Into<Vec<Word>>) -> Self {
        Reply::Frame {
            delay,
            words: words.into(),
        }
    }
}

/// The device at the far end of the coax.
pub trait Terminal: Send {
    fn respond(&mut self, frame: &[Word]) -> Reply;
}

impl<F> Terminal for F
where
    F: FnMut(&[Word]) -> Reply + Send,
{
    fn respond(&mut self, frame: &[Word]) -> Reply {
        self(frame)
    }
}

/// A terminal that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentTerminal;

impl Terminal for SilentTerminal {
    fn respond(&mut self, _frame: &[Word]) -> Reply {
        Reply::Silent
    }
}

/// Counters for a simulated bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Frames decoded on the terminal side.
    pub frames_delivered: u64,
    /// Frames the terminal answered.
    pub replies: u64,
    /// Replies cut short by an abort.
    pub aborted_replies: u64,
}

#[derive(Debug, Default)]
struct Shared {
    tx_active: AtomicBool,
    rx_active: AtomicBool,
    frames_delivered: AtomicU64,
    replies: AtomicU64,
    aborted_replies: AtomicU64,
}

struct Exchange {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// In-process stand-in for the coax transmit and receive hardware.
pub struct SimulatedBus {
    terminal: Arc<Mutex<Box<dyn Terminal>>>,
    shared: Arc<Shared>,
    exchange: Option<Exchange>,
    ignore_abort: bool,
}

impl SimulatedBus {
    pub fn new(terminal: impl Terminal + 'static) -> Self {
        Self {
            terminal: Arc::new(Mutex::new(Box::new(terminal))),
            shared: Arc::new(Shared::default()),
            exchange: None,
            ignore_abort: false,
        }
    }

    /// Make every abort go unacknowledged, as a wedged DMA channel would.
    pub fn with_abort_fault(mut self) -> Self {
        self.ignore_abort = true;
        self
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            frames_delivered: self.shared.frames_delivered.load(Ordering::SeqCst),
            replies: self.shared.replies.load(Ordering::SeqCst),
            aborted_replies: self.shared.aborted_replies.load(Ordering::SeqCst),
        }
    }

    fn stop_exchange(&mut self) {
        if let Some(exchange) = self.exchange.take() {
            drop(exchange.stop);
            if exchange.handle.join().is_err() {
                tracing::warn!("simulated terminal panicked");
            }
        }
        self.shared.tx_active.store(false, Ordering::SeqCst);
        self.shared.rx_active.store(false, Ordering::SeqCst);
    }
}

impl CoaxBus for SimulatedBus {
    fn start(&mut self, program: &TxProgram, rx: RxWriter) -> std::io::Result<()> {
        if self.exchange.is_some() {
            return Err(std::io::Error::other("exchange already in progress"));
        }

        self.shared.rx_active.store(true, Ordering::SeqCst);
        self.shared.tx_active.store(true, Ordering::SeqCst);

        let (stop, stopped) = mpsc::channel();
        let line = program.render();
        let terminal = Arc::clone(&self.terminal);
        let shared = Arc::clone(&self.shared);

        let spawned = std::thread::Builder::new()
            .name("coax-sim".to_string())
            .spawn(move || run_exchange(line.into_samples(), terminal, shared, rx, stopped));

        match spawned {
            Ok(handle) => {
                self.exchange = Some(Exchange { stop, handle });
                Ok(())
            }
            Err(err) => {
                self.stop_exchange();
                Err(err)
            }
        }
    }

    fn abort(&mut self) {
        if self.ignore_abort {
            tracing::warn!("simulated bus ignoring abort");
            return;
        }
        self.stop_exchange();
    }

    fn status(&self) -> BusStatus {
        BusStatus {
            tx_active: self.shared.tx_active.load(Ordering::SeqCst),
            rx_active: self.shared.rx_active.load(Ordering::SeqCst),
        }
    }
}

impl Drop for SimulatedBus {
    fn drop(&mut self) {
        self.stop_exchange();
    }
}

impl std::fmt::Debug for SimulatedBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedBus")
            .field("status", &self.status())
            .field("stats", &self.stats())
            .field("ignore_abort", &self.ignore_abort)
            .finish_non_exhaustive()
    }
}

/// Returns true if the bus was stopped before `delay` elapsed.
fn stopped_within(stopped: &mpsc::Receiver<()>, delay: Duration) -> bool {
    !matches!(stopped.recv_timeout(delay), Err(RecvTimeoutError::Timeout))
}

fn run_exchange(
    outbound: Vec<bool>,
    terminal: Arc<Mutex<Box<dyn Terminal>>>,
    shared: Arc<Shared>,
    mut rx: RxWriter,
    stopped: mpsc::Receiver<()>,
) {
    let mut frame = Vec::new();
    Receiver::new().feed(&outbound, |event| {
        if let RxEvent::Word(word) = event {
            frame.push(word.word());
        }
    });
    shared.tx_active.store(false, Ordering::SeqCst);
    shared.frames_delivered.fetch_add(1, Ordering::SeqCst);
    tracing::trace!(words = frame.len(), "terminal received frame");

    let reply = match terminal.lock() {
        Ok(mut terminal) => terminal.respond(&frame),
        Err(_) => Reply::Silent,
    };

    if let Reply::Frame { delay, words } = reply {
        if stopped_within(&stopped, delay) {
            shared.aborted_replies.fetch_add(1, Ordering::SeqCst);
            return;
        }
        if let Ok(program) = TxProgram::encode(&words) {
            shared.replies.fetch_add(1, Ordering::SeqCst);
            let line = program.render().into_samples();
            let mut receiver = Receiver::new();
            for chunk in line.chunks(FEED_CHUNK_TICKS) {
                if stopped_within(&stopped, Duration::ZERO) {
                    shared.aborted_replies.fetch_add(1, Ordering::SeqCst);
                    return;
                }
                receiver.feed(chunk, |event| {
                    rx.push(event.fifo_value());
                });
            }
            if receiver.stats().frames == 0 {
                tracing::warn!("reply did not decode as a frame");
            }
        } else {
            tracing::warn!(words = words.len(), "terminal reply cannot be transmitted");
        }
    }

    // The receiver stays armed until the engine aborts.
    let _ = stopped.recv();
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Instant;

    use super::*;
    use crate::buffer::ReceiveBuffer;
    use coax_signal::{POLL, POLL_ACK};

    fn poll_program() -> TxProgram {
        TxProgram::encode(&[Word::command(POLL)]).unwrap()
    }

    fn wait_for_terminator(buffer: &ReceiveBuffer) -> Option<usize> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(len) = buffer.find_terminator() {
                return Some(len);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        None
    }

    #[test]
    fn terminal_sees_outbound_frame_and_reply_lands_in_buffer() {
        let (seen_tx, seen_rx) = mpsc::channel();
        let mut bus = SimulatedBus::new(move |frame: &[Word]| {
            let _ = seen_tx.send(frame.to_vec());
            Reply::now(vec![Word::data(0x01), Word::command(POLL_ACK)])
        });
        let buffer = ReceiveBuffer::new(16);

        bus.start(&poll_program(), buffer.writer()).unwrap();
        assert_eq!(seen_rx.recv().unwrap(), vec![Word::command(POLL)]);

        let len = wait_for_terminator(&buffer).unwrap();
        assert_eq!(
            buffer.snapshot(len),
            vec![Word::data(0x01).raw(), Word::command(POLL_ACK).raw()]
        );
        assert!(bus.status().rx_active);

        bus.abort();
        assert!(bus.status().is_idle());
        assert_eq!(bus.stats().replies, 1);
    }

    #[test]
    fn silent_terminal_leaves_buffer_untouched() {
        let mut bus = SimulatedBus::new(SilentTerminal);
        let buffer = ReceiveBuffer::new(4);
        bus.start(&poll_program(), buffer.writer()).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(buffer.find_terminator(), None);
        bus.abort();
        assert!(bus.status().is_idle());
        assert_eq!(bus.stats().frames_delivered, 1);
        assert_eq!(bus.stats().replies, 0);
    }

    #[test]
    fn abort_cancels_delayed_reply() {
        let mut bus = SimulatedBus::new(|_: &[Word]| {
            Reply::after(Duration::from_secs(5), vec![Word::data(0x7F)])
        });
        let buffer = ReceiveBuffer::new(4);
        bus.start(&poll_program(), buffer.writer()).unwrap();

        let started = Instant::now();
        while bus.stats().frames_delivered == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        bus.abort();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(bus.status().is_idle());
        assert_eq!(buffer.find_terminator(), None);
        assert_eq!(bus.stats().aborted_replies, 1);
    }

    #[test]
    fn abort_fault_keeps_receiver_active() {
        let mut bus = SimulatedBus::new(SilentTerminal).with_abort_fault();
        let buffer = ReceiveBuffer::new(4);
        bus.start(&poll_program(), buffer.writer()).unwrap();
        bus.abort();
        assert!(bus.status().rx_active);
    }

    #[test]
    fn second_start_without_abort_refused() {
        let mut bus = SimulatedBus::new(SilentTerminal);
        let buffer = ReceiveBuffer::new(4);
        bus.start(&poll_program(), buffer.writer()).unwrap();
        assert!(bus.start(&poll_program(), buffer.writer()).is_err());
        bus.abort();
        assert!(bus.start(&poll_program(), buffer.writer()).is_ok());
        bus.abort();
    }
}
