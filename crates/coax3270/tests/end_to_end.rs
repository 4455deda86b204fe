use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use coax3270::engine::{
    BusStatus, CoaxBus, EngineConfig, EngineError, EngineState, Port, Reply, RxWriter,
    SilentTerminal, SimulatedBus, TransactionEngine, SCREEN_WORDS,
};
use coax3270::frame::OutboundFrame;
use coax3270::signal::{TxProgram, Word, POLL, READ_TERMINAL_ID};
use coax3270::tunnel::{ClientConfig, LoopbackExchange, Outcome, TransactService, TunnelClient};
use coax3270::ErrorKind;

fn port(bus: SimulatedBus) -> Port<SimulatedBus> {
    Port::new(TransactionEngine::new(bus))
}

#[test]
fn poll_returns_terminal_status() {
    let port = port(SimulatedBus::new(|_: &[Word]| {
        Reply::after(Duration::from_millis(10), vec![Word::from_raw(0x04)])
    }));

    let inbound = port
        .transact_words(&[Word::command(POLL)], Duration::from_millis(500))
        .unwrap();
    assert_eq!(inbound, vec![Word::from_raw(0x04)]);
    assert_eq!(port.state().unwrap(), EngineState::Idle);
}

#[test]
fn silent_terminal_times_out_and_port_recovers() {
    let answer = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&answer);
    let port = port(SimulatedBus::new(move |_: &[Word]| {
        if flag.load(Ordering::SeqCst) {
            Reply::now(vec![Word::data(0x20)])
        } else {
            Reply::Silent
        }
    }));

    let started = Instant::now();
    let err = port
        .transact_words(&[Word::command(POLL)], Duration::from_millis(100))
        .unwrap_err();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(1000));
    assert!(matches!(err, EngineError::ReceiveTimeout(_)));
    assert_eq!(err.kind(), ErrorKind::ReceiveTimeout);
    assert_eq!(port.state().unwrap(), EngineState::Idle);

    answer.store(true, Ordering::SeqCst);
    let inbound = port
        .transact_words(&[Word::command(POLL)], Duration::from_millis(500))
        .unwrap();
    assert_eq!(inbound, vec![Word::data(0x20)]);

    let stats = port.stats().unwrap();
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.completed, 1);
}

/// Records the interval between each `start` and the `abort` that ends it.
struct RecordingBus {
    inner: SimulatedBus,
    started: Option<Instant>,
    intervals: Arc<Mutex<Vec<(Instant, Instant)>>>,
    in_flight: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
}

impl CoaxBus for RecordingBus {
    fn start(&mut self, program: &TxProgram, rx: RxWriter) -> std::io::Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.started = Some(Instant::now());
        self.inner.start(program, rx)
    }

    fn abort(&mut self) {
        self.inner.abort();
        if let Some(started) = self.started.take() {
            self.intervals.lock().unwrap().push((started, Instant::now()));
        }
        self.in_flight.store(false, Ordering::SeqCst);
    }

    fn status(&self) -> BusStatus {
        self.inner.status()
    }
}

#[test]
fn concurrent_callers_are_serialized() {
    // Each reply echoes the data byte of the request.
    let intervals = Arc::new(Mutex::new(Vec::new()));
    let overlapped = Arc::new(AtomicBool::new(false));
    let bus = RecordingBus {
        inner: SimulatedBus::new(|frame: &[Word]| {
            let byte = frame.get(1).and_then(|word| word.data_byte()).unwrap_or(0);
            Reply::after(Duration::from_millis(20), vec![Word::data(byte)])
        }),
        started: None,
        intervals: Arc::clone(&intervals),
        in_flight: Arc::new(AtomicBool::new(false)),
        overlapped: Arc::clone(&overlapped),
    };
    let port = Port::new(TransactionEngine::new(bus));

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [0x11u8, 0x22]
        .into_iter()
        .map(|byte| {
            let port = port.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let frame = [Word::command(READ_TERMINAL_ID), Word::data(byte)];
                (byte, port.transact_words(&frame, Duration::from_millis(1000)))
            })
        })
        .collect();

    for handle in handles {
        let (byte, result) = handle.join().unwrap();
        assert_eq!(result.unwrap(), vec![Word::data(byte)]);
    }
    assert_eq!(port.stats().unwrap().completed, 2);
    assert_eq!(port.last_outcome().unwrap(), Some(EngineState::Completed));
    assert!(!overlapped.load(Ordering::SeqCst));

    let mut intervals = intervals.lock().unwrap().clone();
    intervals.sort();
    assert_eq!(intervals.len(), 2);
    assert!(intervals[0].1 <= intervals[1].0, "exchanges interleaved: {intervals:?}");
}

#[test]
fn full_screen_reply_fits_default_buffer() {
    let screen: Vec<Word> = (0..SCREEN_WORDS).map(|i| Word::data(i as u8)).collect();
    let expected = screen.clone();
    let port = port(SimulatedBus::new(move |_: &[Word]| Reply::now(screen.clone())));

    let inbound = port
        .transact_words(&[Word::command(POLL)], Duration::from_secs(5))
        .unwrap();
    assert_eq!(inbound, expected);
}

#[test]
fn reply_filling_every_slot_is_recovered() {
    let config = EngineConfig {
        max_frame_words: 4,
        ..EngineConfig::default()
    };
    let reply: Vec<Word> = (1..=4).map(Word::data).collect();
    let expected = reply.clone();
    let engine = TransactionEngine::with_config(
        SimulatedBus::new(move |_: &[Word]| Reply::now(reply.clone())),
        config,
    );
    let port = Port::new(engine);

    let inbound = port
        .transact_words(&[Word::command(POLL)], Duration::from_millis(500))
        .unwrap();
    assert_eq!(inbound, expected);
}

#[test]
fn tunnel_round_trip_over_loopback() {
    let service = TransactService::new(port(SimulatedBus::new(|frame: &[Word]| {
        Reply::now(vec![Word::data(frame.len() as u8)])
    })));
    let client = TunnelClient::new(
        LoopbackExchange::new(service),
        ClientConfig::new("http://device/transact"),
    );

    let frame = OutboundFrame::new(vec![Word::command(POLL), Word::data(0)]).with_repeat(5, 1);
    let outcome = client
        .transact(Some(1), &frame, Some(Duration::from_millis(500)))
        .unwrap();
    assert_eq!(outcome, Outcome::Received(vec![Word::data(6)]));
}

#[test]
fn tunnel_maps_silence_to_receive_timeout() {
    let service = TransactService::new(port(SimulatedBus::new(SilentTerminal)));
    let client = TunnelClient::new(
        LoopbackExchange::new(service),
        ClientConfig::new("http://device/transact"),
    );

    let frames: Vec<_> = (0..2)
        .map(|_| (None, OutboundFrame::new(vec![Word::command(POLL)])))
        .collect();
    let outcomes = client.transact_many(&frames, Some(Duration::from_millis(30)));
    for outcome in outcomes {
        assert_eq!(outcome.unwrap(), Outcome::ReceiveTimeout);
    }
}

#[test]
fn service_reports_timeout_as_408() {
    let service = TransactService::new(port(SimulatedBus::new(SilentTerminal)));
    let body = Word::command(POLL).raw().to_le_bytes();
    let response = service.handle(
        "POST",
        "/transact",
        [("Content-Length", "2"), ("X-3270-Timeout", "25")],
        &body,
    );
    assert_eq!(response.status, 408);
}
