use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use coax3270::engine::{Reply, SimulatedBus};
use coax3270::frame::OutboundFrame;
use coax3270::signal::{Word, POLL};
use coax3270::tunnel::Outcome;
use serde::Serialize;

use crate::cmd::simulate::loopback_client;
use crate::cmd::{parse_duration, parse_timeout, PollArgs};
use crate::exit::{tunnel_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{emit, OutputFormat, Report, WordView};

#[derive(Serialize)]
struct PollReport {
    sequence: usize,
    elapsed_us: u128,
    response: Option<WordView>,
}

impl Report for PollReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["SEQ", "ELAPSED_US", "RESPONSE"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let response = match &self.response {
            Some(word) => format!("{} {}", word.value, word.detail),
            None => "timeout".to_string(),
        };
        vec![vec![
            self.sequence.to_string(),
            self.elapsed_us.to_string(),
            response,
        ]]
    }
}

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let timeout = parse_timeout(&args.timeout)?;

    let status = args.status;
    let client = loopback_client(SimulatedBus::new(move |frame: &[Word]| {
        if frame.first() == Some(&Word::command(POLL)) {
            Reply::now(vec![status])
        } else {
            Reply::Silent
        }
    }));
    let poll = OutboundFrame::new(vec![Word::command(POLL)]);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut sequence = 0usize;
    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        let outcome = client
            .transact(None, &poll, Some(timeout))
            .map_err(|err| tunnel_error("poll failed", err))?;
        let elapsed_us = started.elapsed().as_micros();

        let response = match outcome {
            Outcome::Received(words) => words.first().copied().map(WordView::new),
            Outcome::ReceiveTimeout => None,
        };
        emit(
            &PollReport {
                sequence,
                elapsed_us,
                response,
            },
            format,
        );
        sequence = sequence.saturating_add(1);

        if args.count.is_some_and(|count| sequence >= count) {
            break;
        }
        std::thread::sleep(interval);
    }

    tracing::debug!(polls = sequence, "poll loop finished");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
