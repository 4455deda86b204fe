use std::time::Instant;

use coax3270::engine::{
    Port, Reply, SilentTerminal, SimulatedBus, SystemClock, TransactionEngine,
};
use coax3270::frame::OutboundFrame;
use coax3270::signal::Word;
use coax3270::tunnel::{
    ClientConfig, LoopbackExchange, Outcome, TransactService, TunnelClient, TunnelError,
    STATUS_OK, STATUS_REQUEST_TIMEOUT, TRANSACT_PATH,
};
use serde::Serialize;

use crate::cmd::{parse_duration, parse_timeout, SimulateArgs};
use crate::exit::{code_for, CliResult, SUCCESS, TIMEOUT};
use crate::output::{emit, OutputFormat, Report, WordView};

#[derive(Serialize)]
struct SimulateReport {
    outcome: &'static str,
    status: Option<u16>,
    elapsed_ms: u128,
    words: Vec<WordView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Report for SimulateReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["OUTCOME", "STATUS", "ELAPSED_MS", "WORDS"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let words = match &self.error {
            Some(error) => error.clone(),
            None => self
                .words
                .iter()
                .map(|word| word.value.clone())
                .collect::<Vec<_>>()
                .join(" "),
        };
        vec![vec![
            self.outcome.to_string(),
            self.status.map_or_else(|| "-".to_string(), |status| status.to_string()),
            self.elapsed_ms.to_string(),
            words,
        ]]
    }
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.timeout)?;
    let delay = parse_duration(&args.delay)?;

    let bus = if args.silent {
        SimulatedBus::new(SilentTerminal)
    } else {
        let reply = args.reply.clone();
        SimulatedBus::new(move |frame: &[Word]| {
            tracing::debug!(words = frame.len(), "simulated terminal answering");
            Reply::after(delay, reply.clone())
        })
    };

    let client = loopback_client(bus);
    let frame = OutboundFrame::new(args.words).with_repeat(args.repeat_count, args.repeat_offset);

    let started = Instant::now();
    let result = client.transact(args.station, &frame, Some(timeout));
    let elapsed_ms = started.elapsed().as_millis();

    let (report, code) = match result {
        Ok(Outcome::Received(words)) => (
            SimulateReport {
                outcome: "received",
                status: Some(STATUS_OK),
                elapsed_ms,
                words: words.into_iter().map(WordView::new).collect(),
                error: None,
            },
            SUCCESS,
        ),
        Ok(Outcome::ReceiveTimeout) => (
            SimulateReport {
                outcome: "receive_timeout",
                status: Some(STATUS_REQUEST_TIMEOUT),
                elapsed_ms,
                words: Vec::new(),
                error: None,
            },
            TIMEOUT,
        ),
        Err(err) => (
            SimulateReport {
                outcome: "error",
                status: status_of(&err),
                elapsed_ms,
                words: Vec::new(),
                error: Some(err.to_string()),
            },
            code_for(err.kind()),
        ),
    };

    emit(&report, format);
    Ok(code)
}

/// A tunnel client wired straight to a device service over `bus`.
pub(crate) fn loopback_client(
    bus: SimulatedBus,
) -> TunnelClient<LoopbackExchange<SimulatedBus, SystemClock>> {
    let service = TransactService::new(Port::new(TransactionEngine::new(bus)));
    TunnelClient::new(
        LoopbackExchange::new(service),
        ClientConfig::new(format!("loopback:{TRANSACT_PATH}")),
    )
}

fn status_of(err: &TunnelError) -> Option<u16> {
    match err {
        TunnelError::Status { status, .. } => Some(*status),
        _ => None,
    }
}
