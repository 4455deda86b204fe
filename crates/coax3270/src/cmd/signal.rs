use coax3270::signal::{Receiver, TxProgram, Word, TERMINATOR};
use serde::Serialize;

use crate::cmd::SignalArgs;
use crate::exit::{signal_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat, Report};

#[derive(Serialize)]
struct RunView {
    level: &'static str,
    ticks: usize,
}

#[derive(Serialize)]
struct SignalReport {
    words: usize,
    ticks: usize,
    duration_ns: u128,
    runs: Vec<RunView>,
    /// Words recovered by feeding the waveform back through a receiver.
    echoed: Vec<String>,
    #[serde(skip)]
    line: String,
}

impl Report for SignalReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["RUN", "LEVEL", "TICKS"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.runs
            .iter()
            .enumerate()
            .map(|(index, run)| {
                vec![
                    index.to_string(),
                    run.level.to_string(),
                    run.ticks.to_string(),
                ]
            })
            .collect()
    }

    fn pretty(&self) -> String {
        format!(
            "words={} ticks={} duration_ns={} runs={} echoed=[{}]",
            self.words,
            self.ticks,
            self.duration_ns,
            self.runs.len(),
            self.echoed.join(" ")
        )
    }

    /// One character per tick.
    fn raw(&self) -> Vec<u8> {
        format!("{}\n", self.line).into_bytes()
    }
}

pub fn run(args: SignalArgs, format: OutputFormat) -> CliResult<i32> {
    let program = TxProgram::encode(&args.words).map_err(|err| signal_error("signal", err))?;
    let waveform = program.render();

    let echoed = Receiver::decode(&waveform)
        .into_iter()
        .take_while(|&value| value != TERMINATOR)
        .map(|value| Word::from_raw(value).to_string())
        .collect();

    let report = SignalReport {
        words: program.word_count(),
        ticks: waveform.len(),
        duration_ns: waveform.duration().as_nanos(),
        runs: waveform
            .runs()
            .map(|run| RunView {
                level: if run.level { "high" } else { "low" },
                ticks: run.ticks,
            })
            .collect(),
        echoed,
        line: waveform
            .samples()
            .iter()
            .map(|&high| if high { '1' } else { '0' })
            .collect(),
    };
    emit(&report, format);
    Ok(SUCCESS)
}
