use std::time::Duration;

use clap::{Args, Subcommand};
use coax3270::signal::{command_code, Word};

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod pack;
pub mod poll;
pub mod signal;
pub mod simulate;
pub mod unpack;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manchester-encode words into 32-bit line patterns.
    Encode(EncodeArgs),
    /// Decode 32-bit line patterns back into words.
    Decode(DecodeArgs),
    /// Pack a frame into its tunnel body.
    Pack(PackArgs),
    /// Unpack a tunnel body into words.
    Unpack(UnpackArgs),
    /// Show the line waveform of a frame as level runs.
    Signal(SignalArgs),
    /// Run one tunnelled transaction against a simulated terminal.
    Simulate(SimulateArgs),
    /// Poll a simulated terminal until interrupted.
    Poll(PollArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Pack(args) => pack::run(args, format),
        Command::Unpack(args) => unpack::run(args, format),
        Command::Signal(args) => signal::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Poll(args) => poll::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Words to encode (hex `0x...`, decimal, or a command name such as POLL).
    #[arg(required = true, value_parser = parse_word)]
    pub words: Vec<Word>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// 32-bit line patterns in hex.
    #[arg(required = true, value_parser = parse_pattern)]
    pub patterns: Vec<u32>,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Frame words (hex `0x...`, decimal, or a command name).
    #[arg(required = true, value_parser = parse_word)]
    pub words: Vec<Word>,
    /// Total occurrences of the repeated tail. 0 sends the frame as is.
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub repeat_count: i32,
    /// Index of the first repeated word.
    #[arg(long, default_value = "0")]
    pub repeat_offset: usize,
}

#[derive(Args, Debug)]
pub struct UnpackArgs {
    /// Tunnel body in hex (whitespace ignored).
    pub hex: String,
    /// Reject the reserved end-of-frame word, as for a received frame.
    #[arg(long)]
    pub inbound: bool,
}

#[derive(Args, Debug)]
pub struct SignalArgs {
    /// Frame words (hex `0x...`, decimal, or a command name).
    #[arg(required = true, value_parser = parse_word)]
    pub words: Vec<Word>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Outbound frame words.
    #[arg(required = true, value_parser = parse_word)]
    pub words: Vec<Word>,
    /// Words the terminal answers with (comma-separated).
    #[arg(long, value_delimiter = ',', value_parser = parse_word, default_value = "0x000")]
    pub reply: Vec<Word>,
    /// Terminal never answers.
    #[arg(long, conflicts_with_all = ["reply", "delay"])]
    pub silent: bool,
    /// Delay before the terminal answers (e.g. 5ms, 1s).
    #[arg(long, default_value = "0ms")]
    pub delay: String,
    /// Transaction timeout (e.g. 500ms, 1s).
    #[arg(long, default_value = "1000ms")]
    pub timeout: String,
    /// Station address header sent with the request.
    #[arg(long)]
    pub station: Option<u8>,
    /// Total occurrences of the repeated tail.
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub repeat_count: i32,
    /// Index of the first repeated word.
    #[arg(long, default_value = "0")]
    pub repeat_offset: usize,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Terminal status word returned for each POLL.
    #[arg(long, value_parser = parse_word, default_value = "0x000")]
    pub status: Word,
    /// Exit after N polls.
    #[arg(long)]
    pub count: Option<usize>,
    /// Pause between polls (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
    /// Timeout for each poll (e.g. 50ms).
    #[arg(long, default_value = "100ms")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a word given as `0x` hex, decimal, or a command name.
pub fn parse_word(input: &str) -> Result<Word, String> {
    let input = input.trim();
    if let Some(code) = command_code(input) {
        return Ok(Word::command(code));
    }

    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => input.parse::<u16>(),
    };
    parsed
        .map(Word::from_raw)
        .map_err(|_| format!("invalid word: {input}"))
}

/// Parse a 32-bit line pattern in hex, with or without `0x`.
pub fn parse_pattern(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u32::from_str_radix(digits, 16).map_err(|_| format!("invalid pattern: {input}"))
}

/// Parse a duration such as `250ms` or `2s`. A bare number is milliseconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis_per_unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, 1000)
    } else {
        (input, 1)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| CliError::usage(format!("duration out of range: {input}")))
}

/// Like [`parse_duration`], but zero is refused.
pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let timeout = parse_duration(input)?;
    if timeout.is_zero() {
        return Err(CliError::usage("timeout must be greater than zero"));
    }
    Ok(timeout)
}
