use coax3270::signal::decode_word;
use serde::Serialize;

use crate::cmd::DecodeArgs;
use crate::exit::{signal_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{emit, OutputFormat, Report, WordView};

#[derive(Serialize)]
struct DecodedPattern {
    pattern: String,
    word: WordView,
    parity_ok: bool,
}

#[derive(Serialize)]
struct DecodeReport {
    words: Vec<DecodedPattern>,
}

impl Report for DecodeReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["PATTERN", "WORD", "KIND", "DETAIL", "PARITY_OK"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.words
            .iter()
            .map(|decoded| {
                let mut row = vec![decoded.pattern.clone()];
                row.extend(decoded.word.cells());
                row.push(decoded.parity_ok.to_string());
                row
            })
            .collect()
    }
}

/// Exits with `DATA_INVALID` if any pattern failed its parity check.
pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut words = Vec::with_capacity(args.patterns.len());
    for pattern in args.patterns {
        let decoded = decode_word(pattern)
            .map_err(|err| signal_error(&format!("decode 0x{pattern:08x}"), err))?;
        if !decoded.parity_ok {
            tracing::warn!("parity mismatch in 0x{pattern:08x}");
        }
        words.push(DecodedPattern {
            pattern: format!("0x{pattern:08x}"),
            word: WordView::new(decoded.word()),
            parity_ok: decoded.parity_ok,
        });
    }

    let all_ok = words.iter().all(|decoded| decoded.parity_ok);
    emit(&DecodeReport { words }, format);
    Ok(if all_ok { SUCCESS } else { DATA_INVALID })
}
