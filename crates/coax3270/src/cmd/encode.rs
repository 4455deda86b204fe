use coax3270::signal::{encode_word, parity_bit};
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{signal_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat, Report, WordView};

#[derive(Serialize)]
struct EncodedWord {
    word: WordView,
    pattern: String,
    parity: u8,
}

#[derive(Serialize)]
struct EncodeReport {
    words: Vec<EncodedWord>,
}

impl Report for EncodeReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["WORD", "KIND", "DETAIL", "PATTERN", "PARITY"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.words
            .iter()
            .map(|encoded| {
                let mut row = encoded.word.cells();
                row.push(encoded.pattern.clone());
                row.push(encoded.parity.to_string());
                row
            })
            .collect()
    }

    fn raw(&self) -> Vec<u8> {
        self.words
            .iter()
            .map(|encoded| format!("{}\n", encoded.pattern))
            .collect::<String>()
            .into_bytes()
    }
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut words = Vec::with_capacity(args.words.len());
    for word in args.words {
        let pattern = encode_word(word.raw())
            .map_err(|err| signal_error(&format!("encode {word}"), err))?;
        words.push(EncodedWord {
            word: WordView::new(word),
            pattern: format!("0x{pattern:08x}"),
            parity: u8::from(parity_bit(word.raw())),
        });
    }

    emit(&EncodeReport { words }, format);
    Ok(SUCCESS)
}
