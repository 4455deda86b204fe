use coax3270::frame::{decode_frame, decode_inbound};
use serde::Serialize;

use crate::cmd::UnpackArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{emit, OutputFormat, Report, WordView};

#[derive(Serialize)]
struct UnpackReport {
    words: Vec<WordView>,
}

impl Report for UnpackReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["WORD", "KIND", "DETAIL"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.words.iter().map(WordView::cells).collect()
    }
}

pub fn run(args: UnpackArgs, format: OutputFormat) -> CliResult<i32> {
    let body = parse_hex(&args.hex)?;
    let words = if args.inbound {
        decode_inbound(&body)
    } else {
        decode_frame(&body)
    }
    .map_err(|err| frame_error("unpack", err))?;

    let report = UnpackReport {
        words: words.into_iter().map(WordView::new).collect(),
    };
    emit(&report, format);
    Ok(SUCCESS)
}

/// Hex digits to bytes. Whitespace is ignored; an odd digit count is refused.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            DATA_INVALID,
            "hex body must have an even number of digits",
        ));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::new(DATA_INVALID, "invalid hex digit in body"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_hex() {
        assert_eq!(parse_hex("0400 fe03").unwrap(), vec![0x04, 0x00, 0xFE, 0x03]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_hex() {
        assert_eq!(parse_hex("040").unwrap_err().code, DATA_INVALID);
        assert_eq!(parse_hex("zz").unwrap_err().code, DATA_INVALID);
    }
}
