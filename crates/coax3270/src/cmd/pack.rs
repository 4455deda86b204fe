use bytes::BytesMut;
use coax3270::frame::{encode_frame, OutboundFrame};
use serde::Serialize;

use crate::cmd::PackArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{emit, hex, OutputFormat, Report};

#[derive(Serialize)]
struct PackReport {
    words: usize,
    expanded_words: usize,
    bytes: usize,
    body: String,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl Report for PackReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["WORDS", "EXPANDED", "BYTES", "BODY"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        vec![vec![
            self.words.to_string(),
            self.expanded_words.to_string(),
            self.bytes.to_string(),
            self.body.clone(),
        ]]
    }

    fn raw(&self) -> Vec<u8> {
        self.raw.clone()
    }
}

pub fn run(args: PackArgs, format: OutputFormat) -> CliResult<i32> {
    let words = args.words.len();
    let frame = OutboundFrame::new(args.words).with_repeat(args.repeat_count, args.repeat_offset);

    let mut body = BytesMut::new();
    encode_frame(&frame, &mut body).map_err(|err| frame_error("pack", err))?;

    let report = PackReport {
        words,
        expanded_words: body.len() / 2,
        bytes: body.len(),
        body: hex(&body),
        raw: body.to_vec(),
    };
    emit(&report, format);
    Ok(SUCCESS)
}
