use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use coax3270::signal::{command_name, Word};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result printable in every output format.
pub trait Report: Serialize {
    fn headers(&self) -> Vec<&'static str>;

    fn rows(&self) -> Vec<Vec<String>>;

    /// One human-readable line per row.
    fn pretty(&self) -> String {
        let headers = self.headers();
        self.rows()
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| format!("{}={cell}", name.to_ascii_lowercase()))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Bytes written for `--format raw`.
    fn raw(&self) -> Vec<u8> {
        let mut text = self.pretty();
        text.push('\n');
        text.into_bytes()
    }
}

pub fn emit(report: &impl Report, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(report.headers());
            for row in report.rows() {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", report.pretty()),
        OutputFormat::Raw => print_raw(&report.raw()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// How a word reads on the bus.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WordView {
    pub value: String,
    pub kind: &'static str,
    pub detail: String,
}

impl WordView {
    pub fn new(word: Word) -> Self {
        let (kind, detail) = if word.is_terminator() {
            ("terminator", "end of frame".to_string())
        } else if !word.fits_wire() {
            ("invalid", "wider than 10 bits".to_string())
        } else if let Some(code) = word.command_code() {
            ("command", format!("{} 0x{code:02x}", command_name(code)))
        } else if let Some(byte) = word.data_byte() {
            let parity = if word.data_parity_ok() == Some(true) {
                "parity ok"
            } else {
                "parity error"
            };
            ("data", format!("0x{byte:02x} {parity}"))
        } else {
            ("invalid", String::new())
        };

        Self {
            value: word.to_string(),
            kind,
            detail,
        }
    }

    pub fn cells(&self) -> Vec<String> {
        vec![self.value.clone(), self.kind.to_string(), self.detail.clone()]
    }
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
