// src/export.rs
// =============================================================================
// Writes collected URLs out for other tools: one URL per line (txt) or a
// single-column CSV with a "URL" header.
// =============================================================================

use clap::ValueEnum;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Txt,
}

pub fn write_urls<W: Write>(out: &mut W, urls: &[String], format: ExportFormat) -> io::Result<()> {
    match format {
        ExportFormat::Txt => {
            for url in urls {
                writeln!(out, "{}", url)?;
            }
        }
        ExportFormat::Csv => {
            writeln!(out, "URL")?;
            for url in urls {
                writeln!(out, "{}", csv_field(url))?;
            }
        }
    }
    out.flush()
}

// Quote fields holding a delimiter, a quote or a line break (RFC 4180)
fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
