//! Input loading and output writers.
//!
//! The `-` path convention routes through standard streams, for input and
//! output alike. Frames are written as an aligned table, CSV or the
//! column-oriented JSON document from [`Frame::to_json`].

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;

use crate::{
    cli::OutputFormat,
    frame::Frame,
    table::{display_cell, render_frame},
};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn read_json_input(path: &Path) -> Result<JsonValue> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    serde_json::from_reader(reader).with_context(|| format!("Parsing JSON from {path:?}"))
}

pub fn open_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    })
}

pub fn write_frame<W: Write>(frame: &Frame, format: OutputFormat, mut writer: W) -> Result<()> {
    match format {
        OutputFormat::Table => {
            writer
                .write_all(render_frame(frame).as_bytes())
                .context("Writing table output")?;
        }
        OutputFormat::Csv => {
            let mut csv_writer = csv::Writer::from_writer(&mut writer);
            csv_writer
                .write_record(frame.columns.iter().map(|c| c.name.as_str()))
                .context("Writing CSV header")?;
            for row in &frame.rows {
                csv_writer
                    .write_record(row.iter().map(display_cell))
                    .context("Writing CSV row")?;
            }
            csv_writer.flush().context("Flushing CSV output")?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &frame.to_json())
                .context("Writing JSON output")?;
            writeln!(writer)?;
        }
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}
