use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::records::PhotoRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Json,
}

pub fn write_records<W: Write>(
    out: W,
    records: &[PhotoRecord],
    format: Format,
    indent: Option<usize>,
) -> Result<()> {
    match format {
        Format::Csv => write_csv(out, records),
        Format::Json => write_json(out, records, indent),
    }
}

/// Header row first, even for an empty table.
pub fn write_csv<W: Write>(out: W, records: &[PhotoRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(PhotoRecord::FIELDS)?;
    for record in records {
        wtr.write_record(record.as_row())?;
    }
    wtr.flush().context("Failed to write CSV")?;
    Ok(())
}

pub fn write_json<W: Write>(mut out: W, records: &[PhotoRecord], indent: Option<usize>) -> Result<()> {
    match indent {
        Some(width) => {
            let pad = vec![b' '; width];
            let mut ser =
                serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&pad));
            records.serialize(&mut ser)?;
        }
        None => serde_json::to_writer(&mut out, records)?,
    }
    out.flush().context("Failed to write JSON")?;
    Ok(())
}
