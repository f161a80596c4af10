use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::fetcher::Fetcher;
use crate::parser::detail;

pub const CREATED_COLUMN: &str = "created_date";
pub const UPDATED_COLUMN: &str = "updated_date";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnrichStats {
    pub rows: usize,
    pub dated: usize,
    pub missing: usize,
}

/// Copy a crawl CSV from `input` to `output`, appending the created and
/// last-modified dates scraped from each row's `photo_page`.
///
/// Rows whose page cannot be fetched or parsed get empty date columns.
pub fn add_dates<R: Read, W: Write>(
    fetcher: &Fetcher,
    input: R,
    output: W,
) -> Result<EnrichStats> {
    let mut rdr = csv::Reader::from_reader(input);
    let mut headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let Some(page_col) = headers.iter().position(|h| h == "photo_page") else {
        bail!("input CSV has no photo_page column");
    };
    headers.push_field(CREATED_COLUMN);
    headers.push_field(UPDATED_COLUMN);

    let mut wtr = csv::Writer::from_writer(output);
    wtr.write_record(&headers)?;

    let mut stats = EnrichStats::default();
    for (line, row) in rdr.records().enumerate() {
        let mut row = row.with_context(|| format!("Bad CSV row {}", line + 1))?;
        stats.rows += 1;
        debug!("Line #{}", line + 1);

        let url = row.get(page_col).unwrap_or_default();
        let dates = if url.is_empty() {
            None
        } else {
            fetcher
                .fetch_url(url)
                .ok()
                .and_then(|html| detail::extract_dates(&html))
        };

        match dates {
            Some(d) => {
                stats.dated += 1;
                row.push_field(&d.created);
                row.push_field(&d.updated);
            }
            None => {
                stats.missing += 1;
                row.push_field("");
                row.push_field("");
            }
        }
        wtr.write_record(&row)?;
    }
    wtr.flush().context("Failed to write CSV")?;

    info!(
        "Update finished. {} rows, {} dated, {} without dates",
        stats.rows, stats.dated, stats.missing
    );
    Ok(stats)
}
