mod config;
mod crawl;
mod enrich;
mod fetcher;
mod output;
mod parser;
mod records;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::fetcher::{Fetcher, PAGE_SIZE};
use crate::output::Format;

#[derive(Parser)]
#[command(
    name = "abrcrawl",
    about = "Crawl the Agência Brasil image bank listing and output it as tabular data"
)]
struct Cli {
    /// Print extra info while performing the tasks
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch listing pages and extract their photo records
    Crawl {
        /// Only photos published up to this day (YYYY/MM/DD)
        #[arg(short, long, value_parser = parse_start_date)]
        date: Option<String>,
        /// Number of listing pages to retrieve
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
        /// Indent width for pretty-printed JSON
        #[arg(short, long)]
        indent: Option<usize>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },
    /// Add created/updated dates to a crawl CSV by visiting each photo page
    Dates {
        /// CSV produced by `crawl`
        #[arg(short, long)]
        input_file: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let t0 = Instant::now();
    let settings = Settings::load()?;
    let fetcher = Fetcher::new(settings).context("Failed to build HTTP client")?;

    let result = match cli.command {
        Commands::Crawl {
            date,
            pages,
            format,
            indent,
            output_file,
        } => {
            tracing::debug!(
                pages,
                page_size = PAGE_SIZE,
                gallery = %fetcher.settings().gallery_url,
                "starting crawl"
            );
            let show_progress = output_file.is_some() && !cli.verbose;
            let (records, stats) = crawl::crawl(&fetcher, pages, date.as_deref(), show_progress);
            if stats.ok == 0 {
                eprintln!("No data.");
            }
            let out = open_output(output_file.as_ref())?;
            output::write_records(out, &records, format, indent)
        }
        Commands::Dates {
            input_file,
            output_file,
        } => {
            let input = File::open(&input_file)
                .with_context(|| format!("Failed to open {:?}", input_file))?;
            let out = open_output(output_file.as_ref())?;
            enrich::add_dates(&fetcher, BufReader::new(input), out).map(|_| ())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Failed to create {:?}", p))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn parse_start_date(s: &str) -> Result<String, String> {
    let well_formed = s.len() == 10
        && s.chars()
            .enumerate()
            .all(|(i, c)| if i == 4 || i == 7 { c == '/' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(format!("'{}' is not in YYYY/MM/DD format", s));
    }
    NaiveDate::parse_from_str(s, "%Y/%m/%d")
        .map(|_| s.to_string())
        .map_err(|e| format!("'{}' is not a valid date: {}", s, e))
}
