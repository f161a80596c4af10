use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::fetcher::{Fetcher, PageRequest};
use crate::parser::listing;
use crate::records::{PhotoRecord, UNKNOWN_DAY};

/// Crawl stats returned after completion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages: u32,
    pub ok: u32,
    pub failed: u32,
    pub records: usize,
}

/// Fetch listing pages `1..=pages` one after another and collect their
/// records in page order.
///
/// A failed page contributes no records and the crawl moves on. The last
/// date heading seen, even one with no entry after it on its page, carries
/// over into the following pages.
pub fn crawl(
    fetcher: &Fetcher,
    pages: u32,
    start_date: Option<&str>,
    show_progress: bool,
) -> (Vec<PhotoRecord>, CrawlStats) {
    let pb = if show_progress {
        let pb = ProgressBar::new(u64::from(pages));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut records: Vec<PhotoRecord> = Vec::new();
    let mut current_day = UNKNOWN_DAY.to_string();
    let mut stats = CrawlStats {
        pages,
        ..Default::default()
    };

    for page in 1..=pages {
        info!("Getting page {}", page);
        let request = PageRequest::new(page, start_date);
        match fetcher.fetch(&request) {
            Ok(html) => {
                let (found, closing_day) = listing::extract_page(&html, &current_day);
                current_day = closing_day;
                info!(page, records = found.len(), "page extracted");
                stats.ok += 1;
                records.extend(found);
            }
            Err(e) => {
                warn!(page, "No data ({})", e);
                stats.failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    stats.records = records.len();
    info!(
        "Crawled {} pages ({} ok, {} failed), {} records",
        stats.pages, stats.ok, stats.failed, stats.records
    );
    (records, stats)
}
