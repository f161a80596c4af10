use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, TimeZone};
use regex::{Captures, Regex};
use tracing::debug;

use crate::records::DetailDates;

// Created date in groups 1-5, last modification in groups 6-10.
static BYLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?s)<div class="documentByLine">.*?<span>"#,
        r".*?([0-9]+) de (.*?) de ([0-9]+) - (..)h(..).*?</span>.*?</span>",
        r".*?([0-9]+) de (.*?) de ([0-9]+) - (..)h(..)",
    ))
    .unwrap()
});

const MONTHS: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

/// Brasília time, which is how the byline dates are written.
const BRT_OFFSET_SECS: i32 = 3 * 3600;

/// Pull the created / last-modified timestamps out of a photo detail page.
pub fn extract_dates(html: &str) -> Option<DetailDates> {
    let Some(caps) = BYLINE_RE.captures(html) else {
        debug!("no byline dates found");
        return None;
    };
    let created = timestamp(&caps, 1);
    let updated = timestamp(&caps, 6);
    match (created, updated) {
        (Some(created), Some(updated)) => Some(DetailDates { created, updated }),
        _ => {
            debug!(byline = &caps[0], "byline dates did not parse");
            None
        }
    }
}

/// Numeric month for a Portuguese month name or a plain number.
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.trim();
    if let Some(i) = MONTHS.iter().position(|m| m.eq_ignore_ascii_case(name)) {
        return Some(i as u32 + 1);
    }
    // eq_ignore_ascii_case leaves the cedilla alone
    if name.to_lowercase() == "março" {
        return Some(3);
    }
    name.parse().ok().filter(|m| (1..=12).contains(m))
}

/// Render groups `first..first + 5` (day, month, year, hour, minute).
fn timestamp(caps: &Captures, first: usize) -> Option<String> {
    let num = |i: usize| caps.get(first + i)?.as_str().trim().parse::<u32>().ok();

    let day = num(0)?;
    let month = month_number(caps.get(first + 1)?.as_str())?;
    let year = i32::try_from(num(2)?).ok()?;
    let (hour, minute) = (num(3)?, num(4)?);

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    let brt = FixedOffset::west_opt(BRT_OFFSET_SECS)?;
    let local = brt.from_local_datetime(&naive).single()?;
    Some(local.format("%Y-%m-%dT%H:%M%:z").to_string())
}
