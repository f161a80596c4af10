use std::sync::LazyLock;

use regex::Regex;

use crate::records::PhotoRecord;

// Groups: 1 = photo page, 2 = thumbnail, 3 = author, 4 = caption.
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?s)<div id="lista_banco_imagens_bloco">.*?<a href="([^"]*)""#,
        r#".*?<img src="([^"]*)""#,
        r#".*?<div class="nomeFotografo">(.*?)</div>"#,
        r#".*?<block align="left" class="legendafoto2">(.*?)</block>"#,
    ))
    .unwrap()
});
static DATE_MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)class="chapeu1".*?>(.*?)<"#).unwrap());

/// Extract every photo entry of a listing page, in document order.
///
/// Each record is tagged with the last date heading that precedes it in the
/// document, or `initial_date` while no heading has been seen.
pub fn extract(html: &str, initial_date: &str) -> Vec<PhotoRecord> {
    Entries::new(html, initial_date).collect()
}

/// Like [`extract`], also returning the date heading in effect at the end of
/// the page: the last heading anywhere in `html`, or `initial_date` if the
/// page has none. Headings after the last entry still count.
pub fn extract_page(html: &str, initial_date: &str) -> (Vec<PhotoRecord>, String) {
    let records = extract(html, initial_date);
    let closing = last_date_mark(html).unwrap_or(initial_date).to_string();
    (records, closing)
}

/// Last date heading found in `text`, if any.
pub fn last_date_mark(text: &str) -> Option<&str> {
    DATE_MARK_RE
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Walks a listing page entry by entry.
///
/// The next search resumes right after the caption of the previous entry,
/// not after the whole entry match.
pub struct Entries<'a> {
    html: &'a str,
    cursor: usize,
    current_date: String,
    done: bool,
}

impl<'a> Entries<'a> {
    pub fn new(html: &'a str, initial_date: &str) -> Self {
        Self {
            html,
            cursor: 0,
            current_date: initial_date.to_string(),
            done: false,
        }
    }

    /// Byte offset where the next entry search starts.
    #[cfg(test)]
    fn position(&self) -> usize {
        self.cursor
    }
}

impl Iterator for Entries<'_> {
    type Item = PhotoRecord;

    fn next(&mut self) -> Option<PhotoRecord> {
        if self.done {
            return None;
        }
        let Some(caps) = ENTRY_RE.captures_at(self.html, self.cursor) else {
            self.done = true;
            return None;
        };
        let (Some(whole), Some(page), Some(thumb), Some(author), Some(caption)) = (
            caps.get(0),
            caps.get(1),
            caps.get(2),
            caps.get(3),
            caps.get(4),
        ) else {
            self.done = true;
            return None;
        };

        // Rescan from the top of the document so the most recent heading wins.
        if let Some(day) = last_date_mark(&self.html[..whole.start()]) {
            self.current_date = day.to_string();
        }
        self.cursor = caption.end();

        Some(PhotoRecord {
            thumbnail_url: thumb.as_str().to_string(),
            author: author.as_str().to_string(),
            description: caption.as_str().to_string(),
            pub_day: self.current_date.clone(),
            photo_page: page.as_str().to_string(),
        })
    }
}
