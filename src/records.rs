use serde::Serialize;

/// Heading value used before any date heading has been seen.
pub const UNKNOWN_DAY: &str = "unknown";

/// One gallery entry pulled from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoRecord {
    pub thumbnail_url: String,
    pub author: String,
    pub description: String,
    pub pub_day: String,
    pub photo_page: String,
}

impl PhotoRecord {
    /// Column names in serialization order.
    pub const FIELDS: [&'static str; 5] = [
        "thumbnail_url",
        "author",
        "description",
        "pub_day",
        "photo_page",
    ];

    pub fn as_row(&self) -> [&str; 5] {
        [
            &self.thumbnail_url,
            &self.author,
            &self.description,
            &self.pub_day,
            &self.photo_page,
        ]
    }
}

/// Created / last-modified timestamps scraped from a photo's own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailDates {
    pub created: String,
    pub updated: String,
}
