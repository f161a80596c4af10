pub mod detail;
pub mod listing;
