//! Lyrics candidate matching: similarity, confidence scoring, name cleaning
//! and best-match resolution against a `LyricsStore`.

pub mod cleaning;
pub mod confidence;
pub mod resolver;
pub mod similarity;

pub use resolver::{find_best_match, find_best_match_with_retry, search_ranked, search_single};
