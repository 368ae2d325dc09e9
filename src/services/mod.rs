pub mod bulk;
pub mod export;
pub mod matching;
