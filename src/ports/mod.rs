pub mod lyrics_store;
