pub mod client;

pub use client::LrclibClient;
