// src/feed/mod.rs
pub mod acquire;
pub mod browser;
pub mod catalog;
pub mod types;

pub use acquire::Acquirer;
pub use browser::{FeedBrowser, FeedSession, HttpBrowser};
pub use catalog::LeagueCatalog;
pub use types::RawFeed;
