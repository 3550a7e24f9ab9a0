// src/config/mod.rs
pub mod app;

pub use app::{AppConfig, FeedConfig, PacingConfig, ScheduleConfig, SinkConfig};
