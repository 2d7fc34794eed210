//! Embassy async tasks

pub mod link;

pub use link::{link_task, TICK_INTERVAL_MS};
