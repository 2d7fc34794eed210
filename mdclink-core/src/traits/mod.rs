//! Seams between the core logic and the runtime
//!
//! These traits define the interface between the display control logic
//! and whatever owns the actual connection.

pub mod transport;

pub use transport::Transport;
