//! Embassy runtime for a networked display
//!
//! Binds [`mdclink_core::Display`] to an embassy-net TCP socket:
//!
//! - [`tasks::link_task`] owns the socket, feeds received bytes and ticks
//!   into the controller and writes its outbound frames
//! - [`channels::CONTROL`] carries control calls into the task
//! - [`channels::NOTIFICATIONS`] publishes state changes to subscribers
//! - [`config`] loads the TOML configuration
//!
//! The board binary brings up the network stack, a global allocator (for
//! TOML parsing) and a defmt transport, then spawns `link_task`.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod channels;
pub mod config;
pub mod outbox;
pub mod tasks;

pub use config::{parse_config, ConfigError, NodeConfig};
pub use outbox::Outbox;
