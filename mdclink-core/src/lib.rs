//! Board-agnostic core logic for networked display control
//!
//! This crate contains everything that does not depend on a particular
//! network stack or executor:
//!
//! - The transport seam ([`traits::Transport`])
//! - Single-in-flight request queue
//! - Desired/raw/effective state reconciliation with bounded enforcement
//! - Contact and fault status monitoring
//! - Tick-driven schedules
//! - Configuration type definitions
//! - The [`display::Display`] controller composing all of the above

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod display;
pub mod queue;
pub mod schedule;
pub mod state;
pub mod status;
pub mod traits;

pub use display::{Control, ControlError, Display, Notification};
