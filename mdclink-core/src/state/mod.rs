//! Desired/raw/effective state reconciliation
//!
//! Every controllable property keeps the value last requested (desired),
//! the value last reported by the device (raw), and derives what users
//! should see (effective) from both plus the age of the request.

pub mod effective;
pub mod property;

pub use effective::{effective, Effective};
pub use property::{Check, Desired, Phase, Property, Step};
