//! Configuration types
//!
//! Board-agnostic settings for one display. Loading them from a file is
//! the runtime's job; these types only carry values and defaults.

pub mod types;

pub use types::*;
