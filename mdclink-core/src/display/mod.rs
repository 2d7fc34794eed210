//! The display controller and its control/notification surface
//!
//! Data flows one way through [`Display`]:
//!
//! ```text
//! control call ─► desired ─► Command ─► RequestQueue ─► Transport
//!                                                          │
//! Notification ◄─ effective ◄─ raw ◄─ Response ◄─ FrameDecoder ◄─ bytes
//! ```

pub mod control;
pub mod controller;
pub mod notification;

pub use control::{Control, ControlError, MAX_VOLUME};
pub use controller::{Display, NOTIFICATION_CAPACITY};
pub use notification::{ConnectionState, DisplayState, Notification, Tracked, INFO_TEXT_CAPACITY};
