//! Connectivity and fault status

pub mod clock;
pub mod monitor;

pub use clock::{ClockTime, Since, WallClock};
pub use monitor::{ContactStatus, MonitorTimings, StatusLevel, StatusMonitor, MESSAGE_CAPACITY};
