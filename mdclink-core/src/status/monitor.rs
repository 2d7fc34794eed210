//! Contact and fault status
//!
//! Checked on a fixed interval, in order of severity:
//!
//! 1. nothing received for longer than the interval plus grace → error
//! 2. heartbeat enabled and none within its grace window → error
//! 3. display on with no video sync → warning
//! 4. any other fault flag → warning
//! 5. otherwise OK, and the last good contact is refreshed

use core::fmt::Write;

use heapless::{String, Vec};
use mdclink_protocol::FaultFlags;

use super::clock::{Since, WallClock};
use crate::schedule::Schedule;

/// Longest status message
pub const MESSAGE_CAPACITY: usize = 96;

/// Severity of a contact status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusLevel {
    Ok = 0,
    Warning = 1,
    Error = 2,
}

/// Level plus a human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContactStatus {
    pub level: StatusLevel,
    pub message: String<MESSAGE_CAPACITY>,
}

impl ContactStatus {
    fn new(level: StatusLevel, args: core::fmt::Arguments<'_>) -> Self {
        let mut message = String::new();
        // Text past capacity is dropped
        let _ = message.write_fmt(args);
        Self { level, message }
    }

    pub fn ok() -> Self {
        Self::new(StatusLevel::Ok, format_args!("OK"))
    }
}

/// Thresholds for [`StatusMonitor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorTimings {
    pub check_interval_ms: u64,
    pub receive_grace_ms: u64,
    pub heartbeat_grace_ms: u64,
}

/// Derives [`ContactStatus`] from receive recency, heartbeats and faults
#[derive(Debug, Clone)]
pub struct StatusMonitor {
    timings: MonitorTimings,
    check: Schedule,
    heartbeat_enabled: bool,
    started_ms: u64,
    last_receive_ms: u64,
    last_good_contact_ms: Option<u64>,
    last_heartbeat_ms: Option<u64>,
    faults: FaultFlags,
    clock: WallClock,
}

impl StatusMonitor {
    pub fn new(timings: MonitorTimings, heartbeat_enabled: bool, clock: WallClock) -> Self {
        Self {
            timings,
            check: Schedule::every(timings.check_interval_ms),
            heartbeat_enabled,
            started_ms: 0,
            last_receive_ms: 0,
            last_good_contact_ms: None,
            last_heartbeat_ms: None,
            faults: FaultFlags::default(),
            clock,
        }
    }

    /// Begin periodic checks; the first runs one interval from now
    ///
    /// The heartbeat grace window also counts from here until the first
    /// heartbeat arrives.
    pub fn start(&mut self, now_ms: u64) {
        self.started_ms = now_ms;
        self.check.start(now_ms);
    }

    /// Any bytes arrived from the display
    pub fn record_receive(&mut self, now_ms: u64) {
        self.last_receive_ms = now_ms;
    }

    /// The external heartbeat source checked in
    pub fn record_heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = Some(now_ms);
    }

    pub fn set_faults(&mut self, faults: FaultFlags) {
        self.faults = faults;
    }

    pub fn faults(&self) -> FaultFlags {
        self.faults
    }

    pub fn sync_wall_clock(&mut self, unix_ms: i64, now_ms: u64) {
        self.clock.sync(unix_ms, now_ms);
    }

    pub fn last_good_contact_ms(&self) -> Option<u64> {
        self.last_good_contact_ms
    }

    /// Run a check if one is due
    pub fn poll(&mut self, now_ms: u64, power_on: bool) -> Option<ContactStatus> {
        if self.check.poll(now_ms) {
            Some(self.check_now(now_ms, power_on))
        } else {
            None
        }
    }

    /// Evaluate status immediately
    ///
    /// `power_on` is whether the effective power is exactly On; the no-sync
    /// warning is only raised then.
    pub fn check_now(&mut self, now_ms: u64, power_on: bool) -> ContactStatus {
        let since_receive = now_ms.saturating_sub(self.last_receive_ms);
        if since_receive > self.timings.check_interval_ms + self.timings.receive_grace_ms {
            return self.off_network(now_ms);
        }

        if self.heartbeat_enabled {
            let last = self.last_heartbeat_ms.unwrap_or(self.started_ms);
            let since_heartbeat = now_ms.saturating_sub(last);
            if since_heartbeat > self.timings.heartbeat_grace_ms {
                return self.missed_heartbeat(now_ms);
            }
        }

        if self.faults.no_sync && power_on {
            return ContactStatus::new(
                StatusLevel::Warning,
                format_args!("Display is on but no video signal detected"),
            );
        }

        if let Some(status) = fault_status(&self.faults) {
            return status;
        }

        self.last_good_contact_ms = Some(now_ms);
        ContactStatus::ok()
    }

    fn off_network(&self, now_ms: u64) -> ContactStatus {
        let Some(previous) = self.last_good_contact_ms else {
            return ContactStatus::new(StatusLevel::Error, format_args!("Always been missing."));
        };

        match self.clock.since(previous, now_ms) {
            Since::Minutes(n) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("Off the network for approx. {} mins", n),
            ),
            Since::Hours(n) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("Off the network for approx. {} hours", n),
            ),
            Since::Days(n) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("Off the network for approx. {} days", n),
            ),
            Since::At(time) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("Off the network since {}", time),
            ),
        }
    }

    fn missed_heartbeat(&self, now_ms: u64) -> ContactStatus {
        let Some(previous) = self.last_heartbeat_ms else {
            return ContactStatus::new(StatusLevel::Error, format_args!("Never checked in"));
        };

        match self.clock.since(previous, now_ms) {
            Since::Minutes(n) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("Last check-in was approx. {} mins ago", n),
            ),
            Since::Hours(n) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("Last check-in was approx. {} hours ago", n),
            ),
            Since::Days(n) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("Last check-in was approx. {} days ago", n),
            ),
            Since::At(time) => ContactStatus::new(
                StatusLevel::Error,
                format_args!("No check-in since {}", time),
            ),
        }
    }
}

/// Warning naming every faulted subsystem other than video sync
fn fault_status(faults: &FaultFlags) -> Option<ContactStatus> {
    let mut names: Vec<&str, 4> = Vec::new();
    let flagged = [
        (faults.bright_sensor, "bright-sensor"),
        (faults.fan, "fan"),
        (faults.lamp, "lamp"),
        (faults.temperature, "temperature"),
    ];
    for (set, name) in flagged {
        if set {
            let _ = names.push(name);
        }
    }

    let (last, rest) = names.split_last()?;
    if rest.is_empty() {
        return Some(ContactStatus::new(
            StatusLevel::Warning,
            format_args!("A {} related fault is being reported by display", last),
        ));
    }

    let mut status = ContactStatus::new(
        StatusLevel::Warning,
        format_args!("Faults are being reported in relation to "),
    );
    for (i, name) in rest.iter().enumerate() {
        if i > 0 {
            let _ = status.message.push_str(", ");
        }
        let _ = status.message.push_str(name);
    }
    let _ = write!(status.message, " and {}", last);
    Some(status)
}
