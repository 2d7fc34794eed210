//! Events published by the controller
//!
//! State notifications carry user-visible values and are only raised when
//! the value changes. Diagnostics report things a log should show; the
//! core does not log itself.

use core::fmt;

use heapless::String;
use mdclink_protocol::{FaultFlags, FrameError, InputCode, IrRemote, Power};

use super::control::ControlError;
use crate::state::Effective;
use crate::status::ContactStatus;

/// Longest serial number or software version kept
pub const INFO_TEXT_CAPACITY: usize = 32;

/// Transport connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Timeout,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite of raw power and raw input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayState {
    /// Powered and on the main input (or the input is not known)
    On,
    Off,
    /// Powered but showing some other input
    UnknownInput,
    /// Power has never been reported
    Unknown,
}

impl DisplayState {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayState::On => "On",
            DisplayState::Off => "Off",
            DisplayState::UnknownInput => "UnknownInput",
            DisplayState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property under enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tracked {
    Power,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    // State
    Connection(ConnectionState),
    /// `None` once the value is unknown again (stale request, no report)
    Power(Option<Effective<Power>>),
    Input(Option<Effective<InputCode>>),
    State(DisplayState),
    Volume(u8),
    Mute(bool),
    Contact(ContactStatus),
    Faults(FaultFlags),
    Temperature(u8),
    SerialNumber(String<INFO_TEXT_CAPACITY>),
    SoftwareVersion(String<INFO_TEXT_CAPACITY>),
    IrRemote(IrRemote),

    // Diagnostics
    /// Misaligned bytes dropped while looking for a header
    FramingDiscarded { bytes: usize },
    /// A response failed validation or decoding
    ResponseRejected { command: Option<u8>, error: FrameError },
    /// A frame arrived with no request in flight
    UnsolicitedFrame,
    /// No response in time; the queue and decoder were reset
    ProtocolTimeout { abandoned: usize },
    /// A request could not be issued
    RequestFailed(ControlError),
    EnforcementStarted(Tracked),
    EnforcementSettled(Tracked),
    EnforcementGaveUp(Tracked),
    /// Input enforcement stopped because power is meant to be off
    InputAborted,
    /// Input enforcement is turning the display on first
    PowerPrecondition,
}

impl Notification {
    /// True for events meant for a log rather than for subscribers
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            Notification::FramingDiscarded { .. }
                | Notification::ResponseRejected { .. }
                | Notification::UnsolicitedFrame
                | Notification::ProtocolTimeout { .. }
                | Notification::RequestFailed(_)
                | Notification::EnforcementStarted(_)
                | Notification::EnforcementSettled(_)
                | Notification::EnforcementGaveUp(_)
                | Notification::InputAborted
                | Notification::PowerPrecondition
        )
    }
}

/// Last published value of every state notification
#[derive(Debug, Clone, Default)]
pub(crate) struct Published {
    pub connection: Option<ConnectionState>,
    pub power: Option<Effective<Power>>,
    pub input: Option<Effective<InputCode>>,
    pub state: Option<DisplayState>,
    pub volume: Option<u8>,
    pub mute: Option<bool>,
    pub contact: Option<ContactStatus>,
    pub faults: Option<FaultFlags>,
    pub temperature: Option<u8>,
    pub serial_number: Option<String<INFO_TEXT_CAPACITY>>,
    pub software_version: Option<String<INFO_TEXT_CAPACITY>>,
    pub ir_remote: Option<IrRemote>,
}

/// Store `value` in `slot`; returns true if it differs from what was there
pub(crate) fn changed<V: PartialEq>(slot: &mut Option<V>, value: V) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

/// Like [`changed`], but an absent value is a state of its own
pub(crate) fn replaced<V: PartialEq>(slot: &mut Option<V>, value: Option<V>) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Copy as much of `text` as fits
pub(crate) fn info_text(text: &str) -> String<INFO_TEXT_CAPACITY> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
