//! Control surface
//!
//! Every call returns as soon as the request is queued. An `Err` only
//! means the call was rejected up front; whether the display did what was
//! asked shows up later as notifications.

use mdclink_protocol::{FrameError, InputCode, IrRemote, Power};

use crate::queue::QueueError;

/// Highest accepted volume level
pub const MAX_VOLUME: u8 = 100;

/// Synchronous rejection of a control call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Too many requests already waiting
    Queue(QueueError),
    /// The command could not be encoded
    Frame(FrameError),
    VolumeOutOfRange,
    /// Ensuring a state needs a configured main input
    NoMainInputCode,
}

impl From<QueueError> for ControlError {
    fn from(err: QueueError) -> Self {
        ControlError::Queue(err)
    }
}

impl From<FrameError> for ControlError {
    fn from(err: FrameError) -> Self {
        ControlError::Frame(err)
    }
}

/// A control call as a value, for delivery over a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    SetPower(Power),
    SetInput(InputCode),
    /// Power plus main input for On, power alone for Off
    EnsureState(Power),
    PollStatus,
    PollExtendedStatus,
    GetSerialNumber,
    GetSoftwareVersion,
    GetIrRemoteControl,
    SetIrRemoteControl(IrRemote),
    SetVolume(u8),
    ClearMenu,
    /// Serial number, IR lock state and software version
    PollNonCriticalInfo,
    /// The external heartbeat source checked in
    Heartbeat,
    /// Unix time in milliseconds, as of now
    SyncWallClock(i64),
}
