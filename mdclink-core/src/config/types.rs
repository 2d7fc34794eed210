//! Configuration type definitions
//!
//! Durations are configured in whole seconds; the `*_ms` accessors convert
//! for the millisecond clock the controller runs on.

use mdclink_protocol::InputCode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::status::MonitorTimings;

/// Default TCP port of the display control service
pub const DEFAULT_PORT: u16 = 1515;

/// Timing thresholds
///
/// These are tuned per display family rather than derived from the
/// protocol, so all of them are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timings {
    /// Period between enforcement attempts
    pub retry_period_s: u32,
    /// Stop enforcing a request older than this
    pub give_up_s: u32,
    /// Show the raw value once a request is older than this
    pub stale_after_s: u32,
    /// Period of the contact status check
    pub status_check_interval_s: u32,
    /// Extra silence tolerated on top of the check interval
    pub receive_grace_s: u32,
    /// Heartbeat silence tolerated before reporting an error
    pub heartbeat_grace_s: u32,
    /// Clear the request queue if a response takes longer than this
    pub protocol_timeout_s: u32,
    pub status_poll_s: u32,
    /// Delay of the first status poll after each connect
    pub status_poll_on_connect_s: u32,
    pub extended_poll_s: u32,
    pub extended_poll_first_s: u32,
    /// Serial number, software version and IR lock state
    pub info_poll_s: u32,
    pub info_poll_first_s: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            retry_period_s: 25,
            give_up_s: 75,
            stale_after_s: 60,
            status_check_interval_s: 75,
            receive_grace_s: 15,
            heartbeat_grace_s: 5 * 60,
            protocol_timeout_s: 10,
            status_poll_s: 30,
            status_poll_on_connect_s: 1,
            extended_poll_s: 45,
            extended_poll_first_s: 15,
            info_poll_s: 48 * 60 * 60,
            info_poll_first_s: 15,
        }
    }
}

const fn ms(seconds: u32) -> u64 {
    seconds as u64 * 1000
}

impl Timings {
    pub fn retry_period_ms(&self) -> u64 {
        ms(self.retry_period_s)
    }

    pub fn give_up_ms(&self) -> u64 {
        ms(self.give_up_s)
    }

    pub fn stale_after_ms(&self) -> u64 {
        ms(self.stale_after_s)
    }

    pub fn protocol_timeout_ms(&self) -> u64 {
        ms(self.protocol_timeout_s)
    }

    pub fn status_poll_ms(&self) -> u64 {
        ms(self.status_poll_s)
    }

    pub fn status_poll_on_connect_ms(&self) -> u64 {
        ms(self.status_poll_on_connect_s)
    }

    pub fn extended_poll_ms(&self) -> u64 {
        ms(self.extended_poll_s)
    }

    pub fn extended_poll_first_ms(&self) -> u64 {
        ms(self.extended_poll_first_s)
    }

    pub fn info_poll_ms(&self) -> u64 {
        ms(self.info_poll_s)
    }

    pub fn info_poll_first_ms(&self) -> u64 {
        ms(self.info_poll_first_s)
    }

    /// Thresholds for the status monitor
    pub fn monitor(&self) -> MonitorTimings {
        MonitorTimings {
            check_interval_ms: ms(self.status_check_interval_s),
            receive_grace_ms: ms(self.receive_grace_s),
            heartbeat_grace_ms: ms(self.heartbeat_grace_s),
        }
    }
}

/// Per-display configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfig {
    /// Set ID addressing the display (0 for a direct connection)
    pub set_id: u8,
    /// Input that counts as "on" for the composite display state
    #[cfg_attr(feature = "serde", serde(with = "input_code"))]
    pub main_input_code: Option<InputCode>,
    /// Report an error when the external heartbeat goes quiet
    pub heartbeat_enabled: bool,
    /// Local time offset used when rendering clock times
    pub utc_offset_minutes: i16,
    pub timings: Timings,
}

/// Input codes are written as two hex digits or a source name
#[cfg(feature = "serde")]
mod input_code {
    use core::fmt::Write;

    use heapless::String;
    use mdclink_protocol::InputCode;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(code: &Option<InputCode>, serializer: S) -> Result<S::Ok, S::Error> {
        match code {
            Some(code) => {
                let mut text: String<2> = String::new();
                let _ = write!(text, "{}", code);
                serializer.serialize_some(text.as_str())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<InputCode>, D::Error> {
        let text: Option<String<16>> = Option::deserialize(deserializer)?;
        match text {
            Some(text) => InputCode::parse(&text)
                .map(Some)
                .map_err(|_| D::Error::custom("unknown input code")),
            None => Ok(None),
        }
    }
}
