//! User-facing reconciliation of desired and raw values

use core::fmt;

use super::property::Desired;

/// What users see for a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effective<T> {
    /// The device agrees (or the request is stale/absent)
    Exact(T),
    /// A change was requested recently and the device has not confirmed it
    Partially(T),
}

impl<T: Copy> Effective<T> {
    pub fn value(&self) -> T {
        match self {
            Effective::Exact(v) | Effective::Partially(v) => *v,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Effective::Partially(_))
    }
}

impl<T: fmt::Display> fmt::Display for Effective<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effective::Exact(v) => write!(f, "{}", v),
            Effective::Partially(v) => write!(f, "Partially {}", v),
        }
    }
}

/// Pure function of (raw, desired, request time, now)
///
/// Once a request is older than `stale_after_ms` the raw value wins, so a
/// give-up or an out-of-band change on the device is not shown as
/// "partially" forever.
pub fn effective<T: Copy + PartialEq>(
    raw: Option<T>,
    desired: Option<Desired<T>>,
    now_ms: u64,
    stale_after_ms: u64,
) -> Option<Effective<T>> {
    match desired {
        None => raw.map(Effective::Exact),
        Some(d) if now_ms.saturating_sub(d.requested_at_ms) > stale_after_ms => {
            raw.map(Effective::Exact)
        }
        Some(d) if raw == Some(d.value) => Some(Effective::Exact(d.value)),
        Some(d) => Some(Effective::Partially(d.value)),
    }
}
