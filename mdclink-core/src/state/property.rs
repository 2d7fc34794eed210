//! Enforcement of a single controllable property
//!
//! ```text
//! Unknown ──raw──► InSync ◄──converged── Enforcing ──give-up──► GaveUp
//!                    │                      ▲
//!                    └──── set_desired ─────┘
//! ```
//!
//! Setting a desired value starts a retry schedule. Each retry re-checks
//! the raw value; the schedule stops when the values agree, or when the
//! request is older than the give-up threshold.

use super::effective::{effective, Effective};
use crate::schedule::Schedule;

/// Last requested value and when it was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Desired<T> {
    pub value: T,
    pub requested_at_ms: u64,
}

/// Reconciliation phase of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Device has not reported a value yet
    Unknown,
    /// Raw matches desired, or nothing was requested
    InSync,
    /// Diverged and retrying
    Enforcing,
    /// Diverged, no longer retrying
    GaveUp,
}

/// Result of comparing raw against desired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Check<T> {
    pub current: Option<T>,
    pub desired: Option<T>,
    pub in_sync: bool,
    /// This check ended an active enforcement cycle
    pub settled: bool,
}

/// Outcome of one enforcement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step<T> {
    /// Nothing to do; the retry schedule is stopped
    InSync,
    /// The request is too old; the retry schedule is stopped
    GaveUp,
    /// Issue the command for this value again
    Retry(T),
}

/// Desired and raw values of one property plus its retry schedule
#[derive(Debug, Clone)]
pub struct Property<T> {
    desired: Option<Desired<T>>,
    raw: Option<T>,
    retry: Schedule,
    give_up_ms: u64,
}

impl<T: Copy + PartialEq> Property<T> {
    pub fn new(retry_period_ms: u64, give_up_ms: u64) -> Self {
        Self {
            desired: None,
            raw: None,
            retry: Schedule::every(retry_period_ms),
            give_up_ms,
        }
    }

    pub fn raw(&self) -> Option<T> {
        self.raw
    }

    pub fn desired(&self) -> Option<Desired<T>> {
        self.desired
    }

    /// True while the retry schedule is running
    pub fn is_enforcing(&self) -> bool {
        self.retry.is_started()
    }

    /// Record a request
    ///
    /// Returns true if this started a new enforcement cycle, in which case
    /// the caller makes one attempt immediately.
    pub fn set_desired(&mut self, value: T, now_ms: u64) -> bool {
        self.desired = Some(Desired {
            value,
            requested_at_ms: now_ms,
        });

        if self.retry.is_started() {
            return false;
        }
        self.retry.start(now_ms);
        true
    }

    /// Record a device report; returns true if the value changed
    pub fn update_raw(&mut self, value: T) -> bool {
        let changed = self.raw != Some(value);
        self.raw = Some(value);
        changed
    }

    /// Compare raw against desired, stopping the retry schedule when they agree
    pub fn quick_check(&mut self) -> Check<T> {
        let desired = self.desired.map(|d| d.value);
        let in_sync = desired.is_none() || self.raw == desired;
        let settled = in_sync && self.retry.is_started();

        if in_sync {
            self.retry.stop();
        }

        Check {
            current: self.raw,
            desired,
            in_sync,
            settled,
        }
    }

    /// One enforcement attempt
    pub fn enforce(&mut self, now_ms: u64) -> Step<T> {
        let check = self.quick_check();
        let desired = match self.desired {
            Some(desired) if !check.in_sync => desired,
            _ => return Step::InSync,
        };

        if now_ms.saturating_sub(desired.requested_at_ms) > self.give_up_ms {
            self.retry.stop();
            return Step::GaveUp;
        }

        Step::Retry(desired.value)
    }

    /// True when a retry is due
    pub fn retry_due(&mut self, now_ms: u64) -> bool {
        self.retry.poll(now_ms)
    }

    /// Stop retrying without touching desired or raw
    pub fn abandon(&mut self) {
        self.retry.stop();
    }

    pub fn phase(&self) -> Phase {
        let raw = match self.raw {
            Some(raw) => raw,
            None => return Phase::Unknown,
        };

        match self.desired {
            None => Phase::InSync,
            Some(d) if d.value == raw => Phase::InSync,
            Some(_) if self.retry.is_started() => Phase::Enforcing,
            Some(_) => Phase::GaveUp,
        }
    }

    pub fn effective(&self, now_ms: u64, stale_after_ms: u64) -> Option<Effective<T>> {
        effective(self.raw, self.desired, now_ms, stale_after_ms)
    }
}
