//! Tick-driven timers
//!
//! Timers do not run on their own: the owner calls [`Schedule::poll`] with
//! the current time from a periodic tick, and a due schedule re-arms itself
//! one period later.

/// A periodic timer with an initial delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Schedule {
    period_ms: u64,
    initial_delay_ms: u64,
    next_due_ms: Option<u64>,
}

impl Schedule {
    /// Fire every `period_ms`, first one period after start
    pub const fn every(period_ms: u64) -> Self {
        Self {
            period_ms,
            initial_delay_ms: period_ms,
            next_due_ms: None,
        }
    }

    /// Override the delay before the first firing
    pub const fn after(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    /// Arm the schedule; does nothing if already started
    pub fn start(&mut self, now_ms: u64) {
        if self.next_due_ms.is_none() {
            self.next_due_ms = Some(now_ms.saturating_add(self.initial_delay_ms));
        }
    }

    pub fn stop(&mut self) {
        self.next_due_ms = None;
    }

    pub fn is_started(&self) -> bool {
        self.next_due_ms.is_some()
    }

    /// Move the next firing to `delay_ms` from now, starting if needed
    pub fn set_delay(&mut self, now_ms: u64, delay_ms: u64) {
        self.next_due_ms = Some(now_ms.saturating_add(delay_ms));
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Returns true once per elapsed period
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.next_due_ms {
            Some(due) if now_ms >= due => {
                self.next_due_ms = Some(now_ms.saturating_add(self.period_ms));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_never_fires() {
        let mut schedule = Schedule::every(1000);
        assert!(!schedule.poll(5000));
        assert!(!schedule.is_started());
    }

    #[test]
    fn test_first_after_delay_then_period() {
        let mut schedule = Schedule::every(30_000).after(1_000);
        schedule.start(0);

        assert!(!schedule.poll(999));
        assert!(schedule.poll(1_000));
        assert!(!schedule.poll(30_999));
        assert!(schedule.poll(31_000));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut schedule = Schedule::every(100);
        schedule.start(0);
        schedule.start(50);
        assert!(schedule.poll(100));
    }

    #[test]
    fn test_set_delay_reschedules() {
        let mut schedule = Schedule::every(30_000);
        schedule.start(0);
        schedule.set_delay(10_000, 1_000);
        assert!(schedule.poll(11_000));
    }

    #[test]
    fn test_stop() {
        let mut schedule = Schedule::every(100);
        schedule.start(0);
        schedule.stop();
        assert!(!schedule.poll(1_000));
    }
}
