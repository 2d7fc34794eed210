//! Single-in-flight request queue
//!
//! A request is a frame plus a tag describing how to interpret its
//! response. The tag is handed back when the next frame arrives, so the
//! caller resumes its own continuation instead of the queue storing
//! callbacks.

use heapless::Deque;
use mdclink_protocol::Frame;

use crate::traits::Transport;

/// Maximum requests waiting behind the one in flight
pub const QUEUE_CAPACITY: usize = 16;

/// Errors from enqueueing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// The waiting list is at capacity
    Full,
}

#[derive(Debug, Clone)]
struct Pending<K> {
    kind: K,
    frame: Frame,
}

#[derive(Debug, Clone, Copy)]
struct InFlight<K> {
    kind: K,
    sent_at_ms: u64,
}

/// FIFO of requests with exactly zero or one in flight
#[derive(Debug)]
pub struct RequestQueue<K, const N: usize = QUEUE_CAPACITY> {
    waiting: Deque<Pending<K>, N>,
    in_flight: Option<InFlight<K>>,
    timeout_ms: u64,
}

impl<K: Copy, const N: usize> RequestQueue<K, N> {
    /// Create an empty queue that gives up after `timeout_ms` without a response
    pub const fn new(timeout_ms: u64) -> Self {
        Self {
            waiting: Deque::new(),
            in_flight: None,
            timeout_ms,
        }
    }

    /// Enqueue a request, sending it at once if nothing is in flight
    pub fn request<T: Transport>(
        &mut self,
        kind: K,
        frame: Frame,
        now_ms: u64,
        transport: &mut T,
    ) -> Result<(), QueueError> {
        if self.in_flight.is_none() {
            self.dispatch(kind, &frame, now_ms, transport);
            return Ok(());
        }

        self.waiting
            .push_back(Pending { kind, frame })
            .map_err(|_| QueueError::Full)
    }

    /// Resolve the in-flight request with a received frame
    ///
    /// Returns the tag of the resolved request, or `None` if nothing was
    /// waiting for a response. The next queued request is sent before
    /// returning.
    pub fn handle<T: Transport>(&mut self, now_ms: u64, transport: &mut T) -> Option<K> {
        let resolved = self.in_flight.take()?;

        if let Some(next) = self.waiting.pop_front() {
            self.dispatch(next.kind, &next.frame, now_ms, transport);
        }

        Some(resolved.kind)
    }

    /// Clear everything if the in-flight request has waited too long
    ///
    /// Returns the number of abandoned requests when the timeout fires.
    /// Abandoned requests are never resolved.
    pub fn check_timeout(&mut self, now_ms: u64) -> Option<usize> {
        let in_flight = self.in_flight.as_ref()?;
        if now_ms.saturating_sub(in_flight.sent_at_ms) < self.timeout_ms {
            return None;
        }
        Some(self.clear())
    }

    /// Drop all requests without resolving them; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.len();
        self.waiting.clear();
        self.in_flight = None;
        dropped
    }

    /// Tag of the request currently awaiting a response
    pub fn in_flight(&self) -> Option<K> {
        self.in_flight.map(|f| f.kind)
    }

    /// Requests in flight plus waiting
    pub fn len(&self) -> usize {
        self.waiting.len() + usize::from(self.in_flight.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_none()
    }

    fn dispatch<T: Transport>(&mut self, kind: K, frame: &Frame, now_ms: u64, transport: &mut T) {
        transport.send(frame.as_bytes());
        self.in_flight = Some(InFlight {
            kind,
            sent_at_ms: now_ms,
        });
    }
}
