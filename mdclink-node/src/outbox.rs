//! Outbound byte buffer implementing the core transport seam
//!
//! The controller runs synchronously, so its sends land here and the link
//! task writes them to the socket after each step.

use defmt::*;
use heapless::Vec;

use mdclink_core::traits::Transport;
use mdclink_protocol::MAX_FRAME_SIZE;

/// Bytes buffered between flushes
pub const OUTBOX_CAPACITY: usize = 4 * MAX_FRAME_SIZE;

/// Pending outbound bytes plus connection bookkeeping
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<u8, OUTBOX_CAPACITY>,
    connected: bool,
    drop_requested: bool,
}

impl Outbox {
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
            connected: false,
            drop_requested: false,
        }
    }

    /// Mark the socket up or down; a fresh connection clears any drop request
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        if connected {
            self.drop_requested = false;
        } else {
            self.pending.clear();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Bytes waiting to be written
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True once after the controller asked for the connection to be dropped
    pub fn take_drop_request(&mut self) -> bool {
        core::mem::take(&mut self.drop_requested)
    }
}

impl Transport for Outbox {
    fn send(&mut self, bytes: &[u8]) {
        if !self.connected {
            debug!("Not connected; dropping {} bytes", bytes.len());
            return;
        }
        if self.pending.extend_from_slice(bytes).is_err() {
            warn!("Outbox full; dropping {} bytes", bytes.len());
        }
    }

    fn drop_connection(&mut self) {
        self.drop_requested = true;
    }

    fn clear_queue(&mut self) {
        self.pending.clear();
    }
}
