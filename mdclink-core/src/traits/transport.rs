//! Byte transport to the display
//!
//! The transport owns the socket (or serial bridge). The core only ever
//! pushes complete frames into it; inbound bytes and connection events come
//! back through the `Display::on_*` methods.

/// Outbound side of a connection
pub trait Transport {
    /// Queue bytes for sending; returns immediately
    fn send(&mut self, bytes: &[u8]);

    /// Drop the current connection; the owner reconnects later
    fn drop_connection(&mut self);

    /// Discard anything queued but not yet written
    fn clear_queue(&mut self);
}
