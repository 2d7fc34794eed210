//! Display control protocol
//!
//! This crate defines the binary protocol spoken by networked displays
//! (Samsung MDC style) over a TCP socket or serial bridge. Every message,
//! in either direction, uses the same frame shape:
//!
//! ```text
//! ┌────────┬─────────┬────────┬────────┬─────────────┬──────────┐
//! │ HEADER │ COMMAND │ SET ID │ LENGTH │ PAYLOAD     │ CHECKSUM │
//! │ 1B     │ 1B      │ 1B     │ 1B     │ 0–255B      │ 1B       │
//! └────────┴─────────┴────────┴────────┴─────────────┴──────────┘
//! ```
//!
//! The checksum is the sum of COMMAND through the last PAYLOAD byte, modulo 256.
//! Responses carry command `0xFF`, an acknowledgement byte (`'A'` or `'N'`) and
//! the echoed request command as the first two payload bytes.
//!
//! The transport is a byte stream, so [`FrameDecoder`] reassembles frames
//! from arbitrarily split chunks.

#![no_std]
#![deny(unsafe_code)]

pub mod decoder;
pub mod frame;
pub mod input;
pub mod messages;

pub use decoder::{FeedReport, FrameDecoder, BUFFER_CAPACITY, MAX_FRAMES_PER_PASS};
pub use frame::{checksum, Frame, FrameError, Response, HEADER, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use input::InputCode;
pub use messages::{
    Command, DisplayStatus, ExtendedStatus, FaultFlags, IrRemote, Power,
};
