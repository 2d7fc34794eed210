//! Stream reassembly for length-prefixed frames
//!
//! Bytes arrive from the transport in chunks whose boundaries mean nothing:
//! a chunk may hold a partial frame, one frame, or many. The decoder keeps
//! only bytes that do not yet form a complete frame, and the kept bytes
//! always begin with [`HEADER`].

use heapless::Vec;

use crate::frame::{Frame, HEADER, LENGTH_OFFSET, MAX_FRAME_SIZE, PREAMBLE_SIZE};

/// Internal buffer size; always holds at least one maximum-size frame
pub const BUFFER_CAPACITY: usize = 2 * MAX_FRAME_SIZE;

/// Upper bound on frames extracted from one buffer fill
///
/// A fill holds at most `BUFFER_CAPACITY` bytes, so a well-formed stream
/// never reaches this. Hitting it ends the pass; the remaining bytes stay
/// buffered and the next pass picks them up.
pub const MAX_FRAMES_PER_PASS: usize = 300;

/// Summary of one `feed` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeedReport {
    /// Frames handed to the callback
    pub frames: usize,
    /// Misaligned bytes thrown away while looking for a header
    pub discarded: usize,
}

/// Reassembles frames from an arbitrarily fragmented byte stream
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8, BUFFER_CAPACITY>,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Drop all buffered bytes
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of buffered bytes not yet forming a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append a chunk and hand every completed frame to `on_frame`, in order
    pub fn feed<F>(&mut self, mut data: &[u8], mut on_frame: F) -> FeedReport
    where
        F: FnMut(Frame),
    {
        let mut report = FeedReport::default();

        while !data.is_empty() {
            if self.buffer.is_empty() {
                let skip = data
                    .iter()
                    .position(|&byte| byte == HEADER)
                    .unwrap_or(data.len());
                report.discarded += skip;
                data = &data[skip..];
                if data.is_empty() {
                    break;
                }
            }

            let take = (BUFFER_CAPACITY - self.buffer.len()).min(data.len());
            // `take` never exceeds the free space
            let _ = self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            self.extract(&mut report, &mut on_frame);
        }

        report
    }

    /// Hand out every complete frame currently buffered
    fn extract<F>(&mut self, report: &mut FeedReport, on_frame: &mut F)
    where
        F: FnMut(Frame),
    {
        for _ in 0..MAX_FRAMES_PER_PASS {
            report.discarded += self.realign();

            if self.buffer.len() < PREAMBLE_SIZE {
                return;
            }

            let total = PREAMBLE_SIZE + self.buffer[LENGTH_OFFSET] as usize + 1;
            if self.buffer.len() < total {
                return;
            }

            if let Ok(frame) = Frame::from_bytes(&self.buffer[..total]) {
                report.frames += 1;
                on_frame(frame);
            }
            self.consume(total);
        }
    }

    /// Drop leading bytes until the buffer starts with a header
    fn realign(&mut self) -> usize {
        let skip = self
            .buffer
            .iter()
            .position(|&byte| byte == HEADER)
            .unwrap_or(self.buffer.len());
        if skip > 0 {
            self.consume(skip);
        }
        skip
    }

    fn consume(&mut self, count: usize) {
        let len = self.buffer.len();
        self.buffer.copy_within(count..len, 0);
        self.buffer.truncate(len - count);
    }
}
