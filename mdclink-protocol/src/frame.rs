//! Frame encoding and validation.
//!
//! Frame format:
//! - HEADER (1 byte): 0xAA synchronization byte
//! - COMMAND (1 byte): opcode, or 0xFF for responses
//! - SET ID (1 byte): display address on a shared bus
//! - LENGTH (1 byte): payload length (0-255)
//! - PAYLOAD (0-255 bytes): command-specific data
//! - CHECKSUM (1 byte): sum of COMMAND, SET ID, LENGTH and PAYLOAD, mod 256

use heapless::Vec;

/// Frame synchronization byte
pub const HEADER: u8 = 0xAA;

/// Command byte carried by every response frame
pub const RESPONSE_COMMAND: u8 = 0xFF;

/// Positive acknowledgement byte (`'A'`)
pub const ACK: u8 = b'A';

/// Negative acknowledgement byte (`'N'`)
pub const NAK: u8 = b'N';

/// Maximum payload size in bytes (the length field is a single byte)
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// HEADER + COMMAND + SET ID + LENGTH
pub const PREAMBLE_SIZE: usize = 4;

/// Offset of the LENGTH byte
pub const LENGTH_OFFSET: usize = 3;

/// Offset of the acknowledgement byte in a response
pub const ACK_OFFSET: usize = 4;

/// Offset of the echoed request command in a response
pub const ECHO_OFFSET: usize = 5;

/// Maximum complete frame size (PREAMBLE + MAX_PAYLOAD + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = PREAMBLE_SIZE + MAX_PAYLOAD_SIZE + 1;

/// Errors that can occur while building or interpreting frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// First byte is not the header sentinel
    BadHeader,
    /// Fewer bytes than the smallest possible frame
    Truncated,
    /// LENGTH byte disagrees with the number of bytes present
    LengthMismatch,
    /// Checksum mismatch
    InvalidChecksum,
    /// Frame is not a response (command byte is not 0xFF)
    NotAResponse,
    /// Device refused the command
    Nak { command: u8, code: u8 },
    /// Acknowledgement byte is neither 'A' nor 'N'
    BadAcknowledgement,
    /// Response echoes a different command than the one being decoded
    UnexpectedCommand { expected: u8, actual: u8 },
    /// Response is too short for the field being read
    ShortPayload,
    /// Text field is not valid UTF-8
    InvalidText,
    /// Input code string is neither hex nor a known name
    InvalidInputCode,
}

/// Sum of the given bytes modulo 256
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

/// A complete frame, kept as the exact bytes seen on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_SIZE>,
}

impl Frame {
    /// Build an outbound frame, computing its checksum
    pub fn encode(command: u8, set_id: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut bytes = Vec::new();
        bytes
            .extend_from_slice(&[HEADER, command, set_id, payload.len() as u8])
            .map_err(|_| FrameError::PayloadTooLarge)?;
        bytes
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        let sum = checksum(&bytes[1..]);
        bytes.push(sum).map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self { bytes })
    }

    /// Wrap bytes extracted from a stream
    ///
    /// Only the shape is checked (LENGTH agrees with the byte count);
    /// header and checksum are checked by [`Frame::validate`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < PREAMBLE_SIZE + 1 {
            return Err(FrameError::Truncated);
        }
        if bytes.len() != PREAMBLE_SIZE + bytes[LENGTH_OFFSET] as usize + 1 {
            return Err(FrameError::LengthMismatch);
        }

        let mut vec = Vec::new();
        vec.extend_from_slice(bytes)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { bytes: vec })
    }

    /// Raw frame bytes, header through checksum
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Command byte (0xFF for responses)
    pub fn command(&self) -> u8 {
        self.bytes[1]
    }

    /// Set ID byte
    pub fn set_id(&self) -> u8 {
        self.bytes[2]
    }

    /// Payload bytes, excluding the checksum
    pub fn payload(&self) -> &[u8] {
        &self.bytes[PREAMBLE_SIZE..self.bytes.len() - 1]
    }

    /// Checksum byte as received
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// Check the header sentinel and recompute the checksum
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.bytes[0] != HEADER {
            return Err(FrameError::BadHeader);
        }
        if checksum(&self.bytes[1..self.bytes.len() - 1]) != self.checksum() {
            return Err(FrameError::InvalidChecksum);
        }
        Ok(())
    }
}

/// A validated, positively acknowledged response frame
///
/// ```text
/// aa   ff   00   09      41 ('A')    00       01 00 00 14 10 00 00   6e
/// HDR  CMD  ID   length  ACK         R->Cmd   data...                CSUM
/// +0   +1   +2   +3      +4          +5       +6 ...
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Response<'a> {
    frame: &'a Frame,
}

impl<'a> Response<'a> {
    /// Check structure and acknowledgement of a response frame
    pub fn decode(frame: &'a Frame) -> Result<Self, FrameError> {
        frame.validate()?;

        if frame.command() != RESPONSE_COMMAND {
            return Err(FrameError::NotAResponse);
        }

        let payload = frame.payload();
        if payload.len() < 2 {
            return Err(FrameError::ShortPayload);
        }

        match payload[0] {
            ACK => Ok(Self { frame }),
            NAK => Err(FrameError::Nak {
                command: payload[1],
                code: payload.get(2).copied().unwrap_or(0),
            }),
            _ => Err(FrameError::BadAcknowledgement),
        }
    }

    /// The request command this response answers
    pub fn command(&self) -> u8 {
        self.frame.as_bytes()[ECHO_OFFSET]
    }

    pub fn set_id(&self) -> u8 {
        self.frame.set_id()
    }

    /// Fail unless this response answers `command`
    pub fn expect(&self, command: u8) -> Result<(), FrameError> {
        if self.command() != command {
            return Err(FrameError::UnexpectedCommand {
                expected: command,
                actual: self.command(),
            });
        }
        Ok(())
    }

    /// Byte at an absolute frame offset (the checksum is not addressable)
    pub fn byte(&self, offset: usize) -> Result<u8, FrameError> {
        let bytes = self.frame.as_bytes();
        if offset >= bytes.len() - 1 {
            return Err(FrameError::ShortPayload);
        }
        Ok(bytes[offset])
    }

    /// Bytes between two absolute offsets, `end` counted back from the frame end
    pub fn span(&self, start: usize, trailing: usize) -> Result<&'a [u8], FrameError> {
        let bytes = self.frame.as_bytes();
        let end = bytes.len().checked_sub(trailing).ok_or(FrameError::ShortPayload)?;
        if start > end {
            return Err(FrameError::ShortPayload);
        }
        Ok(&bytes[start..end])
    }
}
