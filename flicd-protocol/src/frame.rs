//! Frame encoding and decoding for the flicd protocol.
//!
//! Frame format:
//! - LENGTH (2 bytes, little-endian): number of bytes that follow (opcode + payload)
//! - OPCODE (1 byte): command or event identifier
//! - PAYLOAD (0-65534 bytes): opcode-specific fields
//!
//! A frame with LENGTH 0 carries no opcode at all. The daemon never sends one
//! on purpose; the parser skips it.

use alloc::vec::Vec;
use core::fmt;

/// Size of the length prefix
pub const HEADER_SIZE: usize = 2;

/// Maximum payload size in bytes (LENGTH also covers the opcode byte)
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - 1;

/// Errors that can occur during frame encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::PayloadTooLarge => write!(f, "payload exceeds {} bytes", MAX_PAYLOAD_SIZE),
            FrameError::BufferTooSmall => write!(f, "buffer too small for frame"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command or event opcode
    pub opcode: u8,
    /// Payload data
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame with the given opcode and payload
    pub fn new(opcode: u8, payload: Vec<u8>) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        Ok(Self { opcode, payload })
    }

    /// Create a frame with no payload
    pub fn empty(opcode: u8) -> Self {
        Self {
            opcode,
            payload: Vec::new(),
        }
    }

    /// Value of the LENGTH field for this frame
    pub fn wire_length(&self) -> u16 {
        // Frame::new caps the payload, so this cannot overflow
        (1 + self.payload.len()) as u16
    }

    /// Total number of bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + 1 + self.payload.len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[..HEADER_SIZE].copy_from_slice(&self.wire_length().to_le_bytes());
        buffer[HEADER_SIZE] = self.opcode;
        buffer[HEADER_SIZE + 1..frame_len].copy_from_slice(&self.payload);

        Ok(frame_len)
    }

    /// Encode this frame into a freshly allocated buffer
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, FrameError> {
        let mut buffer = alloc::vec![0u8; self.encoded_len()];
        let len = self.encode(&mut buffer)?;
        buffer.truncate(len);
        Ok(buffer)
    }
}

/// State machine for parsing incoming frames
///
/// Bytes can arrive in any chunking; the parser keeps the partial frame
/// between calls.
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    length_low: u8,
    remaining: usize,
    opcode: u8,
    buffer: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Waiting for the low byte of LENGTH
    WaitingForLengthLow,
    /// Waiting for the high byte of LENGTH
    WaitingForLengthHigh,
    /// Got LENGTH, waiting for OPCODE
    WaitingForOpcode,
    /// Reading payload bytes
    ReadingPayload,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitingForLengthLow,
            length_low: 0,
            remaining: 0,
            opcode: 0,
            buffer: Vec::new(),
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.state = ParseState::WaitingForLengthLow;
        self.length_low = 0;
        self.remaining = 0;
        self.opcode = 0;
        self.buffer.clear();
    }

    /// True when no partial frame is buffered
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::WaitingForLengthLow
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Some(frame)` when a complete frame is parsed, `None` when
    /// more bytes are needed.
    pub fn feed(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            ParseState::WaitingForLengthLow => {
                self.length_low = byte;
                self.state = ParseState::WaitingForLengthHigh;
                None
            }
            ParseState::WaitingForLengthHigh => {
                let length = u16::from_le_bytes([self.length_low, byte]) as usize;
                if length == 0 {
                    // Empty frame, nothing to deliver
                    self.reset();
                } else {
                    self.remaining = length - 1;
                    self.state = ParseState::WaitingForOpcode;
                }
                None
            }
            ParseState::WaitingForOpcode => {
                self.opcode = byte;
                if self.remaining == 0 {
                    return Some(self.take_frame());
                }
                self.buffer.clear();
                self.buffer.reserve(self.remaining);
                self.state = ParseState::ReadingPayload;
                None
            }
            ParseState::ReadingPayload => {
                self.buffer.push(byte);
                self.remaining -= 1;
                if self.remaining == 0 {
                    return Some(self.take_frame());
                }
                None
            }
        }
    }

    /// Feed a chunk of bytes, pushing every completed frame into `out`
    ///
    /// All bytes are consumed; a trailing partial frame stays buffered.
    pub fn feed_bytes(&mut self, bytes: &[u8], out: &mut Vec<Frame>) {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte) {
                out.push(frame);
            }
        }
    }

    fn take_frame(&mut self) -> Frame {
        let frame = Frame {
            opcode: self.opcode,
            payload: core::mem::take(&mut self.buffer),
        };
        self.reset();
        frame
    }
}
