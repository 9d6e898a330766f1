//! Wire primitives
//!
//! All multi-byte integers are little-endian. Enumerations travel as one
//! byte holding the variant's position in its declaration order. Names use a
//! fixed 17-byte slot: a length byte followed by 16 bytes of which only the
//! first `length` are meaningful.

use alloc::vec::Vec;
use core::fmt;

use crate::types::{BdAddr, ButtonUuid, Name, MAX_NAME_LEN};

/// Errors raised while decoding a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload ended before all fields were read
    UnexpectedEnd {
        /// Bytes the field needed
        needed: usize,
        /// Bytes left in the payload
        remaining: usize,
    },
    /// Enumeration byte outside the known variants
    InvalidEnum {
        /// Enumeration type name
        ty: &'static str,
        /// Received byte
        value: u8,
    },
    /// Name length byte larger than the slot
    NameTooLong(u8),
    /// Name bytes are not UTF-8
    InvalidUtf8,
    /// Opcode with no known schema
    UnknownOpcode(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEnd { needed, remaining } => write!(
                f,
                "payload truncated: needed {} bytes, {} left",
                needed, remaining
            ),
            DecodeError::InvalidEnum { ty, value } => {
                write!(f, "invalid {} value {}", ty, value)
            }
            DecodeError::NameTooLong(len) => {
                write!(f, "name length {} exceeds {}", len, MAX_NAME_LEN)
            }
            DecodeError::InvalidUtf8 => write!(f, "name is not valid UTF-8"),
            DecodeError::UnknownOpcode(op) => write!(f, "unknown opcode {}", op),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// An enumeration encoded as its ordinal byte
pub trait WireEnum: Sized + Copy {
    /// Type name used in decode errors
    const NAME: &'static str;

    /// Look up the variant at `ordinal`
    fn from_ordinal(ordinal: u8) -> Option<Self>;

    /// Position of this variant in declaration order
    fn ordinal(self) -> u8;
}

/// Appends primitive fields to a payload buffer
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create an empty writer
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a writer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_bool(&mut self, v: bool) -> &mut Self {
        self.buf.push(v as u8);
        self
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn put_i8(&mut self, v: i8) -> &mut Self {
        self.buf.push(v as u8);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn put_i16(&mut self, v: i16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Write a device address verbatim
    pub fn put_bdaddr(&mut self, addr: &BdAddr) -> &mut Self {
        self.buf.extend_from_slice(addr.as_bytes());
        self
    }

    pub fn put_enum<E: WireEnum>(&mut self, v: E) -> &mut Self {
        self.buf.push(v.ordinal());
        self
    }

    /// Write a name into its fixed slot, zero padded
    ///
    /// Longer names are cut at the last character boundary that fits.
    pub fn put_name(&mut self, name: &str) -> &mut Self {
        let bytes = name.as_bytes();
        let mut len = bytes.len().min(MAX_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        self.buf.push(len as u8);
        self.buf.extend_from_slice(&bytes[..len]);
        self.buf.resize(self.buf.len() + MAX_NAME_LEN - len, 0);
        self
    }

    /// Write an optional UUID; `None` becomes all zeroes
    pub fn put_uuid(&mut self, uuid: Option<&ButtonUuid>) -> &mut Self {
        match uuid {
            Some(uuid) => self.buf.extend_from_slice(uuid.as_bytes()),
            None => self.buf.extend_from_slice(&[0u8; 16]),
        }
        self
    }

    /// Write a u16 element count followed by the addresses
    pub fn put_bdaddr_array(&mut self, addrs: &[BdAddr]) -> &mut Self {
        let count = addrs.len().min(u16::MAX as usize);
        self.put_u16(count as u16);
        for addr in &addrs[..count] {
            self.put_bdaddr(addr);
        }
        self
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the finished payload
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads primitive fields from a payload in order
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not read yet
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEnd {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.get_u8()? as i8)
    }

    pub fn get_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn get_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn get_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn get_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn get_bdaddr(&mut self) -> Result<BdAddr, DecodeError> {
        Ok(BdAddr::from_bytes(self.take_array()?))
    }

    pub fn get_enum<E: WireEnum>(&mut self) -> Result<E, DecodeError> {
        let value = self.get_u8()?;
        E::from_ordinal(value).ok_or(DecodeError::InvalidEnum {
            ty: E::NAME,
            value,
        })
    }

    /// Read a name slot (length byte + 16 bytes)
    pub fn get_name(&mut self) -> Result<Name, DecodeError> {
        let len = self.get_u8()?;
        let slot = self.take(MAX_NAME_LEN)?;
        if len as usize > MAX_NAME_LEN {
            return Err(DecodeError::NameTooLong(len));
        }
        let text = core::str::from_utf8(&slot[..len as usize])
            .map_err(|_| DecodeError::InvalidUtf8)?;
        let mut name = Name::new();
        // Cannot fail: the text is at most MAX_NAME_LEN bytes
        let _ = name.push_str(text);
        Ok(name)
    }

    /// Read a UUID; all zeroes means the daemon does not know it
    pub fn get_uuid(&mut self) -> Result<Option<ButtonUuid>, DecodeError> {
        let bytes: [u8; 16] = self.take_array()?;
        Ok(ButtonUuid::from_bytes(bytes))
    }

    /// Read a u16 element count followed by that many addresses
    pub fn get_bdaddr_array(&mut self) -> Result<Vec<BdAddr>, DecodeError> {
        let count = self.get_u16()? as usize;
        // Check the whole array up front so a bogus count cannot over-allocate
        if self.remaining() < count * 6 {
            return Err(DecodeError::UnexpectedEnd {
                needed: count * 6,
                remaining: self.remaining(),
            });
        }
        let mut addrs = Vec::with_capacity(count);
        for _ in 0..count {
            addrs.push(self.get_bdaddr()?);
        }
        Ok(addrs)
    }
}
