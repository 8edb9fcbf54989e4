//! Drive controller command protocol
//!
//! Every request is a single 24-byte payload of six little-endian `u32`
//! fields sent on the bulk OUT endpoint. Reads are answered on the bulk IN
//! endpoint with exactly the requested number of bytes; writes get no answer.
//!
//! | Offset | Field             | Notes                                   |
//! |--------|-------------------|-----------------------------------------|
//! | 0      | `magic`           | always [`MAGIC`]                        |
//! | 4      | `opcode`          | [`Opcode::Write`] or [`Opcode::Read`]   |
//! | 8      | `address`         | target address                          |
//! | 12     | `argument`        | write: value, read: byte count          |
//! | 16     | `length_selector` | write: 1 or 2, read: 0                  |
//! | 20     | `reserved`        | always 0                                |

use std::fmt;
use std::time::Duration;

use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::DecodeError;

/// Bulk OUT endpoint of interface 0, carries requests
pub const BULK_OUT_EP: u8 = 0x0E;
/// Bulk IN endpoint of interface 0, carries read responses
pub const BULK_IN_EP: u8 = 0x8F;

/// Protocol version tag carried in every request
pub const MAGIC: u32 = 0x8765_4321;

/// Size of one encoded [`Command`]
pub const COMMAND_SIZE: usize = 24;

/// Largest read the firmware serves in one transaction
pub const MAX_TRANSFER: u32 = 4096;

/// Read response timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
/// [`DEFAULT_TIMEOUT_MS`] as a [`Duration`]
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);

/// Request opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    /// Store one or two bytes
    Write = 0x3E8,
    /// Fetch up to [`MAX_TRANSFER`] bytes
    Read = 0x3E9,
}

impl Opcode {
    /// Map a raw opcode field back to an opcode
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0x3E8 => Some(Opcode::Write),
            0x3E9 => Some(Opcode::Read),
            _ => None,
        }
    }
}

/// Width of a write request, sent in the `length_selector` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum WriteWidth {
    /// 8-bit store
    Byte = 1,
    /// 16-bit store
    Word = 2,
}

impl WriteWidth {
    /// Map a raw `length_selector` back to a width
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(WriteWidth::Byte),
            2 => Some(WriteWidth::Word),
            _ => None,
        }
    }

    /// Number of bytes stored
    pub fn bytes(self) -> usize {
        self as usize
    }
}

/// One request in the wire layout
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Command {
    magic: U32<LittleEndian>,
    opcode: U32<LittleEndian>,
    address: U32<LittleEndian>,
    argument: U32<LittleEndian>,
    length_selector: U32<LittleEndian>,
    reserved: U32<LittleEndian>,
}

impl Command {
    const fn new(opcode: Opcode, address: u32, argument: u32, length_selector: u32) -> Self {
        Self {
            magic: U32::new(MAGIC),
            opcode: U32::new(opcode as u32),
            address: U32::new(address),
            argument: U32::new(argument),
            length_selector: U32::new(length_selector),
            reserved: U32::new(0),
        }
    }

    /// Read request for `len` bytes starting at `address`
    ///
    /// `len` is sent as-is; callers keep it at or below [`MAX_TRANSFER`].
    pub const fn read(address: u32, len: u32) -> Self {
        Self::new(Opcode::Read, address, len, 0)
    }

    /// Write request storing `value` at `address`
    pub const fn write(address: u32, value: u32, width: WriteWidth) -> Self {
        Self::new(Opcode::Write, address, value, width as u32)
    }

    /// Decode a payload received from the host side
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let cmd = Self::read_from_bytes(data).map_err(|_| DecodeError::WrongLength {
            expected: COMMAND_SIZE,
            actual: data.len(),
        })?;

        if cmd.magic.get() != MAGIC {
            return Err(DecodeError::BadMagic(cmd.magic.get()));
        }
        if cmd.opcode().is_none() {
            return Err(DecodeError::UnknownOpcode(cmd.opcode.get()));
        }
        Ok(cmd)
    }

    /// Encoded wire bytes
    pub fn to_bytes(&self) -> [u8; COMMAND_SIZE] {
        let mut out = [0u8; COMMAND_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Protocol tag, [`MAGIC`] for every valid request
    pub fn magic(&self) -> u32 {
        self.magic.get()
    }

    /// Decoded opcode, `None` if the field holds an unknown value
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_value(self.opcode.get())
    }

    /// Target address
    pub fn address(&self) -> u32 {
        self.address.get()
    }

    /// Value to store (write) or byte count to fetch (read)
    pub fn argument(&self) -> u32 {
        self.argument.get()
    }

    /// Raw width field: 1 or 2 for writes, 0 for reads
    pub fn length_selector(&self) -> u32 {
        self.length_selector.get()
    }

    /// Always 0 on the wire
    pub fn reserved(&self) -> u32 {
        self.reserved.get()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("magic", &format_args!("0x{:08X}", self.magic()))
            .field("opcode", &format_args!("0x{:X}", self.opcode.get()))
            .field("address", &format_args!("0x{:08X}", self.address()))
            .field("argument", &format_args!("0x{:X}", self.argument()))
            .field("length_selector", &self.length_selector())
            .field("reserved", &self.reserved())
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Some(Opcode::Read) => write!(
                f,
                "READ 0x{:08X} len={}",
                self.address(),
                self.argument()
            ),
            Some(Opcode::Write) => {
                match WriteWidth::from_value(self.length_selector()) {
                    Some(width) => write!(f, "WRITE{}", width.bytes() * 8)?,
                    None => write!(f, "WRITE?{}", self.length_selector())?,
                }
                write!(f, " 0x{:08X} = 0x{:X}", self.address(), self.argument())
            }
            None => write!(f, "UNKNOWN(0x{:X})", self.opcode.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_byte_layout() {
        let cmd = Command::write(0x82B6, 0x41, WriteWidth::Byte);
        assert_eq!(
            cmd.to_bytes(),
            [
                0x21, 0x43, 0x65, 0x87, // magic
                0xE8, 0x03, 0x00, 0x00, // opcode
                0xB6, 0x82, 0x00, 0x00, // address
                0x41, 0x00, 0x00, 0x00, // value
                0x01, 0x00, 0x00, 0x00, // one byte
                0x00, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_read_layout() {
        let cmd = Command::read(0x80000, 4096);
        assert_eq!(
            cmd.to_bytes(),
            [
                0x21, 0x43, 0x65, 0x87, //
                0xE9, 0x03, 0x00, 0x00, //
                0x00, 0x00, 0x08, 0x00, //
                0x00, 0x10, 0x00, 0x00, //
                0x00, 0x00, 0x00, 0x00, //
                0x00, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_write_word_selector() {
        let cmd = Command::write(0x1234, 0xBEEF, WriteWidth::Word);
        assert_eq!(cmd.magic(), MAGIC);
        assert_eq!(cmd.opcode(), Some(Opcode::Write));
        assert_eq!(cmd.length_selector(), 2);
        assert_eq!(cmd.argument(), 0xBEEF);
        assert_eq!(cmd.reserved(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            Command::parse(&[0u8; 23]),
            Err(DecodeError::WrongLength {
                expected: 24,
                actual: 23
            })
        );

        let mut raw = Command::read(0, 1).to_bytes();
        raw[0] = 0x00;
        assert!(matches!(Command::parse(&raw), Err(DecodeError::BadMagic(_))));

        let mut raw = Command::read(0, 1).to_bytes();
        raw[4] = 0x00;
        assert_eq!(
            Command::parse(&raw),
            Err(DecodeError::UnknownOpcode(0x300))
        );
    }

    #[test]
    fn test_parse_accepts_encoded() {
        let cmd = Command::read(0xDEAD_0000, 17);
        let parsed = Command::parse(&cmd.to_bytes()).unwrap();
        assert_eq!(parsed.opcode(), Some(Opcode::Read));
        assert_eq!(parsed.address(), 0xDEAD_0000);
        assert_eq!(parsed.argument(), 17);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Command::write(0x82BE, 0x41, WriteWidth::Byte).to_string(),
            "WRITE8 0x000082BE = 0x41"
        );
        assert_eq!(
            Command::read(0x80000, 4096).to_string(),
            "READ 0x00080000 len=4096"
        );
    }

    #[test]
    fn test_display_unknown_write_width() {
        let mut raw = Command::write(0, 0, WriteWidth::Byte).to_bytes();
        raw[16..20].copy_from_slice(&0x4000_0000u32.to_le_bytes());
        let cmd = Command::parse(&raw).unwrap();

        assert_eq!(cmd.to_string(), "WRITE?1073741824 0x00000000 = 0x0");
        assert_eq!(
            Command::write(0x10, 0xBEEF, WriteWidth::Word).to_string(),
            "WRITE16 0x00000010 = 0xBEEF"
        );
    }
}
