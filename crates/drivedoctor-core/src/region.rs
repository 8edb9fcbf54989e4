//! Address ranges and the fixed memory map of the controller firmware
//!
//! The firmware guards two windows of its address space. Reads from
//! [`READ_PROTECTED`] return filler until one of the [`UNLOCK_FLAGS`] bytes
//! holds [`UNLOCK_VALUE`], and writes into the window starting at one of
//! [`WRITE_PROTECTED_STARTS`] are dropped while the same flag is clear. Which
//! flag applies depends on the firmware build, see [`FirmwareVariant`].

use std::fmt;

use crate::error::{Error, Result};

/// A `(start, size)` span of the 32-bit address space
///
/// The end of the span may be `2^32` but never beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    start: u32,
    size: u32,
}

impl AddressRange {
    /// Create a range, rejecting spans that run past the 32-bit address space
    pub fn new(start: u32, size: u32) -> Result<Self> {
        if start as u64 + size as u64 > 1u64 << 32 {
            return Err(Error::AddressOverflow { start, size });
        }
        Ok(Self { start, size })
    }

    /// Single-byte range at `address`
    pub const fn byte(address: u32) -> Self {
        Self {
            start: address,
            size: 1,
        }
    }

    /// Range covering `[start, end)`; `end >= start` is the caller's duty
    const fn from_bounds(start: u32, end: u32) -> Self {
        Self {
            start,
            size: end - start,
        }
    }

    /// First address
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Length in bytes
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Exclusive end address (may be `2^32`)
    pub const fn end(&self) -> u64 {
        self.start as u64 + self.size as u64
    }

    /// True for a zero-length range
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if an address lies inside this range
    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && (address as u64) < self.end()
    }

    /// Check if two ranges share at least one address
    pub const fn overlaps(&self, other: &AddressRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.start as u64) < other.end()
            && (other.start as u64) < self.end()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}..0x{:08X}", self.start, self.end())
    }
}

/// Probed by the unlock sequence; reads [`LOCKED_PROBE_VALUE`] while locked
pub const PROBE_ADDRESS: u32 = 0x8_0000;
/// Value of the probe byte while protection is active
pub const LOCKED_PROBE_VALUE: u8 = 0xFF;

/// Flag bytes relaxing both protection windows, one per firmware family
pub const UNLOCK_FLAGS: [u32; 2] = [
    FirmwareVariant::Gc2rD2a.unlock_flag(),
    FirmwareVariant::Gc2D2b.unlock_flag(),
];
/// Flag value that disables protection
pub const UNLOCK_VALUE: u8 = 0x41;

/// Reads here return filler until the drive is unlocked
pub const READ_PROTECTED: AddressRange = AddressRange::from_bounds(0x1_0000, 0x20_0000);

/// Writes from either start up to [`WRITE_PROTECTED_END`] are dropped while locked
pub const WRITE_PROTECTED_STARTS: [u32; 2] = [0x8576, 0x8580];
/// Exclusive end of the write-protected window
pub const WRITE_PROTECTED_END: u32 = 0xF000;

/// Widest write-protected window across known firmware builds
pub const WRITE_PROTECTED: AddressRange =
    AddressRange::from_bounds(WRITE_PROTECTED_STARTS[0], WRITE_PROTECTED_END);

/// Controller ROM (128 KiB)
pub const ROM: AddressRange = AddressRange::from_bounds(0x8_0000, 0xA_0000);

/// Known controller firmware builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareVariant {
    /// GC2R-D2A
    Gc2rD2a,
    /// GC2-DMS
    Gc2Dms,
    /// GC2-D2B
    Gc2D2b,
}

impl FirmwareVariant {
    /// All known builds
    pub const ALL: [FirmwareVariant; 3] = [
        FirmwareVariant::Gc2rD2a,
        FirmwareVariant::Gc2Dms,
        FirmwareVariant::Gc2D2b,
    ];

    /// Address of the flag byte this build checks
    pub const fn unlock_flag(self) -> u32 {
        match self {
            FirmwareVariant::Gc2rD2a | FirmwareVariant::Gc2Dms => 0x82B6,
            FirmwareVariant::Gc2D2b => 0x82BE,
        }
    }

    /// Firmware name as printed on the controller
    pub const fn name(self) -> &'static str {
        match self {
            FirmwareVariant::Gc2rD2a => "GC2R-D2A",
            FirmwareVariant::Gc2Dms => "GC2-DMS",
            FirmwareVariant::Gc2D2b => "GC2-D2B",
        }
    }

    /// Parse a firmware name, case-insensitive, with or without the prefix
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_uppercase();
        let short = name
            .strip_prefix("GC2R-")
            .or_else(|| name.strip_prefix("GC2-"))
            .unwrap_or(name.as_str());
        match short {
            "D2A" => Some(FirmwareVariant::Gc2rD2a),
            "DMS" => Some(FirmwareVariant::Gc2Dms),
            "D2B" => Some(FirmwareVariant::Gc2D2b),
            _ => None,
        }
    }
}

impl fmt::Display for FirmwareVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_limits() {
        assert!(AddressRange::new(0xFFFF_F000, 0x1000).is_ok());
        assert!(AddressRange::new(0, u32::MAX).is_ok());
        assert!(matches!(
            AddressRange::new(0xFFFF_F001, 0x1000),
            Err(Error::AddressOverflow {
                start: 0xFFFF_F001,
                size: 0x1000
            })
        ));

        let top = AddressRange::new(0xFFFF_FFFF, 1).unwrap();
        assert_eq!(top.end(), 1u64 << 32);
        assert!(top.contains(0xFFFF_FFFF));
    }

    #[test]
    fn test_contains_and_overlaps() {
        assert!(READ_PROTECTED.contains(PROBE_ADDRESS));
        assert!(!READ_PROTECTED.contains(0x20_0000));
        assert!(READ_PROTECTED.overlaps(&ROM));
        assert!(!WRITE_PROTECTED.contains(UNLOCK_FLAGS[0]));
        assert!(!WRITE_PROTECTED.contains(UNLOCK_FLAGS[1]));

        let empty = AddressRange::new(0x1_0000, 0).unwrap();
        assert!(empty.is_empty());
        assert!(!empty.overlaps(&READ_PROTECTED));
    }

    #[test]
    fn test_rom_range() {
        assert_eq!(ROM.start(), 0x8_0000);
        assert_eq!(ROM.size(), 0x2_0000);
        assert_eq!(ROM.to_string(), "0x00080000..0x000A0000");
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(
            FirmwareVariant::from_name("gc2r-d2a"),
            Some(FirmwareVariant::Gc2rD2a)
        );
        assert_eq!(FirmwareVariant::from_name("DMS"), Some(FirmwareVariant::Gc2Dms));
        assert_eq!(
            FirmwareVariant::from_name("GC2-D2B"),
            Some(FirmwareVariant::Gc2D2b)
        );
        assert_eq!(FirmwareVariant::from_name("D2C"), None);

        for variant in FirmwareVariant::ALL {
            assert!(UNLOCK_FLAGS.contains(&variant.unlock_flag()));
            assert_eq!(FirmwareVariant::from_name(variant.name()), Some(variant));
        }
    }
}
