//! drivedoctor-usb - USB transport for disc drive controllers
//!
//! This crate finds the drive controller on the USB bus, activates its
//! configuration, claims the command interface and exposes the bulk endpoint
//! pair as a [`DeviceChannel`](drivedoctor_core::DeviceChannel).
//!
//! # Protocol Overview
//!
//! Requests are 24-byte payloads written to bulk OUT endpoint `0x0E`. Read
//! responses come back on bulk IN endpoint `0x8F`. There are no control
//! transfers and no status responses.
//!
//! # Example
//!
//! ```no_run
//! use drivedoctor_core::MemoryBridge;
//! use drivedoctor_usb::UsbDrive;
//!
//! let drive = UsbDrive::open()?;
//! let mut bridge = MemoryBridge::new(drive);
//! bridge.unlock()?;
//! println!("First ROM byte: {:02X}", bridge.read_byte(0x80000)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Configuration Options
//!
//! - `index=N` or `device=N`: Select the Nth matching drive (0-indexed)
//! - `vid=0x05fd`, `pid=0x1290`: Match a different vendor/product ID

mod device;
mod error;

pub use device::{
    parse_options, UsbConfig, UsbDrive, UsbDriveInfo, DRIVE_USB_PRODUCT, DRIVE_USB_VENDOR,
};
pub use error::{Result, UsbError};
