//! drivedoctor-core - Memory access protocol for disc drive controllers
//!
//! This crate implements the vendor command protocol spoken by the USB
//! controller of a family of optical disc drives. The controller exposes its
//! whole 32-bit address space (ROM, RAM and memory-mapped registers) through
//! two requests: an addressed write of one or two bytes, and an addressed read
//! of up to 4 KiB.
//!
//! # Architecture
//!
//! - [`protocol`] - the fixed 24-byte [`Command`](protocol::Command) layout
//! - [`channel`] - the narrow traits the protocol consumes: a bidirectional
//!   [`DeviceChannel`], an append-only [`ByteSink`] and a [`ProgressSink`]
//! - [`bridge`] - [`MemoryBridge`], which owns a channel and provides byte and
//!   word writes, lazily chunked reads, the unlock sequence and region dumps
//! - [`region`] - address ranges and the protection windows of the firmware
//!
//! # Example
//!
//! ```ignore
//! use drivedoctor_core::{AddressRange, MemoryBridge, NoProgress};
//!
//! let mut bridge = MemoryBridge::new(channel);
//! bridge.unlock()?;
//!
//! let mut image = Vec::new();
//! bridge.dump_region(&mut image, &mut NoProgress, AddressRange::new(0x80000, 0x20000)?)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bridge;
pub mod channel;
pub mod error;
pub mod protocol;
pub mod region;

pub use bridge::{BridgeConfig, Chunk, ChunkReader, MemoryBridge, UnlockOutcome};
pub use channel::{ByteSink, DeviceChannel, NoProgress, ProgressSink};
pub use error::{DecodeError, Error, Result, TransportError, TransportResult};
pub use region::AddressRange;
