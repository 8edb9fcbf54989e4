//! CLI command implementations
//!
//! Every command works on a [`MemoryBridge`](drivedoctor_core::MemoryBridge)
//! over any [`DeviceChannel`](drivedoctor_core::DeviceChannel), so the same
//! code drives a real USB drive or the in-memory emulator.

pub mod dump;
mod list;
pub mod memory;
pub mod unlock;

pub use list::list_devices;
