//! Collaborator traits consumed by the bridge
//!
//! The bridge never touches USB, files or terminals directly. A transport
//! crate provides the [`DeviceChannel`], and the caller supplies where dumped
//! bytes go ([`ByteSink`]) and who hears about progress ([`ProgressSink`]).

use std::io;
use std::time::Duration;

use crate::error::TransportError;

/// Bidirectional link to one connected drive
///
/// Implementations bind `transmit` to the bulk OUT endpoint and `receive` to
/// the bulk IN endpoint of the drive's command interface.
pub trait DeviceChannel {
    /// Send one request payload
    fn transmit(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `timeout` for one response of at most `max_len` bytes
    fn receive(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

impl<C: DeviceChannel + ?Sized> DeviceChannel for &mut C {
    fn transmit(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).transmit(data)
    }

    fn receive(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).receive(max_len, timeout)
    }
}

impl<C: DeviceChannel + ?Sized> DeviceChannel for Box<C> {
    fn transmit(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).transmit(data)
    }

    fn receive(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).receive(max_len, timeout)
    }
}

/// Append-only destination for dumped bytes
pub trait ByteSink {
    /// Append all of `bytes`
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<W: io::Write + ?Sized> ByteSink for W {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)
    }
}

/// Callback for progress reporting during dumps
pub trait ProgressSink {
    /// Called once before the first chunk with the total byte count
    fn start(&mut self, _total_bytes: u64) {}

    /// Called after each chunk reaches the sink
    fn advance(&mut self, bytes: u64);

    /// Called after the last chunk
    fn finish(&mut self) {}
}

/// A no-op progress reporter
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&mut self, _bytes: u64) {}
}
