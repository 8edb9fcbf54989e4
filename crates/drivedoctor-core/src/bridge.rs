//! MemoryBridge - addressed reads and writes over a device channel
//!
//! The bridge is a thin, stateless layer: every call is a self-contained
//! request/response exchange on the channel it owns. Whether the drive is
//! locked lives in the drive's memory, not here.

use std::iter::FusedIterator;
use std::ops::Deref;
use std::time::Duration;

use crate::channel::{ByteSink, DeviceChannel, ProgressSink};
use crate::error::{Result, TransportError, TransportResult};
use crate::protocol::{Command, WriteWidth, DEFAULT_READ_TIMEOUT, MAX_TRANSFER};
use crate::region::{
    AddressRange, LOCKED_PROBE_VALUE, PROBE_ADDRESS, ROM, UNLOCK_FLAGS, UNLOCK_VALUE,
};

/// Configuration options for a [`MemoryBridge`]
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long to wait for each read response
    pub read_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Result of [`MemoryBridge::unlock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// The probe read the locked value and both flags were written
    Patched,
    /// The probe read something else; nothing was written
    AlreadyUnlocked {
        /// Byte found at the probe address
        probe: u8,
    },
}

/// One round trip worth of memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Address of the first byte
    pub address: u32,
    /// Bytes as delivered by the device
    pub data: Vec<u8>,
}

impl Chunk {
    /// Exclusive end address
    pub fn end(&self) -> u64 {
        self.address as u64 + self.data.len() as u64
    }

    /// Take the bytes out of the chunk
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

/// Owner of the channel to one drive
pub struct MemoryBridge<C> {
    channel: C,
    read_timeout: Duration,
}

impl<C: DeviceChannel> MemoryBridge<C> {
    /// Bind a bridge to an opened channel with the default configuration
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, BridgeConfig::default())
    }

    /// Bind a bridge to an opened channel
    pub fn with_config(channel: C, config: BridgeConfig) -> Self {
        Self {
            channel,
            read_timeout: config.read_timeout,
        }
    }

    /// How long each read waits for its response
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Borrow the underlying channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Give the channel back
    pub fn into_inner(self) -> C {
        self.channel
    }

    fn send(&mut self, cmd: &Command) -> TransportResult<()> {
        log::trace!("-> {}", cmd);
        self.channel.transmit(&cmd.to_bytes())
    }

    /// Store one byte
    pub fn write_byte(&mut self, address: u32, value: u8) -> TransportResult<()> {
        log::debug!("Writing 0x{:02X} to 0x{:08X}", value, address);
        self.send(&Command::write(address, value as u32, WriteWidth::Byte))
    }

    /// Store one 16-bit word
    ///
    /// The protocol does not check that the target accepts 16-bit stores.
    pub fn write_word(&mut self, address: u32, value: u16) -> TransportResult<()> {
        log::debug!("Writing 0x{:04X} to 0x{:08X}", value, address);
        self.send(&Command::write(address, value as u32, WriteWidth::Word))
    }

    /// Fetch exactly `len` bytes in a single transaction
    fn read_chunk(&mut self, address: u32, len: u32) -> TransportResult<Vec<u8>> {
        debug_assert!(len > 0 && len <= MAX_TRANSFER);
        self.send(&Command::read(address, len))?;

        let data = self.channel.receive(len as usize, self.read_timeout)?;
        if data.len() != len as usize {
            return Err(TransportError::ShortRead {
                expected: len as usize,
                actual: data.len(),
            });
        }
        log::trace!("<- {} bytes from 0x{:08X}", data.len(), address);
        Ok(data)
    }

    /// Read a single byte
    pub fn read_byte(&mut self, address: u32) -> TransportResult<u8> {
        let data = self.read_chunk(address, 1)?;
        data.first().copied().ok_or(TransportError::ShortRead {
            expected: 1,
            actual: 0,
        })
    }

    /// Lazily read `range` in chunks of at most [`MAX_TRANSFER`] bytes
    ///
    /// Nothing is sent until the first item is requested, and each chunk is
    /// requested only after the previous one has fully arrived. Dropping the
    /// reader early stops all further traffic.
    pub fn read(&mut self, range: AddressRange) -> ChunkReader<'_, C> {
        ChunkReader {
            bridge: self,
            next_address: range.start(),
            remaining: range.size(),
        }
    }

    /// Relax the firmware's memory protection if it is still in place
    ///
    /// Reads the probe byte and, only if it holds the locked value, writes the
    /// unlock value to the flag byte of every known firmware build. Writing
    /// the flag of a build that isn't present is harmless.
    pub fn unlock(&mut self) -> TransportResult<UnlockOutcome> {
        let probe = self.read_byte(PROBE_ADDRESS)?;
        if probe != LOCKED_PROBE_VALUE {
            log::info!(
                "Probe byte at 0x{:08X} is 0x{:02X}, memory already accessible",
                PROBE_ADDRESS,
                probe
            );
            return Ok(UnlockOutcome::AlreadyUnlocked { probe });
        }

        // TODO: identify the firmware build first and only patch its flag
        for flag in UNLOCK_FLAGS {
            self.write_byte(flag, UNLOCK_VALUE)?;
        }
        log::info!("Protection flags patched");
        Ok(UnlockOutcome::Patched)
    }

    /// Copy `range` into `sink`, reporting each chunk to `progress`
    ///
    /// Stops at the first transport or sink failure. Bytes already appended
    /// stay in the sink.
    pub fn dump_region<S, P>(
        &mut self,
        sink: &mut S,
        progress: &mut P,
        range: AddressRange,
    ) -> Result<()>
    where
        S: ByteSink + ?Sized,
        P: ProgressSink + ?Sized,
    {
        log::info!("Dumping {} ({} bytes)", range, range.size());
        progress.start(range.size() as u64);

        for chunk in self.read(range) {
            let chunk = chunk?;
            sink.append(&chunk)?;
            progress.advance(chunk.len() as u64);
        }

        progress.finish();
        Ok(())
    }

    /// Unlock the drive and dump its 128 KiB ROM
    pub fn dump_rom<S, P>(&mut self, sink: &mut S, progress: &mut P) -> Result<UnlockOutcome>
    where
        S: ByteSink + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let outcome = self.unlock()?;
        self.dump_region(sink, progress, ROM)?;
        Ok(outcome)
    }
}

/// Lazy iterator over the chunks of a read
///
/// Created by [`MemoryBridge::read`]. After an error is yielded the iterator
/// is exhausted.
pub struct ChunkReader<'a, C> {
    bridge: &'a mut MemoryBridge<C>,
    next_address: u32,
    remaining: u32,
}

impl<C> ChunkReader<'_, C> {
    /// Bytes not yet read
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl<C: DeviceChannel> Iterator for ChunkReader<'_, C> {
    type Item = TransportResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let address = self.next_address;
        let len = self.remaining.min(MAX_TRANSFER);
        match self.bridge.read_chunk(address, len) {
            Ok(data) => {
                // Wraps only when the range ends at 2^32, after the last chunk
                self.next_address = address.wrapping_add(len);
                self.remaining -= len;
                Some(Ok(Chunk { address, data }))
            }
            Err(e) => {
                log::debug!("Read at 0x{:08X} failed: {}", address, e);
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining.div_ceil(MAX_TRANSFER) as usize;
        (0, Some(chunks))
    }
}

impl<C: DeviceChannel> FusedIterator for ChunkReader<'_, C> {}
