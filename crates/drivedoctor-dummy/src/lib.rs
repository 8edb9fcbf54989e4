//! drivedoctor-dummy - In-memory drive controller emulator for testing
//!
//! This crate provides a fake drive that speaks the command protocol over a
//! [`DeviceChannel`]. It keeps the controller's memory in a buffer, enforces
//! the firmware's read and write protection until the right flag byte is
//! patched, and answers reads the way the real controller does. It's useful
//! for testing and development without real hardware.

use std::time::Duration;

use drivedoctor_core::protocol::{Command, Opcode, WriteWidth, MAX_TRANSFER};
use drivedoctor_core::region::{
    FirmwareVariant, READ_PROTECTED, ROM, UNLOCK_VALUE, WRITE_PROTECTED,
};
use drivedoctor_core::{DeviceChannel, TransportError, TransportResult};

/// Byte returned for protected reads while locked
const FILLER: u8 = 0xFF;

/// Configuration for the dummy drive
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Firmware build to emulate (selects which flag byte unlocks)
    pub variant: FirmwareVariant,
    /// Start with protection already relaxed
    pub unlocked: bool,
    /// Size of the backed address space; reads above it return zeros
    pub memory_size: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            variant: FirmwareVariant::Gc2rD2a,
            unlocked: false,
            memory_size: 0x20_0000,
        }
    }
}

/// Parse options from key=value pairs
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "variant" | "fw" => {
                config.variant = FirmwareVariant::from_name(value)
                    .ok_or_else(|| format!("unknown firmware variant: {}", value))?;
            }
            "unlocked" => {
                config.unlocked = match *value {
                    "1" | "true" | "yes" => true,
                    "0" | "false" | "no" => false,
                    _ => return Err(format!("unlocked: {}", value)),
                };
            }
            _ => return Err(format!("unknown option: {}", key)),
        }
    }

    Ok(config)
}

/// Deterministic ROM contents used when none are supplied
pub fn default_rom() -> Vec<u8> {
    (0..ROM.size())
        .map(|i| (i as u8).wrapping_mul(0x1D) ^ (i >> 8) as u8 ^ 0x5A)
        .collect()
}

/// Dummy drive controller
///
/// Emulates the controller's memory for testing purposes.
pub struct DummyDrive {
    config: DummyConfig,
    memory: Vec<u8>,
    pending: Option<Vec<u8>>,
    history: Vec<Command>,
}

impl DummyDrive {
    /// Create a dummy drive with the given configuration and the default ROM
    pub fn new(config: DummyConfig) -> Self {
        Self::with_rom(config, &default_rom())
    }

    /// Create a locked GC2R-D2A drive
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy drive with the given ROM image
    pub fn with_rom(config: DummyConfig, rom: &[u8]) -> Self {
        let mut memory = vec![0u8; config.memory_size];

        let start = ROM.start() as usize;
        if start < memory.len() {
            let len = rom.len().min(ROM.size() as usize).min(memory.len() - start);
            memory[start..start + len].copy_from_slice(&rom[..len]);
        }

        let flag = config.variant.unlock_flag() as usize;
        if config.unlocked && flag < memory.len() {
            memory[flag] = UNLOCK_VALUE;
        }

        Self {
            config,
            memory,
            pending: None,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Raw memory, ignoring protection
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Every command accepted so far
    pub fn history(&self) -> &[Command] {
        &self.history
    }

    /// Check if the emulated firmware currently allows protected access
    pub fn is_unlocked(&self) -> bool {
        self.memory
            .get(self.config.variant.unlock_flag() as usize)
            .is_some_and(|&b| b == UNLOCK_VALUE)
    }

    fn peek(&self, address: u32) -> u8 {
        if !self.is_unlocked() && READ_PROTECTED.contains(address) {
            return FILLER;
        }
        self.memory.get(address as usize).copied().unwrap_or(0)
    }

    fn handle_read(&mut self, cmd: &Command) -> TransportResult<()> {
        let len = cmd.argument();
        if len > MAX_TRANSFER {
            return Err(TransportError::Transmit(format!(
                "read of {} bytes exceeds transfer limit",
                len
            )));
        }

        let response = (0..len)
            .map(|i| self.peek(cmd.address().wrapping_add(i)))
            .collect();
        if self.pending.replace(response).is_some() {
            log::warn!("Dummy drive: unread response discarded");
        }
        Ok(())
    }

    fn handle_write(&mut self, cmd: &Command) -> TransportResult<()> {
        let width = WriteWidth::from_value(cmd.length_selector()).ok_or_else(|| {
            TransportError::Transmit(format!(
                "unsupported write width {}",
                cmd.length_selector()
            ))
        })?;

        let bytes = cmd.argument().to_le_bytes();
        let locked = !self.is_unlocked();
        for (i, &byte) in bytes[..width.bytes()].iter().enumerate() {
            let address = cmd.address().wrapping_add(i as u32);
            if locked && WRITE_PROTECTED.contains(address) {
                log::debug!("Dummy drive: write to 0x{:08X} dropped (locked)", address);
                continue;
            }
            if let Some(slot) = self.memory.get_mut(address as usize) {
                *slot = byte;
            }
        }
        Ok(())
    }
}

impl DeviceChannel for DummyDrive {
    fn transmit(&mut self, data: &[u8]) -> TransportResult<()> {
        let cmd = Command::parse(data).map_err(|e| TransportError::Transmit(e.to_string()))?;
        log::trace!("Dummy drive: {}", cmd);

        match cmd.opcode() {
            Some(Opcode::Read) => self.handle_read(&cmd)?,
            Some(Opcode::Write) => self.handle_write(&cmd)?,
            None => {
                return Err(TransportError::Transmit(format!(
                    "unknown opcode in {:?}",
                    cmd
                )))
            }
        }
        self.history.push(cmd);
        Ok(())
    }

    fn receive(&mut self, max_len: usize, timeout: Duration) -> TransportResult<Vec<u8>> {
        let mut response = self.pending.take().ok_or(TransportError::Timeout(timeout))?;
        response.truncate(max_len);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivedoctor_core::region::{PROBE_ADDRESS, UNLOCK_FLAGS};
    use drivedoctor_core::{AddressRange, MemoryBridge, NoProgress, UnlockOutcome};

    #[test]
    fn test_locked_rom_reads_filler() {
        let mut bridge = MemoryBridge::new(DummyDrive::new_default());
        let mut out = Vec::new();
        bridge.dump_region(&mut out, &mut NoProgress, ROM).unwrap();
        assert_eq!(out.len(), 0x2_0000);
        assert!(out.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_dump_rom_every_variant() {
        for variant in FirmwareVariant::ALL {
            let config = DummyConfig {
                variant,
                ..Default::default()
            };
            let mut bridge = MemoryBridge::new(DummyDrive::new(config));
            let mut out = Vec::new();

            let outcome = bridge.dump_rom(&mut out, &mut NoProgress).unwrap();
            assert_eq!(outcome, UnlockOutcome::Patched, "{}", variant);
            assert_eq!(out, default_rom(), "{}", variant);
            assert!(bridge.channel().is_unlocked());
        }
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut bridge = MemoryBridge::new(DummyDrive::new_default());
        assert_eq!(bridge.unlock().unwrap(), UnlockOutcome::Patched);

        let probe = default_rom()[0];
        assert_eq!(
            bridge.unlock().unwrap(),
            UnlockOutcome::AlreadyUnlocked { probe }
        );
        // probe + 2 writes, then a probe only
        assert_eq!(bridge.channel().history().len(), 4);
    }

    #[test]
    fn test_preunlocked_drive() {
        let config = DummyConfig {
            unlocked: true,
            ..Default::default()
        };
        let mut bridge = MemoryBridge::new(DummyDrive::new(config));
        assert_eq!(bridge.read_byte(PROBE_ADDRESS).unwrap(), default_rom()[0]);
        assert!(matches!(
            bridge.unlock().unwrap(),
            UnlockOutcome::AlreadyUnlocked { .. }
        ));
    }

    #[test]
    fn test_write_protection() {
        let mut bridge = MemoryBridge::new(DummyDrive::new_default());

        bridge.write_byte(0x9000, 0xAA).unwrap();
        bridge.write_byte(0x8000, 0xBB).unwrap();
        assert_eq!(bridge.read_byte(0x9000).unwrap(), 0x00);
        assert_eq!(bridge.read_byte(0x8000).unwrap(), 0xBB);

        bridge.unlock().unwrap();
        bridge.write_byte(0x9000, 0xAA).unwrap();
        assert_eq!(bridge.read_byte(0x9000).unwrap(), 0xAA);
    }

    #[test]
    fn test_write_word_little_endian() {
        let mut bridge = MemoryBridge::new(DummyDrive::new_default());
        bridge.write_word(0x4000, 0xBEEF).unwrap();

        let range = AddressRange::new(0x4000, 2).unwrap();
        let chunk = bridge.read(range).next().unwrap().unwrap();
        assert_eq!(&chunk[..], &[0xEF, 0xBE]);
    }

    #[test]
    fn test_flags_live_outside_write_window() {
        let drive = DummyDrive::new_default();
        for flag in UNLOCK_FLAGS {
            assert!(!WRITE_PROTECTED.contains(flag));
            assert!((flag as usize) < drive.memory().len());
        }
    }

    #[test]
    fn test_oversized_read_rejected() {
        let mut drive = DummyDrive::new_default();
        let cmd = Command::read(0, MAX_TRANSFER + 1);
        assert!(matches!(
            drive.transmit(&cmd.to_bytes()),
            Err(TransportError::Transmit(_))
        ));
        assert!(drive.history().is_empty());
    }

    #[test]
    fn test_receive_without_request_times_out() {
        let mut drive = DummyDrive::new_default();
        let timeout = Duration::from_millis(10);
        assert!(matches!(
            drive.receive(16, timeout),
            Err(TransportError::Timeout(t)) if t == timeout
        ));
    }

    #[test]
    fn test_unknown_write_width_rejected() {
        let mut drive = DummyDrive::new_default();
        let mut raw = Command::write(0x4000, 0xAA, WriteWidth::Byte).to_bytes();
        raw[16..20].copy_from_slice(&0x4000_0000u32.to_le_bytes());

        assert!(matches!(
            drive.transmit(&raw),
            Err(TransportError::Transmit(_))
        ));
        assert_eq!(drive.memory()[0x4000], 0);
    }

    #[test]
    fn test_garbage_rejected() {
        let mut drive = DummyDrive::new_default();
        assert!(drive.transmit(&[0u8; 24]).is_err());
        assert!(drive.transmit(b"short").is_err());
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("variant", "d2b"), ("unlocked", "true")]).unwrap();
        assert_eq!(config.variant, FirmwareVariant::Gc2D2b);
        assert!(config.unlocked);

        assert!(parse_options(&[("variant", "xyz")]).is_err());
        assert!(parse_options(&[("speed", "1")]).is_err());
    }
}
