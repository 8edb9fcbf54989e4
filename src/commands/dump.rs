//! Memory dump commands
//!
//! Both commands stream chunks straight into the output file as they arrive,
//! so a failed dump leaves the bytes read so far on disk.

use drivedoctor_core::region::ROM;
use drivedoctor_core::{AddressRange, DeviceChannel, MemoryBridge, ProgressSink, UnlockOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// =============================================================================
// Progress reporting
// =============================================================================

/// Create a progress bar with custom phase message
fn create_progress_bar_with_phase(
    total: u64,
    phase: &str,
) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Progress reporter using an indicatif progress bar
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
    phase: &'static str,
}

impl IndicatifProgress {
    pub fn new(phase: &'static str) -> Self {
        Self { bar: None, phase }
    }
}

impl ProgressSink for IndicatifProgress {
    fn start(&mut self, total_bytes: u64) {
        self.bar = Some(
            create_progress_bar_with_phase(total_bytes, self.phase)
                .unwrap_or_else(|_| ProgressBar::new(total_bytes)),
        );
    }

    fn advance(&mut self, bytes: u64) {
        if let Some(pb) = &self.bar {
            pb.inc(bytes);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_with_message("Read complete");
        }
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        // A dump that failed midway never reaches finish()
        if let Some(pb) = self.bar.take() {
            pb.abandon();
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Report what the unlock step did
pub fn print_unlock_outcome(outcome: UnlockOutcome) {
    match outcome {
        UnlockOutcome::Patched => println!("Memory protection disabled"),
        UnlockOutcome::AlreadyUnlocked { probe } => println!(
            "Memory protection already disabled (probe byte 0x{:02X})",
            probe
        ),
    }
}

/// Unlock the drive and dump its firmware ROM to `output`
pub fn run_dump_rom<C: DeviceChannel>(
    bridge: &mut MemoryBridge<C>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Dumping firmware ROM {} to {:?}", ROM, output);

    let mut file = BufWriter::new(File::create(output)?);
    let mut progress = IndicatifProgress::new("Reading ROM");
    let outcome = bridge.dump_rom(&mut file, &mut progress)?;
    file.flush()?;

    print_unlock_outcome(outcome);
    println!("Wrote {} bytes to {:?}", ROM.size(), output);
    Ok(())
}

/// Dump `size` bytes starting at `address` to `output`
pub fn run_dump<C: DeviceChannel>(
    bridge: &mut MemoryBridge<C>,
    output: &Path,
    address: u32,
    size: u32,
    unlock: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let range = AddressRange::new(address, size)?;

    if unlock {
        print_unlock_outcome(bridge.unlock()?);
    }

    let mut file = BufWriter::new(File::create(output)?);
    let mut progress = IndicatifProgress::new("Reading");
    bridge.dump_region(&mut file, &mut progress, range)?;
    file.flush()?;

    println!("Wrote {} bytes from {} to {:?}", size, range, output);
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use drivedoctor_dummy::{default_rom, DummyDrive};

    #[test]
    fn test_progress_without_start_is_noop() {
        let mut progress = IndicatifProgress::new("Reading");
        progress.advance(10);
        progress.finish();
        assert!(progress.bar.is_none());
    }

    #[test]
    fn test_dump_rom_to_file() {
        let path = std::env::temp_dir().join(format!("drivedoctor-rom-{}.bin", std::process::id()));
        let mut bridge = MemoryBridge::new(DummyDrive::new_default());

        run_dump_rom(&mut bridge, &path).unwrap();
        let data = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(data, default_rom());
    }

    #[test]
    fn test_dump_rejects_overflowing_range() {
        let path = std::env::temp_dir().join("drivedoctor-never-created.bin");
        let mut bridge = MemoryBridge::new(DummyDrive::new_default());

        assert!(run_dump(&mut bridge, &path, 0xFFFF_FF00, 0x200, false).is_err());
        assert!(bridge.channel().history().is_empty());
        assert!(!path.exists());
    }
}
