//! Unlock command

use drivedoctor_core::region::{LOCKED_PROBE_VALUE, PROBE_ADDRESS, UNLOCK_FLAGS};
use drivedoctor_core::{DeviceChannel, MemoryBridge, UnlockOutcome};

/// Relax the firmware's memory protection and report what happened
pub fn run_unlock<C: DeviceChannel>(
    bridge: &mut MemoryBridge<C>,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = bridge.unlock()?;
    super::dump::print_unlock_outcome(outcome);

    if outcome == UnlockOutcome::Patched {
        let probe = bridge.read_byte(PROBE_ADDRESS)?;
        log::debug!("Probe byte after unlock: 0x{:02X}", probe);
        if probe == LOCKED_PROBE_VALUE {
            log::warn!(
                "ROM still reads as 0xFF; none of the flags at {:04X?} took effect",
                UNLOCK_FLAGS
            );
        }
    }
    Ok(())
}
