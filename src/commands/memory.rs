//! Peek and poke commands

use drivedoctor_core::{AddressRange, DeviceChannel, MemoryBridge};
use std::fmt::Write as _;

const BYTES_PER_LINE: usize = 16;

/// Format `data` as a canonical hexdump starting at `address`
pub fn format_hexdump(address: u32, data: &[u8]) -> String {
    let mut out = String::new();

    for (i, line) in data.chunks(BYTES_PER_LINE).enumerate() {
        let line_address = address as u64 + (i * BYTES_PER_LINE) as u64;
        let _ = write!(out, "{:08X}  ", line_address);

        for col in 0..BYTES_PER_LINE {
            match line.get(col) {
                Some(b) => {
                    let _ = write!(out, "{:02X} ", b);
                }
                None => out.push_str("   "),
            }
            if col == 7 {
                out.push(' ');
            }
        }

        out.push_str(" |");
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }

    out
}

/// Read `size` bytes at `address` and print them as a hexdump
pub fn run_peek<C: DeviceChannel>(
    bridge: &mut MemoryBridge<C>,
    address: u32,
    size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let range = AddressRange::new(address, size)?;
    let stdout = std::io::stdout();
    peek_to(bridge, range, &mut stdout.lock())
}

/// Hexdump `range` into `out` one chunk at a time, as the chunks arrive
fn peek_to<C: DeviceChannel, W: std::io::Write>(
    bridge: &mut MemoryBridge<C>,
    range: AddressRange,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    // Chunks are multiples of a line, so line addresses stay aligned to the start
    for chunk in bridge.read(range) {
        let chunk = chunk?;
        out.write_all(format_hexdump(chunk.address, &chunk).as_bytes())?;
    }
    Ok(())
}

/// Write a byte, or a little-endian word when `word` is set
pub fn run_poke<C: DeviceChannel>(
    bridge: &mut MemoryBridge<C>,
    address: u32,
    value: u32,
    word: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if word {
        let value = u16::try_from(value)
            .map_err(|_| format!("Value 0x{:X} does not fit in a word", value))?;
        bridge.write_word(address, value)?;
        println!("Wrote 0x{:04X} to 0x{:08X}", value, address);
    } else {
        let value = u8::try_from(value)
            .map_err(|_| format!("Value 0x{:X} does not fit in a byte", value))?;
        bridge.write_byte(address, value)?;
        println!("Wrote 0x{:02X} to 0x{:08X}", value, address);
    }
    Ok(())
}
