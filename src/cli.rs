//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "drivedoctor")]
#[command(
    author,
    version,
    about = "Read and patch the memory of USB optical disc drive controllers",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Device to use: usb[:index=N,vid=0x..,pid=0x..] or dummy[:variant=d2a|dms|d2b,unlocked=true]
    #[arg(short, long, default_value = "usb", global = true)]
    pub device: String,

    /// Read response timeout in milliseconds
    #[arg(long, default_value_t = 3000, global = true)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Unlock the drive and dump its 128 KiB firmware ROM
    DumpRom {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Dump an arbitrary memory region to a file
    Dump {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex, e.g., 0x80000)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Number of bytes to read (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        size: u32,

        /// Relax the firmware's memory protection first
        #[arg(long)]
        unlock: bool,
    },

    /// Relax the firmware's memory protection
    Unlock,

    /// Print a hexdump of drive memory
    Peek {
        /// Start address (hex, e.g., 0x80000)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Number of bytes to read (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "256")]
        size: u32,
    },

    /// Write a byte (or a little-endian word) to drive memory
    Poke {
        /// Target address (hex, e.g., 0x82B6)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Value to write (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        value: u32,

        /// Write two bytes instead of one
        #[arg(long)]
        word: bool,
    },

    /// List connected drives and available devices
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x80000"), Ok(0x80000));
        assert_eq!(parse_hex_u32("0XFF"), Ok(0xFF));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("ten").is_err());
        assert!(parse_hex_u32("0x100000000").is_err());
    }

    #[test]
    fn test_cli_dump() {
        let cli = Cli::try_parse_from([
            "drivedoctor",
            "-d",
            "dummy:variant=dms",
            "dump",
            "-o",
            "out.bin",
            "--address",
            "0x80000",
            "--size",
            "0x100",
            "--unlock",
        ])
        .unwrap();

        assert_eq!(cli.device, "dummy:variant=dms");
        assert_eq!(cli.timeout, 3000);
        match cli.command {
            Commands::Dump {
                output,
                address,
                size,
                unlock,
            } => {
                assert_eq!(output, PathBuf::from("out.bin"));
                assert_eq!(address, 0x80000);
                assert_eq!(size, 0x100);
                assert!(unlock);
            }
            _ => panic!("expected dump"),
        }
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "drivedoctor",
            "peek",
            "--address",
            "0x8000",
            "--timeout",
            "500",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.device, "usb");
        assert_eq!(cli.timeout, 500);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Peek {
                address: 0x8000,
                size: 256
            }
        ));
    }

    #[test]
    fn test_cli_rejects_bad_address() {
        assert!(Cli::try_parse_from(["drivedoctor", "poke", "--address", "nope", "--value", "1"])
            .is_err());
    }
}
