//! drivedoctor - Memory access tool for USB optical disc drives
//!
//! Reads and patches the memory of the USB bridge controller found in a family
//! of external optical drives, using the vendor's bulk command protocol.
//!
//! # Architecture
//!
//! Every command builds a [`MemoryBridge`] over a boxed
//! [`DeviceChannel`](drivedoctor_core::DeviceChannel) chosen with `--device`:
//! - **usb** - a real drive, reached through its bulk endpoint pair
//! - **dummy** - an in-memory emulator with the same protection behaviour
//!
//! The commands themselves never know which one they are talking to.

mod cli;
mod commands;
mod devices;

use clap::Parser;
use cli::{Cli, Commands};
use drivedoctor_core::{BridgeConfig, MemoryBridge};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    // Listing needs no open device
    if let Commands::List = cli.command {
        return commands::list_devices();
    }

    let channel = devices::open_device(&cli.device)?;
    let config = BridgeConfig {
        read_timeout: Duration::from_millis(cli.timeout),
    };
    let mut bridge = MemoryBridge::with_config(channel, config);

    match cli.command {
        Commands::DumpRom { output } => commands::dump::run_dump_rom(&mut bridge, &output),
        Commands::Dump {
            output,
            address,
            size,
            unlock,
        } => commands::dump::run_dump(&mut bridge, &output, address, size, unlock),
        Commands::Unlock => commands::unlock::run_unlock(&mut bridge),
        Commands::Peek { address, size } => commands::memory::run_peek(&mut bridge, address, size),
        Commands::Poke {
            address,
            value,
            word,
        } => commands::memory::run_poke(&mut bridge, address, value, word),
        Commands::List => commands::list_devices(),
    }
}
