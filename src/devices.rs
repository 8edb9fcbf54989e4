//! Device registration and dispatch
//!
//! This module provides a centralized registry for the device backends, with
//! support for feature-gated inclusion and dynamic help text generation.

use drivedoctor_core::DeviceChannel;
use thiserror::Error;

/// Information about a device backend
pub struct DeviceInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Errors raised while selecting and opening a device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("unknown device: {0}")]
    Unknown(String),

    #[error("invalid {device} parameters: {message}")]
    InvalidOptions {
        device: &'static str,
        message: String,
    },

    #[error("failed to open {device}: {message}")]
    OpenFailed {
        device: &'static str,
        message: String,
    },
}

/// Get information about all available devices (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    #[cfg(feature = "usb")]
    devices.push(DeviceInfo {
        name: "usb",
        aliases: &[],
        description: "USB disc drive controller (VID:05fd PID:1290) (index=<n>,vid=<id>,pid=<id>)",
    });

    #[cfg(feature = "dummy")]
    devices.push(DeviceInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory drive emulator for testing (variant=d2a|dms|d2b,unlocked=<bool>)",
    });

    devices
}

/// Generate help text listing all available devices
pub fn device_help() -> String {
    let devices = available_devices();

    if devices.is_empty() {
        return "No devices available (recompile with device features enabled)".to_string();
    }

    let mut help = String::from("Available devices:\n");
    for d in &devices {
        help.push_str(&format!("  {:8} - {}\n", d.name, d.description));
    }
    help
}

/// Resolve a device name or alias to its primary name
pub fn find_device(name: &str) -> Option<&'static str> {
    available_devices()
        .into_iter()
        .find(|d| d.name == name || d.aliases.contains(&name))
        .map(|d| d.name)
}

/// Parse a device string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_device_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the device named by `device` as a boxed channel
#[allow(unused_variables)]
pub fn open_device(device: &str) -> Result<Box<dyn DeviceChannel>, DeviceError> {
    let (name, options) = parse_device_string(device);

    let canonical_name = find_device(name).ok_or_else(|| DeviceError::Unknown(name.to_string()))?;

    match canonical_name {
        #[cfg(feature = "usb")]
        "usb" => {
            use drivedoctor_usb::{parse_options, UsbDrive};

            let config = parse_options(&options).map_err(|e| DeviceError::InvalidOptions {
                device: "usb",
                message: e.to_string(),
            })?;

            log::info!("Opening USB drive...");
            let drive = UsbDrive::open_with_config(config).map_err(|e| DeviceError::OpenFailed {
                device: "usb drive",
                message: format!(
                    "{}\nMake sure the drive is connected and you have permissions.",
                    e
                ),
            })?;
            log::info!("Using {}", drive.info());

            Ok(Box::new(drive))
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            use drivedoctor_dummy::{parse_options, DummyDrive};

            let config = parse_options(&options).map_err(|message| DeviceError::InvalidOptions {
                device: "dummy",
                message,
            })?;

            log::info!(
                "Using dummy drive ({}, {})",
                config.variant,
                if config.unlocked { "unlocked" } else { "locked" }
            );
            Ok(Box::new(DummyDrive::new(config)))
        }

        _ => Err(DeviceError::Unknown(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_string() {
        assert_eq!(parse_device_string("usb"), ("usb", vec![]));
        assert_eq!(
            parse_device_string("dummy:variant=d2b,unlocked=true"),
            ("dummy", vec![("variant", "d2b"), ("unlocked", "true")])
        );
        // Entries without '=' are ignored
        assert_eq!(
            parse_device_string("usb:index=1,bogus"),
            ("usb", vec![("index", "1")])
        );
    }

    #[test]
    fn test_unknown_device() {
        assert!(matches!(
            open_device("ch341a"),
            Err(DeviceError::Unknown(name)) if name == "ch341a"
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        use drivedoctor_core::MemoryBridge;

        let channel = open_device("emulator:unlocked=true").unwrap();
        let mut bridge = MemoryBridge::new(channel);
        assert_ne!(bridge.read_byte(0x80000).unwrap(), 0xFF);

        assert!(matches!(
            open_device("dummy:variant=zz"),
            Err(DeviceError::InvalidOptions { device: "dummy", .. })
        ));
    }
}
