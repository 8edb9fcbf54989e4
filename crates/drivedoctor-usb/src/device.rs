//! USB drive implementation
//!
//! This module provides the `UsbDrive` struct that carries command payloads
//! to the drive controller over its bulk endpoint pair.

use std::time::Duration;

use drivedoctor_core::protocol::{BULK_IN_EP, BULK_OUT_EP};
use drivedoctor_core::{DeviceChannel, TransportError, TransportResult};
use nusb::transfer::{Buffer, Bulk, In, Out, TransferError};
use nusb::{Endpoint, MaybeFuture};

use crate::error::{Result, UsbError};

// USB device identifiers
pub const DRIVE_USB_VENDOR: u16 = 0x05FD;
pub const DRIVE_USB_PRODUCT: u16 = 0x1290;

const COMMAND_INTERFACE: u8 = 0;
/// Timeout for request transfers on the OUT endpoint
const WRITE_TIMEOUT_MS: u64 = 3000;
const WRITE_TIMEOUT: Duration = Duration::from_millis(WRITE_TIMEOUT_MS);

/// Configuration options for opening a drive
#[derive(Debug, Clone)]
pub struct UsbConfig {
    /// Device index (when multiple drives are connected)
    pub device_index: usize,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            vendor_id: DRIVE_USB_VENDOR,
            product_id: DRIVE_USB_PRODUCT,
        }
    }
}

fn parse_u16(value: &str) -> Option<u16> {
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => u16::from_str_radix(value, 16).ok(),
    }
}

/// Parse options from key=value pairs
pub fn parse_options(options: &[(&str, &str)]) -> Result<UsbConfig> {
    let mut config = UsbConfig::default();

    for (key, value) in options {
        match *key {
            "device" | "index" => {
                config.device_index = value
                    .parse()
                    .map_err(|_| UsbError::InvalidParameter(format!("index: {}", value)))?;
            }
            "vid" => {
                config.vendor_id = parse_u16(value)
                    .ok_or_else(|| UsbError::InvalidParameter(format!("vid: {}", value)))?;
            }
            "pid" => {
                config.product_id = parse_u16(value)
                    .ok_or_else(|| UsbError::InvalidParameter(format!("pid: {}", value)))?;
            }
            _ => {
                return Err(UsbError::InvalidParameter(format!(
                    "unknown option: {}",
                    key
                )));
            }
        }
    }

    Ok(config)
}

/// Map a failed bulk transfer onto the core's transport taxonomy
fn transfer_error(e: TransferError, timeout: Duration, what: &str) -> TransportError {
    match e {
        // transfer_blocking cancels the transfer when the timeout expires
        TransferError::Cancelled => TransportError::Timeout(timeout),
        TransferError::Disconnected => TransportError::Disconnected,
        other if what == "transmit" => TransportError::Transmit(other.to_string()),
        other => TransportError::Receive(other.to_string()),
    }
}

/// Drive controller reached over USB
pub struct UsbDrive {
    /// Bulk OUT endpoint for requests
    out_ep: Endpoint<Bulk, Out>,
    /// Bulk IN endpoint for read responses
    in_ep: Endpoint<Bulk, In>,
    info: UsbDriveInfo,
}

impl UsbDrive {
    /// Open the first connected drive
    pub fn open() -> Result<Self> {
        Self::open_with_config(UsbConfig::default())
    }

    /// Open a drive with the specified configuration
    pub fn open_with_config(config: UsbConfig) -> Result<Self> {
        let devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == config.vendor_id && d.product_id() == config.product_id)
            .collect();

        let device_info = devices
            .get(config.device_index)
            .ok_or(UsbError::DeviceNotFound {
                vendor_id: config.vendor_id,
                product_id: config.product_id,
            })?;

        log::info!(
            "Opening drive at bus {} address {}",
            device_info.busnum(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        // The controller enumerates unconfigured; select its first configuration
        let configuration = device
            .configurations()
            .next()
            .map(|c| c.configuration_value())
            .unwrap_or(1);
        log::debug!("Setting configuration {}", configuration);
        device
            .set_configuration(configuration)
            .wait()
            .map_err(|e| UsbError::ConfigurationFailed(e.to_string()))?;

        let interface = device
            .claim_interface(COMMAND_INTERFACE)
            .wait()
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        let out_ep = interface
            .endpoint::<Bulk, Out>(BULK_OUT_EP)
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;
        let in_ep = interface
            .endpoint::<Bulk, In>(BULK_IN_EP)
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        Ok(Self {
            out_ep,
            in_ep,
            info: UsbDriveInfo::from(device_info),
        })
    }

    /// List all connected drives
    pub fn list_devices() -> Result<Vec<UsbDriveInfo>> {
        Self::list_devices_with_config(&UsbConfig::default())
    }

    /// List connected drives matching the vendor/product IDs in `config`
    pub fn list_devices_with_config(config: &UsbConfig) -> Result<Vec<UsbDriveInfo>> {
        let devices = nusb::list_devices()
            .wait()?
            .filter(|d| d.vendor_id() == config.vendor_id && d.product_id() == config.product_id)
            .map(|d| UsbDriveInfo::from(&d))
            .collect();

        Ok(devices)
    }

    /// Bus location and descriptor strings of the opened drive
    pub fn info(&self) -> &UsbDriveInfo {
        &self.info
    }
}

impl DeviceChannel for UsbDrive {
    fn transmit(&mut self, data: &[u8]) -> TransportResult<()> {
        let mut out_buf = Buffer::new(data.len());
        out_buf.extend_from_slice(data);

        self.out_ep
            .transfer_blocking(out_buf, WRITE_TIMEOUT)
            .into_result()
            .map_err(|e| transfer_error(e, WRITE_TIMEOUT, "transmit"))?;
        Ok(())
    }

    fn receive(&mut self, max_len: usize, timeout: Duration) -> TransportResult<Vec<u8>> {
        // IN requests must be a multiple of the packet size
        let max_packet_size = self.in_ep.max_packet_size();
        let request_len = max_len.div_ceil(max_packet_size) * max_packet_size;
        let mut in_buf = Buffer::new(request_len);
        in_buf.set_requested_len(request_len);

        let data = self
            .in_ep
            .transfer_blocking(in_buf, timeout)
            .into_result()
            .map_err(|e| transfer_error(e, timeout, "receive"))?;

        let len = data.len().min(max_len);
        Ok(data[..len].to_vec())
    }
}

/// Information about a connected drive
#[derive(Debug, Clone)]
pub struct UsbDriveInfo {
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    pub product: Option<String>,
    pub serial: Option<String>,
}

impl From<&nusb::DeviceInfo> for UsbDriveInfo {
    fn from(d: &nusb::DeviceInfo) -> Self {
        Self {
            bus: d.busnum(),
            address: d.device_address(),
            product: d.product_string().map(str::to_string),
            serial: d.serial_number().map(str::to_string),
        }
    }
}

impl std::fmt::Display for UsbDriveInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Drive at bus {} address {}", self.bus, self.address)?;
        if let Some(product) = &self.product {
            write!(f, " ({})", product)?;
        }
        if let Some(serial) = &self.serial {
            write!(f, " serial {}", serial)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_defaults() {
        let config = parse_options(&[]).unwrap();
        assert_eq!(config.device_index, 0);
        assert_eq!(config.vendor_id, 0x05FD);
        assert_eq!(config.product_id, 0x1290);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("index", "2"), ("vid", "0x1234"), ("pid", "ABCD")]).unwrap();
        assert_eq!(config.device_index, 2);
        assert_eq!(config.vendor_id, 0x1234);
        assert_eq!(config.product_id, 0xABCD);

        assert!(parse_options(&[("index", "two")]).is_err());
        assert!(parse_options(&[("vid", "0x12345")]).is_err());
        assert!(parse_options(&[("speed", "fast")]).is_err());
    }

    #[test]
    fn test_transfer_error_mapping() {
        let timeout = Duration::from_millis(3000);
        assert!(matches!(
            transfer_error(TransferError::Cancelled, timeout, "receive"),
            TransportError::Timeout(t) if t == timeout
        ));
        assert!(matches!(
            transfer_error(TransferError::Disconnected, timeout, "transmit"),
            TransportError::Disconnected
        ));
        assert!(matches!(
            transfer_error(TransferError::Stall, timeout, "transmit"),
            TransportError::Transmit(_)
        ));
        assert!(matches!(
            transfer_error(TransferError::Stall, timeout, "receive"),
            TransportError::Receive(_)
        ));
    }

    #[test]
    fn test_write_timeout_is_fixed() {
        assert_eq!(WRITE_TIMEOUT, Duration::from_millis(WRITE_TIMEOUT_MS));
        assert_eq!(WRITE_TIMEOUT_MS, 3000);
    }

    #[test]
    fn test_info_display() {
        let info = UsbDriveInfo {
            bus: 1,
            address: 7,
            product: Some("Drive".to_string()),
            serial: None,
        };
        assert_eq!(info.to_string(), "Drive at bus 1 address 7 (Drive)");
    }
}
