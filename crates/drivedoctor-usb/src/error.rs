//! Error types for the USB transport

use thiserror::Error;

/// Result type for USB setup operations
pub type Result<T> = std::result::Result<T, UsbError>;

/// Errors that can occur while opening the drive
#[derive(Debug, Error)]
pub enum UsbError {
    /// No matching device on the bus
    #[error("drive not found (VID:{vendor_id:04x} PID:{product_id:04x})")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// Failed to enumerate or open the device
    #[error("failed to open drive: {0}")]
    OpenFailed(String),

    /// Failed to activate the USB configuration
    #[error("failed to set configuration: {0}")]
    ConfigurationFailed(String),

    /// Failed to claim the interface or its endpoints
    #[error("failed to claim interface: {0}")]
    ClaimFailed(String),

    /// Parameter parsing error
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<nusb::Error> for UsbError {
    fn from(e: nusb::Error) -> Self {
        UsbError::OpenFailed(e.to_string())
    }
}
