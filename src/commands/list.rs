//! List command implementation

use crate::devices;

/// List available device backends and any connected drives
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", devices::device_help());

    #[cfg(feature = "usb")]
    {
        let drives = drivedoctor_usb::UsbDrive::list_devices()?;
        println!();
        if drives.is_empty() {
            println!("No drives connected");
        } else {
            println!("Connected drives:");
            for (index, drive) in drives.iter().enumerate() {
                println!("  usb:index={}  {}", index, drive);
            }
        }
    }

    Ok(())
}
