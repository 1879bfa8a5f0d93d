//! Linux i2c-dev transport
//!
//! Talks to the fan controller through `/dev/i2c-<index>` using SMBus
//! byte-data transactions.

use crate::bus::{BusConnection, RegisterBus};
use cm4fan_core::{BusIndex, Cm4FanError, Emc2301, Result};
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use std::path::{Path, PathBuf};
use tracing::{debug, error, trace};

/// Directory holding the i2c-dev nodes
const DEFAULT_DEVICE_DIR: &str = "/dev";

/// Register bus backed by the Linux i2c-dev interface
#[derive(Debug, Clone)]
pub struct LinuxI2cBus {
    device_address: u16,
    device_dir: PathBuf,
}

impl LinuxI2cBus {
    /// Create a transport targeting the given 7-bit slave address
    pub fn new(device_address: u8) -> Self {
        Self {
            device_address: u16::from(device_address),
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
        }
    }

    /// Look for `i2c-<index>` nodes in `dir` instead of `/dev`
    pub fn with_device_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.device_dir = dir.into();
        self
    }

    /// Directory the device nodes are opened from
    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    /// Device node for a bus index
    pub fn device_path(&self, bus: BusIndex) -> PathBuf {
        self.device_dir.join(format!("i2c-{}", bus.index()))
    }
}

impl Default for LinuxI2cBus {
    fn default() -> Self {
        Self::new(Emc2301::DEFAULT_ADDRESS)
    }
}

impl RegisterBus for LinuxI2cBus {
    type Connection = LinuxI2cConnection;

    fn open(&self, bus: BusIndex) -> Result<LinuxI2cConnection> {
        let path = self.device_path(bus);
        debug!(
            "Opening {} at address 0x{:02X}",
            path.display(),
            self.device_address
        );

        let device = LinuxI2CDevice::new(&path, self.device_address).map_err(|e| {
            debug!("Failed to open {}: {}", path.display(), e);
            Cm4FanError::BusOpen {
                bus: bus.index(),
                reason: e.to_string(),
            }
        })?;

        Ok(LinuxI2cConnection { device, bus })
    }
}

/// Open i2c-dev handle; the file descriptor is closed on drop
pub struct LinuxI2cConnection {
    device: LinuxI2CDevice,
    bus: BusIndex,
}

impl BusConnection for LinuxI2cConnection {
    fn bus_index(&self) -> BusIndex {
        self.bus
    }

    fn read_register(&mut self, register: u8) -> Result<u8> {
        let value = self.device.smbus_read_byte_data(register).map_err(|e| {
            error!(
                "Read of register 0x{:02X} on bus {} failed: {}",
                register, self.bus, e
            );
            Cm4FanError::read_failed(register, e.to_string())
        })?;
        trace!("RX bus {} reg 0x{:02X} = 0x{:02X}", self.bus, register, value);
        Ok(value)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        trace!("TX bus {} reg 0x{:02X} = 0x{:02X}", self.bus, register, value);
        self.device
            .smbus_write_byte_data(register, value)
            .map_err(|e| {
                error!(
                    "Write of register 0x{:02X} on bus {} failed: {}",
                    register, self.bus, e
                );
                Cm4FanError::write_failed(register, e.to_string())
            })
    }
}

impl Drop for LinuxI2cConnection {
    fn drop(&mut self) {
        trace!("Closing bus {}", self.bus);
    }
}
