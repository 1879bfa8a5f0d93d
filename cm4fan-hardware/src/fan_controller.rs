//! Fan Controller - bound EMC2301 device handle
//!
//! A `FanController` only exists after the device has been located, its
//! product id verified, and its tach range configured. Duty cycle and RPM
//! operations live in `duty_cycle` and `tach`.

use crate::bus::{BusConnection, RegisterBus};
use crate::locator::locate;
use cm4fan_core::{BusIndex, Cm4FanError, Emc2301, FanStatus, Register, Result};
use tracing::{debug, info, warn};

/// Fan controller interface
///
/// Generic over the connection type, allowing real hardware
/// (`LinuxI2cConnection`) or mock connections for testing. Owns its
/// connection exclusively; dropping the controller releases it.
pub struct FanController<C: BusConnection> {
    conn: C,
}

impl<C: BusConnection> FanController<C> {
    /// Locate the device, open it, and bind to it
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no bus answers the probe, `BusOpen` if the
    /// located bus cannot be reopened, and any error from [`Self::bind`].
    pub fn open<B>(bus: &B) -> Result<Self>
    where
        B: RegisterBus<Connection = C>,
    {
        let index = locate(bus)?;
        let conn = bus.open(index)?;
        Self::bind(conn)
    }

    /// Verify the product id and configure the tach range on an open connection
    ///
    /// Clears the range-select bits of the fan configuration register so the
    /// tach counter runs with multiplier 1, which the RPM conversion relies
    /// on. The connection is released if any step fails.
    ///
    /// # Errors
    ///
    /// Returns `IdentityMismatch` if the product id is wrong, or `RegisterIo`
    /// if any register transaction fails.
    pub fn bind(mut conn: C) -> Result<Self> {
        let bus = conn.bus_index();

        let id = conn.read_register(Register::ProductId.addr())?;
        if id != Emc2301::PRODUCT_ID {
            warn!(
                "Bus {}: product id 0x{:02X} is not an {}",
                bus,
                id,
                Emc2301::NAME
            );
            return Err(Cm4FanError::IdentityMismatch {
                bus: bus.index(),
                expected: Emc2301::PRODUCT_ID,
                found: id,
            });
        }

        let config = conn.read_register(Register::FanConfig.addr())?;
        // RNG[1:0] = 00 selects the 500 RPM range (m = 1)
        let configured = config & !Emc2301::RANGE_MASK;
        debug!(
            "Bus {}: fan config 0x{:02X} -> 0x{:02X}",
            bus, config, configured
        );
        conn.write_register(Register::FanConfig.addr(), configured)?;

        info!("{} bound on bus {}", Emc2301::NAME, bus);
        Ok(Self { conn })
    }

    /// Bus this controller is bound to
    pub fn bus_index(&self) -> BusIndex {
        self.conn.bus_index()
    }

    /// Read the drive setting and speed in one snapshot
    pub fn status(&mut self) -> Result<FanStatus> {
        let duty_cycle = self.get_duty_cycle()?;
        let rpm = self.get_rpm()?;

        Ok(FanStatus {
            bus: self.bus_index(),
            duty_cycle,
            rpm,
        })
    }

    /// Release the connection
    pub fn close(self) {
        debug!("Closing {} on bus {}", Emc2301::NAME, self.bus_index());
    }

    pub(crate) fn read(&mut self, register: Register) -> Result<u8> {
        self.conn.read_register(register.addr())
    }

    pub(crate) fn write(&mut self, register: Register, value: u8) -> Result<()> {
        self.conn.write_register(register.addr(), value)
    }
}
