//! Duty cycle control
//!
//! The fan drive register is linear: 0x00 is off and 0xFF is full drive
//! (EMC2301 datasheet, equation 4-1). Conversions round half away from zero
//! and use integer arithmetic only.

use crate::bus::BusConnection;
use crate::fan_controller::FanController;
use cm4fan_core::{DutyCycle, Register, Result};
use tracing::debug;

/// Convert a duty cycle to a drive register value (0-255)
///
/// Computes `round(255 * percent / 100)`:
/// - 0% → 0
/// - 10% → 26
/// - 50% → 128
/// - 100% → 255
#[inline]
pub fn percent_to_register(duty: DutyCycle) -> u8 {
    // percent <= 100, so the result is at most 255
    ((u32::from(duty.percent()) * 255 + 50) / 100) as u8
}

/// Convert a drive register value (0-255) to a duty cycle
///
/// Computes `round(value / 255 * 100)`, which never exceeds 100.
#[inline]
pub fn register_to_percent(value: u8) -> DutyCycle {
    DutyCycle::saturating(((u32::from(value) * 200 + 255) / 510) as u8)
}

impl<C: BusConnection> FanController<C> {
    /// Read the current duty cycle
    ///
    /// # Errors
    ///
    /// Returns `RegisterIo` if the drive register cannot be read.
    pub fn get_duty_cycle(&mut self) -> Result<DutyCycle> {
        let value = self.read(Register::FanDrive)?;
        let duty = register_to_percent(value);
        debug!("Drive register 0x{:02X} = {}", value, duty);
        Ok(duty)
    }

    /// Set the duty cycle in percent
    ///
    /// The value is written without read-back.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `percent` is outside 0-100, or `RegisterIo`
    /// if the write fails.
    pub fn set_duty_cycle(&mut self, percent: i32) -> Result<()> {
        let duty = DutyCycle::new(percent)?;
        self.set_duty(duty)
    }

    /// Set an already validated duty cycle
    pub fn set_duty(&mut self, duty: DutyCycle) -> Result<()> {
        let value = percent_to_register(duty);
        debug!("Setting duty cycle {} (drive 0x{:02X})", duty, value);
        self.write(Register::FanDrive, value)
    }
}
