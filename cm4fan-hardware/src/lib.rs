//! cm4fan-hardware
//!
//! Hardware crate that contains the register bus transports and the EMC2301
//! driver logic. This crate is intended to be used by the CLI crate and by
//! any other program that needs to drive the fan.
//!
//! Public API:
//! - `fan_controller::FanController` - bound device handle with duty cycle and RPM operations
//! - `locator::locate` - helper to find the bus the device sits on
//! - `linux_bus::LinuxI2cBus` - `/dev/i2c-*` transport
//! - `mock::MockBus` - in-memory transport for tests and dry runs

pub mod bus;
pub mod duty_cycle;
pub mod fan_controller;
pub mod linux_bus;
pub mod locator;
pub mod mock;
pub mod tach;

pub use bus::{BusConnection, RegisterBus};
pub use duty_cycle::{percent_to_register, register_to_percent};
pub use fan_controller::FanController;
pub use linux_bus::{LinuxI2cBus, LinuxI2cConnection};
pub use locator::locate;
pub use mock::{MockBus, MockChip, MockConnection};
pub use tach::{classify_rpm, rpm_from_tach, tach_count};
