//! EMC2301 register map and chip constants
//!
//! The EMC2301 is a single-channel PWM fan controller with an RPM-based
//! tachometer. Only the registers the driver touches are listed here; the
//! addresses and the conversion constant come from the EMC2301 datasheet
//! (register table 6-1, fan drive setting 6.12, fan configuration 6.14,
//! tach reading 6.23, simplified tach conversion equation 4-3).

use std::fmt;

/// Registers read or written by the driver
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Fan drive setting, linear 0-255 (0x30)
    FanDrive = 0x30,
    /// Fan configuration 1; bits 5-6 select the tach range (0x32)
    FanConfig = 0x32,
    /// Tach reading high byte (0x3E)
    TachHigh = 0x3E,
    /// Tach reading low byte, top 5 bits significant (0x3F)
    TachLow = 0x3F,
    /// Product id (0xFD)
    ProductId = 0xFD,
}

impl Register {
    /// Raw register address on the bus
    #[inline]
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:02X})", self, self.addr())
    }
}

/// EMC2301 chip characteristics
pub struct Emc2301;

impl Emc2301 {
    /// Human-readable chip name
    pub const NAME: &'static str = "EMC2301";

    /// Value of the product id register on a genuine EMC2301
    pub const PRODUCT_ID: u8 = 0x37;

    /// Fixed 7-bit SMBus address of the EMC2301
    pub const DEFAULT_ADDRESS: u8 = 0x2F;

    /// Tach range-select field (RNG) in the fan configuration register
    pub const RANGE_MASK: u8 = 0b11 << 5;

    /// Tach-to-RPM numerator for the 500 RPM range (multiplier m = 1)
    pub const TACH_TO_RPM: u32 = 3_932_160;

    /// Largest value the 13-bit tach count can hold
    pub const MAX_TACH_COUNT: u16 = 0x1FFF;

    /// Candidate RPM values at or below this are not trusted
    pub const MIN_TRUSTED_RPM: u32 = 500;
}

/// First bus index scanned during discovery
pub const FIRST_BUS: u8 = 0;

/// Last bus index scanned during discovery (inclusive)
pub const LAST_BUS: u8 = 10;
