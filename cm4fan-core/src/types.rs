//! Core types and data structures for cm4fan

use crate::chip::{FIRST_BUS, LAST_BUS};
use crate::error::{Cm4FanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an I2C bus (`/dev/i2c-<index>` on Linux)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusIndex(pub u8);

impl BusIndex {
    /// Candidate buses in scan order, `FIRST_BUS..=LAST_BUS`
    pub fn candidates() -> impl Iterator<Item = BusIndex> {
        (FIRST_BUS..=LAST_BUS).map(BusIndex)
    }

    /// Raw index
    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for BusIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fan drive strength as a percentage in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "u8")]
pub struct DutyCycle(u8);

impl DutyCycle {
    /// Maximum percentage value
    pub const MAX: u8 = 100;

    /// Fan commanded off
    pub const OFF: DutyCycle = DutyCycle(0);

    /// Fan commanded to full drive
    pub const FULL: DutyCycle = DutyCycle(Self::MAX);

    /// Create a duty cycle from a percentage
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `percent` is outside `0..=100`.
    pub fn new(percent: i32) -> Result<Self> {
        match u8::try_from(percent) {
            Ok(p) if p <= Self::MAX => Ok(Self(p)),
            _ => Err(Cm4FanError::InvalidInput(format!(
                "duty cycle must be 0-{}, got {}",
                Self::MAX,
                percent
            ))),
        }
    }

    /// Create a duty cycle, clamping percentages above 100 to full drive
    pub fn saturating(percent: u8) -> Self {
        Self(percent.min(Self::MAX))
    }

    /// Percentage value
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Whether the fan is commanded off
    pub fn is_off(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i32> for DutyCycle {
    type Error = Cm4FanError;

    fn try_from(percent: i32) -> Result<Self> {
        Self::new(percent)
    }
}

impl From<DutyCycle> for u8 {
    fn from(duty: DutyCycle) -> Self {
        duty.0
    }
}

impl fmt::Display for DutyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Outcome of a single RPM measurement
///
/// Exactly one variant holds per measurement; a speed value only exists for
/// `Measured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RpmReading {
    /// Tach reading is fast enough to be trusted
    Measured { rpm: u32 },
    /// Reading is too slow to trust and the fan is commanded off
    Stopped,
    /// Reading is too slow to trust although the fan is driven
    Undefined,
}

impl RpmReading {
    /// Measured speed, if any
    pub fn rpm(&self) -> Option<u32> {
        match self {
            RpmReading::Measured { rpm } => Some(*rpm),
            RpmReading::Stopped | RpmReading::Undefined => None,
        }
    }
}

impl fmt::Display for RpmReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpmReading::Measured { rpm } => write!(f, "{} RPM", rpm),
            RpmReading::Stopped => f.write_str("stopped"),
            RpmReading::Undefined => f.write_str("undefined"),
        }
    }
}

/// Snapshot of the bound fan controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanStatus {
    /// Bus the controller is bound to
    pub bus: BusIndex,
    /// Current drive setting
    pub duty_cycle: DutyCycle,
    /// Current speed measurement
    pub rpm: RpmReading,
}
