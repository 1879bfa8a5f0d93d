//! Tachometer reading and RPM conversion
//!
//! The tach count is a 13-bit value split across two registers:
//! - HIGH byte: bit 7 = 2048 ... bit 0 = 32
//! - LOW byte: bit 7 = 16 ... bit 3 = 1, bits 2-0 ignored
//!
//! With the tach range fixed to multiplier 1 at bind time, the simplified
//! conversion is `RPM = 3932160 / count` (EMC2301 datasheet, equation 4-3).
//! That formula loses precision at low speed, so candidates at or below
//! 500 RPM are not reported as measurements.

use crate::bus::BusConnection;
use crate::fan_controller::FanController;
use cm4fan_core::{DutyCycle, Emc2301, Register, Result, RpmReading};
use tracing::debug;

/// Assemble the 13-bit tach count from the two tach registers
#[inline]
pub fn tach_count(high: u8, low: u8) -> u16 {
    (u16::from(high) << 5) | (u16::from(low) >> 3)
}

/// Candidate RPM for a tach count, or `None` for a zero count
#[inline]
pub fn rpm_from_tach(count: u16) -> Option<u32> {
    if count == 0 {
        return None;
    }
    Some(Emc2301::TACH_TO_RPM / u32::from(count))
}

/// Decide what a candidate RPM means
///
/// Candidates above `Emc2301::MIN_TRUSTED_RPM` are measurements. Otherwise
/// the duty cycle is read through `read_duty` to tell a fan that is
/// commanded off from one whose speed cannot be determined. `read_duty` is
/// only called in that case.
pub fn classify_rpm<F>(candidate: u32, read_duty: F) -> Result<RpmReading>
where
    F: FnOnce() -> Result<DutyCycle>,
{
    if candidate > Emc2301::MIN_TRUSTED_RPM {
        return Ok(RpmReading::Measured { rpm: candidate });
    }

    if read_duty()?.is_off() {
        Ok(RpmReading::Stopped)
    } else {
        Ok(RpmReading::Undefined)
    }
}

impl<C: BusConnection> FanController<C> {
    /// Measure the fan speed
    ///
    /// Reads both tach registers, and the drive register as well when the
    /// tach reading is too slow to trust. A zero tach count is reported as
    /// `Undefined` without further reads.
    ///
    /// # Errors
    ///
    /// Returns `RegisterIo` if any register read fails. Nothing is retried.
    pub fn get_rpm(&mut self) -> Result<RpmReading> {
        let high = self.read(Register::TachHigh)?;
        let low = self.read(Register::TachLow)?;
        let count = tach_count(high, low);

        let Some(candidate) = rpm_from_tach(count) else {
            debug!("Tach count is zero, speed undefined");
            return Ok(RpmReading::Undefined);
        };

        debug!(
            "Tach 0x{:02X}/0x{:02X} -> count {} -> {} RPM",
            high, low, count, candidate
        );
        classify_rpm(candidate, || self.get_duty_cycle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, MockChip, MockConnection};
    use cm4fan_core::{BusIndex, Cm4FanError};

    fn controller_with(chip: MockChip) -> FanController<MockConnection> {
        let bus = MockBus::new().with_chip(BusIndex(0), chip);
        FanController::open(&bus).unwrap()
    }

    #[test]
    fn test_tach_count_bit_layout() {
        assert_eq!(tach_count(0x01, 0x00), 32);
        assert_eq!(tach_count(0x00, 0x08), 1);
        // Low 3 bits of the low byte are ignored
        assert_eq!(tach_count(0x00, 0x07), 0);
        assert_eq!(tach_count(0xFF, 0xFF), 0x1FFF);
        assert_eq!(tach_count(0xF5, 0x48), 7849);
    }

    #[test]
    fn test_rpm_from_tach() {
        assert_eq!(rpm_from_tach(0), None);
        assert_eq!(rpm_from_tach(1), Some(3_932_160));
        assert_eq!(rpm_from_tach(32), Some(122_880));
        assert_eq!(rpm_from_tach(0x1FFF), Some(480));
    }

    #[test]
    fn test_classify_trusted_skips_duty_read() {
        let reading = classify_rpm(1200, || panic!("duty cycle must not be read")).unwrap();
        assert_eq!(reading, RpmReading::Measured { rpm: 1200 });

        let reading = classify_rpm(501, || panic!("duty cycle must not be read")).unwrap();
        assert_eq!(reading, RpmReading::Measured { rpm: 501 });
    }

    #[test]
    fn test_classify_slow_reading() {
        let stopped = classify_rpm(400, || Ok(DutyCycle::OFF)).unwrap();
        assert_eq!(stopped, RpmReading::Stopped);

        let undefined = classify_rpm(400, || DutyCycle::new(20)).unwrap();
        assert_eq!(undefined, RpmReading::Undefined);

        // The threshold itself is not trusted
        let boundary = classify_rpm(500, || DutyCycle::new(20)).unwrap();
        assert_eq!(boundary, RpmReading::Undefined);
    }

    #[test]
    fn test_classify_propagates_duty_error() {
        let result = classify_rpm(400, || Err(Cm4FanError::read_failed(0x30, "nack")));
        assert!(matches!(result, Err(Cm4FanError::RegisterIo { .. })));
    }

    #[test]
    fn test_get_rpm_measured() {
        let mut controller = controller_with(MockChip::emc2301().with_tach(0x01, 0x00));
        assert_eq!(
            controller.get_rpm().unwrap(),
            RpmReading::Measured { rpm: 122_880 }
        );
    }

    #[test]
    fn test_get_rpm_threshold_boundary() {
        // count 7848 -> 501 RPM
        let mut controller = controller_with(MockChip::emc2301().with_tach(0xF5, 0x40));
        assert_eq!(
            controller.get_rpm().unwrap(),
            RpmReading::Measured { rpm: 501 }
        );

        // count 7849 -> 500 RPM, fan driven
        let chip = MockChip::emc2301()
            .with_tach(0xF5, 0x48)
            .with_register(0x30, 51);
        let mut controller = controller_with(chip);
        assert_eq!(controller.get_rpm().unwrap(), RpmReading::Undefined);
    }

    #[test]
    fn test_get_rpm_stopped() {
        // Full-scale count is 480 RPM, fan commanded off
        let chip = MockChip::emc2301()
            .with_tach(0xFF, 0xF8)
            .with_register(0x30, 0);
        let mut controller = controller_with(chip);
        assert_eq!(controller.get_rpm().unwrap(), RpmReading::Stopped);
    }

    #[test]
    fn test_get_rpm_undefined() {
        let chip = MockChip::emc2301()
            .with_tach(0xFF, 0xF8)
            .with_register(0x30, 51);
        let mut controller = controller_with(chip);
        assert_eq!(controller.get_rpm().unwrap(), RpmReading::Undefined);
    }

    #[test]
    fn test_get_rpm_drive_rounding_to_zero_is_stopped() {
        // Register value 1 reads back as 0%
        let chip = MockChip::emc2301()
            .with_tach(0xFF, 0xF8)
            .with_register(0x30, 1);
        let mut controller = controller_with(chip);
        assert_eq!(controller.get_rpm().unwrap(), RpmReading::Stopped);
    }

    #[test]
    fn test_get_rpm_zero_count_is_undefined() {
        // The drive register would fail if it were consulted
        let chip = MockChip::emc2301().with_tach(0x00, 0x07).failing_read(0x30);
        let mut controller = controller_with(chip);
        assert_eq!(controller.get_rpm().unwrap(), RpmReading::Undefined);
    }

    #[test]
    fn test_get_rpm_tach_read_failures() {
        let mut controller = controller_with(MockChip::emc2301().failing_read(0x3E));
        assert!(matches!(
            controller.get_rpm(),
            Err(Cm4FanError::RegisterIo { register: 0x3E, .. })
        ));

        let mut controller = controller_with(MockChip::emc2301().failing_read(0x3F));
        assert!(matches!(
            controller.get_rpm(),
            Err(Cm4FanError::RegisterIo { register: 0x3F, .. })
        ));
    }

    #[test]
    fn test_get_rpm_duty_read_failure() {
        let chip = MockChip::emc2301()
            .with_tach(0xFF, 0xF8)
            .failing_read(0x30);
        let mut controller = controller_with(chip);
        assert!(matches!(
            controller.get_rpm(),
            Err(Cm4FanError::RegisterIo { register: 0x30, .. })
        ));
    }

    #[test]
    fn test_get_rpm_follows_simulated_fan() {
        let chip = MockChip::emc2301().with_simulated_fan(4000);
        let bus = MockBus::new().with_chip(BusIndex(0), chip);
        let mut controller = FanController::open(&bus).unwrap();

        assert_eq!(controller.get_rpm().unwrap(), RpmReading::Stopped);

        controller.set_duty_cycle(100).unwrap();
        assert_eq!(
            controller.get_rpm().unwrap(),
            RpmReading::Measured { rpm: 4000 }
        );
    }
}
