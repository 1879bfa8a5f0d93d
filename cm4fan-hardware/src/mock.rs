//! In-memory register bus
//!
//! Simulates EMC2301 chips sitting on numbered buses. Used by the test
//! suites and by the CLI's `--mock` mode. Failures can be injected per bus
//! and per register, and every open and close is counted so tests can
//! verify that connections are released on all paths.

use crate::bus::{BusConnection, RegisterBus};
use cm4fan_core::{BusIndex, Cm4FanError, Emc2301, Register, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Register file of one simulated chip
#[derive(Debug, Clone, Default)]
pub struct MockChip {
    registers: HashMap<u8, u8>,
    failing_reads: HashSet<u8>,
    failing_writes: HashSet<u8>,
    fan_max_rpm: Option<u32>,
}

impl MockChip {
    /// A chip whose registers all read 0
    pub fn blank() -> Self {
        Self::default()
    }

    /// A freshly powered EMC2301: correct product id, range bits set, fan off
    pub fn emc2301() -> Self {
        Self::blank()
            .with_register(Register::ProductId.addr(), Emc2301::PRODUCT_ID)
            .with_register(Register::FanConfig.addr(), 0x2B)
            .with_register(Register::FanDrive.addr(), 0x00)
            .with_register(Register::TachHigh.addr(), 0xFF)
            .with_register(Register::TachLow.addr(), 0xF8)
    }

    /// Preset a register value
    pub fn with_register(mut self, register: u8, value: u8) -> Self {
        self.registers.insert(register, value);
        self
    }

    /// Preset the two tach registers
    pub fn with_tach(self, high: u8, low: u8) -> Self {
        self.with_register(Register::TachHigh.addr(), high)
            .with_register(Register::TachLow.addr(), low)
    }

    /// Make every read of `register` fail
    pub fn failing_read(mut self, register: u8) -> Self {
        self.failing_reads.insert(register);
        self
    }

    /// Make every write of `register` fail
    pub fn failing_write(mut self, register: u8) -> Self {
        self.failing_writes.insert(register);
        self
    }

    /// Keep the tach registers consistent with the drive setting
    ///
    /// Speed scales linearly with the drive register up to `max_rpm`.
    pub fn with_simulated_fan(mut self, max_rpm: u32) -> Self {
        self.fan_max_rpm = Some(max_rpm);
        let drive = self.register(Register::FanDrive.addr());
        self.update_tach(drive);
        self
    }

    /// Current value of a register (0 if never written)
    pub fn register(&self, register: u8) -> u8 {
        self.registers.get(&register).copied().unwrap_or(0)
    }

    fn update_tach(&mut self, drive: u8) {
        let Some(max_rpm) = self.fan_max_rpm else {
            return;
        };

        let rpm = max_rpm * u32::from(drive) / 255;
        let count = if rpm == 0 {
            Emc2301::MAX_TACH_COUNT
        } else {
            (Emc2301::TACH_TO_RPM / rpm).clamp(1, u32::from(Emc2301::MAX_TACH_COUNT)) as u16
        };

        self.registers
            .insert(Register::TachHigh.addr(), (count >> 5) as u8);
        self.registers
            .insert(Register::TachLow.addr(), ((count & 0x1F) << 3) as u8);
    }
}

#[derive(Debug, Default)]
struct MockState {
    chips: HashMap<BusIndex, MockChip>,
    failing_opens: HashSet<BusIndex>,
    open_budgets: HashMap<BusIndex, usize>,
    opens_per_bus: HashMap<BusIndex, usize>,
    opens: usize,
    closes: usize,
    open_now: usize,
    peak_open: usize,
    writes: Vec<(BusIndex, u8, u8)>,
}

/// Simulated register bus shared between a test and the code under test
///
/// Clones share state, so a test can keep one handle for inspection while
/// the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    /// An empty bus topology: every open fails
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a chip on a bus
    pub fn with_chip(self, bus: BusIndex, chip: MockChip) -> Self {
        self.lock().chips.insert(bus, chip);
        self
    }

    /// Make opening `bus` fail even if a chip is present
    pub fn failing_open(self, bus: BusIndex) -> Self {
        self.lock().failing_opens.insert(bus);
        self
    }

    /// Let the first `successes` opens of `bus` succeed and fail the rest
    pub fn failing_open_after(self, bus: BusIndex, successes: usize) -> Self {
        self.lock().open_budgets.insert(bus, successes);
        self
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.lock().opens
    }

    /// Number of connections released so far
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Connections currently open
    pub fn open_connections(&self) -> usize {
        self.lock().open_now
    }

    /// Largest number of connections that were open at the same time
    pub fn peak_open_connections(&self) -> usize {
        self.lock().peak_open
    }

    /// Every successful write in order, as `(bus, register, value)`
    pub fn writes(&self) -> Vec<(BusIndex, u8, u8)> {
        self.lock().writes.clone()
    }

    /// Current value of a register on a bus, if a chip is present
    pub fn register(&self, bus: BusIndex, register: u8) -> Option<u8> {
        self.lock()
            .chips
            .get(&bus)
            .map(|chip| chip.register(register))
    }

    /// Overwrite a register value behind the driver's back
    pub fn set_register(&self, bus: BusIndex, register: u8, value: u8) {
        if let Some(chip) = self.lock().chips.get_mut(&bus) {
            chip.registers.insert(register, value);
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegisterBus for MockBus {
    type Connection = MockConnection;

    fn open(&self, bus: BusIndex) -> Result<MockConnection> {
        let mut state = self.lock();

        let opened_before = state.opens_per_bus.get(&bus).copied().unwrap_or(0);
        let budget_spent = state
            .open_budgets
            .get(&bus)
            .is_some_and(|&budget| opened_before >= budget);

        let unavailable = state.failing_opens.contains(&bus) || !state.chips.contains_key(&bus);
        if budget_spent || unavailable {
            return Err(Cm4FanError::BusOpen {
                bus: bus.index(),
                reason: "No such file or directory".to_string(),
            });
        }

        state.opens += 1;
        *state.opens_per_bus.entry(bus).or_default() += 1;
        state.open_now += 1;
        state.peak_open = state.peak_open.max(state.open_now);
        trace!("Mock open bus {} ({} open)", bus, state.open_now);

        Ok(MockConnection {
            bus,
            state: Arc::clone(&self.state),
        })
    }
}

/// Connection handed out by `MockBus`
#[derive(Debug)]
pub struct MockConnection {
    bus: BusIndex,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BusConnection for MockConnection {
    fn bus_index(&self) -> BusIndex {
        self.bus
    }

    fn read_register(&mut self, register: u8) -> Result<u8> {
        let bus = self.bus;
        let state = self.lock();
        let chip = state
            .chips
            .get(&bus)
            .ok_or_else(|| Cm4FanError::read_failed(register, "No such device"))?;

        if chip.failing_reads.contains(&register) {
            return Err(Cm4FanError::read_failed(register, "Remote I/O error"));
        }

        Ok(chip.register(register))
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        let bus = self.bus;
        let mut state = self.lock();
        let chip = state
            .chips
            .get_mut(&bus)
            .ok_or_else(|| Cm4FanError::write_failed(register, "No such device"))?;

        if chip.failing_writes.contains(&register) {
            return Err(Cm4FanError::write_failed(register, "Remote I/O error"));
        }

        chip.registers.insert(register, value);
        if register == Register::FanDrive.addr() {
            chip.update_tach(value);
        }
        state.writes.push((bus, register, value));

        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        let bus = self.bus;
        let mut state = self.lock();
        state.closes += 1;
        state.open_now = state.open_now.saturating_sub(1);
        trace!("Mock close bus {} ({} open)", bus, state.open_now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_without_chip_fails() {
        let bus = MockBus::new();
        let result = bus.open(BusIndex(0));
        assert!(matches!(result, Err(Cm4FanError::BusOpen { bus: 0, .. })));
        assert_eq!(bus.open_count(), 0);
    }

    #[test]
    fn test_open_close_counters() {
        let bus = MockBus::new().with_chip(BusIndex(2), MockChip::emc2301());

        let first = bus.open(BusIndex(2)).unwrap();
        let second = bus.open(BusIndex(2)).unwrap();
        assert_eq!(bus.open_connections(), 2);
        drop(first);
        drop(second);

        assert_eq!(bus.open_count(), 2);
        assert_eq!(bus.close_count(), 2);
        assert_eq!(bus.open_connections(), 0);
        assert_eq!(bus.peak_open_connections(), 2);
    }

    #[test]
    fn test_failing_open() {
        let bus = MockBus::new()
            .with_chip(BusIndex(1), MockChip::emc2301())
            .failing_open(BusIndex(1));
        assert!(bus.open(BusIndex(1)).is_err());
    }

    #[test]
    fn test_failing_open_after() {
        let bus = MockBus::new()
            .with_chip(BusIndex(1), MockChip::emc2301())
            .with_chip(BusIndex(2), MockChip::emc2301())
            .failing_open_after(BusIndex(1), 1);

        drop(bus.open(BusIndex(1)).unwrap());
        assert!(matches!(
            bus.open(BusIndex(1)),
            Err(Cm4FanError::BusOpen { bus: 1, .. })
        ));
        // Other buses are unaffected
        assert!(bus.open(BusIndex(2)).is_ok());
        assert_eq!(bus.open_count(), 2);
    }

    #[test]
    fn test_read_write_registers() {
        let bus = MockBus::new().with_chip(BusIndex(0), MockChip::emc2301());
        let mut conn = bus.open(BusIndex(0)).unwrap();

        assert_eq!(conn.read_register(0xFD).unwrap(), 0x37);
        conn.write_register(0x30, 0x80).unwrap();
        assert_eq!(conn.read_register(0x30).unwrap(), 0x80);
        assert_eq!(bus.register(BusIndex(0), 0x30), Some(0x80));
        assert_eq!(bus.writes(), vec![(BusIndex(0), 0x30, 0x80)]);
    }

    #[test]
    fn test_injected_register_failures() {
        let chip = MockChip::emc2301().failing_read(0x3E).failing_write(0x32);
        let bus = MockBus::new().with_chip(BusIndex(0), chip);
        let mut conn = bus.open(BusIndex(0)).unwrap();

        assert!(matches!(
            conn.read_register(0x3E),
            Err(Cm4FanError::RegisterIo { register: 0x3E, .. })
        ));
        assert!(conn.write_register(0x32, 0).is_err());
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_simulated_fan_tracks_drive() {
        let chip = MockChip::emc2301().with_simulated_fan(4000);
        // Fan off reads as full-scale tach count
        assert_eq!(chip.register(0x3E), 0xFF);
        assert_eq!(chip.register(0x3F), 0xF8);

        let bus = MockBus::new().with_chip(BusIndex(0), chip);
        let mut conn = bus.open(BusIndex(0)).unwrap();
        conn.write_register(0x30, 255).unwrap();

        // 4000 RPM -> count 983 -> high 30, low (23 << 3)
        assert_eq!(conn.read_register(0x3E).unwrap(), 30);
        assert_eq!(conn.read_register(0x3F).unwrap(), 23 << 3);
    }
}
