//! End-to-end driver tests against the in-memory bus
//!
//! Each test builds a bus topology, binds a controller through the public
//! API, and checks both the results and the connection bookkeeping.

use cm4fan_core::{BusIndex, Cm4FanError, RpmReading};
use cm4fan_hardware::{locate, FanController, MockBus, MockChip, RegisterBus};

/// A topology with the device on bus 3 and noise everywhere else
fn noisy_topology() -> MockBus {
    MockBus::new()
        .with_chip(BusIndex(0), MockChip::blank().failing_read(0xFD))
        .with_chip(BusIndex(1), MockChip::blank().failing_read(0xFD))
        .with_chip(BusIndex(2), MockChip::emc2301())
        .failing_open(BusIndex(2))
        .with_chip(BusIndex(3), MockChip::emc2301())
        .with_chip(BusIndex(4), MockChip::emc2301())
}

#[test]
fn test_locate_returns_matching_bus() {
    let bus = noisy_topology();
    assert_eq!(locate(&bus).unwrap(), BusIndex(3));
    assert_eq!(bus.open_connections(), 0);
}

#[test]
fn test_open_without_device_is_not_found() {
    let bus = MockBus::new();
    let result = FanController::open(&bus);
    assert!(matches!(result, Err(Cm4FanError::DeviceNotFound { .. })));
}

#[test]
fn test_open_with_only_failing_probes_is_not_found() {
    let mut bus = MockBus::new();
    for index in 0..=10 {
        bus = bus.with_chip(BusIndex(index), MockChip::emc2301().failing_read(0xFD));
    }

    let result = FanController::open(&bus);

    assert!(matches!(result, Err(Cm4FanError::DeviceNotFound { .. })));
    assert_eq!(bus.open_count(), 11);
    assert_eq!(bus.close_count(), 11);
}

#[test]
fn test_open_config_write_failure_releases_connection() {
    let chip = MockChip::emc2301().failing_write(0x32);
    let bus = MockBus::new().with_chip(BusIndex(3), chip);

    let result = FanController::open(&bus);

    assert!(matches!(
        result,
        Err(Cm4FanError::RegisterIo { register: 0x32, .. })
    ));
    // Probe connection plus the bind connection, both released
    assert_eq!(bus.open_count(), 2);
    assert_eq!(bus.close_count(), 2);
    assert_eq!(bus.open_connections(), 0);
}

#[test]
fn test_bind_checks_identity_after_probe() {
    // The probe only needs a readable id; the value is checked at bind time
    let bus = MockBus::new().with_chip(BusIndex(5), MockChip::emc2301());
    assert_eq!(locate(&bus).unwrap(), BusIndex(5));

    let conn = bus.open(BusIndex(5)).unwrap();
    bus.set_register(BusIndex(5), 0xFD, 0x12);

    let result = FanController::bind(conn);

    assert!(matches!(
        result,
        Err(Cm4FanError::IdentityMismatch { found: 0x12, .. })
    ));
    assert_eq!(bus.open_connections(), 0);
}

#[test]
fn test_full_session() {
    let chip = MockChip::emc2301().with_simulated_fan(5000);
    let bus = MockBus::new().with_chip(BusIndex(1), chip);

    let mut controller = FanController::open(&bus).unwrap();
    assert_eq!(controller.bus_index(), BusIndex(1));

    assert_eq!(controller.get_duty_cycle().unwrap().percent(), 0);
    assert_eq!(controller.get_rpm().unwrap(), RpmReading::Stopped);

    controller.set_duty_cycle(60).unwrap();
    assert_eq!(controller.get_duty_cycle().unwrap().percent(), 60);
    match controller.get_rpm().unwrap() {
        RpmReading::Measured { rpm } => assert!((2990..=3010).contains(&rpm), "rpm {}", rpm),
        other => panic!("expected a measurement, got {:?}", other),
    }

    let status = controller.status().unwrap();
    assert_eq!(status.duty_cycle.percent(), 60);

    controller.close();
    assert_eq!(bus.open_connections(), 0);
    assert_eq!(bus.open_count(), bus.close_count());
}

#[test]
fn test_each_call_rereads_hardware() {
    let chip = MockChip::emc2301().with_tach(0x01, 0x00);
    let bus = MockBus::new().with_chip(BusIndex(0), chip);
    let mut controller = FanController::open(&bus).unwrap();

    assert_eq!(
        controller.get_rpm().unwrap(),
        RpmReading::Measured { rpm: 122_880 }
    );

    // count 64 -> 61440 RPM
    bus.set_register(BusIndex(0), 0x3E, 0x02);
    assert_eq!(
        controller.get_rpm().unwrap(),
        RpmReading::Measured { rpm: 61_440 }
    );

    bus.set_register(BusIndex(0), 0x30, 0xFF);
    assert_eq!(controller.get_duty_cycle().unwrap().percent(), 100);
}
