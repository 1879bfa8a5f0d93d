//! Bus discovery
//!
//! Finds the bus the fan controller sits on by probing the product id
//! register on each candidate bus in turn.

use crate::bus::{BusConnection, RegisterBus};
use cm4fan_core::{BusIndex, Cm4FanError, Register, Result, FIRST_BUS, LAST_BUS};
use tracing::{debug, error};

/// Find the first bus on which the product id register can be read
///
/// Buses `FIRST_BUS..=LAST_BUS` are tried in ascending order. A bus that
/// cannot be opened, or whose probe read fails, is skipped without retry.
/// Each probe connection is released before the next bus is tried.
///
/// Only the read itself is checked here; the product id value is verified
/// when the controller is bound.
///
/// # Errors
///
/// Returns `Cm4FanError::DeviceNotFound` if no candidate bus answers.
pub fn locate<B: RegisterBus>(bus: &B) -> Result<BusIndex> {
    debug!(
        "Scanning buses {}-{} for the fan controller",
        FIRST_BUS, LAST_BUS
    );

    for candidate in BusIndex::candidates() {
        if probe(bus, candidate) {
            debug!("Found fan controller on bus {}", candidate);
            return Ok(candidate);
        }
    }

    error!("Fan controller not found");
    Err(Cm4FanError::DeviceNotFound {
        first: FIRST_BUS,
        last: LAST_BUS,
    })
}

/// Open `candidate`, read the product id register once, and release it
fn probe<B: RegisterBus>(bus: &B, candidate: BusIndex) -> bool {
    let mut conn = match bus.open(candidate) {
        Ok(conn) => conn,
        Err(e) => {
            debug!("Bus {}: skipped ({})", candidate, e);
            return false;
        }
    };

    let result = conn.read_register(Register::ProductId.addr());
    drop(conn);

    match result {
        Ok(id) => {
            debug!("Bus {}: product id 0x{:02X}", candidate, id);
            true
        }
        Err(e) => {
            debug!("Bus {}: probe failed ({})", candidate, e);
            false
        }
    }
}
