//! Register bus abstraction
//!
//! The driver only needs single-byte register reads and writes on one
//! device. These traits enable testing of `FanController` without real
//! hardware by allowing mock implementations.

use cm4fan_core::{BusIndex, Result};

/// A transport able to open connections to the fan controller by bus index
///
/// The device's slave address is fixed by the transport, so a connection is
/// identified by its bus index alone.
pub trait RegisterBus {
    /// Connection type produced by `open`
    type Connection: BusConnection;

    /// Open a connection on the given bus
    ///
    /// # Errors
    ///
    /// Returns `Cm4FanError::BusOpen` if the bus is unavailable.
    fn open(&self, bus: BusIndex) -> Result<Self::Connection>;
}

/// An open connection to the fan controller
///
/// Dropping the connection releases it. Owners that need to release early
/// drop it explicitly; there is no separate close call to forget.
pub trait BusConnection {
    /// Bus this connection was opened on
    fn bus_index(&self) -> BusIndex;

    /// Read one byte from a register
    ///
    /// # Errors
    ///
    /// Returns `Cm4FanError::RegisterIo` if the transaction fails.
    fn read_register(&mut self, register: u8) -> Result<u8>;

    /// Write one byte to a register
    ///
    /// # Errors
    ///
    /// Returns `Cm4FanError::RegisterIo` if the transaction fails.
    fn write_register(&mut self, register: u8, value: u8) -> Result<()>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &B {
    type Connection = B::Connection;

    fn open(&self, bus: BusIndex) -> Result<Self::Connection> {
        (**self).open(bus)
    }
}

impl<C: BusConnection + ?Sized> BusConnection for Box<C> {
    fn bus_index(&self) -> BusIndex {
        (**self).bus_index()
    }

    fn read_register(&mut self, register: u8) -> Result<u8> {
        (**self).read_register(register)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        (**self).write_register(register, value)
    }
}
