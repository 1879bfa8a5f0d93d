//! cm4fan Core Library
//!
//! Shared types, register map, and errors for the EMC2301 fan controller
//! driver. This crate performs no I/O and is used by both the hardware and
//! CLI crates.

pub mod chip;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use chip::*;
pub use error::*;
pub use types::*;
