//! cm4fan CLI Library
//!
//! This library provides the core functionality for the `cm4fanctl` tool.
//!
//! # Public API
//!
//! Configuration types are available via [`config::CliConfig`] and
//! [`config::ConfigBuilder`]. Device access lives in the `cm4fan-hardware`
//! crate.
//!
//! ```no_run
//! use cm4fanctl::config::{default_config_path, CliConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = CliConfig::builder()
//!     .with_env_overrides()
//!     .with_config_file(&default_config_path())?
//!     .build()?;
//!
//! println!("Device address: 0x{:02X}", config.device_address);
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;
