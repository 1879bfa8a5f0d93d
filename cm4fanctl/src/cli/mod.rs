//! Command-line front end
//!
//! - [`commands`] - clap definitions for flags and subcommands
//! - [`handlers`] - per-command execution plus the [`run`] dispatcher

mod commands;
mod handlers;

pub use commands::*;
pub use handlers::*;
