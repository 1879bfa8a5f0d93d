//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};

use crate::config::{parse_address, MAX_WATCH_INTERVAL_MS, MIN_WATCH_INTERVAL_MS};

/// EMC2301 fan controller CLI
#[derive(Parser, Debug)]
#[command(name = "cm4fanctl")]
#[command(version, about = "EMC2301 fan controller CLI", long_about = None)]
pub struct Cli {
    /// Output format (overrides config file)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging (overrides config file)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Don't load config file
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Config file path (default: ~/.config/cm4fan/cli.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// SMBus address of the controller, decimal or 0x hex (default: 0x2F)
    #[arg(short, long, global = true, value_parser = parse_cli_address)]
    pub address: Option<u8>,

    /// Use an in-memory simulated controller instead of /dev/i2c-*
    ///
    /// The simulation starts fresh on every invocation, so settings written
    /// by one command are not seen by the next.
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_cli_address(value: &str) -> Result<u8, String> {
    parse_address(value).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the bus the fan controller sits on
    Locate,

    /// Show bus, duty cycle and fan speed
    Status,

    /// Read or set the fan duty cycle
    Duty {
        #[command(subcommand)]
        command: DutyCommands,
    },

    /// Measure the fan speed
    Rpm,

    /// Print a status line at a fixed interval until interrupted
    Watch {
        /// Sampling interval in milliseconds (overrides config file)
        #[arg(
            short,
            long,
            value_parser = clap::value_parser!(u64).range(MIN_WATCH_INTERVAL_MS..=MAX_WATCH_INTERVAL_MS)
        )]
        interval_ms: Option<u64>,

        /// Stop after this many samples
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },

    /// Show or manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum DutyCommands {
    /// Read the current duty cycle
    Get,

    /// Set the duty cycle
    Set {
        /// Duty cycle percentage (0-100)
        #[arg(allow_negative_numbers = true)]
        percent: i32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Write the default configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file path
    Path,
}
