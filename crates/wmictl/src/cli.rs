//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap. Keeps argument parsing separate
//! from execution logic.

use clap::{Parser, Subcommand};
use wmi_common::OutputFormat;

/// wmictl - query Windows management data (WMI) from the command line
#[derive(Parser)]
#[command(name = "wmictl")]
#[command(about = "Windows Management Instrumentation (WMI) CLI", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show OS, hardware and BIOS details
    SystemInfo {
        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// List Windows services
    Services {
        /// Filter by name (case-insensitive substring)
        #[arg(long)]
        name: Option<String>,

        /// Filter by state (Running, Stopped, ...)
        #[arg(long)]
        state: Option<String>,

        /// Filter by start mode (Auto, Manual, ...)
        #[arg(long)]
        start_mode: Option<String>,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// List running processes
    Processes {
        /// Filter by name (case-insensitive substring)
        #[arg(long)]
        name: Option<String>,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// List logical disk drives
    Disks {
        /// Filter by drive type (3=Local, 4=Network, 5=CD-ROM)
        #[arg(long)]
        drive_type: Option<i64>,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// Show IP-enabled network adapter configuration
    Network {
        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// List available WMI classes
    ListClasses {
        /// Filter class names (case-insensitive substring)
        #[arg(long)]
        filter_text: Option<String>,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// Show instances of a WMI class
    ClassInfo {
        /// WMI class name (e.g. Win32_BIOS)
        class_name: String,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// Execute a raw WQL query (SELECT only)
    Query {
        /// WQL query text
        wql: String,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// Read Windows event log entries (requires administrator rights)
    Events {
        /// Log name (System, Application, Security)
        #[arg(long, default_value = "System")]
        log_name: String,

        /// Filter by type (1=Error, 2=Warning, 3=Information)
        #[arg(long)]
        event_type: Option<i64>,

        /// Maximum number of entries
        #[arg(long, default_value_t = 100)]
        limit: i64,

        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// Show memory usage
    MemoryInfo {
        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// Show system uptime since last boot
    Uptime {
        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },

    /// Check whether this process has administrator privileges
    AdminCheck {
        /// Output format: table or json
        #[arg(long, default_value = "table")]
        output_format: OutputFormat,
    },
}
