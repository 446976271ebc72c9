//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "qflash")]
#[command(author, version, about = "Serial flash diagnostic tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Backing image file for the emulated device (volatile if omitted)
    #[arg(long, global = true)]
    pub image: Option<PathBuf>,

    /// Static device profile (RON file); auto-discovery is used if omitted
    #[arg(long, global = true)]
    pub profile: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve and display the device profile
    Probe {
        /// Write the resolved profile to a RON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read flash contents to a file
    Read {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (whole device if omitted)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write a file to flash
    Write {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Don't erase before writing
        #[arg(long)]
        no_erase: bool,

        /// Don't verify after writing
        #[arg(long)]
        no_verify: bool,
    },

    /// Erase a block-aligned range, or the whole device
    Erase {
        /// Start address (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,

        /// Number of bytes to erase
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Compare flash contents against a file
    Verify {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,
    },
}
