//! qflash - serial flash diagnostic tool
//!
//! Drives the qflash-core resolver and operation engine against an
//! emulated device (qflash-mem), optionally backed by an image file so
//! contents persist across invocations. The device profile comes from
//! auto-discovery by default, or from a RON profile file.

mod cli;
mod commands;
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use error::CliError;
use qflash_core::engine::FlashEngine;
use qflash_core::profile::DeviceProfile;
use qflash_core::resolver::{self, ProfileSource};
use qflash_mem::{MemFlash, MemFlashConfig};
use std::path::Path;

fn main() {
    let cli = Cli::parse();

    // The filter must be in place before the logger is built, or the
    // verbosity flags select records env_logger has already rejected
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity_filter(cli.verbose)),
    )
    .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Map -v occurrences to an env_logger filter string
fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut bus = open_device(cli.image.as_deref())?;

    let source = match cli.profile.as_deref() {
        Some(path) => ProfileSource::Static(load_profile(path)?),
        None => ProfileSource::Discover,
    };
    let profile = resolver::resolve(&mut bus, source)?;
    let mut engine = FlashEngine::new(bus, profile);

    let mutates = matches!(cli.command, Commands::Write { .. } | Commands::Erase { .. });

    match cli.command {
        Commands::Probe { output } => commands::run_probe(engine.profile(), output.as_deref())?,
        Commands::Read {
            output,
            start,
            length,
        } => commands::run_read(&mut engine, &output, start, length)?,
        Commands::Write {
            input,
            start,
            no_erase,
            no_verify,
        } => commands::run_write(&mut engine, &input, start, no_erase, !no_verify)?,
        Commands::Erase { start, length } => commands::run_erase(&mut engine, start, length)?,
        Commands::Verify { input, start } => commands::run_verify(&mut engine, &input, start)?,
    }

    if mutates {
        if let Some(path) = cli.image.as_deref() {
            engine.into_bus().save_image(path)?;
            log::debug!("image written back to {}", path.display());
        }
    }
    Ok(())
}

/// Open the emulated device, seeded from the image file when one exists
fn open_device(image: Option<&Path>) -> Result<MemFlash, CliError> {
    let config = MemFlashConfig::default();
    match image {
        Some(path) if path.exists() => {
            log::info!("loading device image from {}", path.display());
            Ok(MemFlash::from_image(config, path)?)
        }
        Some(path) => {
            log::info!("no image at {}, starting erased", path.display());
            Ok(MemFlash::new(config))
        }
        None => Ok(MemFlash::new(config)),
    }
}

/// Load a static device profile from a RON file
fn load_profile(path: &Path) -> Result<DeviceProfile, CliError> {
    let text = std::fs::read_to_string(path)?;
    Ok(ron::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflash_core::profile::{OpcodeSet, ProfileFlags};
    use qflash_core::spi::opcodes;

    #[test]
    fn profile_round_trips_through_ron() {
        let profile = DeviceProfile {
            total_size: 16 * 1024 * 1024,
            erase_size: 64 * 1024,
            page_size: 256,
            opcodes: OpcodeSet::jedec_3byte(opcodes::BE_D8),
            busy_bit: opcodes::SR1_WIP_BIT,
            max_clock_hz: 100_000_000,
            flags: ProfileFlags::ERASE_4K | ProfileFlags::FOUR_BYTE_ADDR,
        };
        let text = ron::ser::to_string_pretty(&profile, ron::ser::PrettyConfig::default()).unwrap();
        let parsed: DeviceProfile = ron::from_str(&text).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn verbosity_maps_to_filter_levels() {
        assert_eq!(verbosity_filter(0), "info");
        assert_eq!(verbosity_filter(1), "debug");
        assert_eq!(verbosity_filter(3), "trace");
    }
}
