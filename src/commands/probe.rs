//! Probe command implementation

use crate::error::CliError;
use qflash_core::profile::{DeviceProfile, ProfileFlags};
use std::path::Path;

/// Display the resolved profile, optionally saving it as a RON file
pub fn run_probe(profile: &DeviceProfile, output: Option<&Path>) -> Result<(), CliError> {
    let source = if profile.flags.contains(ProfileFlags::DISCOVERED) {
        "discovered"
    } else {
        "static"
    };
    println!("Profile ({})", source);
    println!("  Total size:  {} bytes", profile.total_size);
    println!("  Erase block: {} bytes", profile.erase_size);
    println!("  Page size:   {} bytes", profile.page_size);
    println!("  Max clock:   {} Hz", profile.max_clock_hz);
    println!(
        "  Opcodes:     read 0x{:02X}, program 0x{:02X}, erase 0x{:02X}",
        profile.opcodes.read, profile.opcodes.page_program, profile.opcodes.erase
    );
    println!("  Busy bit:    {}", profile.busy_bit);
    if profile.flags.contains(ProfileFlags::FOUR_BYTE_ADDR) {
        println!("  Addressing:  4-byte");
    } else {
        println!("  Addressing:  3-byte");
    }

    if let Some(path) = output {
        let ron = ron::ser::to_string_pretty(profile, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, ron)?;
        println!("Profile written to {}", path.display());
    }
    Ok(())
}
