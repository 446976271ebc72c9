//! Verify command implementation

use crate::error::CliError;
use qflash_core::engine::{AddressRange, FlashEngine};
use qflash_core::FlashBus;
use std::path::Path;

/// Compare flash contents against a file
pub fn run_verify<B: FlashBus>(
    engine: &mut FlashEngine<B>,
    input: &Path,
    start: u32,
) -> Result<(), CliError> {
    let expected = std::fs::read(input)?;
    engine.verify(AddressRange::new(start, expected.len() as u32), &expected)?;
    println!(
        "Verify OK: {} bytes at 0x{:08X} match {}",
        expected.len(),
        start,
        input.display()
    );
    Ok(())
}
