//! Erase command implementation

use crate::commands::byte_progress;
use crate::error::CliError;
use qflash_core::engine::{AddressRange, FlashEngine};
use qflash_core::error::OperationError;
use qflash_core::FlashBus;

/// Erase a block-aligned range, or the whole device when no range is given
pub fn run_erase<B: FlashBus>(
    engine: &mut FlashEngine<B>,
    start: Option<u32>,
    length: Option<u32>,
) -> Result<(), CliError> {
    let (start, length) = match (start, length) {
        (Some(start), Some(length)) => (start, length),
        (None, None) => (0, engine.profile().total_size),
        _ => {
            return Err(CliError::Usage(
                "both --start and --length must be given for a partial erase".into(),
            ))
        }
    };

    erase_with_progress(engine, start, length)?;
    println!("Erased {} bytes starting at 0x{:08X}", length, start);
    Ok(())
}

/// Erase block by block so progress can be shown
pub fn erase_with_progress<B: FlashBus>(
    engine: &mut FlashEngine<B>,
    start: u32,
    length: u32,
) -> Result<(), CliError> {
    // Check the whole range up front so the bar never appears for a
    // request the engine would reject mid-way
    let profile = *engine.profile();
    if !profile.is_erase_aligned(start, length) {
        return Err(OperationError::UnalignedRange.into());
    }
    if !profile.is_valid_range(start, length as usize) {
        return Err(OperationError::RangeOutOfBounds.into());
    }

    let block = profile.erase_size;
    let pb = byte_progress(u64::from(length), "Erasing")?;

    let mut done: u32 = 0;
    while done < length {
        engine.erase(AddressRange::new(start + done, block))?;
        done += block;
        pb.set_position(u64::from(done.min(length)));
    }
    pb.finish();
    Ok(())
}
