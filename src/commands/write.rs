//! Write command implementation

use crate::commands::{byte_progress, erase::erase_with_progress};
use crate::error::CliError;
use qflash_core::engine::{AddressRange, FlashEngine};
use qflash_core::error::OperationError;
use qflash_core::FlashBus;
use std::path::Path;

/// Write a file to flash, optionally erasing first and verifying after
pub fn run_write<B: FlashBus>(
    engine: &mut FlashEngine<B>,
    input: &Path,
    start: u32,
    no_erase: bool,
    verify: bool,
) -> Result<(), CliError> {
    let data = std::fs::read(input)?;
    let length = data.len() as u32;
    let profile = *engine.profile();

    if !profile.is_valid_range(start, data.len()) {
        return Err(OperationError::RangeOutOfBounds.into());
    }

    if !no_erase {
        // Erase the covering block-aligned region; bytes inside it but
        // outside the payload are lost
        let block = profile.erase_size;
        let erase_start = start - start % block;
        let erase_end = (start + length).div_ceil(block) * block;
        if erase_start != start || erase_end != start + length {
            log::warn!(
                "erasing 0x{:08X}..0x{:08X} to cover unaligned write",
                erase_start,
                erase_end
            );
        }
        erase_with_progress(engine, erase_start, erase_end - erase_start)?;
    }

    program_with_progress(engine, start, &data)?;
    println!("Wrote {} bytes at 0x{:08X}", length, start);

    if verify {
        engine.verify(AddressRange::new(start, length), &data)?;
        println!("Verify OK");
    }
    Ok(())
}

/// Program page by page so progress can be shown
fn program_with_progress<B: FlashBus>(
    engine: &mut FlashEngine<B>,
    start: u32,
    data: &[u8],
) -> Result<(), CliError> {
    let page = engine.profile().page_size as usize;
    let pb = byte_progress(data.len() as u64, "Writing")?;

    let mut done: usize = 0;
    while done < data.len() {
        let addr = start + done as u32;
        let to_page_end = page - (addr as usize % page);
        let chunk = (data.len() - done).min(to_page_end);
        engine.program(
            AddressRange::new(addr, chunk as u32),
            &data[done..done + chunk],
        )?;
        done += chunk;
        pb.set_position(done as u64);
    }
    pb.finish();
    Ok(())
}
