//! Read command implementation

use crate::commands::byte_progress;
use crate::error::CliError;
use qflash_core::engine::{AddressRange, FlashEngine};
use qflash_core::FlashBus;
use std::path::Path;

const CHUNK: u32 = 4096;

/// Read a range (or the whole device) into a file
pub fn run_read<B: FlashBus>(
    engine: &mut FlashEngine<B>,
    output: &Path,
    start: u32,
    length: Option<u32>,
) -> Result<(), CliError> {
    let total = engine.profile().total_size;
    let length = match length {
        Some(len) => len,
        None => total.saturating_sub(start),
    };

    let mut data = vec![0u8; length as usize];
    let pb = byte_progress(u64::from(length), "Reading")?;

    let mut done: u32 = 0;
    while done < length {
        let chunk = (length - done).min(CHUNK);
        let range = AddressRange::new(start + done, chunk);
        engine.read(range, &mut data[done as usize..(done + chunk) as usize])?;
        done += chunk;
        pb.set_position(u64::from(done));
    }
    pb.finish();

    std::fs::write(output, &data)?;
    println!(
        "Read {} bytes from 0x{:08X} to {}",
        length,
        start,
        output.display()
    );
    Ok(())
}
