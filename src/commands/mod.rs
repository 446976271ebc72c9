//! CLI command implementations
//!
//! Each command drives a [`FlashEngine`](qflash_core::engine::FlashEngine)
//! over whatever bus main.rs opened. Commands split their work into
//! block- or page-sized engine calls so progress can be reported while the
//! engine keeps per-call validation and busy handling.

mod erase;
mod probe;
mod read;
mod verify;
mod write;

pub use erase::run_erase;
pub use probe::run_probe;
pub use read::run_read;
pub use verify::run_verify;
pub use write::run_write;

use crate::error::CliError;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over a byte count
fn byte_progress(total: u64, msg: &'static str) -> Result<ProgressBar, CliError> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("=>-"),
    );
    pb.set_message(msg);
    Ok(pb)
}
