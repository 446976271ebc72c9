//! Self-describing parameter table discovery
//!
//! Implements the JESD216-style discovery flow: a signature-checked header
//! at offset 0 of a dedicated address space, parameter headers pointing at
//! capability tables, and a basic parameter table carrying geometry. The
//! resolver uses this to build a [`DeviceProfile`](crate::profile::DeviceProfile)
//! without any per-part static data.
//!
//! # Usage
//!
//! ```ignore
//! use qflash_core::{bus::FlashBus, sfdp};
//!
//! fn discover<B: FlashBus>(bus: &mut B) {
//!     match sfdp::probe(bus) {
//!         Ok(info) => {
//!             let _ = info.basic.density_bytes;
//!             let _ = info.basic.page_size;
//!         }
//!         Err(_) => {}
//!     }
//! }
//! ```

mod parser;
mod types;

pub use parser::*;
pub use types::*;
