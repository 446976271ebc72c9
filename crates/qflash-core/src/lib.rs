//! qflash-core - External serial flash access layer
//!
//! Core library for driving QSPI-class serial NOR flash devices through a
//! narrow bus-transaction primitive. It is designed to be `no_std`
//! compatible for use in embedded environments.
//!
//! Two stages make up the layer:
//!
//! - The [`resolver`] produces a validated [`profile::DeviceProfile`],
//!   either from caller-supplied static parameters or by reading the
//!   device's self-describing parameter table ([`sfdp`]).
//! - The [`engine`] executes erase/program/read against that profile,
//!   validating ranges up front, splitting work at page and bus limits,
//!   and polling out the device busy flag.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc` and serde)
//! - `alloc` - Enable heap allocation (boxed bus trait objects)
//!
//! # Example
//!
//! ```ignore
//! use qflash_core::{
//!     bus::FlashBus,
//!     engine::{AddressRange, FlashEngine},
//!     resolver::{self, ProfileSource},
//! };
//!
//! fn setup<B: FlashBus>(mut bus: B) -> Result<FlashEngine<B>, qflash_core::ResolutionError> {
//!     let profile = resolver::resolve(&mut bus, ProfileSource::Discover)?;
//!     Ok(FlashEngine::new(bus, profile))
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod bus;
pub mod engine;
pub mod error;
pub mod profile;
pub mod protocol;
pub mod resolver;
pub mod sfdp;
pub mod spi;

pub use bus::FlashBus;
pub use engine::{AddressRange, FlashEngine, PollConfig, ERASED_VALUE};
pub use error::{BusError, OperationError, ResolutionError};
pub use profile::{DeviceProfile, OpcodeSet, ProfileFlags};
pub use resolver::ProfileSource;
