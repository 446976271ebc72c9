//! SPI transaction types
//!
//! This module provides the command descriptor handed to the bus primitive,
//! the address width used for the address phase, and the JEDEC-standard
//! opcode constants used as resolver defaults.

mod address;
mod command;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::BusCommand;
