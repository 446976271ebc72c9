//! Device profile - resolved electrical/protocol parameters
//!
//! A [`DeviceProfile`] is plain data: geometry, the opcode set, and timing
//! limits for one physical memory device. It is produced once at setup,
//! either supplied statically (geometry known at build time) or resolved
//! from the device's self-describing parameter table, and is read-only
//! thereafter.

use bitflags::bitflags;

use crate::error::ResolutionError;
use crate::spi::opcodes;

bitflags! {
    /// Capability flags for a resolved device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "std", serde(transparent))]
    pub struct ProfileFlags: u32 {
        /// Profile was resolved from the device's parameter table
        const DISCOVERED      = 1 << 0;
        /// Device offers a 4 KiB erase in addition to the profile erase size
        const ERASE_4K        = 1 << 1;
        /// Device supports (or requires) 4-byte addressing
        const FOUR_BYTE_ADDR  = 1 << 2;
    }
}

impl Default for ProfileFlags {
    fn default() -> Self {
        ProfileFlags::empty()
    }
}

/// The command opcodes used to drive a device
///
/// Carried as plain data so the engine never hardcodes any single vendor's
/// values. Discovery fills these with JEDEC-standard defaults plus the
/// erase opcode the parameter table declares; static profiles may carry
/// anything the part's datasheet specifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct OpcodeSet {
    /// Read data
    pub read: u8,
    /// Page program
    pub page_program: u8,
    /// Sector/block erase (granularity given by the profile's erase size)
    pub erase: u8,
    /// Read status register
    pub read_status: u8,
    /// Write enable
    pub write_enable: u8,
}

impl OpcodeSet {
    /// JEDEC-standard opcodes with 3-byte addressing and 4 KiB sector erase
    pub const fn jedec_3byte(erase: u8) -> Self {
        Self {
            read: opcodes::READ,
            page_program: opcodes::PP,
            erase,
            read_status: opcodes::RDSR,
            write_enable: opcodes::WREN,
        }
    }

    /// JEDEC-standard native 4-byte-address opcodes
    pub const fn jedec_4byte(erase: u8) -> Self {
        Self {
            read: opcodes::READ_4B,
            page_program: opcodes::PP_4B,
            erase: opcodes::erase_opcode_4b(erase),
            read_status: opcodes::RDSR,
            write_enable: opcodes::WREN,
        }
    }

    fn all_nonzero(&self) -> bool {
        self.read != 0
            && self.page_program != 0
            && self.erase != 0
            && self.read_status != 0
            && self.write_enable != 0
    }
}

/// Resolved parameters for one physical memory device
///
/// Immutable once constructed; owned exclusively by the engine instance
/// bound to the device's chip-select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceProfile {
    /// Total memory size in bytes
    pub total_size: u32,
    /// Erase-block size in bytes
    pub erase_size: u32,
    /// Program-page size in bytes
    pub page_size: u32,
    /// Command opcodes
    pub opcodes: OpcodeSet,
    /// Bit position of the busy/write-in-progress flag in the status register
    pub busy_bit: u8,
    /// Maximum interface clock frequency in Hz
    pub max_clock_hz: u32,
    /// Capability flags
    #[cfg_attr(feature = "std", serde(default))]
    pub flags: ProfileFlags,
}

impl DeviceProfile {
    /// Validate the structural invariants
    ///
    /// Total size must be a whole number of erase blocks, an erase block a
    /// whole number of program pages, all sizes nonzero, all opcodes
    /// nonzero, and the busy bit inside the 8-bit status register.
    pub fn validate(&self) -> Result<(), ResolutionError> {
        let geometry_ok = self.total_size != 0
            && self.erase_size != 0
            && self.page_size != 0
            && self.total_size % self.erase_size == 0
            && self.erase_size % self.page_size == 0;

        if geometry_ok && self.opcodes.all_nonzero() && self.busy_bit < 8 {
            Ok(())
        } else {
            Err(ResolutionError::InvalidStaticProfile)
        }
    }

    /// Check if an address range lies fully inside the device
    pub fn is_valid_range(&self, offset: u32, len: usize) -> bool {
        (offset as u64) + (len as u64) <= self.total_size as u64
    }

    /// Check if an address and length are aligned to the erase-block size
    pub fn is_erase_aligned(&self, offset: u32, len: u32) -> bool {
        offset % self.erase_size == 0 && len % self.erase_size == 0
    }

    /// Check if the device needs 4-byte addressing to reach every byte
    pub fn requires_4byte_addr(&self) -> bool {
        self.total_size > 16 * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_16m() -> DeviceProfile {
        DeviceProfile {
            total_size: 16 * 1024 * 1024,
            erase_size: 64 * 1024,
            page_size: 256,
            opcodes: OpcodeSet::jedec_3byte(opcodes::BE_D8),
            busy_bit: opcodes::SR1_WIP_BIT,
            max_clock_hz: 100_000_000,
            flags: ProfileFlags::empty(),
        }
    }

    #[test]
    fn valid_profile_passes() {
        assert!(profile_16m().validate().is_ok());
    }

    #[test]
    fn erase_size_must_be_multiple_of_page_size() {
        let mut p = profile_16m();
        p.erase_size = 1000; // not a multiple of 256
        assert_eq!(p.validate(), Err(ResolutionError::InvalidStaticProfile));
    }

    #[test]
    fn total_size_must_be_multiple_of_erase_size() {
        let mut p = profile_16m();
        p.total_size = 16 * 1024 * 1024 + 4096;
        assert_eq!(p.validate(), Err(ResolutionError::InvalidStaticProfile));
    }

    #[test]
    fn zero_sizes_rejected() {
        let mut p = profile_16m();
        p.page_size = 0;
        assert_eq!(p.validate(), Err(ResolutionError::InvalidStaticProfile));
    }

    #[test]
    fn zero_opcode_rejected() {
        let mut p = profile_16m();
        p.opcodes.erase = 0;
        assert_eq!(p.validate(), Err(ResolutionError::InvalidStaticProfile));
    }

    #[test]
    fn range_and_alignment_checks() {
        let p = profile_16m();
        assert!(p.is_valid_range(0, 16 * 1024 * 1024));
        assert!(!p.is_valid_range(16 * 1024 * 1024 - 1, 2));
        // Valid start, end past the device
        assert!(!p.is_valid_range(8 * 1024 * 1024, 9 * 1024 * 1024));

        assert!(p.is_erase_aligned(128 * 1024, 64 * 1024));
        assert!(!p.is_erase_aligned(4096, 64 * 1024));
        assert!(!p.is_erase_aligned(64 * 1024, 4096));
    }

    #[test]
    fn four_byte_addressing_threshold() {
        let mut p = profile_16m();
        assert!(!p.requires_4byte_addr());
        p.total_size = 32 * 1024 * 1024;
        assert!(p.requires_4byte_addr());
    }
}
