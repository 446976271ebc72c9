//! Discovery table data structures
//!
//! Wire-format views of the self-describing parameter table (JESD216
//! style): the 8-byte table header, the parameter headers that follow it,
//! and the decoded basic parameter table.

/// Table signature, "SFDP" in little-endian byte order
pub const SFDP_SIGNATURE: u32 = 0x5044_4653;

/// Parameter ID of the basic flash parameter table
pub const PARAM_ID_BASIC: u16 = 0xFF00;

/// Byte offset of the first parameter header
pub const PARAM_HEADER_OFFSET: u32 = 0x08;

/// Minimum basic parameter table length the parser accepts (9 dwords)
pub const BFPT_MIN_LEN: usize = 36;

/// Revision of a table or parameter header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SfdpRevision {
    /// Major revision number
    pub major: u8,
    /// Minor revision number
    pub minor: u8,
}

/// The 8-byte header at offset 0 of the discovery address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfdpHeader {
    /// Table revision
    pub revision: SfdpRevision,
    /// Number of parameter headers present
    pub num_param_headers: u8,
}

/// One 8-byte parameter header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterHeader {
    /// Parameter table ID (MSB:LSB)
    pub id: u16,
    /// Parameter table revision
    pub revision: SfdpRevision,
    /// Table length in dwords
    pub length_dwords: u8,
    /// Byte address of the table in the discovery address space
    pub pointer: u32,
}

impl ParameterHeader {
    /// Table length in bytes
    pub fn length_bytes(&self) -> usize {
        self.length_dwords as usize * 4
    }
}

/// One erase type advertised by the basic parameter table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfdpEraseType {
    /// Erase granularity in bytes
    pub size: u32,
    /// Erase opcode
    pub opcode: u8,
}

impl SfdpEraseType {
    /// Decode a (size-exponent, opcode) pair; a zero exponent marks an
    /// unused slot
    pub fn from_raw(size_exp: u8, opcode: u8) -> Option<Self> {
        if size_exp == 0 || size_exp >= 32 || opcode == 0 {
            return None;
        }
        Some(Self {
            size: 1u32 << size_exp,
            opcode,
        })
    }
}

/// Addressing modes a device can advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// 3-byte addressing only
    ThreeOnly,
    /// 3-byte default, 4-byte selectable
    ThreeOrFour,
    /// 4-byte addressing only
    FourOnly,
}

/// Decoded basic flash parameter table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicFlashParams {
    /// Total device size in bytes
    pub density_bytes: u32,
    /// Program-page size in bytes
    pub page_size: u32,
    /// Advertised erase types (unused slots are `None`)
    pub erase_types: [Option<SfdpEraseType>; 4],
    /// Supported addressing modes
    pub address_mode: AddressMode,
    /// Uniform 4 KiB erase opcode, if the device supports one
    pub erase_4k_opcode: Option<u8>,
}

impl BasicFlashParams {
    /// The smallest advertised erase type
    ///
    /// When several granularities are available the finest one wins, since
    /// it can compose any coarser-aligned range.
    pub fn smallest_erase(&self) -> Option<SfdpEraseType> {
        self.erase_types
            .iter()
            .flatten()
            .copied()
            .min_by_key(|e| e.size)
    }
}
