//! Discovery table parser
//!
//! Reads the parameter table over the bus and decodes it into a
//! [`DeviceProfile`]. The parser only understands major revision 1 tables
//! and ignores parameter tables other than the basic one.

use crate::bus::FlashBus;
use crate::error::ResolutionError;
use crate::profile::{DeviceProfile, OpcodeSet, ProfileFlags};
use crate::protocol;
use crate::spi::opcodes;

use super::types::{
    AddressMode, BasicFlashParams, ParameterHeader, SfdpEraseType, SfdpHeader, SfdpRevision,
    BFPT_MIN_LEN, PARAM_HEADER_OFFSET, PARAM_ID_BASIC, SFDP_SIGNATURE,
};

/// Clock limit assumed for discovered devices
///
/// The basic parameter table does not carry a plain maximum frequency, so
/// discovered profiles get a rate every JEDEC-compliant part sustains.
pub const DISCOVERED_MAX_CLOCK_HZ: u32 = 50_000_000;

/// Everything learned from one discovery pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfdpInfo {
    /// The table header
    pub header: SfdpHeader,
    /// Decoded basic parameter table
    pub basic: BasicFlashParams,
}

/// Extract dword `index` (1-based, as the standard numbers them)
fn dword(data: &[u8], index: usize) -> u32 {
    let off = (index - 1) * 4;
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

/// Parse the 8-byte header at offset 0
pub fn parse_header(bytes: &[u8]) -> Result<SfdpHeader, ResolutionError> {
    if bytes.len() < 8 {
        return Err(ResolutionError::MalformedTable);
    }
    let signature = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if signature != SFDP_SIGNATURE {
        return Err(ResolutionError::SignatureMismatch { found: signature });
    }
    let revision = SfdpRevision {
        minor: bytes[4],
        major: bytes[5],
    };
    if revision.major != 1 {
        return Err(ResolutionError::UnsupportedTableRevision {
            major: revision.major,
            minor: revision.minor,
        });
    }
    Ok(SfdpHeader {
        revision,
        // The field stores the header count minus one
        num_param_headers: bytes[6].saturating_add(1),
    })
}

/// Parse one 8-byte parameter header
pub fn parse_param_header(bytes: &[u8]) -> Result<ParameterHeader, ResolutionError> {
    if bytes.len() < 8 {
        return Err(ResolutionError::MalformedTable);
    }
    Ok(ParameterHeader {
        id: u16::from(bytes[7]) << 8 | u16::from(bytes[0]),
        revision: SfdpRevision {
            minor: bytes[1],
            major: bytes[2],
        },
        length_dwords: bytes[3],
        pointer: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], 0]),
    })
}

/// Decode the basic flash parameter table
pub fn parse_bfpt(data: &[u8]) -> Result<BasicFlashParams, ResolutionError> {
    if data.len() < BFPT_MIN_LEN {
        return Err(ResolutionError::MalformedTable);
    }

    let d1 = dword(data, 1);
    let erase_4k_opcode = if d1 & 0b11 == 0b01 {
        match ((d1 >> 8) & 0xFF) as u8 {
            0 | 0xFF => None,
            op => Some(op),
        }
    } else {
        None
    };
    let address_mode = match (d1 >> 17) & 0b11 {
        0b00 => AddressMode::ThreeOnly,
        0b01 => AddressMode::ThreeOrFour,
        0b10 => AddressMode::FourOnly,
        _ => return Err(ResolutionError::MalformedTable),
    };

    let d2 = dword(data, 2);
    let density_bits: u64 = if d2 & 0x8000_0000 == 0 {
        // Direct format: value is the bit count minus one
        u64::from(d2) + 1
    } else {
        // Exponent format: density is 2^N bits
        let n = d2 & 0x7FFF_FFFF;
        if !(3..=45).contains(&n) {
            return Err(ResolutionError::MalformedTable);
        }
        1u64 << n
    };
    let density_bytes = density_bits / 8;
    if density_bytes == 0 || density_bytes > u64::from(u32::MAX) {
        return Err(ResolutionError::MalformedTable);
    }

    let d8 = dword(data, 8);
    let d9 = dword(data, 9);
    let erase_types = [
        SfdpEraseType::from_raw((d8 & 0xFF) as u8, ((d8 >> 8) & 0xFF) as u8),
        SfdpEraseType::from_raw(((d8 >> 16) & 0xFF) as u8, ((d8 >> 24) & 0xFF) as u8),
        SfdpEraseType::from_raw((d9 & 0xFF) as u8, ((d9 >> 8) & 0xFF) as u8),
        SfdpEraseType::from_raw(((d9 >> 16) & 0xFF) as u8, ((d9 >> 24) & 0xFF) as u8),
    ];

    // Page size arrived with the 11-dword revision; older tables imply 256
    let page_size = if data.len() >= 44 {
        let exp = (dword(data, 11) >> 4) & 0xF;
        1u32 << exp
    } else {
        256
    };

    Ok(BasicFlashParams {
        density_bytes: density_bytes as u32,
        page_size,
        erase_types,
        address_mode,
        erase_4k_opcode,
    })
}

/// Cheap signature-only check for discovery support
///
/// Reads just the first 8 bytes and checks the signature and revision.
/// Useful before committing to a full probe on buses where reads are slow.
pub fn is_supported<B: FlashBus>(bus: &mut B) -> bool {
    let mut header_bytes = [0u8; 8];
    if protocol::read_sfdp(bus, 0, &mut header_bytes).is_err() {
        return false;
    }
    parse_header(&header_bytes).is_ok()
}

/// Read and decode the discovery tables from a device
pub fn probe<B: FlashBus>(bus: &mut B) -> Result<SfdpInfo, ResolutionError> {
    let mut header_bytes = [0u8; 8];
    protocol::read_sfdp(bus, 0, &mut header_bytes)?;
    let header = parse_header(&header_bytes)?;

    // Scan every parameter header, keeping the newest basic table
    let mut basic_header: Option<ParameterHeader> = None;
    for i in 0..header.num_param_headers {
        let mut ph_bytes = [0u8; 8];
        protocol::read_sfdp(bus, PARAM_HEADER_OFFSET + u32::from(i) * 8, &mut ph_bytes)?;
        let ph = parse_param_header(&ph_bytes)?;
        if ph.id == PARAM_ID_BASIC && basic_header.map_or(true, |b| ph.revision > b.revision) {
            basic_header = Some(ph);
        } else {
            log::trace!("skipping parameter table 0x{:04X}", ph.id);
        }
    }
    let ph = basic_header.ok_or(ResolutionError::MalformedTable)?;
    if ph.length_bytes() < BFPT_MIN_LEN {
        return Err(ResolutionError::MalformedTable);
    }

    let mut table = [0u8; 64];
    let len = ph.length_bytes().min(table.len());
    protocol::read_sfdp(bus, ph.pointer, &mut table[..len])?;
    let basic = parse_bfpt(&table[..len])?;

    Ok(SfdpInfo { header, basic })
}

/// Turn decoded discovery data into a usable profile
pub fn to_profile(info: &SfdpInfo) -> Result<DeviceProfile, ResolutionError> {
    let basic = &info.basic;

    let erase = match basic.smallest_erase() {
        Some(e) => e,
        // Some revision 1.0 parts only advertise the uniform 4 KiB erase
        None => basic
            .erase_4k_opcode
            .map(|opcode| SfdpEraseType { size: 4096, opcode })
            .ok_or(ResolutionError::MalformedTable)?,
    };

    let four_byte = basic.address_mode == AddressMode::FourOnly
        || basic.density_bytes > 16 * 1024 * 1024;
    let opcode_set = if four_byte {
        OpcodeSet::jedec_4byte(erase.opcode)
    } else {
        OpcodeSet::jedec_3byte(erase.opcode)
    };

    let mut flags = ProfileFlags::DISCOVERED;
    if basic.erase_4k_opcode.is_some() {
        flags |= ProfileFlags::ERASE_4K;
    }
    if four_byte {
        flags |= ProfileFlags::FOUR_BYTE_ADDR;
    }

    let profile = DeviceProfile {
        total_size: basic.density_bytes,
        erase_size: erase.size,
        page_size: basic.page_size,
        opcodes: opcode_set,
        busy_bit: opcodes::SR1_WIP_BIT,
        max_clock_hz: DISCOVERED_MAX_CLOCK_HZ,
        flags,
    };
    // A table that decodes but describes impossible geometry is malformed,
    // not an invalid caller profile
    profile
        .validate()
        .map_err(|_| ResolutionError::MalformedTable)?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use crate::spi::BusCommand;

    const IMAGE_LEN: usize = 0x50;

    fn put_dword(buf: &mut [u8], offset: usize, value: u32) {
        buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// 16 MiB device, 256 B pages, 64 KiB blocks plus uniform 4 KiB erase
    fn table_image() -> [u8; IMAGE_LEN] {
        let mut img = [0u8; IMAGE_LEN];
        // Header: signature, rev 1.6, one parameter header
        img[0..4].copy_from_slice(b"SFDP");
        img[4] = 0x06;
        img[5] = 0x01;
        img[6] = 0x00;
        img[7] = 0xFF;
        // Basic table header: rev 1.6, 16 dwords at 0x10
        img[8] = 0x00;
        img[9] = 0x06;
        img[10] = 0x01;
        img[11] = 16;
        img[12] = 0x10;
        img[15] = 0xFF;
        // BFPT dword 1: uniform 4K erase with opcode 0x20, 3-byte addressing
        put_dword(&mut img, 0x10, 0x0000_2001);
        // dword 2: density in bit-count format, 16 MiB
        put_dword(&mut img, 0x14, 0x07FF_FFFF);
        // dword 8: erase type 1 = 4 KiB/0x20, type 2 = 64 KiB/0xD8
        put_dword(&mut img, 0x2C, 0xD810_200C);
        // dword 11: page size 2^8
        put_dword(&mut img, 0x38, 0x0000_0080);
        img
    }

    struct TableBus {
        image: [u8; IMAGE_LEN],
    }

    impl FlashBus for TableBus {
        fn max_read_len(&self) -> usize {
            // Small on purpose so the table read gets chunked
            16
        }

        fn max_write_len(&self) -> usize {
            16
        }

        fn transfer(&mut self, cmd: &mut BusCommand<'_>) -> Result<(), BusError> {
            assert_eq!(cmd.opcode, opcodes::RDSFDP);
            assert_eq!(cmd.dummy_cycles, 8);
            let addr = cmd.address.unwrap() as usize;
            for (i, b) in cmd.read_buf.iter_mut().enumerate() {
                *b = self.image.get(addr + i).copied().unwrap_or(0xFF);
            }
            Ok(())
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    #[test]
    fn probe_decodes_basic_table() {
        let mut bus = TableBus {
            image: table_image(),
        };
        let info = probe(&mut bus).unwrap();
        assert_eq!(info.header.revision, SfdpRevision { major: 1, minor: 6 });
        assert_eq!(info.basic.density_bytes, 16 * 1024 * 1024);
        assert_eq!(info.basic.page_size, 256);
        assert_eq!(info.basic.erase_4k_opcode, Some(0x20));
        assert_eq!(
            info.basic.smallest_erase(),
            Some(SfdpEraseType {
                size: 4096,
                opcode: 0x20
            })
        );
    }

    #[test]
    fn profile_uses_smallest_erase_and_3byte_opcodes() {
        let mut bus = TableBus {
            image: table_image(),
        };
        let profile = to_profile(&probe(&mut bus).unwrap()).unwrap();
        assert_eq!(profile.total_size, 16 * 1024 * 1024);
        assert_eq!(profile.erase_size, 4096);
        assert_eq!(profile.page_size, 256);
        assert_eq!(profile.opcodes.read, opcodes::READ);
        assert_eq!(profile.opcodes.page_program, opcodes::PP);
        assert_eq!(profile.opcodes.erase, 0x20);
        assert!(profile.flags.contains(ProfileFlags::DISCOVERED));
        assert!(profile.flags.contains(ProfileFlags::ERASE_4K));
        assert!(!profile.flags.contains(ProfileFlags::FOUR_BYTE_ADDR));
    }

    #[test]
    fn large_density_switches_to_4byte_opcodes() {
        let mut img = table_image();
        // 32 MiB in exponent format: 2^28 bits
        put_dword(&mut img, 0x14, 0x8000_0000 | 28);
        let mut bus = TableBus { image: img };
        let profile = to_profile(&probe(&mut bus).unwrap()).unwrap();
        assert_eq!(profile.total_size, 32 * 1024 * 1024);
        assert_eq!(profile.opcodes.read, opcodes::READ_4B);
        assert_eq!(profile.opcodes.page_program, opcodes::PP_4B);
        assert_eq!(profile.opcodes.erase, opcodes::SE_21);
        assert!(profile.flags.contains(ProfileFlags::FOUR_BYTE_ADDR));
    }

    #[test]
    fn bad_signature_is_reported_with_value_read() {
        let mut img = table_image();
        img[0] = 0x00;
        let mut bus = TableBus { image: img };
        assert_eq!(
            probe(&mut bus),
            Err(ResolutionError::SignatureMismatch { found: 0x5044_4600 })
        );
    }

    #[test]
    fn unknown_major_revision_rejected() {
        let mut img = table_image();
        img[5] = 0x02;
        let mut bus = TableBus { image: img };
        assert_eq!(
            probe(&mut bus),
            Err(ResolutionError::UnsupportedTableRevision { major: 2, minor: 6 })
        );
    }

    #[test]
    fn truncated_table_rejected() {
        let mut img = table_image();
        img[11] = 4; // 16 bytes, below the 9-dword minimum
        let mut bus = TableBus { image: img };
        assert_eq!(probe(&mut bus), Err(ResolutionError::MalformedTable));
    }

    #[test]
    fn support_check_reads_only_the_header() {
        let mut bus = TableBus {
            image: table_image(),
        };
        assert!(is_supported(&mut bus));

        let mut img = table_image();
        img[1] = 0x00;
        let mut bus = TableBus { image: img };
        assert!(!is_supported(&mut bus));
    }

    #[test]
    fn missing_basic_table_rejected() {
        let mut img = table_image();
        img[15] = 0x00; // parameter ID no longer matches the basic table
        let mut bus = TableBus { image: img };
        assert_eq!(probe(&mut bus), Err(ResolutionError::MalformedTable));
    }
}
