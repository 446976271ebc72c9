//! qflash-mem - In-memory flash emulator
//!
//! Emulates a serial NOR flash device behind the
//! [`FlashBus`](qflash_core::bus::FlashBus) trait: erase sets bytes to
//! 0xFF, programming only clears bits, destructive commands require the
//! write-enable latch, and the device reports busy for a configurable
//! number of status reads after each one. It also serves a discovery
//! parameter table so the auto-discovery path can be exercised without
//! hardware.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use qflash_core::error::BusError;
use qflash_core::spi::{opcodes, BusCommand};
use qflash_core::FlashBus;

/// Configuration for the emulated device
#[cfg(feature = "alloc")]
#[derive(Debug, Clone)]
pub struct MemFlashConfig {
    /// Device size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Erase-block size
    pub sector_size: usize,
    /// Discovery parameter table image served for RDSFDP reads
    pub sfdp: Vec<u8>,
}

#[cfg(feature = "alloc")]
impl Default for MemFlashConfig {
    fn default() -> Self {
        let size = 16 * 1024 * 1024;
        let page_size = 256;
        let sector_size = 64 * 1024;
        Self {
            size,
            page_size,
            sector_size,
            sfdp: build_sfdp(size as u32, page_size as u32, sector_size as u32, opcodes::BE_D8),
        }
    }
}

/// Build a minimal discovery table image for the given geometry
///
/// One parameter header pointing at a 16-dword basic table: density in
/// bit-count or exponent format as the size requires, a single erase type,
/// and the page-size exponent. The uniform 4 KiB erase bit is set only
/// when the erase size actually is 4 KiB.
#[cfg(feature = "alloc")]
pub fn build_sfdp(total_size: u32, page_size: u32, erase_size: u32, erase_opcode: u8) -> Vec<u8> {
    fn put_dword(buf: &mut [u8], offset: usize, value: u32) {
        buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    let mut img = vec![0u8; 0x10 + 64];
    // Header: signature, rev 1.6, one parameter header
    img[0..4].copy_from_slice(b"SFDP");
    img[4] = 0x06;
    img[5] = 0x01;
    img[7] = 0xFF;
    // Basic table header: rev 1.6, 16 dwords at 0x10
    img[9] = 0x06;
    img[10] = 0x01;
    img[11] = 16;
    img[12] = 0x10;
    img[15] = 0xFF;

    let mut dword1: u32 = 0;
    if erase_size == 4096 {
        dword1 |= 0b01 | u32::from(erase_opcode) << 8;
    }
    put_dword(&mut img, 0x10, dword1);

    let density_bits = u64::from(total_size) * 8;
    let dword2 = if density_bits <= 0x8000_0000 {
        (density_bits - 1) as u32
    } else {
        0x8000_0000 | density_bits.trailing_zeros()
    };
    put_dword(&mut img, 0x14, dword2);

    let erase_exp = erase_size.trailing_zeros();
    put_dword(&mut img, 0x2C, erase_exp | u32::from(erase_opcode) << 8);

    put_dword(&mut img, 0x38, page_size.trailing_zeros() << 4);
    img
}

/// In-memory flash device
#[cfg(feature = "alloc")]
pub struct MemFlash {
    config: MemFlashConfig,
    data: Vec<u8>,
    write_enabled: bool,
    busy_polls: u32,
    busy_remaining: u32,
    transactions: u64,
    fail_after: Option<u64>,
}

#[cfg(feature = "alloc")]
impl MemFlash {
    /// Create an emulated device, fully erased
    pub fn new(config: MemFlashConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            busy_polls: 0,
            busy_remaining: 0,
            transactions: 0,
            fail_after: None,
        }
    }

    /// Create an emulated device with the default 16 MiB geometry
    pub fn new_default() -> Self {
        Self::new(MemFlashConfig::default())
    }

    /// Create an emulated device pre-filled with `initial_data`
    pub fn with_data(config: MemFlashConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Raw device contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable device contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The configuration
    pub fn config(&self) -> &MemFlashConfig {
        &self.config
    }

    /// Number of bus transactions executed so far
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Report busy for this many status reads after each destructive command
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Fail every transaction after the first `count`
    pub fn set_fail_after(&mut self, count: u64) {
        self.fail_after = Some(count);
    }

    /// Load device contents from a file, padding with 0xFF
    #[cfg(feature = "std")]
    pub fn from_image(config: MemFlashConfig, path: &std::path::Path) -> std::io::Result<Self> {
        let image = std::fs::read(path)?;
        Ok(Self::with_data(config, &image))
    }

    /// Write the full device contents to a file
    #[cfg(feature = "std")]
    pub fn save_image(&self, path: &std::path::Path) -> std::io::Result<()> {
        std::fs::write(path, &self.data)
    }

    fn handle_read(&mut self, cmd: &mut BusCommand<'_>) -> Result<(), BusError> {
        let addr = cmd.address.unwrap_or(0) as usize;
        let len = cmd.read_buf.len();
        if addr + len > self.data.len() {
            log::warn!("read past end of device at 0x{:08X}+{}", addr, len);
            return Err(BusError::Transfer);
        }
        cmd.read_buf.copy_from_slice(&self.data[addr..addr + len]);
        Ok(())
    }

    fn handle_page_program(&mut self, cmd: &BusCommand<'_>) -> Result<(), BusError> {
        if !self.write_enabled {
            log::warn!("page program without write enable");
            return Err(BusError::Transfer);
        }
        let addr = cmd.address.unwrap_or(0) as usize;
        let data = cmd.write_data;
        if addr + data.len() > self.data.len() {
            return Err(BusError::Transfer);
        }
        // Programming only clears bits
        for (i, &byte) in data.iter().enumerate() {
            self.data[addr + i] &= byte;
        }
        self.write_enabled = false;
        self.busy_remaining = self.busy_polls;
        Ok(())
    }

    fn handle_erase(&mut self, cmd: &BusCommand<'_>, erase_size: usize) -> Result<(), BusError> {
        if !self.write_enabled {
            log::warn!("erase without write enable");
            return Err(BusError::Transfer);
        }
        let addr = cmd.address.unwrap_or(0) as usize;
        let aligned = addr & !(erase_size - 1);
        if aligned + erase_size > self.data.len() {
            return Err(BusError::Transfer);
        }
        for byte in &mut self.data[aligned..aligned + erase_size] {
            *byte = 0xFF;
        }
        self.write_enabled = false;
        self.busy_remaining = self.busy_polls;
        Ok(())
    }

    fn handle_sfdp_read(&mut self, cmd: &mut BusCommand<'_>) -> Result<(), BusError> {
        if cmd.dummy_cycles != 8 {
            return Err(BusError::Unsupported);
        }
        let addr = cmd.address.unwrap_or(0) as usize;
        for (i, b) in cmd.read_buf.iter_mut().enumerate() {
            *b = self.config.sfdp.get(addr + i).copied().unwrap_or(0xFF);
        }
        Ok(())
    }
}

#[cfg(feature = "alloc")]
impl FlashBus for MemFlash {
    fn max_read_len(&self) -> usize {
        4096
    }

    fn max_write_len(&self) -> usize {
        self.config.page_size
    }

    fn transfer(&mut self, cmd: &mut BusCommand<'_>) -> Result<(), BusError> {
        if let Some(limit) = self.fail_after {
            if self.transactions >= limit {
                return Err(BusError::Transfer);
            }
        }
        self.transactions += 1;

        match cmd.opcode {
            opcodes::WREN => {
                self.write_enabled = true;
                Ok(())
            }
            opcodes::WRDI => {
                self.write_enabled = false;
                Ok(())
            }
            opcodes::RDSR => {
                let busy = self.busy_remaining > 0;
                if busy {
                    self.busy_remaining -= 1;
                }
                if !cmd.read_buf.is_empty() {
                    cmd.read_buf[0] = if busy { 0x01 } else { 0x00 };
                }
                Ok(())
            }
            opcodes::READ | opcodes::READ_4B => self.handle_read(cmd),
            opcodes::PP | opcodes::PP_4B => self.handle_page_program(cmd),
            opcodes::SE_20 | opcodes::SE_21 => self.handle_erase(cmd, 4 * 1024),
            opcodes::BE_52 | opcodes::BE_5C => self.handle_erase(cmd, 32 * 1024),
            opcodes::BE_D8 | opcodes::BE_DC => self.handle_erase(cmd, 64 * 1024),
            opcodes::RDSFDP => self.handle_sfdp_read(cmd),
            other => {
                log::warn!("unhandled opcode 0x{:02X}", other);
                Err(BusError::Unsupported)
            }
        }
    }

    fn delay_us(&mut self, _us: u32) {}
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use qflash_core::engine::{AddressRange, FlashEngine, PollConfig, ERASED_VALUE};
    use qflash_core::error::{OperationError, ResolutionError};
    use qflash_core::profile::{DeviceProfile, OpcodeSet, ProfileFlags};
    use qflash_core::resolver::{self, ProfileSource};

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

    fn engine_16m() -> FlashEngine<MemFlash> {
        FlashEngine::new(MemFlash::new_default(), profile_16m())
    }

    /// Erase two blocks in the middle of the device, confirm they read as
    /// erased, then program and read back a small payload
    #[test]
    fn erase_program_read_cycle() {
        let mut engine = engine_16m();
        let profile = *engine.profile();
        let start = profile.total_size / 2 - 2 * profile.erase_size;

        engine
            .erase(AddressRange::new(start, 2 * profile.erase_size))
            .unwrap();

        let mut erased = vec![0u8; 2 * profile.erase_size as usize];
        engine
            .read(
                AddressRange::new(start, 2 * profile.erase_size),
                &mut erased,
            )
            .unwrap();
        assert!(erased.iter().all(|&b| b == ERASED_VALUE));

        let payload: Vec<u8> = (0..64).collect();
        engine
            .program(AddressRange::new(start, 64), &payload)
            .unwrap();

        let mut readback = [0u8; 64];
        engine
            .read(AddressRange::new(start, 64), &mut readback)
            .unwrap();
        assert_eq!(&readback[..], &payload[..]);

        engine
            .verify(AddressRange::new(start, 64), &payload)
            .unwrap();
    }

    #[test]
    fn discovery_matches_static_profile_geometry() {
        let mut bus = MemFlash::new_default();
        let discovered = resolver::resolve(&mut bus, ProfileSource::Discover).unwrap();
        let static_profile = profile_16m();

        assert_eq!(discovered.total_size, static_profile.total_size);
        assert_eq!(discovered.erase_size, static_profile.erase_size);
        assert_eq!(discovered.page_size, static_profile.page_size);
        assert_eq!(discovered.opcodes, static_profile.opcodes);
        assert!(discovered.flags.contains(ProfileFlags::DISCOVERED));
    }

    #[test]
    fn discovered_profile_drives_the_device() {
        let mut bus = MemFlash::new_default();
        let profile = resolver::resolve(&mut bus, ProfileSource::Discover).unwrap();
        let mut engine = FlashEngine::new(bus, profile);

        engine.erase(AddressRange::new(0, 64 * 1024)).unwrap();
        let payload = [0x5Au8; 300];
        engine.program(AddressRange::new(128, 300), &payload).unwrap();
        engine.verify(AddressRange::new(128, 300), &payload).unwrap();
    }

    #[test]
    fn programming_only_clears_bits() {
        let mut engine = engine_16m();
        engine.erase(AddressRange::new(0, 64 * 1024)).unwrap();
        engine.program(AddressRange::new(0, 1), &[0xF0]).unwrap();
        // Second program over the same byte cannot set bits back
        engine.program(AddressRange::new(0, 1), &[0x0F]).unwrap();
        let mut b = [0u8; 1];
        engine.read(AddressRange::new(0, 1), &mut b).unwrap();
        assert_eq!(b[0], 0x00);
    }

    #[test]
    fn rejected_operations_cause_no_bus_traffic() {
        let mut engine = engine_16m();
        let before = engine.bus_mut().transactions();

        assert_eq!(
            engine.program(AddressRange::new(0, 16), &[0u8; 8]),
            Err(OperationError::SizeMismatch {
                expected: 16,
                actual: 8
            })
        );
        assert_eq!(
            engine.erase(AddressRange::new(100, 64 * 1024)),
            Err(OperationError::UnalignedRange)
        );
        let mut buf = [0u8; 16];
        assert_eq!(
            engine.read(AddressRange::new(16 * 1024 * 1024, 16), &mut buf),
            Err(OperationError::RangeOutOfBounds)
        );

        assert_eq!(engine.bus_mut().transactions(), before);
    }

    #[test]
    fn slow_device_times_out() {
        let mut bus = MemFlash::new_default();
        bus.set_busy_polls(100);
        let mut engine = FlashEngine::new(bus, profile_16m()).with_poll_config(PollConfig {
            interval_us: 100,
            timeout_us: 300,
        });
        assert_eq!(
            engine.erase(AddressRange::new(0, 64 * 1024)),
            Err(OperationError::DeviceTimeout {
                bytes_transferred: 0
            })
        );
    }

    #[test]
    fn slow_device_within_budget_succeeds() {
        let mut bus = MemFlash::new_default();
        bus.set_busy_polls(5);
        let mut engine = FlashEngine::new(bus, profile_16m());
        engine.erase(AddressRange::new(0, 64 * 1024)).unwrap();
    }

    #[test]
    fn bus_failure_reports_confirmed_bytes() {
        let mut bus = MemFlash::new_default();
        // Page 1 costs three transactions (WREN, PP, RDSR); fail on the 4th
        bus.set_fail_after(3);
        let mut engine = FlashEngine::new(bus, profile_16m());
        let data = [0u8; 512];
        let err = engine.program(AddressRange::new(0, 512), &data).unwrap_err();
        assert_eq!(
            err,
            OperationError::Bus {
                source: BusError::Transfer,
                bytes_transferred: 256
            }
        );
    }

    #[test]
    fn corrupted_table_fails_discovery() {
        let mut config = MemFlashConfig::default();
        config.sfdp[0] = 0x00;
        let mut bus = MemFlash::new(config);
        assert!(matches!(
            resolver::resolve(&mut bus, ProfileSource::Discover),
            Err(ResolutionError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn invalid_static_profile_rejected() {
        let mut bus = MemFlash::new_default();
        let mut profile = profile_16m();
        profile.page_size = 0;
        assert_eq!(
            resolver::resolve(&mut bus, ProfileSource::Static(profile)),
            Err(ResolutionError::InvalidStaticProfile)
        );
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn image_save_and_load_round_trip() {
        let mut engine = engine_16m();
        engine.erase(AddressRange::new(0, 64 * 1024)).unwrap();
        let payload = [0xC3u8; 128];
        engine.program(AddressRange::new(64, 128), &payload).unwrap();

        let path = std::env::temp_dir().join(format!("qflash-mem-test-{}.bin", std::process::id()));
        let bus = engine.into_bus();
        bus.save_image(&path).unwrap();

        let restored = MemFlash::from_image(MemFlashConfig::default(), &path).unwrap();
        assert_eq!(&restored.data()[64..192], &payload[..]);
        std::fs::remove_file(&path).unwrap();
    }
}
