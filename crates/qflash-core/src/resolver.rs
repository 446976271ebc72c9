//! Profile resolution
//!
//! Setup-time entry point: turn a [`ProfileSource`] into a validated
//! [`DeviceProfile`], touching the bus only when discovery is requested.

use crate::bus::FlashBus;
use crate::error::ResolutionError;
use crate::profile::DeviceProfile;
use crate::sfdp;

/// Where the device parameters come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    /// Caller-supplied parameters, validated but otherwise taken as-is
    Static(DeviceProfile),
    /// Read the device's self-describing parameter table
    Discover,
}

/// Resolve a device profile
///
/// The static path performs no bus transactions at all; a rejected static
/// profile therefore leaves the device untouched. The discovery path issues
/// only parameter-space reads, never writes.
pub fn resolve<B: FlashBus>(bus: &mut B, source: ProfileSource) -> Result<DeviceProfile, ResolutionError> {
    match source {
        ProfileSource::Static(profile) => {
            profile.validate()?;
            log::debug!(
                "static profile: {} bytes, {} byte blocks, {} byte pages",
                profile.total_size,
                profile.erase_size,
                profile.page_size
            );
            Ok(profile)
        }
        ProfileSource::Discover => {
            let info = sfdp::probe(bus)?;
            let profile = sfdp::to_profile(&info)?;
            log::info!(
                "discovered device: {} bytes, {} byte blocks, {} byte pages (table rev {}.{})",
                profile.total_size,
                profile.erase_size,
                profile.page_size,
                info.header.revision.major,
                info.header.revision.minor
            );
            Ok(profile)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use crate::profile::{OpcodeSet, ProfileFlags};
    use crate::spi::{opcodes, BusCommand};

    /// Bus that fails the test if anything touches it
    struct PanicBus;

    impl FlashBus for PanicBus {
        fn max_read_len(&self) -> usize {
            256
        }

        fn max_write_len(&self) -> usize {
            256
        }

        fn transfer(&mut self, _cmd: &mut BusCommand<'_>) -> Result<(), BusError> {
            panic!("resolver touched the bus on the static path");
        }

        fn delay_us(&mut self, _us: u32) {}
    }

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
    fn static_profile_passes_through_unchanged() {
        let profile = profile_16m();
        let resolved = resolve(&mut PanicBus, ProfileSource::Static(profile)).unwrap();
        assert_eq!(resolved, profile);
    }

    #[test]
    fn invalid_static_profile_rejected_without_bus_activity() {
        let mut profile = profile_16m();
        profile.erase_size = 0;
        assert_eq!(
            resolve(&mut PanicBus, ProfileSource::Static(profile)),
            Err(ResolutionError::InvalidStaticProfile)
        );
    }

    #[test]
    fn discovery_bus_errors_propagate() {
        struct FailBus;

        impl FlashBus for FailBus {
            fn max_read_len(&self) -> usize {
                256
            }

            fn max_write_len(&self) -> usize {
                256
            }

            fn transfer(&mut self, _cmd: &mut BusCommand<'_>) -> Result<(), BusError> {
                Err(BusError::Transfer)
            }

            fn delay_us(&mut self, _us: u32) {}
        }

        assert_eq!(
            resolve(&mut FailBus, ProfileSource::Discover),
            Err(ResolutionError::Bus(BusError::Transfer))
        );
    }
}
