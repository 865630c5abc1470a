//! NES cartridge parsing and mapper hardware emulation.
//!
//! Load a ROM with [`Rom::parse`], then hand it to [`create_mapper`] to get
//! a boxed [`Mapper`] the bus can route PRG/CHR accesses through.

mod mapper;
mod mmc1;
mod mmc3;
mod nrom;
mod rom;

pub use mapper::{Mapper, Mirroring};
pub use mmc1::Mmc1;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use rom::{Region, Rom, RomError, RomHeader};

/// Build the appropriate [`Mapper`] for a parsed ROM's header, or an error
/// if the mapper number isn't one of the boards this crate implements.
///
/// # Errors
/// Returns [`RomError::UnsupportedMapper`] for any mapper number other than
/// 0 (NROM), 1 (MMC1), and 4 (MMC3).
pub fn create_mapper(rom: &Rom) -> Result<Box<dyn Mapper>, RomError> {
    match rom.header.mapper_number {
        0 => Ok(Box::new(Nrom::new(rom))),
        1 => Ok(Box::new(Mmc1::new(rom))),
        4 => Ok(Box::new(Mmc3::new(rom))),
        other => {
            log::warn!("mapper {other} is not supported");
            Err(RomError::UnsupportedMapper(other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_mapper_is_a_typed_error() {
        let rom = Rom {
            header: RomHeader {
                mapper_number: 99,
                submapper: 0,
                prg_rom_banks: 1,
                chr_rom_banks: 1,
                mirroring: Mirroring::Horizontal,
                has_battery: false,
                has_trainer: false,
                nes2_format: false,
                region: Region::Ntsc,
            },
            prg_rom: vec![0; 16 * 1024],
            chr_rom: vec![0; 8 * 1024],
        };
        assert!(matches!(create_mapper(&rom), Err(RomError::UnsupportedMapper(99))));
    }
}
