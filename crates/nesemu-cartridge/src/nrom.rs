//! Mapper 0 (NROM): no bank switching at all. Either one 16KiB PRG bank
//! mirrored across $8000-$FFFF, or two banks filling it directly.

use crate::mapper::{Mapper, Mirroring};
use crate::rom::Rom;

/// NROM cartridge state: PRG/CHR storage plus fixed mirroring.
pub struct Nrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    mirroring: Mirroring,
    has_battery: bool,
}

impl Nrom {
    /// Build an NROM board from a parsed ROM image.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let chr_is_ram = rom.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0; 8 * 1024]
        } else {
            rom.chr_rom.clone()
        };
        Self {
            prg_rom: rom.prg_rom.clone(),
            chr,
            chr_is_ram,
            prg_ram: vec![0; 8 * 1024],
            mirroring: rom.header.mirroring,
            has_battery: rom.header.has_battery,
        }
    }
}

impl Mapper for Nrom {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[usize::from(addr - 0x6000)],
            0x8000..=0xFFFF => {
                let len = self.prg_rom.len();
                if len == 0 {
                    return 0;
                }
                self.prg_rom[usize::from(addr - 0x8000) % len]
            }
            _ => 0,
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[usize::from(addr - 0x6000)] = value;
        }
    }

    fn read_chr(&mut self, addr: u16) -> u8 {
        self.chr[usize::from(addr) % self.chr.len().max(1)]
    }

    fn write_chr(&mut self, addr: u16, value: u8) {
        if self.chr_is_ram {
            let len = self.chr.len();
            self.chr[usize::from(addr) % len.max(1)] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn name(&self) -> &'static str {
        "NROM"
    }

    fn has_battery(&self) -> bool {
        self.has_battery
    }

    fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut self.prg_ram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomHeader;
    use crate::rom::Region;

    fn test_rom(prg_banks: usize) -> Rom {
        Rom {
            header: RomHeader {
                mapper_number: 0,
                submapper: 0,
                prg_rom_banks: prg_banks as u8,
                chr_rom_banks: 0,
                mirroring: Mirroring::Vertical,
                has_battery: false,
                has_trainer: false,
                nes2_format: false,
                region: Region::Ntsc,
            },
            prg_rom: vec![0xAB; prg_banks * 16 * 1024],
            chr_rom: Vec::new(),
        }
    }

    #[test]
    fn single_bank_mirrors_across_address_space() {
        let rom = test_rom(1);
        let mut mapper = Nrom::new(&rom);
        assert_eq!(mapper.read(0x8000), mapper.read(0xC000));
    }

    #[test]
    fn chr_ram_is_writable() {
        let rom = test_rom(1);
        let mut mapper = Nrom::new(&rom);
        mapper.write_chr(0x0010, 0x42);
        assert_eq!(mapper.read_chr(0x0010), 0x42);
    }

    #[test]
    fn prg_ram_is_exposed_for_battery_persistence() {
        let rom = test_rom(1);
        let mut mapper = Nrom::new(&rom);
        mapper.write(0x6000, 0x55);
        assert_eq!(mapper.prg_ram()[0], 0x55);
        mapper.prg_ram_mut()[1] = 0x66;
        assert_eq!(mapper.read(0x6001), 0x66);
        assert_eq!(mapper.name(), "NROM");
        assert!(!mapper.has_battery());
    }
}
