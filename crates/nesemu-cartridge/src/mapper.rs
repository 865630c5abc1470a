//! The `Mapper` trait: the seam between cartridge hardware quirks and the
//! rest of the system. Every supported board implements this instead of
//! the bus knowing about bank registers directly.

/// Nametable mirroring arrangement, as selected by the cartridge (fixed) or
/// remapped live by mapper hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    /// Nametables 0/2 share storage, 1/3 share storage.
    Horizontal,
    /// Nametables 0/1 share storage, 2/3 share storage.
    Vertical,
    /// All four nametables alias the same 1KiB (no extra VRAM fitted).
    SingleScreenLower,
    /// All four nametables alias the second 1KiB bank.
    SingleScreenUpper,
    /// Four independent 1KiB nametables (requires on-cartridge VRAM).
    FourScreen,
}

/// Cartridge-side logic: PRG/CHR bank switching, mirroring control, and
/// mapper-generated IRQs (MMC3's scanline counter).
pub trait Mapper {
    /// Translate a CPU-visible PRG address ($4020-$FFFF, though boards only
    /// decode a subset) to an offset into PRG ROM, or `None` for PRG RAM/open
    /// bus addresses the mapper handles itself via `read`/`write`.
    fn read(&mut self, addr: u16) -> u8;

    /// Handle a CPU write. May be PRG RAM or a bank-select register,
    /// depending on the board.
    fn write(&mut self, addr: u16, value: u8);

    /// Translate a PPU-visible CHR address ($0000-$1FFF) to a CHR ROM/RAM
    /// byte.
    fn read_chr(&mut self, addr: u16) -> u8;

    /// Handle a PPU-side CHR write (only meaningful when CHR RAM is fitted).
    fn write_chr(&mut self, addr: u16, value: u8);

    /// Current nametable mirroring, which some boards can change at runtime.
    fn mirroring(&self) -> Mirroring;

    /// Whether the mapper is asserting its IRQ line (MMC3 scanline IRQ).
    /// Boards without an IRQ source simply return `false`.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Acknowledge (clear) the mapper's IRQ line.
    fn clear_irq(&mut self) {}

    /// Notify the mapper of a PPU A12 transition, for boards (MMC3) whose
    /// IRQ counter clocks off the pattern-table address line rather than
    /// CPU cycles. `addr` is the PPU CHR address that was just accessed.
    fn clock_ppu_address(&mut self, addr: u16) {
        let _ = addr;
    }

    /// Short, human-readable board name, for UI/debug display.
    fn name(&self) -> &'static str;

    /// Whether this board's PRG RAM is battery-backed (should be persisted
    /// across sessions by the host).
    fn has_battery(&self) -> bool {
        false
    }

    /// Read-only view of PRG RAM, for save-RAM persistence. Empty for
    /// boards with no PRG RAM fitted.
    fn prg_ram(&self) -> &[u8] {
        &[]
    }

    /// Mutable view of PRG RAM, for restoring persisted save RAM. No-op for
    /// boards with no PRG RAM fitted.
    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut []
    }
}
