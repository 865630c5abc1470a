//! The `Console` facade: owns the CPU plus bus, and drives the
//! master-clock scheduler one CPU cycle at a time.

use nesemu_cartridge::{create_mapper, Rom, RomError};
use nesemu_cpu::{Bus, Cpu};

use crate::bus::NesBus;
use crate::input::{Button, Controller};
use crate::palette::pixel_to_rgb;

/// NES timing constants.
pub mod timing {
    /// Master clock frequency, NTSC.
    pub const MASTER_CLOCK_NTSC: u32 = 21_477_272;
    /// CPU clock frequency, NTSC (master / 12).
    pub const CPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 12;
    /// CPU cycles per frame, NTSC (approximate; actual varies with the
    /// odd-frame skip dot).
    pub const CPU_CYCLES_PER_FRAME: u32 = 29_780;
    /// Safety ceiling on CPU cycles per `run_frame()` call, guarding
    /// against a runaway ROM that never reaches VBlank (e.g. stuck in an
    /// infinite non-branching loop with rendering disabled).
    pub const MAX_CYCLES_PER_FRAME: u32 = 200_000;
}

/// Errors surfaced while constructing or loading a [`Console`].
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// The ROM image was malformed or used an unsupported mapper.
    #[error(transparent)]
    Rom(#[from] RomError),
}

/// A point-in-time snapshot of core registers, for debugging/tooling. An
/// optional, best-effort surface that may grow new fields over time.
#[derive(Debug, Clone, Copy)]
pub struct DebugSnapshot {
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer.
    pub s: u8,
    /// Program counter.
    pub pc: u16,
    /// Packed status flags (NV-BDIZC).
    pub status: u8,
    /// Current PPU scanline.
    pub scanline: u16,
    /// Current PPU dot within the scanline.
    pub dot: u16,
    /// CPU cycles executed since the last reset.
    pub total_cycles: u64,
}

/// The complete emulated console: CPU plus system bus, stepped through a
/// master clock that interleaves CPU, PPU, APU, and DMA in a fixed order.
pub struct Console {
    cpu: Cpu,
    bus: NesBus,
    framebuffer_rgb: Vec<u8>,
    frame_count: u64,
    mapper_number: u16,
}

impl Console {
    /// Parse `rom_bytes` and build a console around the resulting mapper.
    ///
    /// # Errors
    /// Returns [`ConsoleError::Rom`] if the image is malformed or its
    /// mapper number isn't one of the boards this crate implements.
    pub fn load_rom(rom_bytes: &[u8]) -> Result<Self, ConsoleError> {
        Self::load_rom_named(rom_bytes, None)
    }

    /// As [`Console::load_rom`], but also takes a filename to use as a
    /// region-inference fallback (the `(E)`/`(U)`/`(J)` tagging convention)
    /// when the header itself doesn't disambiguate NTSC vs PAL.
    ///
    /// # Errors
    /// Returns [`ConsoleError::Rom`] if the image is malformed or its
    /// mapper number isn't one of the boards this crate implements.
    pub fn load_rom_named(rom_bytes: &[u8], filename: Option<&str>) -> Result<Self, ConsoleError> {
        let rom = Rom::parse(rom_bytes, filename)?;
        let pal = rom.header.region == nesemu_cartridge::Region::Pal;
        let mapper_number = rom.header.mapper_number;
        let mapper = create_mapper(&rom)?;
        let mut bus = NesBus::new(mapper, pal);
        let mut cpu = Cpu::new();
        cpu.reset(&mut bus);
        Ok(Self {
            cpu,
            bus,
            framebuffer_rgb: vec![0; nesemu_ppu::WIDTH * nesemu_ppu::HEIGHT * 3],
            frame_count: 0,
            mapper_number,
        })
    }

    /// Full reset: CPU registers (S -= 3, I set, PC reloaded from the reset
    /// vector) and bus RAM/controller/DMA state. PPU/APU/mapper internal
    /// registers are zeroed by their own constructors and are not re-zeroed
    /// here, since this engine only supports power-on reset via `load_rom`.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
    }

    /// Advance the emulated machine one CPU cycle, applying the scheduler
    /// ordering: DMA-stall check, CPU, PPU x3, APU x1, interrupt sampling.
    fn step_cycle(&mut self) {
        if let Some(page) = self.bus.take_oam_dma_request() {
            let odd_cycle = self.cpu.total_cycles() % 2 == 1;
            self.bus.execute_oam_dma(page);
            self.cpu.stall(if odd_cycle { 514 } else { 513 });
        }

        self.cpu.set_nmi_line(self.bus.nmi_pending());
        if self.bus.nmi_pending() {
            self.bus.clear_nmi();
        }
        self.cpu.set_irq_line(self.bus.irq_pending());

        self.cpu.tick(&mut self.bus);
        self.bus.step_ppu();
        let dmc_stall = self.bus.step_apu();
        if dmc_stall > 0 {
            self.cpu.stall(dmc_stall);
        }
        self.bus.step_open_bus();
    }

    /// Run until the PPU completes one frame (its scanline counter wraps
    /// back to the start of the next pre-render line), bounded by
    /// [`timing::MAX_CYCLES_PER_FRAME`] so a pathological ROM can't hang
    /// the host.
    pub fn run_frame(&mut self) {
        let start_scanline = self.bus.ppu().scanline();
        let start_dot = self.bus.ppu().dot();
        let mut cycles = 0;
        loop {
            self.step_cycle();
            cycles += 1;
            let wrapped = self.bus.ppu().scanline() == start_scanline
                && self.bus.ppu().dot() == start_dot
                && cycles > 1;
            if wrapped || cycles >= timing::MAX_CYCLES_PER_FRAME {
                break;
            }
        }
        self.render_framebuffer();
        self.frame_count += 1;
    }

    fn render_framebuffer(&mut self) {
        for (i, &pixel) in self.bus.ppu().framebuffer.iter().enumerate() {
            let (r, g, b) = pixel_to_rgb(pixel);
            self.framebuffer_rgb[i * 3] = r;
            self.framebuffer_rgb[i * 3 + 1] = g;
            self.framebuffer_rgb[i * 3 + 2] = b;
        }
    }

    /// The most recently rendered frame, as packed 8-bit RGB.
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer_rgb
    }

    /// Drain audio samples accumulated since the previous call.
    pub fn audio_drain(&mut self) -> Vec<i16> {
        self.bus.audio_drain()
    }

    /// Set a single button on controller 1 or 2 (`port` 0 or 1).
    pub fn set_button(&mut self, port: u8, button: Button, pressed: bool) {
        let controller = self.controller_mut(port);
        controller.set_button(button, pressed);
    }

    /// Replace a full 8-button snapshot on controller 1 or 2.
    pub fn set_buttons(&mut self, port: u8, buttons: u8) {
        self.controller_mut(port).set_buttons(buttons);
    }

    fn controller_mut(&mut self, port: u8) -> &mut Controller {
        if port == 0 {
            self.bus.controller1_mut()
        } else {
            self.bus.controller2_mut()
        }
    }

    /// Total CPU cycles executed since the last reset.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.cpu.total_cycles()
    }

    /// Frames rendered since construction.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Read memory without side effects, for debugging/disassembly.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        Bus::peek(&self.bus, addr)
    }

    /// The iNES/NES 2.0 mapper number this ROM declared.
    #[must_use]
    pub const fn mapper_number(&self) -> u16 {
        self.mapper_number
    }

    /// Short board name (e.g. "NROM", "MMC1", "MMC3").
    #[must_use]
    pub fn mapper_name(&self) -> &'static str {
        self.bus.mapper_name()
    }

    /// Whether the cartridge's PRG RAM is battery-backed and should be
    /// persisted across sessions.
    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.bus.has_battery()
    }

    /// Read the cartridge's current PRG RAM contents, for persisting a
    /// battery save to disk. Empty if the board has no PRG RAM.
    #[must_use]
    pub fn battery_ram(&self) -> &[u8] {
        self.bus.prg_ram()
    }

    /// Restore previously persisted PRG RAM contents. Bytes beyond the
    /// cartridge's PRG RAM size are ignored; a shorter save leaves the
    /// remaining bytes untouched.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        self.bus.prg_ram_mut().iter_mut().zip(data).for_each(|(dst, &src)| *dst = src);
    }

    /// A best-effort snapshot of CPU/PPU state for tooling. Not part of
    /// any guaranteed ABI — fields may be added over time.
    #[must_use]
    pub fn debug_snapshot(&self) -> DebugSnapshot {
        DebugSnapshot {
            a: self.cpu.a,
            x: self.cpu.x,
            y: self.cpu.y,
            s: self.cpu.s,
            pc: self.cpu.pc,
            status: self.cpu.status.bits(),
            scanline: self.bus.ppu().scanline(),
            dot: self.bus.ppu().dot(),
            total_cycles: self.cpu.total_cycles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop_loop_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 16 + 16 * 1024 + 8 * 1024];
        rom[0..4].copy_from_slice(b"NES\x1A");
        rom[4] = 1; // 16KiB PRG
        rom[5] = 1; // 8KiB CHR
        let prg_start = 16;
        rom[prg_start..prg_start + 16 * 1024].fill(0xEA); // NOP
        // Reset vector -> $8000
        rom[prg_start + 0x3FFC] = 0x00;
        rom[prg_start + 0x3FFD] = 0x80;
        rom
    }

    #[test]
    fn load_rom_resets_pc_to_vector() {
        let console = Console::load_rom(&nop_loop_rom()).unwrap();
        assert_eq!(console.debug_snapshot().pc, 0x8000);
    }

    #[test]
    fn run_frame_advances_cycles_and_produces_a_framebuffer() {
        let mut console = Console::load_rom(&nop_loop_rom()).unwrap();
        console.run_frame();
        assert!(console.total_cycles() > 0);
        assert_eq!(console.frame_count(), 1);
        assert_eq!(console.framebuffer().len(), 256 * 240 * 3);
    }

    #[test]
    fn controller_button_reaches_the_bus() {
        let mut console = Console::load_rom(&nop_loop_rom()).unwrap();
        console.set_button(0, Button::A, true);
        Bus::write(&mut console.bus, 0x4016, 1);
        Bus::write(&mut console.bus, 0x4016, 0);
        assert_eq!(Bus::read(&mut console.bus, 0x4016) & 0x01, 1);
    }

    #[test]
    fn mapper_name_and_number_reflect_the_loaded_board() {
        let console = Console::load_rom(&nop_loop_rom()).unwrap();
        assert_eq!(console.mapper_number(), 0);
        assert_eq!(console.mapper_name(), "NROM");
    }

    #[test]
    fn battery_ram_round_trips_through_the_cartridge() {
        let mut console = Console::load_rom(&nop_loop_rom()).unwrap();
        let mut save = vec![0u8; console.battery_ram().len()];
        save[0] = 0xAB;
        save[1] = 0xCD;
        console.load_battery_ram(&save);
        assert_eq!(console.battery_ram()[0], 0xAB);
        assert_eq!(console.battery_ram()[1], 0xCD);
    }

    #[test]
    fn unsupported_mapper_rom_is_a_typed_error() {
        let mut rom = nop_loop_rom();
        rom[6] = 0xF0; // mapper number high nibble -> 0xF in a non-supported value
        rom[7] = 0xF0;
        let result = Console::load_rom(&rom);
        assert!(result.is_err());
    }
}
