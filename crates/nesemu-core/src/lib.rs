//! Engine facade for a cycle-accurate NES emulation core.
//!
//! This crate wires the CPU, PPU, APU, and cartridge mapper crates together
//! behind a single [`Console`], driven by a master-clock scheduler that
//! interleaves CPU/PPU/APU stepping in the order real hardware does.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                         Console                            │
//! │  ┌───────────────────────────────────────────────────┐    │
//! │  │                      NesBus                        │    │
//! │  │  ┌─────┐  ┌─────┐  ┌─────┐  ┌────────┐  ┌───────┐ │    │
//! │  │  │ RAM │  │ PPU │  │ APU │  │ Mapper │  │ Input │ │    │
//! │  │  └─────┘  └─────┘  └─────┘  └────────┘  └───────┘ │    │
//! │  └───────────────────────────────────────────────────┘    │
//! │                          ▲                                 │
//! │                     ┌────┴────┐                            │
//! │                     │   CPU   │                            │
//! │                     └─────────┘                            │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ```no_run
//! use nesemu_core::Console;
//!
//! let rom_data = std::fs::read("game.nes").expect("failed to read ROM");
//! let mut console = Console::load_rom(&rom_data).expect("failed to build console");
//!
//! loop {
//!     console.set_button(0, nesemu_core::Button::A, true);
//!     console.run_frame();
//!     let _framebuffer = console.framebuffer();
//!     let _audio = console.audio_drain();
//! #   break;
//! }
//! ```

mod bus;
mod console;
mod input;
pub mod palette;

pub use bus::NesBus;
pub use console::{timing, Console, ConsoleError, DebugSnapshot};
pub use input::{Button, Controller};

pub use nesemu_apu::Apu;
pub use nesemu_cartridge::{create_mapper, Mapper, Mirroring, Rom, RomError, RomHeader};
pub use nesemu_cpu::Cpu;
pub use nesemu_ppu::Ppu;

/// Crate version, as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed NES screen dimensions.
pub mod screen {
    /// Screen width in pixels.
    pub const WIDTH: usize = 256;
    /// Screen height in pixels.
    pub const HEIGHT: usize = 240;
    /// Total pixels per frame.
    pub const PIXELS: usize = WIDTH * HEIGHT;
    /// Bytes per frame, packed 8-bit RGB (3 bytes/pixel).
    pub const FRAMEBUFFER_SIZE: usize = PIXELS * 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_constants_match_the_2c02s_visible_area() {
        assert_eq!(screen::WIDTH, 256);
        assert_eq!(screen::HEIGHT, 240);
        assert_eq!(screen::PIXELS, 61_440);
        assert_eq!(screen::FRAMEBUFFER_SIZE, 184_320);
    }

    #[test]
    fn timing_constants_match_the_ntsc_master_clock() {
        assert_eq!(timing::MASTER_CLOCK_NTSC, 21_477_272);
        assert_eq!(timing::CPU_CYCLES_PER_FRAME, 29_780);
    }
}
