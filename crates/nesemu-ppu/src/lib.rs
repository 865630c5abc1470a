//! Cycle-accurate Ricoh 2C02 PPU core.
//!
//! [`Ppu`] is driven one dot at a time by the host's scheduler (3 PPU dots
//! per CPU cycle on NTSC). It owns its own VRAM, OAM, and palette RAM, and
//! talks to the cartridge only through the [`nesemu_cartridge::Mapper`]
//! trait for CHR and nametable-mirroring decisions.

mod background;
mod oam;
mod ppu;
mod registers;
mod scroll;
mod sprites;
mod timing;
mod vram;

pub use oam::SpriteEntry;
pub use ppu::{Pixel, Ppu, HEIGHT, WIDTH};
pub use registers::{Ctrl, Mask, StatusFlags};
pub use scroll::Scroll;
pub use timing::Timing;
