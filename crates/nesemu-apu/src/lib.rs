//! NES 2A03 integrated APU emulation: five channels, frame sequencer, and
//! non-linear mixer producing a 48 kHz mono PCM stream.

mod apu;
mod dmc;
mod envelope;
mod frame_counter;
mod length_counter;
mod noise;
mod pulse;
mod sweep;
mod timer;
mod triangle;

pub use apu::{Apu, AudioBuffer};
pub use dmc::{Dmc, System as DmcSystem, DMC_RATE_NTSC, DMC_RATE_PAL};
pub use frame_counter::{FrameCounter, FrameEvent, Mode as FrameCounterMode};
pub use noise::Noise;
pub use pulse::Pulse;
pub use sweep::PulseChannel;
pub use triangle::Triangle;
