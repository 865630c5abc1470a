//! Top-level APU: register dispatch, channel mixing, and CPU-rate to
//! 48 kHz downsampling.

use log::trace;

use crate::dmc::{Dmc, System};
use crate::frame_counter::FrameCounter;
use crate::noise::Noise;
use crate::pulse::Pulse;
use crate::sweep::PulseChannel;
use crate::triangle::Triangle;

const NTSC_CLOCK_HZ: f64 = 1_789_773.0;
const PAL_CLOCK_HZ: f64 = 1_662_607.0;
const OUTPUT_RATE_HZ: f64 = 48_000.0;

fn pulse_table() -> [f32; 31] {
    let mut table = [0.0f32; 31];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = if i == 0 { 0.0 } else { 95.52 / (8128.0 / i as f32 + 100.0) };
    }
    table
}

fn tnd_table() -> [f32; 203] {
    let mut table = [0.0f32; 203];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = if i == 0 { 0.0 } else { 163.67 / (24329.0 / i as f32 + 100.0) };
    }
    table
}

/// A fixed-capacity ring buffer for drained audio samples, sized for one
/// video frame plus overflow margin per the host-boundary drain contract.
pub struct AudioBuffer {
    samples: Vec<i16>,
}

impl AudioBuffer {
    fn new() -> Self {
        Self { samples: Vec::with_capacity(1024) }
    }

    fn push(&mut self, sample: i16) {
        self.samples.push(sample);
    }

    /// Drain and return all samples accumulated since the last drain.
    pub fn drain(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }
}

/// The complete 2A03 audio unit: five channels, frame sequencer, mixer,
/// and downsampling accumulator.
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame_counter: FrameCounter,

    cycle_parity: bool,
    cycles_per_sample: f64,
    sample_accumulator: f64,
    buffer: AudioBuffer,

    pulse_table: [f32; 31],
    tnd_table: [f32; 203],

    dmc_stall: u32,
}

impl Apu {
    /// Construct a powered-on APU for the given clock rate (NTSC or PAL).
    #[must_use]
    pub fn new(pal: bool) -> Self {
        let clock_hz = if pal { PAL_CLOCK_HZ } else { NTSC_CLOCK_HZ };
        Self {
            pulse1: Pulse::new(PulseChannel::One),
            pulse2: Pulse::new(PulseChannel::Two),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(if pal { System::Pal } else { System::Ntsc }),
            frame_counter: FrameCounter::new(),
            cycle_parity: false,
            cycles_per_sample: clock_hz / OUTPUT_RATE_HZ,
            sample_accumulator: 0.0,
            buffer: AudioBuffer::new(),
            pulse_table: pulse_table(),
            tnd_table: tnd_table(),
            dmc_stall: 0,
        }
    }

    /// Dispatch a CPU write to an APU register in `$4000..=$4017`.
    pub fn write_register(&mut self, address: u16, value: u8) {
        match address {
            0x4000 => self.pulse1.write_ctrl(value),
            0x4001 => self.pulse1.write_sweep(value),
            0x4002 => self.pulse1.write_timer_lo(value),
            0x4003 => self.pulse1.write_timer_hi(value),
            0x4004 => self.pulse2.write_ctrl(value),
            0x4005 => self.pulse2.write_sweep(value),
            0x4006 => self.pulse2.write_timer_lo(value),
            0x4007 => self.pulse2.write_timer_hi(value),
            0x4008 => self.triangle.write_linear(value),
            0x400A => self.triangle.write_timer_lo(value),
            0x400B => self.triangle.write_timer_hi(value),
            0x400C => self.noise.write_ctrl(value),
            0x400E => self.noise.write_period(value),
            0x400F => self.noise.write_length(value),
            0x4010 => self.dmc.write_register(value),
            0x4011 => self.dmc.write_output_level(value),
            0x4012 => self.dmc.write_sample_address(value),
            0x4013 => self.dmc.write_sample_length(value),
            0x4015 => self.write_status(value),
            0x4017 => self.frame_counter.write(value),
            _ => trace!("write to unmapped APU register ${address:04X}"),
        }
    }

    fn write_status(&mut self, value: u8) {
        self.pulse1.set_enabled(value & 0x01 != 0);
        self.pulse2.set_enabled(value & 0x02 != 0);
        self.triangle.set_enabled(value & 0x04 != 0);
        self.noise.set_enabled(value & 0x08 != 0);
        self.dmc.set_enabled(value & 0x10 != 0);
    }

    /// $4015 read: channel-active bits, frame IRQ, and DMC IRQ. Clears the
    /// frame-IRQ and DMC-IRQ flags as a side effect.
    pub fn read_status(&mut self) -> u8 {
        let mut value = 0;
        value |= u8::from(self.pulse1.active());
        value |= u8::from(self.pulse2.active()) << 1;
        value |= u8::from(self.triangle.active()) << 2;
        value |= u8::from(self.noise.active()) << 3;
        value |= u8::from(self.dmc.is_active()) << 4;
        value |= u8::from(self.frame_counter.irq_pending()) << 6;
        value |= u8::from(self.dmc.irq_pending()) << 7;
        self.frame_counter.clear_irq();
        self.dmc.clear_irq();
        value
    }

    /// Whether the frame sequencer or DMC is asserting an IRQ.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending() || self.dmc.irq_pending()
    }

    /// Stall cycles incurred by the most recent DMC sample fetch, consumed
    /// by the bus after each `clock()` call.
    #[must_use]
    pub fn take_dmc_stall(&mut self) -> u32 {
        let stall = self.dmc_stall;
        self.dmc_stall = 0;
        stall
    }

    /// Advance the APU by one CPU cycle. `read_memory` services DMC sample
    /// fetches against PRG space.
    pub fn clock<F: FnMut(u16) -> u8>(&mut self, read_memory: F) {
        let event = self.frame_counter.clock();
        if event.quarter_frame {
            self.pulse1.clock_envelope();
            self.pulse2.clock_envelope();
            self.triangle.clock_linear_counter();
            self.noise.clock_envelope();
        }
        if event.half_frame {
            self.pulse1.clock_length();
            self.pulse1.clock_sweep();
            self.pulse2.clock_length();
            self.pulse2.clock_sweep();
            self.triangle.clock_length();
            self.noise.clock_length();
        }

        // Pulse, noise, and DMC timers are clocked on the CPU-clock's own
        // cadence via an internal divide-by-two (we fold that into the
        // parity flag); the triangle's timer runs at the full CPU rate.
        self.triangle.clock_timer();
        if self.cycle_parity {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
        }
        self.cycle_parity = !self.cycle_parity;

        self.dmc_stall += self.dmc.clock_timer(read_memory);

        self.sample_accumulator += 1.0;
        if self.sample_accumulator >= self.cycles_per_sample {
            self.sample_accumulator -= self.cycles_per_sample;
            let sample = self.mix();
            self.buffer.push((sample * 32000.0).clamp(-32768.0, 32767.0) as i16);
        }
    }

    fn mix(&self) -> f32 {
        let pulse_sum = usize::from(self.pulse1.output() + self.pulse2.output());
        let tnd_sum = usize::from(3 * self.triangle.output() + 2 * self.noise.output())
            + usize::from(self.dmc.output());
        self.pulse_table[pulse_sum.min(30)] + self.tnd_table[tnd_sum.min(202)]
    }

    /// Drain and return every PCM sample accumulated since the previous
    /// drain, as signed 16-bit mono at 48 kHz.
    pub fn audio_drain(&mut self) -> Vec<i16> {
        self.buffer.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_read_clears_frame_irq() {
        let mut apu = Apu::new(false);
        apu.write_register(0x4017, 0x00);
        for _ in 0..FOUR_STEP_IRQ_CYCLE {
            apu.clock(|_| 0);
        }
        assert!(apu.irq_pending());
        let status = apu.read_status();
        assert_ne!(status & 0x40, 0);
        assert!(!apu.irq_pending());
    }

    #[test]
    fn silent_apu_mixes_to_zero() {
        let mut apu = Apu::new(false);
        for _ in 0..1000 {
            apu.clock(|_| 0);
        }
        let samples = apu.audio_drain();
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn enabling_pulse_produces_nonzero_samples() {
        let mut apu = Apu::new(false);
        apu.write_register(0x4015, 0x01);
        apu.write_register(0x4000, 0x3F);
        apu.write_register(0x4002, 0x10);
        apu.write_register(0x4003, 0x00);
        for _ in 0..1000 {
            apu.clock(|_| 0);
        }
        let samples = apu.audio_drain();
        assert!(samples.iter().any(|&s| s != 0));
    }

    const FOUR_STEP_IRQ_CYCLE: u32 = 29830;
}
