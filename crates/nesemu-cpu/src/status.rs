//! 6502 processor status register.

use bitflags::bitflags;

bitflags! {
    /// Processor status flags (the `P` register).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Carry.
        const C = 0b0000_0001;
        /// Zero.
        const Z = 0b0000_0010;
        /// IRQ disable.
        const I = 0b0000_0100;
        /// Decimal mode (present but has no effect on the 2A03's ALU).
        const D = 0b0000_1000;
        /// Break (only meaningful on the value pushed to the stack).
        const B = 0b0001_0000;
        /// Unused bit, always read back as 1 when pushed.
        const U = 0b0010_0000;
        /// Overflow.
        const V = 0b0100_0000;
        /// Negative.
        const N = 0b1000_0000;
    }
}

impl Status {
    /// Power-on value: I and U set, everything else clear.
    #[must_use]
    pub const fn power_on() -> Self {
        Self::from_bits_truncate(Self::I.bits() | Self::U.bits())
    }

    /// Set or clear Z and N based on `value`.
    pub fn set_zn(&mut self, value: u8) {
        self.set(Self::Z, value == 0);
        self.set(Self::N, value & 0x80 != 0);
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::power_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_sets_i_and_u() {
        let s = Status::power_on();
        assert!(s.contains(Status::I));
        assert!(s.contains(Status::U));
        assert!(!s.contains(Status::C));
    }

    #[test]
    fn set_zn_zero() {
        let mut s = Status::empty();
        s.set_zn(0);
        assert!(s.contains(Status::Z));
        assert!(!s.contains(Status::N));
    }

    #[test]
    fn set_zn_negative() {
        let mut s = Status::empty();
        s.set_zn(0x80);
        assert!(!s.contains(Status::Z));
        assert!(s.contains(Status::N));
    }
}
