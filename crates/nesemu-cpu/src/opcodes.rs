//! Flat 256-entry opcode dispatch table.
//!
//! Each entry is `{ mnemonic, addressing mode, base cycle count }`. Extra
//! cycles for page crossings, taken branches, and read-modify-write dummy
//! writes are applied by [`crate::cpu::Cpu`] at execution time, not baked
//! into this table.

use crate::addressing::AddrMode as A;

/// Narrow enum naming every operation the executor can dispatch, including
/// the commonly emulated unofficial opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny,
    Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror,
    Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Unofficial.
    Lax, Sax, Dcp, Isc, Slo, Rla, Sre, Rra,
    /// Freezes the CPU (PC held in place) — opcodes $02,$12,...,$F2.
    Kil,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    /// Operation to perform.
    pub op: Op,
    /// Addressing mode used to resolve the operand.
    pub mode: A,
    /// Base cycle count, before page-cross/branch penalties.
    pub cycles: u8,
}

const fn e(op: Op, mode: A, cycles: u8) -> OpcodeInfo {
    OpcodeInfo { op, mode, cycles }
}

use Op::{
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld,
    Cli, Clv, Cmp, Cpx, Cpy, Dcp, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Isc, Jmp,
    Jsr, Kil, Lax, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rla, Rol,
    Ror, Rra, Rti, Rts, Sax, Sbc, Sec, Sed, Sei, Slo, Sre, Sta, Stx, Sty, Tax,
    Tay, Tsx, Txa, Txs, Tya,
};
use A::{
    Absolute as Abs, AbsoluteX as Abx, AbsoluteY as Aby, Accumulator as Acc,
    Immediate as Imm, Implied as Imp, IndexedIndirect as Izx,
    IndirectIndexed as Izy, Relative as Rel, ZeroPage as Zp, ZeroPageX as Zpx,
    ZeroPageY as Zpy,
};

/// The 256-entry opcode table, indexed by opcode byte.
pub static OPCODES: [OpcodeInfo; 256] = [
    // 0x00
    e(Brk, Imp, 7), e(Ora, Izx, 6), e(Kil, Imp, 2), e(Slo, Izx, 8),
    e(Nop, Zp, 3), e(Ora, Zp, 3), e(Asl, Zp, 5), e(Slo, Zp, 5),
    e(Php, Imp, 3), e(Ora, Imm, 2), e(Asl, Acc, 2), e(Nop, Imm, 2),
    e(Nop, Abs, 4), e(Ora, Abs, 4), e(Asl, Abs, 6), e(Slo, Abs, 6),
    // 0x10
    e(Bpl, Rel, 2), e(Ora, Izy, 5), e(Kil, Imp, 2), e(Slo, Izy, 8),
    e(Nop, Zpx, 4), e(Ora, Zpx, 4), e(Asl, Zpx, 6), e(Slo, Zpx, 6),
    e(Clc, Imp, 2), e(Ora, Aby, 4), e(Nop, Imp, 2), e(Slo, Aby, 7),
    e(Nop, Abx, 4), e(Ora, Abx, 4), e(Asl, Abx, 7), e(Slo, Abx, 7),
    // 0x20
    e(Jsr, Abs, 6), e(And, Izx, 6), e(Kil, Imp, 2), e(Rla, Izx, 8),
    e(Bit, Zp, 3), e(And, Zp, 3), e(Rol, Zp, 5), e(Rla, Zp, 5),
    e(Plp, Imp, 4), e(And, Imm, 2), e(Rol, Acc, 2), e(Nop, Imm, 2),
    e(Bit, Abs, 4), e(And, Abs, 4), e(Rol, Abs, 6), e(Rla, Abs, 6),
    // 0x30
    e(Bmi, Rel, 2), e(And, Izy, 5), e(Kil, Imp, 2), e(Rla, Izy, 8),
    e(Nop, Zpx, 4), e(And, Zpx, 4), e(Rol, Zpx, 6), e(Rla, Zpx, 6),
    e(Sec, Imp, 2), e(And, Aby, 4), e(Nop, Imp, 2), e(Rla, Aby, 7),
    e(Nop, Abx, 4), e(And, Abx, 4), e(Rol, Abx, 7), e(Rla, Abx, 7),
    // 0x40
    e(Rti, Imp, 6), e(Eor, Izx, 6), e(Kil, Imp, 2), e(Sre, Izx, 8),
    e(Nop, Zp, 3), e(Eor, Zp, 3), e(Lsr, Zp, 5), e(Sre, Zp, 5),
    e(Pha, Imp, 3), e(Eor, Imm, 2), e(Lsr, Acc, 2), e(Nop, Imm, 2),
    e(Jmp, Abs, 3), e(Eor, Abs, 4), e(Lsr, Abs, 6), e(Sre, Abs, 6),
    // 0x50
    e(Bvc, Rel, 2), e(Eor, Izy, 5), e(Kil, Imp, 2), e(Sre, Izy, 8),
    e(Nop, Zpx, 4), e(Eor, Zpx, 4), e(Lsr, Zpx, 6), e(Sre, Zpx, 6),
    e(Cli, Imp, 2), e(Eor, Aby, 4), e(Nop, Imp, 2), e(Sre, Aby, 7),
    e(Nop, Abx, 4), e(Eor, Abx, 4), e(Lsr, Abx, 7), e(Sre, Abx, 7),
    // 0x60
    e(Rts, Imp, 6), e(Adc, Izx, 6), e(Kil, Imp, 2), e(Rra, Izx, 8),
    e(Nop, Zp, 3), e(Adc, Zp, 3), e(Ror, Zp, 5), e(Rra, Zp, 5),
    e(Pla, Imp, 4), e(Adc, Imm, 2), e(Ror, Acc, 2), e(Nop, Imm, 2),
    e(Jmp, A::Indirect, 5), e(Adc, Abs, 4), e(Ror, Abs, 6), e(Rra, Abs, 6),
    // 0x70
    e(Bvs, Rel, 2), e(Adc, Izy, 5), e(Kil, Imp, 2), e(Rra, Izy, 8),
    e(Nop, Zpx, 4), e(Adc, Zpx, 4), e(Ror, Zpx, 6), e(Rra, Zpx, 6),
    e(Sei, Imp, 2), e(Adc, Aby, 4), e(Nop, Imp, 2), e(Rra, Aby, 7),
    e(Nop, Abx, 4), e(Adc, Abx, 4), e(Ror, Abx, 7), e(Rra, Abx, 7),
    // 0x80
    e(Nop, Imm, 2), e(Sta, Izx, 6), e(Nop, Imm, 2), e(Sax, Izx, 6),
    e(Sty, Zp, 3), e(Sta, Zp, 3), e(Stx, Zp, 3), e(Sax, Zp, 3),
    e(Dey, Imp, 2), e(Nop, Imm, 2), e(Txa, Imp, 2), e(Nop, Imm, 2),
    e(Sty, Abs, 4), e(Sta, Abs, 4), e(Stx, Abs, 4), e(Sax, Abs, 4),
    // 0x90
    e(Bcc, Rel, 2), e(Sta, Izy, 6), e(Kil, Imp, 2), e(Nop, Izy, 6),
    e(Sty, Zpx, 4), e(Sta, Zpx, 4), e(Stx, Zpy, 4), e(Sax, Zpy, 4),
    e(Tya, Imp, 2), e(Sta, Aby, 5), e(Txs, Imp, 2), e(Nop, Aby, 5),
    e(Nop, Abx, 5), e(Sta, Abx, 5), e(Nop, Aby, 5), e(Nop, Aby, 5),
    // 0xA0
    e(Ldy, Imm, 2), e(Lda, Izx, 6), e(Ldx, Imm, 2), e(Lax, Izx, 6),
    e(Ldy, Zp, 3), e(Lda, Zp, 3), e(Ldx, Zp, 3), e(Lax, Zp, 3),
    e(Tay, Imp, 2), e(Lda, Imm, 2), e(Tax, Imp, 2), e(Lax, Imm, 2),
    e(Ldy, Abs, 4), e(Lda, Abs, 4), e(Ldx, Abs, 4), e(Lax, Abs, 4),
    // 0xB0
    e(Bcs, Rel, 2), e(Lda, Izy, 5), e(Kil, Imp, 2), e(Lax, Izy, 5),
    e(Ldy, Zpx, 4), e(Lda, Zpx, 4), e(Ldx, Zpy, 4), e(Lax, Zpy, 4),
    e(Clv, Imp, 2), e(Lda, Aby, 4), e(Tsx, Imp, 2), e(Lax, Aby, 4),
    e(Ldy, Abx, 4), e(Lda, Abx, 4), e(Ldx, Aby, 4), e(Lax, Aby, 4),
    // 0xC0
    e(Cpy, Imm, 2), e(Cmp, Izx, 6), e(Nop, Imm, 2), e(Dcp, Izx, 8),
    e(Cpy, Zp, 3), e(Cmp, Zp, 3), e(Dec, Zp, 5), e(Dcp, Zp, 5),
    e(Iny, Imp, 2), e(Cmp, Imm, 2), e(Dex, Imp, 2), e(Nop, Imm, 2),
    e(Cpy, Abs, 4), e(Cmp, Abs, 4), e(Dec, Abs, 6), e(Dcp, Abs, 6),
    // 0xD0
    e(Bne, Rel, 2), e(Cmp, Izy, 5), e(Kil, Imp, 2), e(Dcp, Izy, 8),
    e(Nop, Zpx, 4), e(Cmp, Zpx, 4), e(Dec, Zpx, 6), e(Dcp, Zpx, 6),
    e(Cld, Imp, 2), e(Cmp, Aby, 4), e(Nop, Imp, 2), e(Dcp, Aby, 7),
    e(Nop, Abx, 4), e(Cmp, Abx, 4), e(Dec, Abx, 7), e(Dcp, Abx, 7),
    // 0xE0
    e(Cpx, Imm, 2), e(Sbc, Izx, 6), e(Nop, Imm, 2), e(Isc, Izx, 8),
    e(Cpx, Zp, 3), e(Sbc, Zp, 3), e(Inc, Zp, 5), e(Isc, Zp, 5),
    e(Inx, Imp, 2), e(Sbc, Imm, 2), e(Nop, Imp, 2), e(Sbc, Imm, 2),
    e(Cpx, Abs, 4), e(Sbc, Abs, 4), e(Inc, Abs, 6), e(Isc, Abs, 6),
    // 0xF0
    e(Beq, Rel, 2), e(Sbc, Izy, 5), e(Kil, Imp, 2), e(Isc, Izy, 8),
    e(Nop, Zpx, 4), e(Sbc, Zpx, 4), e(Inc, Zpx, 6), e(Isc, Zpx, 6),
    e(Sed, Imp, 2), e(Sbc, Aby, 4), e(Nop, Imp, 2), e(Isc, Aby, 7),
    e(Nop, Abx, 4), e(Sbc, Abx, 4), e(Inc, Abx, 7), e(Isc, Abx, 7),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_fully_populated() {
        assert_eq!(OPCODES.len(), 256);
    }

    #[test]
    fn brk_is_seven_cycles() {
        assert_eq!(OPCODES[0x00].cycles, 7);
        assert!(matches!(OPCODES[0x00].op, Op::Brk));
    }

    #[test]
    fn kil_opcodes_present() {
        for &opcode in &[0x02u8, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
            assert!(matches!(OPCODES[opcode as usize].op, Op::Kil), "opcode {opcode:#04X}");
        }
    }

    #[test]
    fn undocumented_sbc_alias() {
        assert!(matches!(OPCODES[0xEB].op, Op::Sbc));
    }

    #[test]
    fn lda_immediate_is_two_cycles() {
        assert!(matches!(OPCODES[0xA9].op, Op::Lda));
        assert!(matches!(OPCODES[0xA9].mode, A::Immediate));
        assert_eq!(OPCODES[0xA9].cycles, 2);
    }
}
