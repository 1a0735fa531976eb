//! 2A03 opcode table: instruction, addressing mode and base cycle count for all 256 opcodes.
//!
//! Base cycles come from the [6502 instruction reference](https://www.nesdev.org/wiki/6502_instructions);
//! `page_penalty` marks reads that take one more cycle when indexing crosses a page. Branch
//! timing is handled at execution. Undocumented opcodes follow
//! [CPU unofficial opcodes](https://www.nesdev.org/wiki/CPU_unofficial_opcodes).

/// Mnemonics, documented first, then the undocumented set.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,

    ALR, ANC, ARR, AXS, DCP, ISC, JAM, LAS, LAX, LXA, RLA, RRA, SAX, SHA,
    SHX, SHY, SLO, SRE, TAS, XAA,
}

/// Operand addressing modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    /// Implied
    Imp,
    /// Accumulator
    Acc,
    /// #$nn
    Imm,
    /// $nn
    Zp0,
    /// $nn,X
    Zpx,
    /// $nn,Y
    Zpy,
    /// $nnnn
    Abs,
    /// $nnnn,X
    Abx,
    /// $nnnn,Y
    Aby,
    /// ($nnnn)
    Ind,
    /// ($nn,X)
    Izx,
    /// ($nn),Y
    Izy,
    /// Branch offset
    Rel,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub fn operand_len(self) -> u16 {
        match self {
            Imp | Acc => 0,
            Imm | Zp0 | Zpx | Zpy | Izx | Izy | Rel => 1,
            Abs | Abx | Aby | Ind => 2,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Opcode {
    pub instruction: Instruction,
    pub mode: AddressingMode,
    pub cycles: u8,
    pub page_penalty: bool,
    pub documented: bool,
}

const fn op(instruction: Instruction, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode { instruction, mode, cycles, page_penalty: false, documented: true }
}

const fn opp(instruction: Instruction, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode { instruction, mode, cycles, page_penalty: true, documented: true }
}

const fn ill(instruction: Instruction, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode { instruction, mode, cycles, page_penalty: false, documented: false }
}

const fn illp(instruction: Instruction, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode { instruction, mode, cycles, page_penalty: true, documented: false }
}

const JAM_: Opcode = ill(JAM, Imp, 2);

use AddressingMode::*;
use Instruction::*;

/// Indexed by opcode byte; one row per high nibble.
#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // 0x00
    op(BRK, Imp, 7), op(ORA, Izx, 6), JAM_, ill(SLO, Izx, 8), ill(NOP, Zp0, 3), op(ORA, Zp0, 3), op(ASL, Zp0, 5), ill(SLO, Zp0, 5),
    op(PHP, Imp, 3), op(ORA, Imm, 2), op(ASL, Acc, 2), ill(ANC, Imm, 2), ill(NOP, Abs, 4), op(ORA, Abs, 4), op(ASL, Abs, 6), ill(SLO, Abs, 6),
    // 0x10
    op(BPL, Rel, 2), opp(ORA, Izy, 5), JAM_, ill(SLO, Izy, 8), ill(NOP, Zpx, 4), op(ORA, Zpx, 4), op(ASL, Zpx, 6), ill(SLO, Zpx, 6),
    op(CLC, Imp, 2), opp(ORA, Aby, 4), ill(NOP, Imp, 2), ill(SLO, Aby, 7), illp(NOP, Abx, 4), opp(ORA, Abx, 4), op(ASL, Abx, 7), ill(SLO, Abx, 7),
    // 0x20
    op(JSR, Abs, 6), op(AND, Izx, 6), JAM_, ill(RLA, Izx, 8), op(BIT, Zp0, 3), op(AND, Zp0, 3), op(ROL, Zp0, 5), ill(RLA, Zp0, 5),
    op(PLP, Imp, 4), op(AND, Imm, 2), op(ROL, Acc, 2), ill(ANC, Imm, 2), op(BIT, Abs, 4), op(AND, Abs, 4), op(ROL, Abs, 6), ill(RLA, Abs, 6),
    // 0x30
    op(BMI, Rel, 2), opp(AND, Izy, 5), JAM_, ill(RLA, Izy, 8), ill(NOP, Zpx, 4), op(AND, Zpx, 4), op(ROL, Zpx, 6), ill(RLA, Zpx, 6),
    op(SEC, Imp, 2), opp(AND, Aby, 4), ill(NOP, Imp, 2), ill(RLA, Aby, 7), illp(NOP, Abx, 4), opp(AND, Abx, 4), op(ROL, Abx, 7), ill(RLA, Abx, 7),
    // 0x40
    op(RTI, Imp, 6), op(EOR, Izx, 6), JAM_, ill(SRE, Izx, 8), ill(NOP, Zp0, 3), op(EOR, Zp0, 3), op(LSR, Zp0, 5), ill(SRE, Zp0, 5),
    op(PHA, Imp, 3), op(EOR, Imm, 2), op(LSR, Acc, 2), ill(ALR, Imm, 2), op(JMP, Abs, 3), op(EOR, Abs, 4), op(LSR, Abs, 6), ill(SRE, Abs, 6),
    // 0x50
    op(BVC, Rel, 2), opp(EOR, Izy, 5), JAM_, ill(SRE, Izy, 8), ill(NOP, Zpx, 4), op(EOR, Zpx, 4), op(LSR, Zpx, 6), ill(SRE, Zpx, 6),
    op(CLI, Imp, 2), opp(EOR, Aby, 4), ill(NOP, Imp, 2), ill(SRE, Aby, 7), illp(NOP, Abx, 4), opp(EOR, Abx, 4), op(LSR, Abx, 7), ill(SRE, Abx, 7),
    // 0x60
    op(RTS, Imp, 6), op(ADC, Izx, 6), JAM_, ill(RRA, Izx, 8), ill(NOP, Zp0, 3), op(ADC, Zp0, 3), op(ROR, Zp0, 5), ill(RRA, Zp0, 5),
    op(PLA, Imp, 4), op(ADC, Imm, 2), op(ROR, Acc, 2), ill(ARR, Imm, 2), op(JMP, Ind, 5), op(ADC, Abs, 4), op(ROR, Abs, 6), ill(RRA, Abs, 6),
    // 0x70
    op(BVS, Rel, 2), opp(ADC, Izy, 5), JAM_, ill(RRA, Izy, 8), ill(NOP, Zpx, 4), op(ADC, Zpx, 4), op(ROR, Zpx, 6), ill(RRA, Zpx, 6),
    op(SEI, Imp, 2), opp(ADC, Aby, 4), ill(NOP, Imp, 2), ill(RRA, Aby, 7), illp(NOP, Abx, 4), opp(ADC, Abx, 4), op(ROR, Abx, 7), ill(RRA, Abx, 7),
    // 0x80
    ill(NOP, Imm, 2), op(STA, Izx, 6), ill(NOP, Imm, 2), ill(SAX, Izx, 6), op(STY, Zp0, 3), op(STA, Zp0, 3), op(STX, Zp0, 3), ill(SAX, Zp0, 3),
    op(DEY, Imp, 2), ill(NOP, Imm, 2), op(TXA, Imp, 2), ill(XAA, Imm, 2), op(STY, Abs, 4), op(STA, Abs, 4), op(STX, Abs, 4), ill(SAX, Abs, 4),
    // 0x90
    op(BCC, Rel, 2), op(STA, Izy, 6), JAM_, ill(SHA, Izy, 6), op(STY, Zpx, 4), op(STA, Zpx, 4), op(STX, Zpy, 4), ill(SAX, Zpy, 4),
    op(TYA, Imp, 2), op(STA, Aby, 5), op(TXS, Imp, 2), ill(TAS, Aby, 5), ill(SHY, Abx, 5), op(STA, Abx, 5), ill(SHX, Aby, 5), ill(SHA, Aby, 5),
    // 0xA0
    op(LDY, Imm, 2), op(LDA, Izx, 6), op(LDX, Imm, 2), ill(LAX, Izx, 6), op(LDY, Zp0, 3), op(LDA, Zp0, 3), op(LDX, Zp0, 3), ill(LAX, Zp0, 3),
    op(TAY, Imp, 2), op(LDA, Imm, 2), op(TAX, Imp, 2), ill(LXA, Imm, 2), op(LDY, Abs, 4), op(LDA, Abs, 4), op(LDX, Abs, 4), ill(LAX, Abs, 4),
    // 0xB0
    op(BCS, Rel, 2), opp(LDA, Izy, 5), JAM_, illp(LAX, Izy, 5), op(LDY, Zpx, 4), op(LDA, Zpx, 4), op(LDX, Zpy, 4), ill(LAX, Zpy, 4),
    op(CLV, Imp, 2), opp(LDA, Aby, 4), op(TSX, Imp, 2), illp(LAS, Aby, 4), opp(LDY, Abx, 4), opp(LDA, Abx, 4), opp(LDX, Aby, 4), illp(LAX, Aby, 4),
    // 0xC0
    op(CPY, Imm, 2), op(CMP, Izx, 6), ill(NOP, Imm, 2), ill(DCP, Izx, 8), op(CPY, Zp0, 3), op(CMP, Zp0, 3), op(DEC, Zp0, 5), ill(DCP, Zp0, 5),
    op(INY, Imp, 2), op(CMP, Imm, 2), op(DEX, Imp, 2), ill(AXS, Imm, 2), op(CPY, Abs, 4), op(CMP, Abs, 4), op(DEC, Abs, 6), ill(DCP, Abs, 6),
    // 0xD0
    op(BNE, Rel, 2), opp(CMP, Izy, 5), JAM_, ill(DCP, Izy, 8), ill(NOP, Zpx, 4), op(CMP, Zpx, 4), op(DEC, Zpx, 6), ill(DCP, Zpx, 6),
    op(CLD, Imp, 2), opp(CMP, Aby, 4), ill(NOP, Imp, 2), ill(DCP, Aby, 7), illp(NOP, Abx, 4), opp(CMP, Abx, 4), op(DEC, Abx, 7), ill(DCP, Abx, 7),
    // 0xE0
    op(CPX, Imm, 2), op(SBC, Izx, 6), ill(NOP, Imm, 2), ill(ISC, Izx, 8), op(CPX, Zp0, 3), op(SBC, Zp0, 3), op(INC, Zp0, 5), ill(ISC, Zp0, 5),
    op(INX, Imp, 2), op(SBC, Imm, 2), op(NOP, Imp, 2), ill(SBC, Imm, 2), op(CPX, Abs, 4), op(SBC, Abs, 4), op(INC, Abs, 6), ill(ISC, Abs, 6),
    // 0xF0
    op(BEQ, Rel, 2), opp(SBC, Izy, 5), JAM_, ill(ISC, Izy, 8), ill(NOP, Zpx, 4), op(SBC, Zpx, 4), op(INC, Zpx, 6), ill(ISC, Zpx, 6),
    op(SED, Imp, 2), opp(SBC, Aby, 4), ill(NOP, Imp, 2), ill(ISC, Aby, 7), illp(NOP, Abx, 4), opp(SBC, Abx, 4), op(INC, Abx, 7), ill(ISC, Abx, 7),
];
