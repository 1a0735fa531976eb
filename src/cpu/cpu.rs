use std::fmt;

use log::{Level, error, log_enabled, trace};
use thiserror::Error;

use crate::{
    bus::Bus,
    cpu::{
        flags::{
            FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT_DISABLE, FLAG_NEGATIVE,
            FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO,
        },
        opcodes::{AddressingMode, Instruction, OPCODES},
        trace::TraceLine,
    },
};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken to push state and jump through an interrupt vector.
const INTERRUPT_CYCLES: u64 = 7;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CpuError {
    /// A JAM opcode, or an undocumented one while they are disabled. The CPU stays halted
    /// on it until reset.
    #[error("unsupported opcode ${opcode:02X} at ${pc:04X}")]
    UnsupportedOpcode { opcode: u8, pc: u16 },
}

/// Register snapshot handed to step observers and debuggers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub cycles: u64,
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc, self.a, self.x, self.y, self.status, self.sp, self.cycles
        )
    }
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub cycles: u64,
    pub bus: B,
    /// Opcode the CPU stopped on, if any.
    pub halted: Option<u8>,
    /// Execute undocumented opcodes instead of halting on them.
    pub illegal_opcodes: bool,
    /// Emit a trace line per instruction when trace logging is also enabled.
    pub trace: bool,
}

impl<B: Bus> CPU<B> {
    pub fn new(bus: B) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            status: FLAG_INTERRUPT_DISABLE | FLAG_UNUSED,
            cycles: 0,
            bus,
            halted: None,
            illegal_opcodes: true,
            trace: false,
        }
    }

    pub fn reset(&mut self) {
        self.pc = self.read_word(RESET_VECTOR);

        self.sp = 0xFD; // three phantom pushes during the reset sequence
        self.status = FLAG_INTERRUPT_DISABLE | FLAG_UNUSED;

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.halted = None;

        self.cycles = 7;
    }

    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status,
            cycles: self.cycles,
        }
    }

    /// Service a pending interrupt or execute one instruction. Returns the CPU cycles consumed,
    /// including any DMA stall the bus charged meanwhile.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        if let Some(opcode) = self.halted {
            return Err(CpuError::UnsupportedOpcode { opcode, pc: self.pc });
        }

        let start = self.cycles;

        if self.bus.poll_nmi() {
            self.interrupt(NMI_VECTOR);
        } else if self.status & FLAG_INTERRUPT_DISABLE == 0 && self.bus.poll_irq() {
            self.interrupt(IRQ_VECTOR);
        } else {
            self.execute()?;
        }

        self.cycles += self.bus.take_stall_cycles() as u64;
        Ok((self.cycles - start) as u32)
    }

    fn execute(&mut self) -> Result<(), CpuError> {
        if self.trace && log_enabled!(Level::Trace) {
            trace!("{}", TraceLine::capture(self));
        }

        let pc = self.pc;
        let opcode = self.fetch_byte();
        let entry = OPCODES[opcode as usize];

        if entry.instruction == Instruction::JAM || (!entry.documented && !self.illegal_opcodes) {
            self.pc = pc;
            self.halted = Some(opcode);
            error!("CPU halted on opcode ${:02X} at ${:04X}", opcode, pc);
            return Err(CpuError::UnsupportedOpcode { opcode, pc });
        }

        let (addr, crossed) = self.operand_address(entry.mode);
        self.cycles += entry.cycles as u64;
        if crossed && entry.page_penalty {
            self.cycles += 1;
        }

        self.run(entry.instruction, entry.mode, addr, crossed);
        Ok(())
    }

    fn fetch_byte(&mut self) -> u8 {
        let byte = self.bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }

    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.bus.read(addr) as u16;
        let hi = self.bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Read a pointer from the zero page; the high byte wraps within page zero.
    fn read_zero_page_word(&mut self, ptr: u8) -> u16 {
        let lo = self.bus.read(ptr as u16) as u16;
        let hi = self.bus.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    /// Resolve the effective address for `mode`, consuming operand bytes. The flag reports
    /// whether indexing crossed a page.
    fn operand_address(&mut self, mode: AddressingMode) -> (u16, bool) {
        match mode {
            AddressingMode::Imp | AddressingMode::Acc => (0, false),
            AddressingMode::Imm => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            AddressingMode::Zp0 => (self.fetch_byte() as u16, false),
            AddressingMode::Zpx => (self.fetch_byte().wrapping_add(self.x) as u16, false),
            AddressingMode::Zpy => (self.fetch_byte().wrapping_add(self.y) as u16, false),
            AddressingMode::Abs => (self.fetch_word(), false),
            AddressingMode::Abx => {
                let base = self.fetch_word();
                indexed(base, self.x)
            }
            AddressingMode::Aby => {
                let base = self.fetch_word();
                indexed(base, self.y)
            }
            AddressingMode::Ind => {
                let ptr = self.fetch_word();
                let lo = self.bus.read(ptr) as u16;
                // The high byte never carries into the next page.
                let hi = self.bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                ((hi << 8) | lo, false)
            }
            AddressingMode::Izx => {
                let ptr = self.fetch_byte().wrapping_add(self.x);
                (self.read_zero_page_word(ptr), false)
            }
            AddressingMode::Izy => {
                let ptr = self.fetch_byte();
                let base = self.read_zero_page_word(ptr);
                indexed(base, self.y)
            }
            AddressingMode::Rel => {
                let offset = self.fetch_byte() as i8;
                let target = self.pc.wrapping_add(offset as u16);
                (target, (target & 0xFF00) != (self.pc & 0xFF00))
            }
        }
    }

    fn run(&mut self, instruction: Instruction, mode: AddressingMode, addr: u16, crossed: bool) {
        use Instruction::*;

        match instruction {
            ADC => {
                let value = self.bus.read(addr);
                self.add_with_carry(value);
            }
            SBC => {
                let value = self.bus.read(addr);
                self.add_with_carry(!value);
            }
            AND => {
                self.a &= self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            ORA => {
                self.a |= self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            EOR => {
                self.a ^= self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            ASL => {
                self.modify(mode, addr, Self::asl);
            }
            LSR => {
                self.modify(mode, addr, Self::lsr);
            }
            ROL => {
                self.modify(mode, addr, Self::rol);
            }
            ROR => {
                self.modify(mode, addr, Self::ror);
            }
            INC => {
                self.modify(mode, addr, Self::inc);
            }
            DEC => {
                self.modify(mode, addr, Self::dec);
            }
            BIT => {
                let value = self.bus.read(addr);
                self.set_flag(FLAG_ZERO, self.a & value == 0);
                self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
                self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
            }

            BCC => self.branch(self.status & FLAG_CARRY == 0, addr, crossed),
            BCS => self.branch(self.status & FLAG_CARRY != 0, addr, crossed),
            BNE => self.branch(self.status & FLAG_ZERO == 0, addr, crossed),
            BEQ => self.branch(self.status & FLAG_ZERO != 0, addr, crossed),
            BPL => self.branch(self.status & FLAG_NEGATIVE == 0, addr, crossed),
            BMI => self.branch(self.status & FLAG_NEGATIVE != 0, addr, crossed),
            BVC => self.branch(self.status & FLAG_OVERFLOW == 0, addr, crossed),
            BVS => self.branch(self.status & FLAG_OVERFLOW != 0, addr, crossed),

            BRK => {
                // Skip the padding byte.
                self.pc = self.pc.wrapping_add(1);
                self.push_word(self.pc);
                self.push(self.status | FLAG_BREAK | FLAG_UNUSED);
                self.status |= FLAG_INTERRUPT_DISABLE;
                self.pc = self.read_word(IRQ_VECTOR);
            }
            RTI => {
                self.status = (self.pop() & !FLAG_BREAK) | FLAG_UNUSED;
                self.pc = self.pop_word();
            }
            JMP => self.pc = addr,
            JSR => {
                self.push_word(self.pc.wrapping_sub(1));
                self.pc = addr;
            }
            RTS => self.pc = self.pop_word().wrapping_add(1),

            CLC => self.status &= !FLAG_CARRY,
            SEC => self.status |= FLAG_CARRY,
            CLI => self.status &= !FLAG_INTERRUPT_DISABLE,
            SEI => self.status |= FLAG_INTERRUPT_DISABLE,
            CLD => self.status &= !FLAG_DECIMAL,
            SED => self.status |= FLAG_DECIMAL,
            CLV => self.status &= !FLAG_OVERFLOW,

            CMP => {
                let value = self.bus.read(addr);
                self.compare(self.a, value);
            }
            CPX => {
                let value = self.bus.read(addr);
                self.compare(self.x, value);
            }
            CPY => {
                let value = self.bus.read(addr);
                self.compare(self.y, value);
            }

            LDA => {
                self.a = self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            LDX => {
                self.x = self.bus.read(addr);
                self.update_zero_and_negative_flags(self.x);
            }
            LDY => {
                self.y = self.bus.read(addr);
                self.update_zero_and_negative_flags(self.y);
            }
            STA => self.bus.write(addr, self.a),
            STX => self.bus.write(addr, self.x),
            STY => self.bus.write(addr, self.y),

            DEX => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.x);
            }
            DEY => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.y);
            }
            INX => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.x);
            }
            INY => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.y);
            }

            TAX => {
                self.x = self.a;
                self.update_zero_and_negative_flags(self.x);
            }
            TAY => {
                self.y = self.a;
                self.update_zero_and_negative_flags(self.y);
            }
            TSX => {
                self.x = self.sp;
                self.update_zero_and_negative_flags(self.x);
            }
            TXA => {
                self.a = self.x;
                self.update_zero_and_negative_flags(self.a);
            }
            TYA => {
                self.a = self.y;
                self.update_zero_and_negative_flags(self.a);
            }
            TXS => self.sp = self.x,

            PHA => self.push(self.a),
            PHP => self.push(self.status | FLAG_BREAK | FLAG_UNUSED),
            PLA => {
                self.a = self.pop();
                self.update_zero_and_negative_flags(self.a);
            }
            PLP => self.status = (self.pop() & !FLAG_BREAK) | FLAG_UNUSED,

            NOP => {
                // Multi-byte NOPs still perform their read.
                if !matches!(mode, AddressingMode::Imp | AddressingMode::Acc) {
                    self.bus.read(addr);
                }
            }

            // Undocumented
            ALR => {
                self.a &= self.bus.read(addr);
                self.a = self.lsr(self.a);
            }
            ANC => {
                self.a &= self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
                self.set_flag(FLAG_CARRY, self.a & 0x80 != 0);
            }
            ARR => {
                let value = self.a & self.bus.read(addr);
                let carry_in = (self.status & FLAG_CARRY) << 7;
                self.a = (value >> 1) | carry_in;
                self.update_zero_and_negative_flags(self.a);
                let bit6 = self.a & 0x40 != 0;
                let bit5 = self.a & 0x20 != 0;
                self.set_flag(FLAG_CARRY, bit6);
                self.set_flag(FLAG_OVERFLOW, bit6 ^ bit5);
            }
            AXS => {
                let value = self.bus.read(addr);
                let masked = self.a & self.x;
                self.set_flag(FLAG_CARRY, masked >= value);
                self.x = masked.wrapping_sub(value);
                self.update_zero_and_negative_flags(self.x);
            }
            DCP => {
                let result = self.modify(mode, addr, Self::dec);
                self.compare(self.a, result);
            }
            ISC => {
                let result = self.modify(mode, addr, Self::inc);
                self.add_with_carry(!result);
            }
            LAS => {
                let value = self.bus.read(addr) & self.sp;
                self.a = value;
                self.x = value;
                self.sp = value;
                self.update_zero_and_negative_flags(value);
            }
            LAX => {
                let value = self.bus.read(addr);
                self.a = value;
                self.x = value;
                self.update_zero_and_negative_flags(value);
            }
            LXA => {
                self.a = (self.a | UNSTABLE_MAGIC) & self.bus.read(addr);
                self.x = self.a;
                self.update_zero_and_negative_flags(self.a);
            }
            XAA => {
                self.a = (self.a | UNSTABLE_MAGIC) & self.x & self.bus.read(addr);
                self.update_zero_and_negative_flags(self.a);
            }
            RLA => {
                let result = self.modify(mode, addr, Self::rol);
                self.a &= result;
                self.update_zero_and_negative_flags(self.a);
            }
            RRA => {
                let result = self.modify(mode, addr, Self::ror);
                self.add_with_carry(result);
            }
            SLO => {
                let result = self.modify(mode, addr, Self::asl);
                self.a |= result;
                self.update_zero_and_negative_flags(self.a);
            }
            SRE => {
                let result = self.modify(mode, addr, Self::lsr);
                self.a ^= result;
                self.update_zero_and_negative_flags(self.a);
            }
            SAX => self.bus.write(addr, self.a & self.x),
            SHA => self.store_high_and(addr, crossed, self.a & self.x),
            SHX => self.store_high_and(addr, crossed, self.x),
            SHY => self.store_high_and(addr, crossed, self.y),
            TAS => {
                self.sp = self.a & self.x;
                self.store_high_and(addr, crossed, self.sp);
            }

            // Rejected before dispatch.
            JAM => {}
        }
    }

    /// Apply a read-modify-write operation to A or memory and return the result.
    fn modify(&mut self, mode: AddressingMode, addr: u16, op: fn(&mut Self, u8) -> u8) -> u8 {
        if mode == AddressingMode::Acc {
            let value = self.a;
            self.a = op(self, value);
            return self.a;
        }

        let value = self.bus.read(addr);
        // The unmodified value is written back first.
        self.bus.write(addr, value);
        let result = op(self, value);
        self.bus.write(addr, result);
        result
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.status & FLAG_CARRY;
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.status & FLAG_CARRY) << 7;
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.update_zero_and_negative_flags(result);
        result
    }

    fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.update_zero_and_negative_flags(result);
        result
    }

    fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.update_zero_and_negative_flags(result);
        result
    }

    /// Binary ADC; decimal mode does not exist on the 2A03.
    fn add_with_carry(&mut self, value: u8) {
        let carry_in = (self.status & FLAG_CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;

        self.set_flag(FLAG_CARRY, sum > 0xFF);
        self.set_flag(
            FLAG_OVERFLOW,
            (!(self.a ^ value) & (self.a ^ result)) & 0x80 != 0,
        );

        self.a = result;
        self.update_zero_and_negative_flags(self.a);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.set_flag(FLAG_CARRY, register >= value);
        self.update_zero_and_negative_flags(register.wrapping_sub(value));
    }

    fn branch(&mut self, condition: bool, target: u16, crossed: bool) {
        if condition {
            self.pc = target;
            self.cycles += if crossed { 2 } else { 1 };
        }
    }

    /// SHA/SHX/SHY/TAS store `value & (H + 1)`, H being the high byte of the unindexed
    /// address. A page cross replaces the target's high byte with the stored value.
    fn store_high_and(&mut self, addr: u16, crossed: bool, value: u8) {
        let high = (addr >> 8) as u8;
        let base_high_plus_one = if crossed { high } else { high.wrapping_add(1) };
        let data = value & base_high_plus_one;
        let target = if crossed {
            ((data as u16) << 8) | (addr & 0x00FF)
        } else {
            addr
        };
        self.bus.write(target, data);
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    fn interrupt(&mut self, vector: u16) {
        self.push_word(self.pc);
        self.push((self.status & !FLAG_BREAK) | FLAG_UNUSED);
        self.status |= FLAG_INTERRUPT_DISABLE;
        self.pc = self.read_word(vector);
        self.cycles += INTERRUPT_CYCLES;
    }

    fn push(&mut self, value: u8) {
        let addr = 0x0100 | self.sp as u16;
        self.bus.write(addr, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    fn pop(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = 0x0100 | self.sp as u16;
        self.bus.read(addr)
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }
}

/// Constant ORed into A by the unstable XAA/LXA opcodes.
const UNSTABLE_MAGIC: u8 = 0xEE;

fn indexed(base: u16, index: u8) -> (u16, bool) {
    let addr = base.wrapping_add(index as u16);
    (addr, (addr & 0xFF00) != (base & 0xFF00))
}
