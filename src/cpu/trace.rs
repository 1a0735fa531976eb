//! nestest-style execution trace lines.

use std::fmt;

use ansi_term::Colour::{Cyan, Green, Red, Yellow};

use crate::{
    bus::Bus,
    cpu::{
        cpu::{CPU, Registers},
        opcodes::{AddressingMode, Instruction, OPCODES},
    },
};

/// One decoded instruction plus the register state before it runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceLine {
    pub pc: u16,
    pub bytes: Vec<u8>,
    pub instruction: Instruction,
    pub mode: AddressingMode,
    pub documented: bool,
    pub regs: Registers,
}

impl TraceLine {
    /// Decode the instruction at PC without side effects on I/O.
    pub fn capture<B: Bus>(cpu: &mut CPU<B>) -> Self {
        let pc = cpu.pc;
        let opcode = cpu.bus.peek(pc);
        let entry = OPCODES[opcode as usize];

        let mut bytes = vec![opcode];
        for i in 1..=entry.mode.operand_len() {
            bytes.push(cpu.bus.peek(pc.wrapping_add(i)));
        }

        Self {
            pc,
            bytes,
            instruction: entry.instruction,
            mode: entry.mode,
            documented: entry.documented,
            regs: cpu.registers(),
        }
    }

    fn operand(&self) -> String {
        let lo = self.bytes.get(1).copied().unwrap_or(0);
        let word = u16::from_le_bytes([lo, self.bytes.get(2).copied().unwrap_or(0)]);

        match self.mode {
            AddressingMode::Imp => String::new(),
            AddressingMode::Acc => "A".to_string(),
            AddressingMode::Imm => format!("#${lo:02X}"),
            AddressingMode::Zp0 => format!("${lo:02X}"),
            AddressingMode::Zpx => format!("${lo:02X},X"),
            AddressingMode::Zpy => format!("${lo:02X},Y"),
            AddressingMode::Abs => format!("${word:04X}"),
            AddressingMode::Abx => format!("${word:04X},X"),
            AddressingMode::Aby => format!("${word:04X},Y"),
            AddressingMode::Ind => format!("(${word:04X})"),
            AddressingMode::Izx => format!("(${lo:02X},X)"),
            AddressingMode::Izy => format!("(${lo:02X}),Y"),
            AddressingMode::Rel => {
                let target = self.pc.wrapping_add(2).wrapping_add(lo as i8 as u16);
                format!("${target:04X}")
            }
        }
    }

    fn hex_bytes(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn mnemonic(&self) -> String {
        let marker = if self.documented { ' ' } else { '*' };
        format!("{marker}{:?}", self.instruction)
    }

    fn registers(&self) -> String {
        let r = &self.regs;
        format!(
            "A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            r.a, r.x, r.y, r.status, r.sp, r.cycles
        )
    }

    /// Terminal rendering with colored columns.
    pub fn colored(&self) -> String {
        let mnemonic = self.mnemonic();
        let mnemonic = if self.documented {
            Yellow.paint(mnemonic)
        } else {
            Red.paint(mnemonic)
        };

        format!(
            "{}  {:<8} {} {:<27} {}",
            Green.paint(format!("{:04X}", self.pc)),
            self.hex_bytes(),
            mnemonic,
            self.operand(),
            Cyan.paint(self.registers())
        )
    }
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}  {:<8} {} {:<27} {}",
            self.pc,
            self.hex_bytes(),
            self.mnemonic(),
            self.operand(),
            self.registers()
        )
    }
}
