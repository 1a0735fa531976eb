//! [APU Noise](https://www.nesdev.org/wiki/APU_Noise) ($400C–$400F): envelope, 15-bit LFSR, period
//! from $400E, length counter.

use crate::apu::LENGTH_TABLE;
use crate::apu::envelope::Envelope;

/// NTSC period table: 4-bit index from $400E → period in CPU cycles.
const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// Pseudo-random output from a 15-bit LFSR; mode bit shortens the sequence (metallic tone).
#[derive(Debug, Clone)]
pub struct Noise {
    pub enabled: bool,
    /// Envelope loop and length counter halt.
    halt: bool,
    mode: bool,
    pub(crate) length_value: u8,
    timer_period: u16,
    timer_counter: u16,
    shift_register: u16,
    envelope: Envelope,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            enabled: false,
            halt: false,
            mode: false,
            length_value: 0,
            timer_period: NOISE_PERIOD_TABLE[0],
            timer_counter: 0,
            shift_register: 1,
            envelope: Envelope::default(),
        }
    }
}

impl Noise {
    /// $400C: --LC VVVV. Loop/halt, constant volume, volume or envelope period.
    pub fn write_control(&mut self, value: u8) {
        self.halt = value & 0x20 != 0;
        self.envelope.write_control(value);
    }

    /// $400E: M--- PPPP. LFSR mode, period index.
    pub fn write_period(&mut self, value: u8) {
        self.mode = value & 0x80 != 0;
        self.timer_period = NOISE_PERIOD_TABLE[(value & 0x0F) as usize];
    }

    /// $400F: LLLL L---. Length counter load; restarts envelope.
    pub fn write_length(&mut self, value: u8) {
        self.length_value = LENGTH_TABLE[(value >> 3) as usize];
        self.envelope.start = true;
    }

    pub fn step_timer(&mut self) {
        if self.timer_counter == 0 {
            // Table values are full periods in CPU cycles.
            self.timer_counter = self.timer_period - 1;
            let tap = if self.mode { 6 } else { 1 };
            let feedback = (self.shift_register ^ (self.shift_register >> tap)) & 1;
            self.shift_register = (self.shift_register >> 1) | (feedback << 14);
        } else {
            self.timer_counter -= 1;
        }
    }

    pub fn step_envelope(&mut self) {
        self.envelope.step(self.halt);
    }

    pub fn step_length(&mut self) {
        if !self.halt && self.length_value > 0 {
            self.length_value -= 1;
        }
    }

    pub fn output(&self) -> u8 {
        if !self.enabled || self.length_value == 0 || self.shift_register & 1 != 0 {
            return 0;
        }
        self.envelope.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lfsr_long_mode_feedback() {
        let mut n = Noise::default();
        n.step_timer();
        // bit0 (1) ^ bit1 (0) = 1 fed into bit 14.
        assert_eq!(n.shift_register, 0x4000);
    }

    #[test]
    fn lfsr_short_mode_taps_bit_six() {
        let mut n = Noise::default();
        n.write_period(0x80);
        n.shift_register = 0b100_0000;
        n.step_timer();
        assert_eq!(n.shift_register, 0x4000 | 0b10_0000);
    }

    #[test]
    fn long_mode_period_is_32767() {
        let mut n = Noise::default();
        n.write_period(0x00);
        let mut steps = 0;
        loop {
            for _ in 0..NOISE_PERIOD_TABLE[0] {
                n.step_timer();
            }
            steps += 1;
            if n.shift_register == 1 {
                break;
            }
        }
        assert_eq!(steps, 32767);
    }

    /// CPU cycles between two consecutive shift register clocks.
    fn cycles_per_shift(n: &mut Noise) -> u32 {
        n.step_timer();
        let mut cycles = 0;
        loop {
            let before = n.shift_register;
            n.step_timer();
            cycles += 1;
            if n.shift_register != before {
                return cycles;
            }
        }
    }

    #[test]
    fn lfsr_clocks_once_per_table_period() {
        for (index, &period) in NOISE_PERIOD_TABLE.iter().enumerate() {
            let mut n = Noise::default();
            n.write_period(index as u8);
            assert_eq!(cycles_per_shift(&mut n), period as u32, "index {index}");
        }
    }

    #[test]
    fn output_gated_by_low_bit_and_length() {
        let mut n = Noise {
            enabled: true,
            ..Noise::default()
        };
        n.write_control(0x1F);
        n.write_length(0x08);
        assert_eq!(n.length_value, 254);
        assert_eq!(n.output(), 0);
        n.shift_register = 2;
        assert_eq!(n.output(), 15);
    }
}
