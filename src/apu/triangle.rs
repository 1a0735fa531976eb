//! [APU Triangle](https://www.nesdev.org/wiki/APU_Triangle) ($4008–$400B): linear counter (7-bit),
//! length counter, 32-step triangle wave. Timer runs at CPU cycle rate.

use crate::apu::LENGTH_TABLE;

/// 32-step waveform: 15 down to 0, then 0 up to 15. No volume control.
const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
    13, 14, 15,
];

#[derive(Default, Debug, Clone)]
pub struct Triangle {
    pub enabled: bool,
    /// Bit 7 of $4008: linear counter control and length counter halt.
    control: bool,
    pub(crate) length_value: u8,
    timer_period: u16,
    timer_counter: u16,
    sequence_step: u8,
    linear_period: u8,
    linear_counter: u8,
    linear_reload: bool,
}

impl Triangle {
    /// $4008: CRRR RRRR. Control/halt flag, linear counter reload value.
    pub fn write_control(&mut self, value: u8) {
        self.control = value & 0x80 != 0;
        self.linear_period = value & 0x7F;
    }

    /// $400A: timer low 8 bits.
    pub fn write_timer_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0xFF00) | value as u16;
    }

    /// $400B: length counter load, timer high 3 bits; arms a linear counter reload.
    pub fn write_timer_high(&mut self, value: u8) {
        self.length_value = LENGTH_TABLE[(value >> 3) as usize];
        self.timer_period = (self.timer_period & 0x00FF) | ((value & 7) as u16) << 8;
        self.timer_counter = self.timer_period;
        self.linear_reload = true;
    }

    pub fn step_timer(&mut self) {
        if self.timer_counter == 0 {
            self.timer_counter = self.timer_period;
            if self.length_value > 0 && self.linear_counter > 0 {
                self.sequence_step = (self.sequence_step + 1) & 31;
            }
        } else {
            self.timer_counter -= 1;
        }
    }

    pub fn step_length(&mut self) {
        if !self.control && self.length_value > 0 {
            self.length_value -= 1;
        }
    }

    /// Quarter-frame clock of the linear counter.
    pub fn step_linear(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_period;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    pub fn output(&self) -> u8 {
        if !self.enabled
            || self.length_value == 0
            || self.linear_counter == 0
            || self.timer_period < 2
        {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.sequence_step as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> Triangle {
        let mut t = Triangle {
            enabled: true,
            ..Triangle::default()
        };
        t.write_control(0x05);
        t.write_timer_low(0x10);
        t.write_timer_high(0x00);
        t.step_linear();
        t
    }

    #[test]
    fn linear_counter_reloads_then_counts_down() {
        let mut t = playing();
        assert_eq!(t.linear_counter, 5);
        assert!(!t.linear_reload);
        t.step_linear();
        assert_eq!(t.linear_counter, 4);
    }

    #[test]
    fn control_flag_keeps_reload_armed() {
        let mut t = playing();
        t.write_control(0x83);
        t.write_timer_high(0x00);
        t.step_linear();
        t.step_linear();
        assert_eq!(t.linear_counter, 3);
        assert!(t.linear_reload);
    }

    #[test]
    fn sequencer_walks_waveform() {
        let mut t = playing();
        assert_eq!(t.output(), 15);
        for _ in 0..=0x10 {
            t.step_timer();
        }
        assert_eq!(t.output(), 14);
    }

    #[test]
    fn silent_without_linear_count() {
        let mut t = playing();
        for _ in 0..5 {
            t.step_linear();
        }
        assert_eq!(t.linear_counter, 0);
        assert_eq!(t.output(), 0);
    }

    #[test]
    fn ultrasonic_period_is_silenced() {
        let mut t = playing();
        t.write_timer_low(1);
        assert_eq!(t.output(), 0);
    }
}
