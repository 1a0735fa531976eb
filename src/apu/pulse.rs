//! [APU Pulse](https://www.nesdev.org/wiki/APU_Pulse) channels ($4000–$4003, $4004–$4007).
//!
//! Duty sequencer, envelope, sweep unit, length counter and an 11-bit timer. The timer is
//! clocked every APU cycle (every second CPU cycle).

use crate::apu::LENGTH_TABLE;
use crate::apu::envelope::Envelope;

/// Duty cycles (8 steps): 12.5%, 25%, 50%, 25% negated.
const DUTY_TABLE: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Square wave with configurable duty, volume/envelope, frequency sweep, length counter.
#[derive(Debug, Clone)]
pub struct Pulse {
    pub enabled: bool,
    /// 1 for $4000, 2 for $4004. Channel 1 negates with one's complement.
    channel: u8,
    /// Bit 5 of the control byte: envelope loop and length counter halt at once.
    halt: bool,
    pub(crate) length_value: u8,

    timer_period: u16,
    timer_counter: u16,

    duty_mode: u8,
    duty_counter: u8,

    sweep_reload: bool,
    sweep_enabled: bool,
    sweep_negate: bool,
    sweep_shift: u8,
    sweep_period: u8,
    sweep_counter: u8,

    pub(crate) envelope: Envelope,
}

impl Pulse {
    pub fn new(channel: u8) -> Self {
        Self {
            enabled: false,
            channel,
            halt: false,
            length_value: 0,
            timer_period: 0,
            timer_counter: 0,
            duty_mode: 0,
            duty_counter: 0,
            sweep_reload: false,
            sweep_enabled: false,
            sweep_negate: false,
            sweep_shift: 0,
            sweep_period: 0,
            sweep_counter: 0,
            envelope: Envelope::default(),
        }
    }

    /// $4000/$4004: DDLC VVVV. Duty, loop/halt, constant volume, volume or envelope period.
    pub fn write_control(&mut self, value: u8) {
        self.duty_mode = (value >> 6) & 3;
        self.halt = value & 0x20 != 0;
        self.envelope.write_control(value);
    }

    /// $4001/$4005: EPPP NSSS. Sweep enable, period (stored +1), negate, shift.
    pub fn write_sweep(&mut self, value: u8) {
        self.sweep_enabled = value & 0x80 != 0;
        self.sweep_period = ((value >> 4) & 7) + 1;
        self.sweep_negate = value & 0x08 != 0;
        self.sweep_shift = value & 7;
        self.sweep_reload = true;
    }

    /// $4002/$4006: timer low 8 bits.
    pub fn write_timer_low(&mut self, value: u8) {
        self.timer_period = (self.timer_period & 0xFF00) | value as u16;
    }

    /// $4003/$4007: LLLL LTTT. Length load, timer high 3 bits; restarts envelope and sequencer.
    pub fn write_timer_high(&mut self, value: u8) {
        self.length_value = LENGTH_TABLE[(value >> 3) as usize];
        self.timer_period = (self.timer_period & 0x00FF) | ((value & 7) as u16) << 8;
        self.envelope.start = true;
        self.duty_counter = 0;
    }

    pub fn step_timer(&mut self) {
        if self.timer_counter == 0 {
            self.timer_counter = self.timer_period;
            self.duty_counter = (self.duty_counter + 1) & 7;
        } else {
            self.timer_counter -= 1;
        }
    }

    pub fn step_envelope(&mut self) {
        self.envelope.step(self.halt);
    }

    pub fn step_sweep(&mut self) {
        if self.sweep_reload {
            if self.sweep_enabled && self.sweep_counter == 0 {
                self.sweep();
            }
            self.sweep_counter = self.sweep_period;
            self.sweep_reload = false;
        } else if self.sweep_counter > 0 {
            self.sweep_counter -= 1;
        } else {
            if self.sweep_enabled {
                self.sweep();
            }
            self.sweep_counter = self.sweep_period;
        }
    }

    pub fn step_length(&mut self) {
        if !self.halt && self.length_value > 0 {
            self.length_value -= 1;
        }
    }

    /// Saturates at both ends so a runaway sweep stays out of the audible range.
    fn sweep(&mut self) {
        let delta = self.timer_period >> self.sweep_shift;
        if self.sweep_negate {
            let extra = if self.channel == 1 { 1 } else { 0 };
            self.timer_period = self.timer_period.saturating_sub(delta + extra);
        } else {
            self.timer_period = self.timer_period.saturating_add(delta);
        }
    }

    pub fn output(&self) -> u8 {
        if !self.enabled
            || self.length_value == 0
            || DUTY_TABLE[self.duty_mode as usize][self.duty_counter as usize] == 0
        {
            return 0;
        }
        if self.timer_period < 8 || self.timer_period > 0x7FF {
            return 0;
        }
        self.envelope.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Enabled channel with a loaded length counter and an audible period.
    fn audible(channel: u8) -> Pulse {
        let mut p = Pulse::new(channel);
        p.enabled = true;
        p.write_timer_low(0xFF);
        p.write_timer_high(0x00);
        p
    }

    #[test]
    fn control_byte_decodes_all_fields() {
        let mut p = Pulse::new(1);
        p.write_control(0b1011_0101);
        assert_eq!(p.duty_mode, 2);
        assert!(p.halt);
        assert!(!p.envelope.enabled);
        assert_eq!(p.envelope.constant_volume, 5);
        assert!(p.envelope.start);
    }

    #[test]
    fn constant_volume_reaches_output() {
        let mut p = audible(1);
        p.write_control(0b1011_0101);
        // Duty 2 is high on steps 1-4.
        p.duty_counter = 1;
        assert_eq!(p.output(), 5);
    }

    #[test]
    fn sweep_adds_shifted_period() {
        let mut p = Pulse::new(2);
        p.timer_period = 100;
        p.write_sweep(0b1000_0001);
        p.step_sweep();
        assert_eq!(p.timer_period, 150);
    }

    #[test]
    fn sweep_negate_on_first_channel_subtracts_one_more() {
        let mut p = Pulse::new(1);
        p.timer_period = 100;
        p.write_sweep(0b1000_1001);
        p.step_sweep();
        assert_eq!(p.timer_period, 49);

        let mut q = Pulse::new(2);
        q.timer_period = 100;
        q.write_sweep(0b1000_1001);
        q.step_sweep();
        assert_eq!(q.timer_period, 50);
    }

    #[test]
    fn runaway_sweep_stays_silent() {
        let mut p = audible(2);
        p.write_control(0b0011_1111);
        p.timer_period = 100;
        p.write_sweep(0b1000_0001);
        p.duty_counter = 1;

        let mut passed_limit = false;
        for _ in 0..2000 {
            p.step_sweep();
            if p.timer_period > 0x7FF {
                passed_limit = true;
            }
            if passed_limit {
                assert!(p.timer_period > 0x7FF);
                assert_eq!(p.output(), 0);
            }
        }
        assert!(passed_limit);
        assert_eq!(p.timer_period, u16::MAX);
    }

    #[test]
    fn negate_sweep_clamps_at_zero() {
        let mut p = Pulse::new(1);
        p.timer_period = 0;
        p.write_sweep(0b1000_1000);
        p.step_sweep();
        assert_eq!(p.timer_period, 0);
        assert_eq!(p.output(), 0);
    }

    #[test]
    fn sweep_period_is_stored_plus_one() {
        let mut p = Pulse::new(2);
        p.write_sweep(0b1111_0000);
        assert_eq!(p.sweep_period, 8);
        p.step_sweep();
        assert_eq!(p.sweep_counter, 8);
        assert!(!p.sweep_reload);
    }

    #[test]
    fn timer_high_loads_length_from_table() {
        let mut p = Pulse::new(1);
        p.write_timer_high(0b0000_0101);
        assert_eq!(p.length_value, 10);
        assert_eq!(p.timer_period, 0x500);
        p.write_timer_high(0b0000_1000);
        assert_eq!(p.length_value, 254);
        assert_eq!(p.duty_counter, 0);
    }

    #[test]
    fn timer_reloads_and_advances_duty() {
        let mut p = Pulse::new(1);
        p.write_timer_low(2);
        p.step_timer();
        assert_eq!(p.duty_counter, 1);
        assert_eq!(p.timer_counter, 2);
        p.step_timer();
        p.step_timer();
        assert_eq!(p.duty_counter, 1);
        p.step_timer();
        assert_eq!(p.duty_counter, 2);
    }

    #[test]
    fn halt_freezes_length_counter() {
        let mut p = audible(1);
        p.write_control(0x20);
        p.step_length();
        assert_eq!(p.length_value, 10);
        p.write_control(0x00);
        p.step_length();
        assert_eq!(p.length_value, 9);
    }

    #[test]
    fn out_of_range_periods_are_silent() {
        let mut p = audible(1);
        p.write_control(0b1011_1111);
        p.duty_counter = 1;
        p.timer_period = 7;
        assert_eq!(p.output(), 0);
        p.timer_period = 0x800;
        assert_eq!(p.output(), 0);
        p.timer_period = 0x7FF;
        assert_eq!(p.output(), 15);
    }

    #[test]
    fn disabled_channel_is_silent() {
        let mut p = audible(1);
        p.write_control(0b1011_1111);
        p.duty_counter = 1;
        p.enabled = false;
        assert_eq!(p.output(), 0);
    }
}
