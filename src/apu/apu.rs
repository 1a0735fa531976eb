//! NES APU (Audio Processing Unit) implementation.
//!
//! Implements the [APU](https://www.nesdev.org/wiki/APU) as in the Ricoh 2A03: five channels (pulse×2,
//! triangle, noise, DMC), [frame counter](https://www.nesdev.org/wiki/APU_Frame_Counter) (4-step or
//! 5-step), and [APU Mixer](https://www.nesdev.org/wiki/APU_Mixer) (non-linear). Registers $4000–$4013,
//! $4015, $4017. See [APU registers](https://www.nesdev.org/wiki/APU_registers).
//!
//! ## Timing
//!
//! [`APU::step`] is called once per CPU cycle and returns one mixed sample.
//!
//! - Pulse: timer clocked every 2 CPU cycles (one APU cycle).
//! - Triangle, noise, DMC: timers at CPU rate with periods in CPU cycles.
//! - Length/envelope/sweep/linear counter clocked by the frame counter (~240 Hz).
//! - DMC: when the sample buffer empties the APU posts a fetch address; the bus reads it and
//!   stalls the CPU 4 cycles.

use crate::apu::dmc::Dmc;
use crate::apu::noise::Noise;
use crate::apu::pulse::Pulse;
use crate::apu::triangle::Triangle;

/// NTSC CPU clock, which is also the rate of [`APU::step`] samples.
pub const CPU_CLOCK_HZ: f64 = 1_789_773.0;

/// 4-step frame counter: resets every 29830 CPU cycles. Quarter/half frame at 7457, 14913, 22371;
/// IRQ (if not inhibited) at 29829. APU_Frame_Counter.
const FRAME_4STEP_RESET: u32 = 29830;

/// 5-step frame counter: no IRQ; resets every 37282 cycles. Extra half-frame at 37281.
const FRAME_5STEP_RESET: u32 = 37282;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameMode {
    FourStep,
    FiveStep,
}

/// Pulse output: 95.52 / (8128/n + 100), n = pulse1 + pulse2 (0–30). APU_Mixer.
fn pulse_table(n: u8) -> f32 {
    if n == 0 {
        return 0.0;
    }
    95.52 / (8128.0 / n as f32 + 100.0)
}

/// TND (triangle + noise + DMC) output: 163.67 / (24329/n + 100), n = 3*tri + 2*noise + dmc.
fn tnd_table(n: u16) -> f32 {
    if n == 0 {
        return 0.0;
    }
    163.67 / (24329.0 / n as f32 + 100.0)
}

/// APU state: pulse×2, triangle, noise, DMC; frame sequencer; frame IRQ flag.
pub struct APU {
    pub pulse1: Pulse,
    pub pulse2: Pulse,
    pub triangle: Triangle,
    pub noise: Noise,
    pub dmc: Dmc,
    frame_mode: FrameMode,
    frame_irq_inhibit: bool,
    frame_irq: bool,
    frame_cycle: u32,
    /// CPU cycles stepped since power-on.
    cycle: u64,
}

impl Default for APU {
    fn default() -> Self {
        Self::new()
    }
}

impl APU {
    pub fn new() -> Self {
        Self {
            pulse1: Pulse::new(1),
            pulse2: Pulse::new(2),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame_mode: FrameMode::FourStep,
            frame_irq_inhibit: false,
            frame_irq: false,
            frame_cycle: 0,
            cycle: 0,
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn frame_mode(&self) -> FrameMode {
        self.frame_mode
    }

    /// Level-triggered IRQ line: frame interrupt or DMC end-of-sample.
    pub fn irq_pending(&self) -> bool {
        self.frame_irq || self.dmc.irq_flag
    }

    /// Write to APU registers. $4000–$4013 = channel regs; $4015 = channel enables;
    /// $4017 = frame counter (mode 4/5-step, IRQ inhibit). Writing $4017 resets the sequencer.
    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            0x4000 => self.pulse1.write_control(data),
            0x4001 => self.pulse1.write_sweep(data),
            0x4002 => self.pulse1.write_timer_low(data),
            0x4003 => self.pulse1.write_timer_high(data),
            0x4004 => self.pulse2.write_control(data),
            0x4005 => self.pulse2.write_sweep(data),
            0x4006 => self.pulse2.write_timer_low(data),
            0x4007 => self.pulse2.write_timer_high(data),
            0x4008 => self.triangle.write_control(data),
            0x400A => self.triangle.write_timer_low(data),
            0x400B => self.triangle.write_timer_high(data),
            0x400C => self.noise.write_control(data),
            0x400E => self.noise.write_period(data),
            0x400F => self.noise.write_length(data),
            0x4010 => self.dmc.write_control(data),
            0x4011 => self.dmc.write_value(data),
            0x4012 => self.dmc.write_address(data),
            0x4013 => self.dmc.write_length(data),
            0x4015 => self.write_enables(data),
            0x4017 => self.write_frame_counter(data),
            _ => {}
        }
    }

    fn write_enables(&mut self, data: u8) {
        self.pulse1.enabled = data & 0x01 != 0;
        self.pulse2.enabled = data & 0x02 != 0;
        self.triangle.enabled = data & 0x04 != 0;
        self.noise.enabled = data & 0x08 != 0;
        if !self.pulse1.enabled {
            self.pulse1.length_value = 0;
        }
        if !self.pulse2.enabled {
            self.pulse2.length_value = 0;
        }
        if !self.triangle.enabled {
            self.triangle.length_value = 0;
        }
        if !self.noise.enabled {
            self.noise.length_value = 0;
        }
        self.dmc.set_enabled(data & 0x10 != 0);
    }

    fn write_frame_counter(&mut self, data: u8) {
        self.frame_mode = if data & 0x80 == 0 {
            FrameMode::FourStep
        } else {
            FrameMode::FiveStep
        };
        self.frame_irq_inhibit = data & 0x40 != 0;
        if self.frame_irq_inhibit {
            self.frame_irq = false;
        }
        self.frame_cycle = 0;
        // 5-step mode clocks a quarter and half frame immediately (3–4 cycles later on hardware).
        if self.frame_mode == FrameMode::FiveStep {
            self.clock_quarter_frame();
            self.clock_half_frame();
        }
    }

    /// Read $4015: bits 0–3 = length counter > 0 for pulse1, pulse2, triangle, noise; bit 4 = DMC
    /// active; bit 6 = frame IRQ; bit 7 = DMC IRQ. Reading clears the frame IRQ.
    pub fn read_status(&mut self) -> u8 {
        let mut r = 0;
        if self.pulse1.length_value > 0 {
            r |= 0x01;
        }
        if self.pulse2.length_value > 0 {
            r |= 0x02;
        }
        if self.triangle.length_value > 0 {
            r |= 0x04;
        }
        if self.noise.length_value > 0 {
            r |= 0x08;
        }
        if self.dmc.is_active() {
            r |= 0x10;
        }
        if self.frame_irq {
            r |= 0x40;
        }
        if self.dmc.irq_flag {
            r |= 0x80;
        }
        self.frame_irq = false;
        r
    }

    /// Address the DMC wants read, if its sample buffer is waiting on memory.
    pub fn dmc_fetch_request(&self) -> Option<u16> {
        self.dmc.fetch_request()
    }

    pub fn dmc_feed_byte(&mut self, byte: u8) {
        self.dmc.feed_byte(byte);
    }

    /// Quarter-frame: clock envelopes and the triangle linear counter.
    fn clock_quarter_frame(&mut self) {
        self.pulse1.step_envelope();
        self.pulse2.step_envelope();
        self.noise.step_envelope();
        self.triangle.step_linear();
    }

    /// Half-frame: clock length counters and sweep units.
    fn clock_half_frame(&mut self) {
        self.pulse1.step_length();
        self.pulse2.step_length();
        self.triangle.step_length();
        self.noise.step_length();
        self.pulse1.step_sweep();
        self.pulse2.step_sweep();
    }

    fn step_frame_counter(&mut self) {
        self.frame_cycle += 1;
        match (self.frame_mode, self.frame_cycle) {
            (_, 7457) | (_, 22371) => self.clock_quarter_frame(),
            (_, 14913) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
            }
            (FrameMode::FourStep, 29829) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
                if !self.frame_irq_inhibit {
                    self.frame_irq = true;
                }
            }
            (FrameMode::FiveStep, 37281) => {
                self.clock_quarter_frame();
                self.clock_half_frame();
            }
            _ => {}
        }
        let reset = match self.frame_mode {
            FrameMode::FourStep => FRAME_4STEP_RESET,
            FrameMode::FiveStep => FRAME_5STEP_RESET,
        };
        if self.frame_cycle >= reset {
            self.frame_cycle = 0;
        }
    }

    /// Non-linear mix of the five channel outputs, in 0.0..=1.0.
    pub fn mix(&self) -> f32 {
        let pulse = self.pulse1.output() + self.pulse2.output();
        let tnd = 3 * self.triangle.output() as u16
            + 2 * self.noise.output() as u16
            + self.dmc.output() as u16;
        (pulse_table(pulse) + tnd_table(tnd)).min(1.0)
    }

    /// Advance one CPU cycle: frame sequencer, channel timers, then one mixed sample.
    pub fn step(&mut self) -> f32 {
        self.cycle += 1;
        self.step_frame_counter();

        if self.cycle % 2 == 0 {
            self.pulse1.step_timer();
            self.pulse2.step_timer();
        }
        self.triangle.step_timer();
        self.noise.step_timer();
        self.dmc.step_timer();

        self.mix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(apu: &mut APU, cycles: u32) {
        for _ in 0..cycles {
            apu.step();
        }
    }

    #[test]
    fn silence_mixes_to_zero() {
        let mut apu = APU::new();
        assert_eq!(apu.step(), 0.0);
    }

    #[test]
    fn mixer_stays_in_unit_range() {
        let mut apu = APU::new();
        apu.write(0x4015, 0x0F);
        apu.write(0x4000, 0b1011_1111);
        apu.write(0x4002, 0xFF);
        apu.write(0x4003, 0x08);
        apu.write(0x4011, 0x7F);
        for _ in 0..10_000 {
            let s = apu.step();
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn four_step_mode_raises_frame_irq() {
        let mut apu = APU::new();
        run(&mut apu, 29828);
        assert!(!apu.irq_pending());
        run(&mut apu, 1);
        assert!(apu.irq_pending());
        assert_eq!(apu.read_status() & 0x40, 0x40);
        assert!(!apu.irq_pending());
    }

    #[test]
    fn inhibit_and_five_step_suppress_frame_irq() {
        let mut apu = APU::new();
        apu.write(0x4017, 0x40);
        run(&mut apu, 40_000);
        assert!(!apu.irq_pending());

        let mut apu = APU::new();
        apu.write(0x4017, 0x80);
        assert_eq!(apu.frame_mode(), FrameMode::FiveStep);
        run(&mut apu, 40_000);
        assert!(!apu.irq_pending());
    }

    #[test]
    fn half_frame_clocks_length_counters() {
        let mut apu = APU::new();
        apu.write(0x4015, 0x01);
        apu.write(0x4003, 0x00);
        assert_eq!(apu.pulse1.length_value, 10);
        run(&mut apu, 14913);
        assert_eq!(apu.pulse1.length_value, 9);
        run(&mut apu, 29829 - 14913);
        assert_eq!(apu.pulse1.length_value, 8);
    }

    #[test]
    fn five_step_schedule_clocks_half_frames() {
        let mut apu = APU::new();
        apu.write(0x4015, 0x01);
        apu.write(0x4003, 0x00);
        assert_eq!(apu.pulse1.length_value, 10);

        // Selecting 5-step mode clocks a half frame right away.
        apu.write(0x4017, 0x80);
        assert_eq!(apu.pulse1.length_value, 9);

        run(&mut apu, 14913);
        assert_eq!(apu.pulse1.length_value, 8);
        run(&mut apu, 29829 - 14913);
        assert_eq!(apu.pulse1.length_value, 8);
        run(&mut apu, 37281 - 29829);
        assert_eq!(apu.pulse1.length_value, 7);

        // Sequence restarts at 37282.
        run(&mut apu, 1 + 14913);
        assert_eq!(apu.pulse1.length_value, 6);
    }

    #[test]
    fn quarter_frames_clock_envelopes() {
        let mut apu = APU::new();
        apu.write(0x4015, 0x01);
        apu.write(0x4000, 0x00);
        apu.write(0x4003, 0x00);

        run(&mut apu, 7456);
        assert_eq!(apu.pulse1.envelope.volume, 0);
        run(&mut apu, 1);
        assert_eq!(apu.pulse1.envelope.volume, 15);

        run(&mut apu, 14913 - 7457);
        assert_eq!(apu.pulse1.envelope.volume, 14);
        run(&mut apu, 22371 - 14913);
        assert_eq!(apu.pulse1.envelope.volume, 13);
        run(&mut apu, 29829 - 22371);
        assert_eq!(apu.pulse1.envelope.volume, 12);
        run(&mut apu, 1 + 7457);
        assert_eq!(apu.pulse1.envelope.volume, 11);
    }

    #[test]
    fn status_reports_and_disable_clears_length() {
        let mut apu = APU::new();
        apu.write(0x4015, 0x0F);
        apu.write(0x4003, 0x08);
        apu.write(0x400B, 0x08);
        assert_eq!(apu.read_status() & 0x0F, 0x05);
        apu.write(0x4015, 0x00);
        assert_eq!(apu.read_status() & 0x0F, 0x00);
    }

    #[test]
    fn dmc_requests_fetch_when_enabled() {
        let mut apu = APU::new();
        apu.write(0x4012, 0x00);
        apu.write(0x4013, 0x00);
        apu.write(0x4015, 0x10);
        assert_eq!(apu.dmc_fetch_request(), Some(0xC000));
        assert_eq!(apu.read_status() & 0x10, 0x10);
        apu.dmc_feed_byte(0xAA);
        assert_eq!(apu.dmc_fetch_request(), None);
        assert_eq!(apu.read_status() & 0x10, 0);
    }
}
