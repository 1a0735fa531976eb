//! [APU Envelope](https://www.nesdev.org/wiki/APU_Envelope), shared by the pulse and noise channels.

/// Volume unit: either a constant volume or a decaying envelope clocked at quarter frames.
#[derive(Default, Debug, Clone)]
pub struct Envelope {
    /// Envelope drives the volume (bit 4 clear); otherwise `constant_volume` does.
    pub enabled: bool,
    pub start: bool,
    pub period: u8,
    pub counter: u8,
    pub volume: u8,
    pub constant_volume: u8,
}

impl Envelope {
    /// Low nibble of the control byte is the envelope period or the constant volume, per bit 4.
    pub fn write_control(&mut self, value: u8) {
        self.enabled = value & 0x10 == 0;
        if self.enabled {
            self.period = value & 0x0F;
        } else {
            self.constant_volume = value & 0x0F;
        }
        self.start = true;
    }

    /// Quarter-frame clock. `looping` is the channel's shared loop/halt bit.
    pub fn step(&mut self, looping: bool) {
        if self.start {
            self.start = false;
            self.counter = self.period;
            self.volume = 15;
        } else if self.counter > 0 {
            self.counter -= 1;
        } else {
            if self.volume > 0 {
                self.volume -= 1;
            } else if looping {
                self.volume = 15;
            }
            self.counter = self.period;
        }
    }

    pub fn output(&self) -> u8 {
        if self.enabled {
            self.volume
        } else {
            self.constant_volume
        }
    }
}
