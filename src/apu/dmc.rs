//! [APU DMC](https://www.nesdev.org/wiki/APU_DMC) ($4010–$4013): delta modulation, 7-bit output,
//! one-byte sample buffer filled by a memory read the bus performs on request (4-cycle CPU stall).
//! Sample address $C000 + (byte*64); length (byte*16)+1.

/// NTSC rate table: 4-bit index from $4010 → CPU cycles per output bit.
const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

#[derive(Debug, Clone)]
pub struct Dmc {
    enabled: bool,
    irq_enabled: bool,
    pub(crate) irq_flag: bool,
    loop_flag: bool,
    rate_index: u8,
    rate_counter: u16,
    output_level: u8,
    sample_address: u16,
    sample_length: u16,
    current_address: u16,
    bytes_remaining: u16,
    sample_buffer: Option<u8>,
    shift_register: u8,
    bits_remaining: u8,
    silence: bool,
    /// Address the bus must read for the sample buffer, if a fetch is outstanding.
    fetch_request: Option<u16>,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            enabled: false,
            irq_enabled: false,
            irq_flag: false,
            loop_flag: false,
            rate_index: 0,
            rate_counter: 0,
            output_level: 0,
            sample_address: 0xC000,
            sample_length: 1,
            current_address: 0xC000,
            bytes_remaining: 0,
            sample_buffer: None,
            shift_register: 0,
            bits_remaining: 8,
            silence: true,
            fetch_request: None,
        }
    }
}

impl Dmc {
    /// $4010: IL-- RRRR. IRQ enable, loop, rate index. Clearing IRQ enable acknowledges the IRQ.
    pub fn write_control(&mut self, value: u8) {
        self.irq_enabled = value & 0x80 != 0;
        if !self.irq_enabled {
            self.irq_flag = false;
        }
        self.loop_flag = value & 0x40 != 0;
        self.rate_index = value & 0x0F;
    }

    /// $4011: direct load of the 7-bit output level.
    pub fn write_value(&mut self, value: u8) {
        self.output_level = value & 0x7F;
    }

    /// $4012: sample address = $C000 + value * 64.
    pub fn write_address(&mut self, value: u8) {
        self.sample_address = 0xC000 | (value as u16) << 6;
    }

    /// $4013: sample length = value * 16 + 1 bytes.
    pub fn write_length(&mut self, value: u8) {
        self.sample_length = ((value as u16) << 4) | 1;
    }

    /// $4015 bit 4. Enabling with no bytes left restarts the sample; disabling drops the rest.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.irq_flag = false;
        if !enabled {
            self.bytes_remaining = 0;
            self.fetch_request = None;
        } else if self.bytes_remaining == 0 {
            self.restart();
            self.request_fetch();
        }
    }

    pub fn is_active(&self) -> bool {
        self.bytes_remaining > 0
    }

    pub fn fetch_request(&self) -> Option<u16> {
        self.fetch_request
    }

    /// Deliver the byte read for the outstanding fetch. Address wraps from $FFFF to $8000.
    pub fn feed_byte(&mut self, byte: u8) {
        self.fetch_request = None;
        self.sample_buffer = Some(byte);
        self.current_address = match self.current_address {
            0xFFFF => 0x8000,
            addr => addr + 1,
        };
        self.bytes_remaining = self.bytes_remaining.saturating_sub(1);
        if self.bytes_remaining == 0 {
            if self.loop_flag {
                self.restart();
            } else if self.irq_enabled {
                self.irq_flag = true;
            }
        }
    }

    pub fn step_timer(&mut self) {
        if !self.enabled {
            return;
        }
        if self.rate_counter > 0 {
            self.rate_counter -= 1;
            return;
        }
        self.rate_counter = DMC_RATE_TABLE[self.rate_index as usize] - 1;
        self.step_shifter();
    }

    fn step_shifter(&mut self) {
        if !self.silence {
            if self.shift_register & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
        }
        self.shift_register >>= 1;
        self.bits_remaining -= 1;

        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.sample_buffer.take() {
                Some(byte) => {
                    self.shift_register = byte;
                    self.silence = false;
                }
                None => self.silence = true,
            }
            self.request_fetch();
        }
    }

    fn restart(&mut self) {
        self.current_address = self.sample_address;
        self.bytes_remaining = self.sample_length;
    }

    fn request_fetch(&mut self) {
        if self.sample_buffer.is_none() && self.bytes_remaining > 0 {
            self.fetch_request = Some(self.current_address);
        }
    }

    /// Output level is fed to the mixer whether or not the channel is playing.
    pub fn output(&self) -> u8 {
        self.output_level
    }
}
