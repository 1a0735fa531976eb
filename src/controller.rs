//! NES controller input handling.
//!
//! Implements the standard NES controller shift register protocol:
//! write $01 to $4016 to hold the strobe, $00 to latch the current state; then read $4016
//! (port 1) or $4017 (port 2) repeatedly to get one bit per read
//! (A, B, Select, Start, Up, Down, Left, Right). After eight reads the pad returns 1s.

pub const BUTTON_A: u8 = 1 << 0;
pub const BUTTON_B: u8 = 1 << 1;
pub const BUTTON_SELECT: u8 = 1 << 2;
pub const BUTTON_START: u8 = 1 << 3;
pub const BUTTON_UP: u8 = 1 << 4;
pub const BUTTON_DOWN: u8 = 1 << 5;
pub const BUTTON_LEFT: u8 = 1 << 6;
pub const BUTTON_RIGHT: u8 = 1 << 7;

/// Upper bits of a controller read come from the data bus ($40 after `LDA $4016`).
const OPEN_BUS: u8 = 0x40;

/// A standard controller on one of the two ports.
#[derive(Default)]
pub struct Controller {
    /// Current button states: bit 0 = A, 1 = B, 2 = Select, 3 = Start, 4 = Up, 5 = Down, 6 = Left, 7 = Right.
    pub state: u8,
    /// Shift register: latched from `state`; shifted out LSB-first on read, refilled with 1s.
    shift: u8,
    strobe: bool,
}

impl Controller {
    /// Create a new controller with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Press or release the buttons in `mask`.
    pub fn set_button(&mut self, mask: u8, pressed: bool) {
        if pressed {
            self.state |= mask;
        } else {
            self.state &= !mask;
        }
    }

    /// Read one button state. While the strobe is held every read returns button A.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return (self.state & 1) | OPEN_BUS;
        }
        let bit = self.shift & 1;
        self.shift = (self.shift >> 1) | 0x80;
        bit | OPEN_BUS
    }

    /// Write to $4016. Bit 0 high keeps reloading the shift register; the falling edge latches it.
    pub fn write(&mut self, data: u8) {
        self.strobe = data & 1 != 0;
        if self.strobe {
            self.shift = self.state;
        }
    }
}
