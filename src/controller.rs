use serde::{Deserialize, Serialize};

/// Applies the select-line multiplexing of a 3-button pad to a raw, active
/// low button snapshot. The top two bits always read high.
pub fn read_port(raw: u8, selected: bool) -> u8 {
    let value = if selected {
        raw & 0x3F
    } else {
        (raw & 0x0F) | ((raw & 0xC0) >> 2)
    };

    value | 0xC0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pad {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    B,
    C,
    A,
    Start,
}

impl Button {
    pub fn mask(self) -> u8 {
        1 << match self {
            Button::Up => 0,
            Button::Down => 1,
            Button::Left => 2,
            Button::Right => 3,
            Button::B => 4,
            Button::C => 5,
            Button::A => 6,
            Button::Start => 7,
        }
    }
}

/// Button state of one pad, stored active low the way the port lines read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joypad {
    raw: u8,
}

impl Joypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, button: Button) {
        self.raw &= !button.mask();
    }

    pub fn release(&mut self, button: Button) {
        self.raw |= button.mask();
    }

    pub fn raw(&self) -> u8 {
        self.raw
    }

    pub fn read(&self, selected: bool) -> u8 {
        read_port(self.raw, selected)
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self { raw: 0xFF }
    }
}
