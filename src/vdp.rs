use serde::Serialize;
use tracing::trace;

/// Video display processor ports at 0xCC00 (VRAM data) and 0xCC01
/// (register/status). Rendering happens behind this interface.
pub trait VideoProcessor {
    fn read(&mut self, offset: u16) -> u8;
    fn write(&mut self, offset: u16, value: u8);
    /// Vertical-blank pulse, once per frame.
    fn vblank(&mut self);
    /// Interrupt output, forwarded to the CPU's IRQ input.
    fn irq_level(&self) -> bool;
    fn reset(&mut self) {}
}

pub const VRAM_SIZE: usize = 0x4000;

/// TMS9918A port logic: VRAM address latch with read-ahead, register writes
/// and the frame flag that drives the interrupt line.
#[derive(Clone, Serialize)]
pub struct Tms9918 {
    #[serde(skip)]
    pub vram: Vec<u8>,
    pub data_pre_read: u8,
    pub registers: [u8; 8],
    pub address: u16,
    pub first_write: Option<u8>,
    /// Frame flag, status bit 7.
    pub f: bool,
}

impl Tms9918 {
    pub fn new() -> Self {
        Self {
            vram: vec![0; VRAM_SIZE],
            data_pre_read: 0,
            registers: [0; 8],
            address: 0,
            first_write: None,
            f: false,
        }
    }

    fn address_wrapping_inc(&mut self) {
        self.address = (self.address + 1) & 0x3FFF;
    }

    fn read_data(&mut self) -> u8 {
        self.first_write = None;
        let data = self.data_pre_read;
        self.data_pre_read = self.vram[self.address as usize];
        self.address_wrapping_inc();
        data
    }

    fn write_data(&mut self, data: u8) {
        self.vram[self.address as usize] = data;
        self.data_pre_read = data;
        self.address_wrapping_inc();
        self.first_write = None;
    }

    fn read_status(&mut self) -> u8 {
        self.first_write = None;
        let status = if self.f { 0x80 } else { 0x00 };
        self.f = false;
        status
    }

    fn write_control(&mut self, val: u8) {
        let Some(first) = self.first_write else {
            self.first_write = Some(val);
            self.address = (self.address & !0xFF) | val as u16;
            return;
        };

        if val & 0x80 != 0 {
            let reg = val & 0x07;
            trace!("[VDP] R{} = {:02X}", reg, first);
            self.registers[reg as usize] = first;
        } else {
            self.address = ((((val & 0x3F) as u16) << 8) | first as u16) & 0x3FFF;
            if val & 0x40 == 0 {
                self.data_pre_read = self.vram[self.address as usize];
                self.address_wrapping_inc();
            }
        }
        self.first_write = None;
    }

    pub fn is_interrupt_enabled(&self) -> bool {
        self.registers[1] & 0x20 != 0
    }
}

impl Default for Tms9918 {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoProcessor for Tms9918 {
    fn read(&mut self, offset: u16) -> u8 {
        match offset & 0x01 {
            0 => self.read_data(),
            _ => self.read_status(),
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset & 0x01 {
            0 => self.write_data(value),
            _ => self.write_control(value),
        }
    }

    fn vblank(&mut self) {
        self.f = true;
    }

    fn irq_level(&self) -> bool {
        self.f && self.is_interrupt_enabled()
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
