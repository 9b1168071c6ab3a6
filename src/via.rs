use serde::Serialize;
use tracing::trace;

pub const IFR_CA2: u8 = 0x01;
pub const IFR_CA1: u8 = 0x02;
pub const IFR_SR: u8 = 0x04;
pub const IFR_CB2: u8 = 0x08;
pub const IFR_CB1: u8 = 0x10;
pub const IFR_T2: u8 = 0x20;
pub const IFR_T1: u8 = 0x40;

const ACR_T1_FREE_RUN: u8 = 0x40;
const PCR_CA1_POSITIVE: u8 = 0x01;

/// Board-side view of the VIA ports.
pub trait ViaPins {
    /// Level of the eight port B input pins.
    fn port_b_input(&self) -> u8;
    /// Called whenever the driven port A value may have changed.
    fn port_a_output(&mut self, value: u8);
}

/// Parallel I/O controller occupying 0xC000-0xC3FF.
pub trait ParallelIo {
    fn read(&mut self, offset: u16, pins: &mut dyn ViaPins) -> u8;
    fn write(&mut self, offset: u16, value: u8, pins: &mut dyn ViaPins);
    fn set_ca1(&mut self, level: bool);
    fn tick(&mut self, cycles: u32);
    /// Combined interrupt output, forwarded to the CPU's FIRQ input.
    fn irq_level(&self) -> bool;
    fn reset(&mut self) {}
}

/// Register-level 6522: both ports, T1 one-shot and free-run, T2 one-shot,
/// CA1 edge interrupts and the IFR/IER pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Via6522 {
    ora: u8,
    orb: u8,
    ddra: u8,
    ddrb: u8,
    t1_counter: u16,
    t1_latch: u16,
    t1_armed: bool,
    t2_counter: u16,
    t2_latch_low: u8,
    t2_armed: bool,
    sr: u8,
    acr: u8,
    pcr: u8,
    ifr: u8,
    ier: u8,
    ca1: bool,
}

impl Via6522 {
    pub fn new() -> Self {
        Self::default()
    }

    fn port_a_value(&self) -> u8 {
        (self.ora & self.ddra) | !self.ddra
    }

    fn port_b_value(&self, pins: &dyn ViaPins) -> u8 {
        (pins.port_b_input() & !self.ddrb) | (self.orb & self.ddrb)
    }

    pub fn ifr(&self) -> u8 {
        let pending = self.ifr & self.ier & 0x7F;
        self.ifr | if pending != 0 { 0x80 } else { 0 }
    }

    fn tick_t1(&mut self, cycles: u32) {
        let counter = self.t1_counter as u32;
        if cycles <= counter {
            self.t1_counter = (counter - cycles) as u16;
            return;
        }

        if self.t1_armed {
            trace!("[VIA] T1 timeout");
            self.ifr |= IFR_T1;
        }

        if self.acr & ACR_T1_FREE_RUN != 0 {
            let period = self.t1_latch as u32 + 1;
            let over = cycles - counter - 1;
            self.t1_counter = (self.t1_latch as u32 - over % period) as u16;
        } else {
            self.t1_armed = false;
            self.t1_counter = self.t1_counter.wrapping_sub(cycles as u16);
        }
    }

    fn tick_t2(&mut self, cycles: u32) {
        let counter = self.t2_counter as u32;
        if cycles > counter && self.t2_armed {
            trace!("[VIA] T2 timeout");
            self.ifr |= IFR_T2;
            self.t2_armed = false;
        }
        self.t2_counter = self.t2_counter.wrapping_sub(cycles as u16);
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Via6522 {
            ora: 0,
            orb: 0,
            ddra: 0,
            ddrb: 0,
            t1_counter: 0xFFFF,
            t1_latch: 0xFFFF,
            t1_armed: false,
            t2_counter: 0xFFFF,
            t2_latch_low: 0xFF,
            t2_armed: false,
            sr: 0,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            ca1: true,
        }
    }
}

impl ParallelIo for Via6522 {
    fn read(&mut self, offset: u16, pins: &mut dyn ViaPins) -> u8 {
        let value = match offset & 0x0F {
            0x0 => {
                self.ifr &= !(IFR_CB1 | IFR_CB2);
                self.port_b_value(pins)
            }
            0x1 => {
                self.ifr &= !(IFR_CA1 | IFR_CA2);
                self.port_a_value()
            }
            0x2 => self.ddrb,
            0x3 => self.ddra,
            0x4 => {
                self.ifr &= !IFR_T1;
                self.t1_counter as u8
            }
            0x5 => (self.t1_counter >> 8) as u8,
            0x6 => self.t1_latch as u8,
            0x7 => (self.t1_latch >> 8) as u8,
            0x8 => {
                self.ifr &= !IFR_T2;
                self.t2_counter as u8
            }
            0x9 => (self.t2_counter >> 8) as u8,
            0xA => {
                self.ifr &= !IFR_SR;
                self.sr
            }
            0xB => self.acr,
            0xC => self.pcr,
            0xD => self.ifr(),
            0xE => self.ier | 0x80,
            _ => self.port_a_value(),
        };

        trace!("[VIA] [RD] [{:X}] = {:02X}", offset & 0x0F, value);
        value
    }

    fn write(&mut self, offset: u16, value: u8, pins: &mut dyn ViaPins) {
        trace!("[VIA] [WR] [{:X}] = {:02X}", offset & 0x0F, value);

        match offset & 0x0F {
            0x0 => {
                self.ifr &= !(IFR_CB1 | IFR_CB2);
                self.orb = value;
            }
            0x1 => {
                self.ifr &= !(IFR_CA1 | IFR_CA2);
                self.ora = value;
                pins.port_a_output(self.port_a_value());
            }
            0x2 => self.ddrb = value,
            0x3 => {
                self.ddra = value;
                pins.port_a_output(self.port_a_value());
            }
            0x4 | 0x6 => self.t1_latch = (self.t1_latch & 0xFF00) | value as u16,
            0x5 => {
                self.t1_latch = (self.t1_latch & 0x00FF) | ((value as u16) << 8);
                self.t1_counter = self.t1_latch;
                self.ifr &= !IFR_T1;
                self.t1_armed = true;
            }
            0x7 => {
                self.t1_latch = (self.t1_latch & 0x00FF) | ((value as u16) << 8);
                self.ifr &= !IFR_T1;
            }
            0x8 => self.t2_latch_low = value,
            0x9 => {
                self.t2_counter = ((value as u16) << 8) | self.t2_latch_low as u16;
                self.ifr &= !IFR_T2;
                self.t2_armed = true;
            }
            0xA => {
                self.ifr &= !IFR_SR;
                self.sr = value;
            }
            0xB => self.acr = value,
            0xC => self.pcr = value,
            0xD => self.ifr &= !value & 0x7F,
            0xE => {
                if value & 0x80 != 0 {
                    self.ier |= value & 0x7F;
                } else {
                    self.ier &= !value;
                }
            }
            _ => {
                self.ora = value;
                pins.port_a_output(self.port_a_value());
            }
        }
    }

    fn set_ca1(&mut self, level: bool) {
        if level == self.ca1 {
            return;
        }
        self.ca1 = level;

        let positive = self.pcr & PCR_CA1_POSITIVE != 0;
        if level == positive {
            trace!("[VIA] CA1 active edge");
            self.ifr |= IFR_CA1;
        }
    }

    fn tick(&mut self, cycles: u32) {
        self.tick_t1(cycles);
        self.tick_t2(cycles);
    }

    fn irq_level(&self) -> bool {
        self.ifr & self.ier & 0x7F != 0
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
