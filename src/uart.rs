use std::{io::Read, sync::mpsc};

use tracing::trace;

pub const LCR_DLAB: u8 = 0x80;
pub const LSR_DATA_READY: u8 = 0x01;
pub const LSR_THR_EMPTY: u8 = 0x20;
pub const LSR_TX_EMPTY: u8 = 0x40;

/// Serial port register block at 0xC400-0xC7FF.
pub trait Serial {
    fn read(&mut self, offset: u16) -> u8;
    fn write(&mut self, offset: u16, value: u8);
}

/// 16550 register file. Received bytes arrive on a channel and transmitted
/// bytes leave on another; transmission completes instantly, so the holding
/// register always reads empty.
pub struct Uart16550 {
    input: mpsc::Receiver<u8>,
    transmit: mpsc::Sender<u8>,
    rbr: Option<u8>,
    ier: u8,
    fcr: u8,
    lcr: u8,
    mcr: u8,
    scr: u8,
    dll: u8,
    dlm: u8,
}

impl Uart16550 {
    /// Returns the UART, the sender feeding its receive side and the receiver
    /// draining its transmit side.
    pub fn new() -> (Self, mpsc::Sender<u8>, mpsc::Receiver<u8>) {
        let (in_tx, in_rx) = mpsc::channel();
        let (out_tx, out_rx) = mpsc::channel();
        (
            Self {
                input: in_rx,
                transmit: out_tx,
                rbr: None,
                ier: 0,
                fcr: 0,
                lcr: 0,
                mcr: 0,
                scr: 0,
                dll: 0,
                dlm: 0,
            },
            in_tx,
            out_rx,
        )
    }

    fn fill(&mut self) {
        if self.rbr.is_none() {
            self.rbr = self.input.try_recv().ok();
        }
    }

    fn dlab(&self) -> bool {
        self.lcr & LCR_DLAB != 0
    }
}

impl Serial for Uart16550 {
    fn read(&mut self, offset: u16) -> u8 {
        match offset & 0x07 {
            0 if self.dlab() => self.dll,
            0 => {
                self.fill();
                self.rbr.take().unwrap_or(0)
            }
            1 if self.dlab() => self.dlm,
            1 => self.ier,
            2 => {
                let fifo = if self.fcr & 0x01 != 0 { 0xC0 } else { 0x00 };
                fifo | 0x01
            }
            3 => self.lcr,
            4 => self.mcr,
            5 => {
                self.fill();
                let ready = if self.rbr.is_some() { LSR_DATA_READY } else { 0 };
                LSR_THR_EMPTY | LSR_TX_EMPTY | ready
            }
            6 => 0xB0,
            _ => self.scr,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        match offset & 0x07 {
            0 if self.dlab() => self.dll = value,
            0 => {
                trace!("[UART] TX {:02X}", value);
                if self.transmit.send(value).is_err() {
                    trace!("[UART] Transmit receiver dropped, byte lost");
                }
            }
            1 if self.dlab() => self.dlm = value,
            1 => self.ier = value & 0x0F,
            2 => self.fcr = value,
            3 => self.lcr = value,
            4 => self.mcr = value & 0x1F,
            5 | 6 => trace!("[UART] Ignored write to status register {}", offset & 0x07),
            _ => self.scr = value,
        }
    }
}

/// Debug shortcut that feeds the receive holding register from a host stream
/// (usually stdin) instead of the emulated line, and reports data ready at
/// all times. Reads block until the host stream yields a byte, so this is
/// only suitable for driving a serial console from a terminal.
pub struct ConsoleSerial<S, R> {
    inner: S,
    host: R,
}

impl<S: Serial, R: Read> ConsoleSerial<S, R> {
    pub fn new(inner: S, host: R) -> Self {
        Self { inner, host }
    }

    fn read_host(&mut self) -> u8 {
        let mut byte = [0u8; 1];
        match self.host.read(&mut byte) {
            Ok(1) => byte[0],
            _ => 0xFF,
        }
    }
}

impl<S: Serial, R: Read> Serial for ConsoleSerial<S, R> {
    fn read(&mut self, offset: u16) -> u8 {
        match offset & 0x07 {
            0 if self.inner.read(3) & LCR_DLAB == 0 => self.read_host(),
            5 => self.inner.read(offset) | LSR_DATA_READY,
            _ => self.inner.read(offset),
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        self.inner.write(offset, value);
    }
}
