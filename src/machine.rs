use std::{path::Path, sync::mpsc};

use anyhow::Context;
use serde::Serialize;

use crate::{
    bus::{Bus, MachineState, Peripherals},
    clock::{Clock, ClockEvent},
    config::MachineConfig,
    controller::{Button, Pad},
    cpu::Cpu,
    diagnostic::DiagnosticSink,
    error::MachineError,
    interrupt::InterruptLines,
    keyboard::KeyboardDevice,
    psg::{SoundChip, Ym2149},
    rom::Rom,
    uart::{ConsoleSerial, Serial, Uart16550},
    utils::hexdump,
    vdp::{Tms9918, VideoProcessor},
    via::{ParallelIo, Via6522},
};

/// Host ends of the built-in UART's channels.
pub struct SerialHost {
    pub input: mpsc::Sender<u8>,
    pub output: mpsc::Receiver<u8>,
}

/// A CPU and its bus, advanced one instruction at a time. After every
/// instruction each device is brought up to the same cycle before the CPU
/// runs again, so no line change is observed late.
pub struct Machine<C: Cpu> {
    pub bus: Bus,
    pub cpu: C,
    pub clock: Clock,
    keyboard: Option<Box<dyn KeyboardDevice>>,
    keyboard_input: Option<mpsc::Sender<u8>>,
    serial: Option<SerialHost>,
    cycles: u64,
    frame_ready: bool,
}

impl<C: Cpu> Machine<C> {
    pub fn reset(&mut self) {
        tracing::info!("[Machine] Reset");
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.clock.reset();
        self.cycles = 0;
        self.frame_ready = false;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pc(&self) -> u16 {
        self.cpu.pc()
    }

    pub fn halted(&self) -> bool {
        self.cpu.halted()
    }

    /// Runs one CPU instruction and advances every device by its cycle count.
    pub fn step(&mut self) -> u32 {
        // a stalled CPU still lets time pass
        let cycles = self.cpu.step(&mut self.bus).max(1);
        self.advance(cycles);
        cycles
    }

    fn advance(&mut self, cycles: u32) {
        self.bus.tick(cycles);

        if let Some(keyboard) = self.keyboard.as_mut() {
            keyboard.run(cycles, &mut self.bus);
        }

        for event in self.clock.tick(cycles) {
            match event {
                ClockEvent::VBlankStart => self.bus.vblank(),
                ClockEvent::FrameEnd => {
                    self.frame_ready = true;
                    tracing::trace!(
                        "Frame {} completed, total cycles: {}",
                        self.clock.frame_count(),
                        self.clock.total_cycles()
                    );
                }
            }
        }

        self.cycles += cycles as u64;
    }

    pub fn step_for(&mut self, n: usize) {
        let mut cycles_executed = 0;
        while cycles_executed < n {
            cycles_executed += self.step() as usize;
        }
    }

    pub fn step_frame(&mut self) {
        self.frame_ready = false;
        while !self.frame_ready {
            self.step();
        }
    }

    /// Service key: drives the NMI line directly.
    pub fn set_service_key(&mut self, pressed: bool) {
        tracing::debug!("[Machine] Service key {}", if pressed { "down" } else { "up" });
        self.bus.set_service_key(pressed);
    }

    pub fn press(&mut self, pad: Pad, button: Button) {
        self.bus.joypad_mut(pad).press(button);
    }

    pub fn release(&mut self, pad: Pad, button: Button) {
        self.bus.joypad_mut(pad).release(button);
    }

    pub fn attach_cartridge(&mut self, image: &[u8]) -> Result<(), MachineError> {
        self.bus.attach_cartridge(image)
    }

    pub fn load_cartridge_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let image = std::fs::read(path)
            .with_context(|| format!("reading cartridge image {}", path.display()))?;
        self.attach_cartridge(&image)
            .with_context(|| format!("attaching cartridge image {}", path.display()))
    }

    /// Sender for scancode bytes when the built-in serial keyboard is attached.
    pub fn keyboard_input(&self) -> Option<&mpsc::Sender<u8>> {
        self.keyboard_input.as_ref()
    }

    /// Sender feeding the built-in UART's receive side.
    pub fn serial_input(&self) -> Option<&mpsc::Sender<u8>> {
        self.serial.as_ref().map(|serial| &serial.input)
    }

    /// Everything the built-in UART has transmitted since the last call.
    pub fn drain_serial_output(&mut self) -> Vec<u8> {
        self.serial
            .as_ref()
            .map(|serial| serial.output.try_iter().collect())
            .unwrap_or_default()
    }

    pub fn report(&self) -> MachineReport {
        MachineReport {
            pc: self.cpu.pc(),
            cycles: self.cycles,
            frame: self.clock.frame_count(),
            bank3_page: self.bus.memory().bank3_page(),
            state: *self.bus.state(),
            lines: *self.bus.lines(),
        }
    }

    pub fn memory_dump(&self, start: u16, end: u16) -> String {
        let memory: Vec<u8> = (0..=0xFFFFu16).map(|addr| self.bus.peek(addr)).collect();
        hexdump(&memory, start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineReport {
    pub pc: u16,
    pub cycles: u64,
    pub frame: u64,
    pub bank3_page: usize,
    pub state: MachineState,
    pub lines: InterruptLines,
}

impl MachineReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Default)]
pub struct MachineBuilder {
    config: MachineConfig,
    rom: Rom,
    cartridge: Option<Vec<u8>>,
    via: Option<Box<dyn ParallelIo>>,
    uart: Option<Box<dyn Serial>>,
    vdp: Option<Box<dyn VideoProcessor>>,
    psg: Option<Box<dyn SoundChip>>,
    diagnostic: Option<DiagnosticSink>,
    keyboard: Option<Box<dyn KeyboardDevice>>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ram_size(mut self, size: usize) -> Self {
        self.config.ram_size = size;
        self
    }

    pub fn rom(mut self, data: &[u8]) -> Self {
        self.rom = Rom::new(data);
        self
    }

    /// Uses an already loaded ROM, e.g. from [`Rom::load`].
    pub fn rom_image(mut self, rom: Rom) -> Self {
        self.rom = rom;
        self
    }

    pub fn cartridge(mut self, image: &[u8]) -> Self {
        self.cartridge = Some(image.to_vec());
        self
    }

    pub fn via(mut self, via: Box<dyn ParallelIo>) -> Self {
        self.via = Some(via);
        self
    }

    pub fn uart(mut self, uart: Box<dyn Serial>) -> Self {
        self.uart = Some(uart);
        self
    }

    pub fn vdp(mut self, vdp: Box<dyn VideoProcessor>) -> Self {
        self.vdp = Some(vdp);
        self
    }

    pub fn psg(mut self, psg: Box<dyn SoundChip>) -> Self {
        self.psg = Some(psg);
        self
    }

    pub fn diagnostic(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostic = Some(sink);
        self
    }

    pub fn keyboard(mut self, keyboard: Box<dyn KeyboardDevice>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn build<C: Cpu>(self, mut cpu: C) -> Result<Machine<C>, MachineError> {
        tracing::info!("Initializing Ultim809 with {:?}", self.config);

        let (uart, serial) = match self.uart {
            Some(uart) => (uart, None),
            None => {
                let (uart, input, output) = Uart16550::new();
                let uart: Box<dyn Serial> = if self.config.debug_console {
                    tracing::info!("[Machine] UART receive register fed from stdin");
                    Box::new(ConsoleSerial::new(uart, std::io::stdin()))
                } else {
                    Box::new(uart)
                };
                (uart, Some(SerialHost { input, output }))
            }
        };

        let mut keyboard_input = None;
        let keyboard = match self.keyboard {
            Some(keyboard) => Some(keyboard),
            None if self.config.keyboard => default_keyboard(&mut keyboard_input),
            None => None,
        };

        let peripherals = Peripherals {
            via: self.via.unwrap_or_else(|| Box::new(Via6522::new())),
            uart,
            vdp: self.vdp.unwrap_or_else(|| Box::new(Tms9918::new())),
            psg: self.psg.unwrap_or_else(|| Box::new(Ym2149::new())),
            diagnostic: self.diagnostic.unwrap_or_default(),
        };

        let clock = Clock::new(self.config.cpu_clock_hz, self.config.frame_rate)?;
        tracing::debug!(
            "[Machine] {} cycles per scanline",
            clock.cycles_per_scanline()
        );

        let mut bus = Bus::new(self.config.ram_size, self.rom, peripherals)?;
        if let Some(image) = &self.cartridge {
            bus.attach_cartridge(image)?;
        }

        cpu.reset(&mut bus);

        Ok(Machine {
            bus,
            cpu,
            clock,
            keyboard,
            keyboard_input,
            serial,
            cycles: 0,
            frame_ready: false,
        })
    }
}

#[cfg(feature = "keyboard")]
fn default_keyboard(input: &mut Option<mpsc::Sender<u8>>) -> Option<Box<dyn KeyboardDevice>> {
    let (keyboard, tx) = crate::keyboard::Ps2Keyboard::new();
    *input = Some(tx);
    Some(Box::new(keyboard))
}

#[cfg(not(feature = "keyboard"))]
fn default_keyboard(_input: &mut Option<mpsc::Sender<u8>>) -> Option<Box<dyn KeyboardDevice>> {
    tracing::warn!("[Machine] Keyboard requested but the `keyboard` feature is disabled");
    None
}
