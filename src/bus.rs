use derivative::Derivative;
use serde::Serialize;
use tracing::{info, trace};

use crate::{
    address_map::{ultim809_map, AddressMap, Decoded, Region},
    controller::{Joypad, Pad},
    cpu::CpuBus,
    diagnostic::DiagnosticSink,
    error::MachineError,
    interrupt::{InterruptLine, InterruptLines},
    keyboard::{KeyboardDecoder, KeyboardLines, SliceControl},
    memory::{Bank, BankedMemory},
    psg::{PortInputs, SoundChip},
    rom::Rom,
    uart::Serial,
    vdp::VideoProcessor,
    via::{ParallelIo, ViaPins},
};

/// Value read from addresses no device claims.
pub const OPEN_BUS: u8 = 0xFF;

/// Physical RAM offset cartridge images are copied to.
pub const CARTRIDGE_OFFSET: usize = 0x0100;

const PORT_B_CARD_DETECT: u8 = 1 << 4;
const PORT_B_KEYBOARD_DATA: u8 = 1 << 7;

/// Board-level latches that are not part of any peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MachineState {
    pub card_present: bool,
    /// SELECT line of both controller ports.
    pub controller_select: bool,
    pub keyboard: KeyboardDecoder,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            card_present: false,
            controller_select: true,
            keyboard: KeyboardDecoder::default(),
        }
    }
}

impl MachineState {
    /// Port B input pins: card detect on bit 4 and keyboard data on bit 7,
    /// both pulled low when active.
    pub fn port_b_input(&self) -> u8 {
        let mut value = 0xFF;
        if self.card_present {
            value &= !PORT_B_CARD_DETECT;
        }
        if !self.keyboard.data_line {
            value &= !PORT_B_KEYBOARD_DATA;
        }
        value
    }
}

/// The device collaborators wired behind the bus.
pub struct Peripherals {
    pub via: Box<dyn ParallelIo>,
    pub uart: Box<dyn Serial>,
    pub vdp: Box<dyn VideoProcessor>,
    pub psg: Box<dyn SoundChip>,
    pub diagnostic: DiagnosticSink,
}

struct BoardPins<'a> {
    state: &'a MachineState,
    memory: &'a mut BankedMemory,
}

impl ViaPins for BoardPins<'_> {
    fn port_b_input(&self) -> u8 {
        self.state.port_b_input()
    }

    fn port_a_output(&mut self, value: u8) {
        self.memory.select_bank3(value);
    }
}

struct ControllerPorts<'a> {
    pads: &'a [Joypad; 2],
    selected: bool,
}

impl PortInputs for ControllerPorts<'_> {
    fn port_a(&mut self) -> u8 {
        self.pads[0].read(self.selected)
    }

    fn port_b(&mut self) -> u8 {
        self.pads[1].read(self.selected)
    }
}

/// CPU address space. Every access is routed to exactly one backing store or
/// device, and the interrupt lines are recomputed before the access returns.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Bus {
    map: AddressMap,
    state: MachineState,
    memory: BankedMemory,
    rom: Rom,
    pads: [Joypad; 2],
    lines: InterruptLines,

    #[derivative(Debug = "ignore")]
    via: Box<dyn ParallelIo>,
    #[derivative(Debug = "ignore")]
    uart: Box<dyn Serial>,
    #[derivative(Debug = "ignore")]
    vdp: Box<dyn VideoProcessor>,
    #[derivative(Debug = "ignore")]
    psg: Box<dyn SoundChip>,
    #[derivative(Debug = "ignore")]
    diagnostic: DiagnosticSink,
}

impl Bus {
    pub fn new(ram_size: usize, rom: Rom, peripherals: Peripherals) -> Result<Self, MachineError> {
        let map = AddressMap::new(ultim809_map())?;
        let memory = BankedMemory::new(ram_size)?;

        let Peripherals {
            via,
            uart,
            vdp,
            psg,
            diagnostic,
        } = peripherals;

        Ok(Self {
            map,
            state: MachineState::default(),
            memory,
            rom,
            pads: [Joypad::new(); 2],
            lines: InterruptLines::new(),
            via,
            uart,
            vdp,
            psg,
            diagnostic,
        })
    }

    pub fn reset(&mut self) {
        self.via.reset();
        self.vdp.reset();
        self.psg.reset();
        self.update_lines();
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn memory(&self) -> &BankedMemory {
        &self.memory
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    pub fn lines(&self) -> &InterruptLines {
        &self.lines
    }

    pub fn joypad(&self, pad: Pad) -> &Joypad {
        &self.pads[pad as usize]
    }

    pub fn joypad_mut(&mut self, pad: Pad) -> &mut Joypad {
        &mut self.pads[pad as usize]
    }

    /// Copies a cartridge image to RAM at 0x0100 and pulls the card detect
    /// line. RAM is left untouched when the image does not fit.
    pub fn attach_cartridge(&mut self, image: &[u8]) -> Result<(), MachineError> {
        self.memory.load(CARTRIDGE_OFFSET, image)?;
        self.state.card_present = true;
        info!(
            "[BUS] Cartridge attached: {} bytes at {:#06X}",
            image.len(),
            CARTRIDGE_OFFSET
        );
        Ok(())
    }

    pub fn read(&mut self, address: u16) -> u8 {
        let Some(Decoded { region, offset }) = self.map.decode(address) else {
            trace!("[BUS] Open bus read {:04X}", address);
            return OPEN_BUS;
        };

        let value = match region {
            Region::Bank1 => self.memory.read(Bank::Bank1, offset),
            Region::Bank2 => self.memory.read(Bank::Bank2, offset),
            Region::Bank3 => self.memory.read(Bank::Bank3, offset),
            Region::Via => {
                let mut pins = BoardPins {
                    state: &self.state,
                    memory: &mut self.memory,
                };
                self.via.read(offset, &mut pins)
            }
            Region::Uart => self.uart.read(offset),
            Region::VdpVram => self.vdp.read(0),
            Region::VdpRegister => self.vdp.read(1),
            Region::PsgAddress => {
                let mut ports = ControllerPorts {
                    pads: &self.pads,
                    selected: self.state.controller_select,
                };
                self.psg.read_data(&mut ports)
            }
            Region::ControllerSelectClear => {
                self.state.controller_select = false;
                0
            }
            Region::ControllerSelectSet => {
                self.state.controller_select = true;
                0
            }
            Region::PsgData | Region::Diagnostic => {
                trace!("[BUS] Read from write-only port {:04X}", address);
                OPEN_BUS
            }
            Region::Rom => self.rom.read(offset),
        };

        self.update_lines();
        value
    }

    pub fn write(&mut self, address: u16, value: u8) {
        let Some(Decoded { region, offset }) = self.map.decode(address) else {
            trace!("[BUS] Open bus write {:04X} = {:02X}", address, value);
            return;
        };

        match region {
            Region::Bank1 => self.memory.write(Bank::Bank1, offset, value),
            Region::Bank2 => self.memory.write(Bank::Bank2, offset, value),
            Region::Bank3 => self.memory.write(Bank::Bank3, offset, value),
            Region::Via => {
                let mut pins = BoardPins {
                    state: &self.state,
                    memory: &mut self.memory,
                };
                self.via.write(offset, value, &mut pins);
            }
            Region::Uart => self.uart.write(offset, value),
            Region::VdpVram => self.vdp.write(0, value),
            Region::VdpRegister => self.vdp.write(1, value),
            Region::PsgAddress => self.psg.write_address(value),
            Region::PsgData => self.psg.write_data(value),
            Region::ControllerSelectClear | Region::ControllerSelectSet => {
                trace!("[BUS] Ignored write to read-only port {:04X}", address);
            }
            Region::Diagnostic => self.diagnostic.write(value),
            Region::Rom => self.rom.write(offset, value),
        }

        self.update_lines();
    }

    /// Side-effect free view of memory: RAM banks and ROM read through,
    /// device registers read as open bus.
    pub fn peek(&self, address: u16) -> u8 {
        match self.map.decode(address) {
            Some(Decoded {
                region: Region::Bank1,
                offset,
            }) => self.memory.read(Bank::Bank1, offset),
            Some(Decoded {
                region: Region::Bank2,
                offset,
            }) => self.memory.read(Bank::Bank2, offset),
            Some(Decoded {
                region: Region::Bank3,
                offset,
            }) => self.memory.read(Bank::Bank3, offset),
            Some(Decoded {
                region: Region::Rom,
                offset,
            }) => self.rom.read(offset),
            _ => OPEN_BUS,
        }
    }

    /// Advances the VIA timers.
    pub fn tick(&mut self, cycles: u32) {
        self.via.tick(cycles);
        self.update_lines();
    }

    pub fn vblank(&mut self) {
        self.vdp.vblank();
        self.update_lines();
    }

    pub fn set_service_key(&mut self, pressed: bool) {
        self.lines.set(InterruptLine::Nmi, pressed);
    }

    fn update_lines(&mut self) {
        self.lines.set(InterruptLine::Irq, self.vdp.irq_level());
        self.lines.set(InterruptLine::Firq, self.via.irq_level());
    }
}

impl KeyboardLines for Bus {
    fn clock(&mut self, level: bool) -> SliceControl {
        let falling_edge = self.state.keyboard.clock(level);

        self.via.set_ca1(level);
        self.update_lines();

        if falling_edge {
            SliceControl::Yield
        } else {
            SliceControl::Continue
        }
    }

    fn data(&mut self, level: bool) {
        self.state.keyboard.data(level);
    }
}

impl CpuBus for Bus {
    fn read(&mut self, address: u16) -> u8 {
        Bus::read(self, address)
    }

    fn write(&mut self, address: u16, value: u8) {
        Bus::write(self, address, value)
    }

    fn nmi(&self) -> bool {
        self.lines.nmi()
    }

    fn irq(&self) -> bool {
        self.lines.irq()
    }

    fn firq(&self) -> bool {
        self.lines.firq()
    }

    fn take_nmi_edge(&mut self) -> bool {
        self.lines.take_nmi_edge()
    }
}
