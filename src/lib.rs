pub mod address_map;
pub mod bus;
pub mod clock;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod diagnostic;
pub mod error;
pub mod interrupt;
pub mod keyboard;
pub mod machine;
pub mod memory;
pub mod psg;
pub mod rom;
pub mod uart;
pub mod utils;
pub mod vdp;
pub mod via;

pub use bus::{Bus, MachineState, Peripherals, CARTRIDGE_OFFSET, OPEN_BUS};
pub use config::MachineConfig;
pub use controller::{read_port, Button, Joypad, Pad};
pub use cpu::{Cpu, CpuBus};
pub use error::MachineError;
pub use interrupt::{InterruptLine, InterruptLines};
pub use machine::{Machine, MachineBuilder, MachineReport};
pub use utils::hexdump;

use tracing_subscriber::EnvFilter;

/// Builds a machine with the stock configuration and the given monitor ROM.
pub fn get_machine<C: Cpu>(cpu: C, rom_data: &[u8]) -> Result<Machine<C>, MachineError> {
    MachineBuilder::new().rom(rom_data).build(cpu)
}

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`). Safe to
/// call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
