use thiserror::Error;

use crate::address_map::Region;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    #[error("address map overlap: {first:?} and {second:?} both claim {address:#06X}")]
    OverlappingRegions {
        first: Region,
        second: Region,
        address: u16,
    },

    #[error("RAM size {size:#X} leaves no page for bank 3 (need at least {minimum:#X} bytes)")]
    RamTooSmall { size: usize, minimum: usize },

    #[error("invalid machine config: {0}")]
    InvalidConfig(String),

    #[error("cartridge image of {len} bytes does not fit in {capacity} bytes of RAM")]
    CartridgeTooLarge { len: usize, capacity: usize },
}
