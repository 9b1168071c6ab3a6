use std::{fs::File, io::Read, path::PathBuf};

use anyhow::Context;
use serde::Serialize;

pub const ROM_BASE: u16 = 0xE000;
pub const ROM_SIZE: usize = 0x2000;

/// The fixed 8KB monitor ROM mapped at 0xE000-0xFFFF.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rom {
    pub rom_path: Option<PathBuf>,
    #[serde(skip)]
    data: Vec<u8>,
}

impl Rom {
    /// Builds the ROM from `rom`. Short images are padded with 0xFF, long
    /// images keep only their first 8KB.
    pub fn new(rom: &[u8]) -> Self {
        let mut data = vec![0xFF; ROM_SIZE];
        let len = rom.len().min(ROM_SIZE);
        data[..len].copy_from_slice(&rom[..len]);

        if rom.len() > ROM_SIZE {
            tracing::warn!(
                "[ROM] Image is {} bytes, only the first {} are mapped",
                rom.len(),
                ROM_SIZE
            );
        }

        Rom {
            rom_path: None,
            data,
        }
    }

    pub fn load(rom_path: PathBuf) -> anyhow::Result<Self> {
        let mut file = File::open(&rom_path)
            .with_context(|| format!("opening ROM image {}", rom_path.display()))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        let mut rom = Self::new(&buffer);
        rom.rom_path = Some(rom_path);

        Ok(rom)
    }

    pub fn read(&self, offset: u16) -> u8 {
        self.data
            .get(offset as usize)
            .copied()
            .unwrap_or(0xFF)
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        tracing::trace!(
            "Attempt to write {:02X} to ROM address {:#06X}",
            value,
            ROM_BASE as usize + offset as usize
        );
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new(&[])
    }
}
