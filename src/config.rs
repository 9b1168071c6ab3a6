use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::clock::{CPU_CLOCK_HZ, FRAME_RATE};

pub const DEFAULT_RAM_SIZE: usize = 512 * 1024;

/// RAM sizes the board was built with.
pub const RAM_SIZE_OPTIONS: [usize; 4] = [512 * 1024, 1024 * 1024, 2048 * 1024, 4096 * 1024];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub ram_size: usize,
    pub cpu_clock_hz: u32,
    pub frame_rate: u32,
    /// Feed the UART receive register from stdin. Blocks the emulator on
    /// every receive read; meant for poking at the monitor from a terminal.
    pub debug_console: bool,
    /// Attach the serial keyboard (needs the `keyboard` feature).
    pub keyboard: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            ram_size: DEFAULT_RAM_SIZE,
            cpu_clock_hz: CPU_CLOCK_HZ,
            frame_rate: FRAME_RATE,
            debug_console: false,
            keyboard: false,
        }
    }
}

impl MachineConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("parsing machine config")?;
        if !RAM_SIZE_OPTIONS.contains(&config.ram_size) {
            tracing::warn!(
                "[CONFIG] RAM size {:#X} is not one of the stock options",
                config.ram_size
            );
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading machine config {}", path.display()))?;
        Self::from_json(&json)
    }
}
