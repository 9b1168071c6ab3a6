use crate::error::MachineError;

/// Ultim809 timing: 8 MHz crystal divided by four for the CPU, 60 Hz video.
pub const CPU_CLOCK_HZ: u32 = 2_000_000;
pub const FRAME_RATE: u32 = 60;
pub const SCANLINES_PER_FRAME: u32 = 262;
pub const VBLANK_START_LINE: u32 = 192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    VBlankStart,
    FrameEnd,
}

/// Frame timing in CPU cycles. The vertical-blank pulse that raises the VDP
/// interrupt comes from here.
#[derive(Debug, Clone)]
pub struct Clock {
    cycles_per_scanline: u32,

    /// Total CPU cycles executed
    total_cycles: u64,

    /// Current scanline (0-261)
    current_scanline: u32,

    /// Cycles within current scanline
    scanline_cycle: u32,

    frame_count: u64,
}

impl Clock {
    /// Fails when the rates are zero, overflow, or leave less than one CPU
    /// cycle per scanline.
    pub fn new(cpu_clock_hz: u32, frame_rate: u32) -> Result<Self, MachineError> {
        if cpu_clock_hz == 0 {
            return Err(MachineError::InvalidConfig(
                "cpu_clock_hz must be non-zero".to_string(),
            ));
        }
        if frame_rate == 0 {
            return Err(MachineError::InvalidConfig(
                "frame_rate must be non-zero".to_string(),
            ));
        }

        let lines_per_second = frame_rate.checked_mul(SCANLINES_PER_FRAME).ok_or_else(|| {
            MachineError::InvalidConfig(format!("frame_rate {} is out of range", frame_rate))
        })?;

        let cycles_per_scanline = cpu_clock_hz / lines_per_second;
        if cycles_per_scanline == 0 {
            return Err(MachineError::InvalidConfig(format!(
                "cpu_clock_hz {} is too slow for {} scanlines per second",
                cpu_clock_hz, lines_per_second
            )));
        }

        Ok(Self::with_scanline_length(cycles_per_scanline))
    }

    fn with_scanline_length(cycles_per_scanline: u32) -> Self {
        Self {
            cycles_per_scanline,
            total_cycles: 0,
            current_scanline: 0,
            scanline_cycle: 0,
            frame_count: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::with_scanline_length(self.cycles_per_scanline);
    }

    /// Advance the clock by the specified number of CPU cycles
    pub fn tick(&mut self, cycles: u32) -> Vec<ClockEvent> {
        let mut triggered_events = Vec::new();
        let mut remaining = cycles;
        self.total_cycles += cycles as u64;

        while remaining > 0 {
            let left_in_line = self.cycles_per_scanline - self.scanline_cycle;
            if remaining < left_in_line {
                self.scanline_cycle += remaining;
                break;
            }

            remaining -= left_in_line;
            self.scanline_cycle = 0;
            self.current_scanline += 1;

            if self.current_scanline == VBLANK_START_LINE {
                triggered_events.push(ClockEvent::VBlankStart);
            }

            if self.current_scanline >= SCANLINES_PER_FRAME {
                self.current_scanline = 0;
                self.frame_count += 1;
                triggered_events.push(ClockEvent::FrameEnd);
            }
        }

        triggered_events
    }

    pub fn cycles_per_scanline(&self) -> u32 {
        self.cycles_per_scanline
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::with_scanline_length(CPU_CLOCK_HZ / (FRAME_RATE * SCANLINES_PER_FRAME))
    }
}
