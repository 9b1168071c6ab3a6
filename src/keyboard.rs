use serde::Serialize;

/// Returned from [`KeyboardLines::clock`] to tell the keyboard whether it may
/// keep running in the current slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceControl {
    Continue,
    Yield,
}

/// The two open-collector lines a serial keyboard drives.
pub trait KeyboardLines {
    fn clock(&mut self, level: bool) -> SliceControl;
    fn data(&mut self, level: bool);
}

/// A serial keyboard advanced cooperatively by the machine scheduler.
pub trait KeyboardDevice {
    /// Runs for at most `cycles` CPU cycles, reporting line changes through
    /// `lines`. When a clock change returns [`SliceControl::Yield`] the
    /// device must stop and forfeit the rest of the slice.
    fn run(&mut self, cycles: u32, lines: &mut dyn KeyboardLines);
}

/// Falling-edge detector on the keyboard clock line plus the last level seen
/// on the data line. Both lines idle high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyboardDecoder {
    pub data_line: bool,
    pub clock_prev: bool,
}

impl KeyboardDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new clock level and returns true on a high-to-low
    /// transition. Only the stored previous level is compared; edges are
    /// never queued.
    pub fn clock(&mut self, level: bool) -> bool {
        let falling_edge = self.clock_prev && !level;
        self.clock_prev = level;
        falling_edge
    }

    pub fn data(&mut self, level: bool) {
        self.data_line = level;
    }
}

impl Default for KeyboardDecoder {
    fn default() -> Self {
        Self {
            data_line: true,
            clock_prev: true,
        }
    }
}

#[cfg(feature = "keyboard")]
pub use ps2::Ps2Keyboard;

#[cfg(feature = "keyboard")]
mod ps2 {
    use std::sync::mpsc;

    use super::{KeyboardDevice, KeyboardLines, SliceControl};

    /// Cycles the clock line stays in each half of a bit cell.
    pub const HALF_PERIOD: u32 = 80;
    /// Cycles between presenting a data bit and pulling the clock low.
    pub const DATA_SETUP: u32 = 20;
    /// Idle cycles between two frames.
    pub const INTER_FRAME: u32 = 400;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Data,
        ClockLow,
        ClockHigh,
    }

    #[derive(Debug, Clone, Copy)]
    struct Frame {
        bits: u16,
        index: u8,
        phase: Phase,
    }

    impl Frame {
        const LEN: u8 = 11;

        /// Start bit, eight data bits LSB first, odd parity, stop bit.
        fn new(byte: u8) -> Self {
            let parity = (byte.count_ones() % 2 == 0) as u16;
            let bits = ((byte as u16) << 1) | (parity << 9) | (1 << 10);
            Self {
                bits,
                index: 0,
                phase: Phase::Data,
            }
        }

        fn bit(&self) -> bool {
            self.bits & (1 << self.index) != 0
        }
    }

    /// Serial keyboard that clocks queued scancode bytes out over the clock
    /// and data lines, one 11-bit frame per byte.
    pub struct Ps2Keyboard {
        input: mpsc::Receiver<u8>,
        frame: Option<Frame>,
        wait: u32,
    }

    impl Ps2Keyboard {
        pub fn new() -> (Self, mpsc::Sender<u8>) {
            let (tx, rx) = mpsc::channel();
            (
                Self {
                    input: rx,
                    frame: None,
                    wait: 0,
                },
                tx,
            )
        }

        pub fn is_idle(&self) -> bool {
            self.frame.is_none()
        }
    }

    impl KeyboardDevice for Ps2Keyboard {
        fn run(&mut self, cycles: u32, lines: &mut dyn KeyboardLines) {
            let mut budget = cycles;

            while budget > 0 {
                if self.wait > 0 {
                    let spent = self.wait.min(budget);
                    self.wait -= spent;
                    budget -= spent;
                    continue;
                }

                let Some(frame) = self.frame.as_mut() else {
                    match self.input.try_recv() {
                        Ok(byte) => {
                            tracing::trace!("[KBD] Sending {:02X}", byte);
                            self.frame = Some(Frame::new(byte));
                            continue;
                        }
                        Err(_) => return,
                    }
                };

                match frame.phase {
                    Phase::Data => {
                        lines.data(frame.bit());
                        frame.phase = Phase::ClockLow;
                        self.wait = DATA_SETUP;
                    }
                    Phase::ClockLow => {
                        frame.phase = Phase::ClockHigh;
                        self.wait = HALF_PERIOD;
                        if lines.clock(false) == SliceControl::Yield {
                            return;
                        }
                    }
                    Phase::ClockHigh => {
                        lines.clock(true);
                        frame.index += 1;
                        if frame.index == Frame::LEN {
                            self.frame = None;
                            self.wait = INTER_FRAME;
                        } else {
                            frame.phase = Phase::Data;
                            self.wait = HALF_PERIOD - DATA_SETUP;
                        }
                    }
                }
            }
        }
    }

}
