use serde::Serialize;
use tracing::debug;

/// CPU interrupt inputs. Each one has exactly one driver:
///
/// - `Nmi`: the service key, used to break into the monitor
/// - `Irq`: the video processor's vblank flag
/// - `Firq`: the VIA's combined interrupt output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InterruptLine {
    Nmi,
    Irq,
    Firq,
}

/// Current level of the three interrupt lines. The lines are never combined;
/// the CPU samples each one on its own input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterruptLines {
    nmi: bool,
    irq: bool,
    firq: bool,
    #[serde(skip)]
    nmi_edge: bool,
}

impl InterruptLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives `line` to `level`. Returns true when the level changed.
    pub fn set(&mut self, line: InterruptLine, level: bool) -> bool {
        let slot = match line {
            InterruptLine::Nmi => &mut self.nmi,
            InterruptLine::Irq => &mut self.irq,
            InterruptLine::Firq => &mut self.firq,
        };

        if *slot == level {
            return false;
        }

        *slot = level;
        if line == InterruptLine::Nmi && level {
            self.nmi_edge = true;
        }
        debug!(
            "[INT] {:?} {}",
            line,
            if level { "asserted" } else { "cleared" }
        );
        true
    }

    pub fn nmi(&self) -> bool {
        self.nmi
    }

    pub fn irq(&self) -> bool {
        self.irq
    }

    pub fn firq(&self) -> bool {
        self.firq
    }

    /// NMI is taken on the assertion edge, not the level. Returns and clears
    /// the latched edge.
    pub fn take_nmi_edge(&mut self) -> bool {
        std::mem::take(&mut self.nmi_edge)
    }
}
