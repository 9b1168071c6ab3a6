/// What the instruction engine sees of the machine: byte reads and writes
/// and the three interrupt inputs it samples between instructions.
pub trait CpuBus {
    fn read(&mut self, address: u16) -> u8;
    fn write(&mut self, address: u16, value: u8);

    fn nmi(&self) -> bool;
    fn irq(&self) -> bool;
    fn firq(&self) -> bool;

    /// Returns and clears the latched NMI assertion edge.
    fn take_nmi_edge(&mut self) -> bool;
}

/// The instruction engine driving the bus. Implementations live outside this
/// crate.
pub trait Cpu {
    /// Executes one instruction (or interrupt entry) and returns the cycles
    /// it took.
    fn step(&mut self, bus: &mut dyn CpuBus) -> u32;

    fn reset(&mut self, _bus: &mut dyn CpuBus) {}

    fn pc(&self) -> u16 {
        0
    }

    fn halted(&self) -> bool {
        false
    }
}
