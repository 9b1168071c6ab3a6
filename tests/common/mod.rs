#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, Write},
    rc::Rc,
};

use ultim809::{Cpu, CpuBus};

pub const CYCLES_PER_OP: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(u16),
    Write(u16, u8),
}

/// Levels of the three interrupt inputs right after an access returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    pub value: u8,
    pub nmi: bool,
    pub irq: bool,
    pub firq: bool,
}

/// Stand-in instruction engine that performs one scripted bus access per
/// step and idles once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptCpu {
    pub ops: VecDeque<Op>,
    pub reads: Vec<Observed>,
    pub resets: usize,
}

impl ScriptCpu {
    pub fn new(ops: &[Op]) -> Self {
        Self {
            ops: ops.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, ops: &[Op]) {
        self.ops.extend(ops.iter().copied());
    }

    pub fn last_read(&self) -> Observed {
        *self.reads.last().expect("no reads recorded")
    }
}

impl Cpu for ScriptCpu {
    fn step(&mut self, bus: &mut dyn CpuBus) -> u32 {
        match self.ops.pop_front() {
            Some(Op::Read(address)) => {
                let value = bus.read(address);
                self.reads.push(Observed {
                    value,
                    nmi: bus.nmi(),
                    irq: bus.irq(),
                    firq: bus.firq(),
                });
            }
            Some(Op::Write(address, value)) => bus.write(address, value),
            None => {}
        }
        CYCLES_PER_OP
    }

    fn reset(&mut self, _bus: &mut dyn CpuBus) {
        self.resets += 1;
    }
}

/// `Write` target shared between a test and the machine under test.
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Unable to set global tracing subscriber");
}
