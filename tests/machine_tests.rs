mod common;

use std::{cell::RefCell, rc::Rc};

use common::{Op, ScriptCpu, CYCLES_PER_OP};
use ultim809::{
    diagnostic::DiagnosticSink,
    keyboard::{KeyboardDevice, KeyboardLines, SliceControl},
    memory::PAGE_SIZE,
    CpuBus, Machine, MachineBuilder, MachineConfig, MachineError,
};

const VDP_REGISTER: u16 = 0xCC01;
const VIA_T1C_L: u16 = 0xC004;
const VIA_T1C_H: u16 = 0xC005;
const VIA_IER: u16 = 0xC00E;

#[cfg(test)]
#[ctor::ctor]
fn init() {
    common::init_tracing();
}

fn machine() -> Machine<ScriptCpu> {
    machine_with(MachineBuilder::new())
}

fn machine_with(builder: MachineBuilder) -> Machine<ScriptCpu> {
    builder
        .diagnostic(DiagnosticSink::new(Box::new(std::io::sink())))
        .build(ScriptCpu::default())
        .unwrap()
}

fn run(machine: &mut Machine<ScriptCpu>, ops: &[Op]) {
    machine.cpu.push(ops);
    while !machine.cpu.ops.is_empty() {
        machine.step();
    }
}

#[test]
fn test_build_resets_cpu() {
    let mut machine = machine();
    assert_eq!(machine.cpu.resets, 1);
    assert_eq!(machine.cycles(), 0);

    machine.step_for(100);
    assert!(machine.cycles() >= 100);

    machine.reset();
    assert_eq!(machine.cpu.resets, 2);
    assert_eq!(machine.cycles(), 0);
}

#[test]
fn test_step_advances_by_instruction_cycles() {
    let mut machine = machine();
    assert_eq!(machine.step(), CYCLES_PER_OP);
    assert_eq!(machine.step(), CYCLES_PER_OP);
    assert_eq!(machine.cycles(), 2 * CYCLES_PER_OP as u64);
}

#[test]
fn test_vblank_raises_irq_until_status_read() {
    let mut machine = machine();
    // R1 = 0x20: frame interrupt enable
    run(&mut machine, &[Op::Write(VDP_REGISTER, 0x20), Op::Write(VDP_REGISTER, 0x81)]);
    assert!(!machine.bus.lines().irq());

    machine.step_frame();
    assert!(machine.bus.lines().irq());
    assert!(!machine.bus.lines().firq());
    assert_eq!(machine.report().frame, 1);

    run(&mut machine, &[Op::Read(VDP_REGISTER)]);
    let observed = machine.cpu.last_read();
    assert_eq!(observed.value & 0x80, 0x80);
    assert!(!observed.irq);

    run(&mut machine, &[Op::Read(VDP_REGISTER)]);
    assert_eq!(machine.cpu.last_read().value & 0x80, 0);
}

#[test]
fn test_vblank_without_enable_leaves_irq_low() {
    let mut machine = machine();
    machine.step_frame();
    assert!(!machine.bus.lines().irq());

    run(&mut machine, &[Op::Read(VDP_REGISTER)]);
    assert_eq!(machine.cpu.last_read().value & 0x80, 0x80);
}

#[test]
fn test_via_timer_drives_firq() {
    let mut machine = machine();
    run(
        &mut machine,
        &[Op::Write(VIA_IER, 0xC0), Op::Write(VIA_T1C_L, 0x10), Op::Write(VIA_T1C_H, 0x00)],
    );

    for _ in 0..3 {
        machine.step();
        assert!(!machine.bus.lines().firq());
    }

    machine.step();
    assert!(machine.bus.lines().firq());
    assert!(!machine.bus.lines().irq());

    run(&mut machine, &[Op::Read(VIA_T1C_L)]);
    assert!(!machine.cpu.last_read().firq);
    assert!(!machine.bus.lines().firq());
}

#[test]
fn test_service_key_nmi() {
    let mut machine = machine();
    assert!(!machine.bus.take_nmi_edge());

    machine.set_service_key(true);
    assert!(machine.bus.lines().nmi());
    assert!(machine.bus.take_nmi_edge());
    assert!(!machine.bus.take_nmi_edge());

    // holding the key does not retrigger
    machine.set_service_key(true);
    assert!(!machine.bus.take_nmi_edge());

    machine.set_service_key(false);
    assert!(!machine.bus.lines().nmi());
    machine.set_service_key(true);
    assert!(machine.bus.take_nmi_edge());
}

#[test]
fn test_config_selects_ram_size() {
    let config = MachineConfig::from_json(r#"{ "ram_size": 1048576 }"#).unwrap();
    let mut machine = machine_with(MachineBuilder::new().config(config));
    assert_eq!(machine.bus.memory().num_banks(), 64);

    run(&mut machine, &[Op::Write(0xC003, 0xFF), Op::Write(0xC001, 35)]);
    assert_eq!(machine.report().bank3_page, 35);
}

#[test]
fn test_builder_errors() {
    let result = MachineBuilder::new()
        .ram_size(PAGE_SIZE + 1)
        .build(ScriptCpu::default());
    assert_eq!(
        result.err(),
        Some(MachineError::RamTooSmall {
            size: PAGE_SIZE + 1,
            minimum: 2 * PAGE_SIZE
        })
    );
}

#[test]
fn test_builder_rejects_out_of_range_timing() {
    for json in [
        r#"{ "frame_rate": 20000000 }"#,
        r#"{ "frame_rate": 0 }"#,
        r#"{ "cpu_clock_hz": 0 }"#,
        r#"{ "cpu_clock_hz": 1000 }"#,
    ] {
        let config = MachineConfig::from_json(json).unwrap();
        let result = MachineBuilder::new()
            .config(config)
            .build(ScriptCpu::default());
        assert!(
            matches!(result, Err(MachineError::InvalidConfig(_))),
            "{} was accepted",
            json
        );
    }
}

#[test]
fn test_load_cartridge_file() {
    let path = std::env::temp_dir().join(format!("ultim809-{}.ex9", std::process::id()));
    std::fs::write(&path, [0x86, 0x42, 0x3F]).unwrap();

    let mut machine = machine();
    machine.load_cartridge_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(machine.bus.state().card_present);
    assert_eq!(machine.bus.peek(0x0100), 0x86);
    assert_eq!(machine.bus.peek(0x0102), 0x3F);

    let err = machine.load_cartridge_file(&path).unwrap_err();
    assert!(err.to_string().contains("reading cartridge image"));
}

#[test]
fn test_report_json() {
    let mut machine = machine_with(MachineBuilder::new().cartridge(&[0x12]));
    machine.set_service_key(true);

    let report = machine.report();
    assert!(report.state.card_present);
    assert!(report.lines.nmi());

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["bank3_page"], 0);
    assert_eq!(json["state"]["card_present"], true);
    assert_eq!(json["state"]["controller_select"], true);
    assert_eq!(json["lines"]["nmi"], true);
    assert_eq!(json["lines"]["irq"], false);
}

#[test]
fn test_memory_dump_uses_cpu_view() {
    let mut machine = machine_with(MachineBuilder::new().rom(&[0xAA, 0xBB]));
    run(&mut machine, &[Op::Write(0x4000, b'H'), Op::Write(0x4001, b'I')]);

    let dump = machine.memory_dump(0x4000, 0x400F);
    assert!(dump.starts_with("4000: 48 49 00"));
    assert!(dump.contains("HI"));

    let dump = machine.memory_dump(0xE000, 0xE001);
    assert!(dump.starts_with("e000: aa bb"));

    // device registers are not touched
    let dump = machine.memory_dump(0xCC06, 0xCC06);
    assert!(dump.starts_with("cc06: ff"));
    assert!(machine.bus.state().controller_select);
}

/// Drives the clock line through a fixed level sequence, one change per
/// slice unless told to continue, and records what the bus answered.
struct ScriptedKeyboard {
    levels: Vec<bool>,
    answers: Rc<RefCell<Vec<SliceControl>>>,
    slices: Rc<RefCell<usize>>,
}

impl KeyboardDevice for ScriptedKeyboard {
    fn run(&mut self, _cycles: u32, lines: &mut dyn KeyboardLines) {
        *self.slices.borrow_mut() += 1;
        while !self.levels.is_empty() {
            let level = self.levels.remove(0);
            let answer = lines.clock(level);
            self.answers.borrow_mut().push(answer);
            if answer == SliceControl::Yield {
                return;
            }
        }
    }
}

#[test]
fn test_keyboard_device_yields_on_falling_edge() {
    let answers = Rc::new(RefCell::new(Vec::new()));
    let slices = Rc::new(RefCell::new(0));
    let keyboard = ScriptedKeyboard {
        levels: vec![true, false, false, true, false, true],
        answers: answers.clone(),
        slices: slices.clone(),
    };

    let mut machine = machine_with(MachineBuilder::new().keyboard(Box::new(keyboard)));
    assert!(machine.keyboard_input().is_none());

    machine.step();
    assert_eq!(
        *answers.borrow(),
        vec![SliceControl::Continue, SliceControl::Yield]
    );

    machine.step();
    assert_eq!(answers.borrow().len(), 5);
    assert_eq!(answers.borrow()[4], SliceControl::Yield);

    machine.step();
    assert_eq!(answers.borrow().len(), 6);
    assert_eq!(*slices.borrow(), 3);
    assert!(machine.bus.state().keyboard.clock_prev);
}

#[test]
fn test_rom_loaded_from_file() {
    let path = std::env::temp_dir().join(format!("ultim809-rom-{}.bin", std::process::id()));
    std::fs::write(&path, [0x7E, 0xE0, 0x10]).unwrap();
    let rom = ultim809::rom::Rom::load(path.clone()).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut machine = machine_with(MachineBuilder::new().rom_image(rom));
    assert_eq!(machine.bus.rom().rom_path.as_deref(), Some(path.as_path()));

    run(&mut machine, &[Op::Read(0xE000), Op::Read(0xE002), Op::Read(0xE003)]);
    let values: Vec<u8> = machine.cpu.reads.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![0x7E, 0x10, 0xFF]);
}
