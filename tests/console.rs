use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use famiclock::{
    AudioSink, CartridgeImage, Console, ConsoleConfig, ConsoleState, Error, MapperStatus,
    Mirroring, RunMode, Tick,
    cartridge::CartridgeError,
    controller::BUTTON_A,
    cpu::CpuError,
};

const RESET: u16 = 0x8000;

const NMI_HANDLER: u16 = 0x9000;

/// 32 KiB of NOPs with `program` at $8000, the reset vector pointing at it and the NMI vector
/// at `NMI_HANDLER`.
fn program_rom(program: &[u8]) -> Vec<u8> {
    let mut prg = vec![0xEA; 0x8000];
    prg[..program.len()].copy_from_slice(program);
    prg[0x7FFA..0x7FFC].copy_from_slice(&NMI_HANDLER.to_le_bytes());
    prg[0x7FFC..0x7FFE].copy_from_slice(&RESET.to_le_bytes());
    prg
}

fn nrom(program: &[u8]) -> CartridgeImage {
    CartridgeImage::new(program_rom(program), vec![0; 0x2000], 0, Mirroring::Horizontal).unwrap()
}

/// NOP; NOP; JMP $8000
fn looping_console() -> Console {
    let mut console = Console::default();
    console.load(nrom(&[0xEA, 0xEA, 0x4C, 0x00, 0x80]));
    console
}

#[test]
fn load_leaves_console_stopped_at_reset_vector() {
    let console = looping_console();
    assert_eq!(console.state(), ConsoleState::Stopped);
    assert_eq!(console.registers().pc, RESET);
    assert_eq!(console.mapper_status(), MapperStatus::Active(0));
}

#[test]
fn units_advance_in_one_three_one_ratio() {
    let mut console = looping_console();
    let dots = console.bus().ppu.dots;
    let apu_cycles = console.bus().apu.cycle();

    let mut total = 0u64;
    for _ in 0..500 {
        let cycles = console.step().unwrap() as u64;
        assert!(cycles >= 2);
        total += cycles;
    }

    assert_eq!(console.bus().ppu.dots - dots, 3 * total);
    assert_eq!(console.bus().apu.cycle() - apu_cycles, total);
}

#[test]
fn audio_sink_gets_one_sample_per_cpu_cycle() {
    struct Counter(Rc<Cell<u64>>);

    impl AudioSink for Counter {
        fn push_sample(&mut self, sample: f32) {
            assert!((0.0..=1.0).contains(&sample));
            self.0.set(self.0.get() + 1);
        }
    }

    let mut console = looping_console();
    let samples = Rc::new(Cell::new(0));
    console.set_audio_sink(Counter(samples.clone()));

    let mut total = 0;
    for _ in 0..100 {
        total += console.step().unwrap() as u64;
    }
    assert_eq!(samples.get(), total);
}

#[test]
fn breakpoint_at_reset_vector_halts_first_tick() {
    let mut console = looping_console();
    console.add_breakpoint(RESET);
    console.run_with_breakpoints(|_| {}).unwrap();
    assert_eq!(console.state(), ConsoleState::Running(RunMode::Breakpoints));

    assert_eq!(console.tick().unwrap(), Tick::Breakpoint(RESET));
    assert_eq!(console.registers().pc, RESET);
    assert_eq!(console.registers().cycles, 7);
    assert_eq!(console.state(), ConsoleState::Stopped);
    assert_eq!(console.tick().unwrap(), Tick::Idle);
}

#[test]
fn resuming_executes_the_breakpoint_once() {
    let mut console = looping_console();
    console.add_breakpoint(RESET);
    console.run_with_breakpoints(|_| {}).unwrap();
    assert_eq!(console.tick().unwrap(), Tick::Breakpoint(RESET));

    console.run_with_breakpoints(|_| {}).unwrap();
    assert_eq!(console.tick().unwrap(), Tick::Stepped); // NOP at $8000
    assert_eq!(console.tick().unwrap(), Tick::Stepped); // NOP at $8001
    assert_eq!(console.tick().unwrap(), Tick::Breakpoint(RESET)); // JMP lands on it
    assert!(!console.is_running());
}

#[test]
fn step_callback_sees_each_instruction() {
    let mut console = looping_console();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    console
        .run_with_breakpoints(move |regs| log.borrow_mut().push(regs.pc))
        .unwrap();

    for _ in 0..4 {
        assert_eq!(console.tick().unwrap(), Tick::Stepped);
    }
    assert_eq!(*seen.borrow(), vec![0x8001, 0x8002, 0x8000, 0x8001]);
}

#[test]
fn step_frame_advances_exactly_one_frame() {
    let mut console = looping_console();
    for expected in 1..=3 {
        let cycles = console.step_frame().unwrap();
        assert!(cycles > 0);
        assert_eq!(console.frame(), expected);
    }
}

#[test]
fn run_ticks_whole_frames_and_reports_them() {
    let mut console = looping_console();
    let frames = Rc::new(Cell::new(0));
    let counter = frames.clone();
    console
        .run(move |framebuffer| {
            assert_eq!(framebuffer.len(), 256 * 240);
            counter.set(counter.get() + 1);
        })
        .unwrap();

    assert_eq!(console.tick().unwrap(), Tick::Frame);
    assert_eq!(console.tick().unwrap(), Tick::Frame);
    assert_eq!(frames.get(), 2);
    assert_eq!(console.frame(), 2);
}

#[test]
fn fps_is_unknown_until_second_sample() {
    let mut console = looping_console();
    assert_eq!(console.fps(), None);
    console.step_frame().unwrap();
    console.step_frame().unwrap();
    let fps = console.fps().unwrap();
    assert!(fps > 0.0);
}

#[test]
fn stop_handle_stops_on_next_tick() {
    let mut console = looping_console();
    let handle = console.stop_handle();
    console.run(|_| {}).unwrap();

    let remote = handle.clone();
    std::thread::spawn(move || remote.stop()).join().unwrap();

    assert_eq!(console.tick().unwrap(), Tick::Idle);
    assert_eq!(console.state(), ConsoleState::Stopped);
    assert_eq!(console.frame(), 0);
}

#[test]
fn unloaded_console_refuses_to_run() {
    let mut console = Console::default();
    assert_eq!(console.state(), ConsoleState::Unloaded);
    assert_eq!(console.mapper_status(), MapperStatus::NoCartridge);
    assert!(matches!(console.step(), Err(Error::NotLoaded)));
    assert!(matches!(console.step_frame(), Err(Error::NotLoaded)));
    assert!(matches!(console.run(|_| {}), Err(Error::NotLoaded)));
    assert_eq!(console.tick().unwrap(), Tick::Idle);
}

#[test]
fn invalid_image_keeps_previous_cartridge() {
    let mut console = looping_console();
    console.step().unwrap();
    let before = console.registers();

    let err = console.load_ines(&[0x4E, 0x45, 0x53]).unwrap_err();
    assert!(matches!(err, Error::Cartridge(CartridgeError::TooShort(3))));
    assert_eq!(console.registers(), before);
    assert_eq!(console.state(), ConsoleState::Stopped);
    assert_eq!(console.mapper_status(), MapperStatus::Active(0));
}

#[test]
fn ines_image_loads_through_console() {
    let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    let mut prg = vec![0xEA; 0x4000];
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0xC0;
    data.extend_from_slice(&prg);
    data.extend_from_slice(&[0; 0x2000]);

    let mut console = Console::default();
    console.load_ines(&data).unwrap();
    assert_eq!(console.registers().pc, 0xC000);
    assert_eq!(console.bus().mapper.as_ref().unwrap().mirroring(), Mirroring::Vertical);
}

#[test]
fn unsupported_mapper_is_distinct_from_no_cartridge() {
    let mut console = Console::default();
    let image = CartridgeImage::new(vec![0; 0x8000], vec![], 4, Mirroring::Vertical).unwrap();
    console.load(image);

    assert_eq!(console.mapper_status(), MapperStatus::Unsupported(4));
    assert_eq!(console.state(), ConsoleState::Stopped);
    // Cartridge space is unmapped.
    assert_eq!(console.read(0x8000), 0);
}

#[test]
fn nrom_reads_mirror_program_rom() {
    for banks in [1, 2] {
        let len = banks * 0x4000;
        let prg: Vec<u8> = (0..len).map(|i| (i * 7 ^ (i >> 8)) as u8).collect();
        let image = CartridgeImage::new(prg.clone(), vec![0; 0x2000], 0, Mirroring::Horizontal)
            .unwrap();

        let mut console = Console::default();
        console.load(image);
        for addr in 0x8000..=0xFFFFu16 {
            let offset = (addr as usize - 0x8000) % len;
            assert_eq!(console.read(addr), prg[offset], "addr ${addr:04X}");
        }
    }
}

#[test]
fn reset_stops_and_returns_to_vector() {
    let mut console = looping_console();
    console.run(|_| {}).unwrap();
    console.tick().unwrap();
    assert!(console.is_running());

    console.reset();
    assert_eq!(console.state(), ConsoleState::Stopped);
    assert_eq!(console.registers().pc, RESET);
    assert_eq!(console.mapper_status(), MapperStatus::Active(0));
}

#[test]
fn strict_mode_stops_on_undocumented_opcode() {
    let config = ConsoleConfig {
        illegal_opcodes: false,
        ..ConsoleConfig::default()
    };
    let mut console = Console::new(config);
    console.load(nrom(&[0xEA, 0xA7, 0x10])); // NOP; LAX $10
    console.run_with_breakpoints(|_| {}).unwrap();

    assert_eq!(console.tick().unwrap(), Tick::Stepped);
    let err = console.tick().unwrap_err();
    assert!(matches!(
        err,
        Error::Cpu(CpuError::UnsupportedOpcode {
            opcode: 0xA7,
            pc: 0x8001
        })
    ));
    assert_eq!(console.state(), ConsoleState::Stopped);
    assert_eq!(console.registers().pc, 0x8001);
}

#[test]
fn controller_is_read_through_the_cpu() {
    // LDA #1; STA $4016; LDA #0; STA $4016; LDA $4016
    let mut console = Console::default();
    console.load(nrom(&[
        0xA9, 0x01, 0x8D, 0x16, 0x40, 0xA9, 0x00, 0x8D, 0x16, 0x40, 0xAD, 0x16, 0x40,
    ]));
    console.controller_mut(0).unwrap().set_button(BUTTON_A, true);
    assert!(console.controller_mut(2).is_none());

    for _ in 0..5 {
        console.step().unwrap();
    }
    assert_eq!(console.registers().a, 0x41);
}

#[test]
fn debug_writes_reach_ram() {
    let mut console = looping_console();
    console.write(0x0010, 0x5A);
    assert_eq!(console.read(0x0810), 0x5A);
}

#[test]
fn vblank_nmi_is_taken_on_the_step_after_the_frame() {
    // LDA #$80; STA $2000; JMP $8005
    let mut console = Console::default();
    console.load(nrom(&[0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80]));
    console.step().unwrap();
    console.step().unwrap();
    assert_eq!(console.registers().pc, 0x8005);

    console.step_frame().unwrap();
    assert_eq!(console.registers().pc, 0x8005);

    assert_eq!(console.step().unwrap(), 7);
    assert_eq!(console.registers().pc, NMI_HANDLER);
}

#[test]
fn oam_dma_stalls_the_cpu_and_keeps_units_in_step() {
    // LDA #$02; STA $4014
    let mut console = Console::default();
    console.load(nrom(&[0xA9, 0x02, 0x8D, 0x14, 0x40]));
    console.write(0x0200, 0x77);
    console.write(0x02FF, 0x99);

    assert_eq!(console.step().unwrap(), 2);
    assert_eq!(console.bus().apu.cycle() % 2, 0);
    let dots = console.bus().ppu.dots;
    let apu_cycles = console.bus().apu.cycle();

    assert_eq!(console.step().unwrap(), 4 + 513);
    assert_eq!(console.bus().ppu.dots - dots, 1551);
    assert_eq!(console.bus().apu.cycle() - apu_cycles, 517);
    assert_eq!(console.bus().ppu.oam[0], 0x77);
    assert_eq!(console.bus().ppu.oam[0xFF], 0x99);
}

#[test]
fn oam_dma_on_odd_cycle_costs_one_more() {
    // LDA $00; STA $4014
    let mut console = Console::default();
    console.load(nrom(&[0xA5, 0x00, 0x8D, 0x14, 0x40]));

    assert_eq!(console.step().unwrap(), 3);
    assert_eq!(console.bus().apu.cycle() % 2, 1);
    let dots = console.bus().ppu.dots;

    assert_eq!(console.step().unwrap(), 4 + 514);
    assert_eq!(console.bus().ppu.dots - dots, 3 * 518);
}
