//! The console: owns every unit and advances them in lockstep.
//!
//! Each [`Console::step`] runs one CPU instruction, then the PPU for three dots per CPU cycle,
//! then the APU once per CPU cycle. Real-time scheduling belongs to the host: it calls
//! [`Console::tick`] at the [`Pacer`](crate::pacer::Pacer) cadence after choosing a run mode
//! with [`Console::run`] or [`Console::run_with_breakpoints`].

use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use log::{debug, info};

use crate::{
    bus::{Bus, NesBus},
    cartridge::{CartridgeImage, Mapper, MapperStatus},
    config::ConsoleConfig,
    controller::Controller,
    cpu::{CPU, Registers, TraceLine},
    error::{Error, Result},
};

/// Picture steps per CPU cycle.
const PPU_DOTS_PER_CPU_CYCLE: u32 = 3;

type FrameCallback = Box<dyn FnMut(&[u32])>;
type StepCallback = Box<dyn FnMut(&Registers)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// One frame per tick.
    Frames,
    /// One instruction per tick, halting on breakpoints.
    Breakpoints,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleState {
    Unloaded,
    Stopped,
    Running(RunMode),
}

/// Outcome of one scheduled tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Not running; nothing was executed.
    Idle,
    Frame,
    Stepped,
    /// Execution halted before the instruction at this address.
    Breakpoint(u16),
}

/// Receives one mixed sample (0.0..=1.0) per APU cycle.
pub trait AudioSink {
    fn push_sample(&mut self, sample: f32);
}

/// Requests a stop from anywhere; honoured at the start of the next tick.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

pub struct Console {
    cpu: CPU<NesBus>,
    state: ConsoleState,
    breakpoints: BTreeSet<u16>,
    /// Address a breakpoint halted on; the next resume executes it once.
    resume_from: Option<u16>,
    fps_frame_count: u32,
    last_fps_sample: Option<Instant>,
    on_end_frame: Option<FrameCallback>,
    on_step: Option<StepCallback>,
    audio_sink: Option<Box<dyn AudioSink>>,
    stop_handle: StopHandle,
    config: ConsoleConfig,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(ConsoleConfig::default())
    }
}

impl Console {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            cpu: configured_cpu(NesBus::new(), &config),
            state: ConsoleState::Unloaded,
            breakpoints: BTreeSet::new(),
            resume_from: None,
            fps_frame_count: 0,
            last_fps_sample: None,
            on_end_frame: None,
            on_step: None,
            audio_sink: None,
            stop_handle: StopHandle::default(),
            config,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Insert a cartridge and reset every unit. Breakpoints and callbacks are kept.
    pub fn load(&mut self, image: CartridgeImage) {
        info!(
            "loaded cartridge: mapper {}, PRG {} KiB, CHR {} KiB{}, {:?} mirroring",
            image.mapper_id(),
            image.prg_rom().len() / 1024,
            image.chr().len() / 1024,
            if image.chr_is_ram() { " (RAM)" } else { "" },
            image.mirroring()
        );

        let mut cpu = configured_cpu(NesBus::with_mapper(Mapper::new(image)), &self.config);
        cpu.reset();

        self.cpu = cpu;
        self.state = ConsoleState::Stopped;
        self.resume_from = None;
        self.fps_frame_count = 0;
        self.last_fps_sample = None;
    }

    /// Parse an iNES image and load it. A rejected image leaves the console untouched.
    pub fn load_ines(&mut self, data: &[u8]) -> Result<()> {
        let image = CartridgeImage::from_ines(data)?;
        self.load(image);
        Ok(())
    }

    /// Stop, then reset the CPU and PPU. Cartridge state is kept.
    pub fn reset(&mut self) {
        self.stop();
        self.cpu.reset();
        self.cpu.bus.ppu.reset();
        self.resume_from = None;
        info!("reset, PC=${:04X}", self.cpu.pc);
    }

    /// Execute one instruction and advance the PPU and APU to match. Returns the CPU cycles used.
    pub fn step(&mut self) -> Result<u32> {
        self.ensure_loaded()?;

        let cycles = match self.cpu.step() {
            Ok(cycles) => cycles,
            Err(err) => {
                self.stop();
                return Err(err.into());
            }
        };

        for _ in 0..cycles * PPU_DOTS_PER_CPU_CYCLE {
            self.cpu.bus.step_ppu();
        }
        for _ in 0..cycles {
            let sample = self.cpu.bus.step_apu();
            if let Some(sink) = self.audio_sink.as_mut() {
                sink.push_sample(sample);
            }
        }

        Ok(cycles)
    }

    /// Step until the PPU starts a new frame, then notify the frame callback. Returns CPU cycles.
    pub fn step_frame(&mut self) -> Result<u64> {
        self.ensure_loaded()?;

        let frame = self.cpu.bus.ppu.frame;
        let mut cycles = 0u64;
        while self.cpu.bus.ppu.frame == frame {
            cycles += self.step()? as u64;
        }

        if let Some(on_end_frame) = self.on_end_frame.as_mut() {
            on_end_frame(&self.cpu.bus.ppu.framebuffer[..]);
        }
        self.fps_frame_count += 1;
        Ok(cycles)
    }

    /// Run one frame per tick, calling `on_end_frame` with the framebuffer after each.
    pub fn run(&mut self, on_end_frame: impl FnMut(&[u32]) + 'static) -> Result<()> {
        self.ensure_loaded()?;
        self.stop();
        self.on_end_frame = Some(Box::new(on_end_frame));
        self.state = ConsoleState::Running(RunMode::Frames);
        debug!("running frames");
        Ok(())
    }

    /// Run one instruction per tick, calling `on_step` afterwards and halting on breakpoints.
    pub fn run_with_breakpoints(&mut self, on_step: impl FnMut(&Registers) + 'static) -> Result<()> {
        self.ensure_loaded()?;
        self.stop();
        self.on_step = Some(Box::new(on_step));
        self.state = ConsoleState::Running(RunMode::Breakpoints);
        debug!("running with {} breakpoint(s)", self.breakpoints.len());
        Ok(())
    }

    pub fn stop(&mut self) {
        if let ConsoleState::Running(mode) = self.state {
            self.state = ConsoleState::Stopped;
            debug!("stopped {mode:?} run");
        }
    }

    /// One scheduled tick of the current run mode. A pending [`StopHandle`] request is honoured
    /// first.
    pub fn tick(&mut self) -> Result<Tick> {
        if self.stop_handle.take() {
            self.stop();
        }

        let ConsoleState::Running(mode) = self.state else {
            return Ok(Tick::Idle);
        };

        match mode {
            RunMode::Frames => {
                self.step_frame()?;
                Ok(Tick::Frame)
            }
            RunMode::Breakpoints => {
                let pc = self.cpu.pc;
                let outcome = if self.resume_from.take() != Some(pc) && self.breakpoints.contains(&pc) {
                    self.halt_at(pc)
                } else {
                    self.step()?;
                    let pc = self.cpu.pc;
                    if self.breakpoints.contains(&pc) {
                        self.halt_at(pc)
                    } else {
                        Tick::Stepped
                    }
                };

                if let Some(on_step) = self.on_step.as_mut() {
                    on_step(&self.cpu.registers());
                }
                Ok(outcome)
            }
        }
    }

    fn halt_at(&mut self, pc: u16) -> Tick {
        debug!("breakpoint hit at ${pc:04X}");
        self.stop();
        self.resume_from = Some(pc);
        Tick::Breakpoint(pc)
    }

    fn ensure_loaded(&self) -> Result<()> {
        match self.state {
            ConsoleState::Unloaded => Err(Error::NotLoaded),
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ConsoleState::Running(_))
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Frames per second since the previous call; `None` on the first call.
    pub fn fps(&mut self) -> Option<f64> {
        let now = Instant::now();
        let fps = self.last_fps_sample.map(|last| {
            let elapsed = now.duration_since(last).as_secs_f64();
            if elapsed > 0.0 {
                self.fps_frame_count as f64 / elapsed
            } else {
                0.0
            }
        });

        self.fps_frame_count = 0;
        self.last_fps_sample = Some(now);
        if let Some(fps) = fps {
            debug!("{fps:.1} fps");
        }
        fps
    }

    pub fn registers(&self) -> Registers {
        self.cpu.registers()
    }

    /// Decoded instruction at PC.
    pub fn trace_line(&mut self) -> TraceLine {
        TraceLine::capture(&mut self.cpu)
    }

    /// Debugger read without I/O side effects.
    pub fn read(&mut self, addr: u16) -> u8 {
        self.cpu.bus.peek(addr)
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        self.cpu.bus.write(addr, data);
    }

    pub fn breakpoints(&self) -> &BTreeSet<u16> {
        &self.breakpoints
    }

    pub fn breakpoints_mut(&mut self) -> &mut BTreeSet<u16> {
        &mut self.breakpoints
    }

    pub fn add_breakpoint(&mut self, addr: u16) -> bool {
        self.breakpoints.insert(addr)
    }

    pub fn remove_breakpoint(&mut self, addr: u16) -> bool {
        self.breakpoints.remove(&addr)
    }

    /// 256x240 pixels, 0xRRGGBB.
    pub fn framebuffer(&self) -> &[u32] {
        &self.cpu.bus.ppu.framebuffer[..]
    }

    pub fn frame(&self) -> u64 {
        self.cpu.bus.ppu.frame
    }

    pub fn controller_mut(&mut self, port: usize) -> Option<&mut Controller> {
        self.cpu.bus.controllers.get_mut(port)
    }

    pub fn set_audio_sink(&mut self, sink: impl AudioSink + 'static) {
        self.audio_sink = Some(Box::new(sink));
    }

    pub fn mapper_status(&self) -> MapperStatus {
        self.cpu
            .bus
            .mapper
            .as_ref()
            .map_or(MapperStatus::NoCartridge, Mapper::status)
    }

    pub fn bus(&self) -> &NesBus {
        &self.cpu.bus
    }
}

fn configured_cpu(bus: NesBus, config: &ConsoleConfig) -> CPU<NesBus> {
    let mut cpu = CPU::new(bus);
    cpu.illegal_opcodes = config.illegal_opcodes;
    cpu.trace = config.trace;
    cpu
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Mirroring;

    fn image() -> CartridgeImage {
        CartridgeImage::new(vec![0xEA; 0x8000], vec![0; 0x2000], 0, Mirroring::Horizontal).unwrap()
    }

    #[test]
    fn config_flags_reach_the_cpu() {
        let config = ConsoleConfig {
            illegal_opcodes: false,
            trace: true,
            ..ConsoleConfig::default()
        };
        let mut console = Console::new(config);
        assert!(console.cpu.trace);
        assert!(!console.cpu.illegal_opcodes);

        console.load(image());
        assert!(console.cpu.trace);
        assert!(!console.cpu.illegal_opcodes);
    }

    #[test]
    fn trace_is_off_by_default() {
        let mut console = Console::default();
        console.load(image());
        assert!(!console.cpu.trace);
        assert!(console.cpu.illegal_opcodes);
    }
}
