//! NES emulator entry point.
//!
//! Loads a cartridge and runs it in a window, or headless for a fixed number of frames.
//! Usage: famiclock [OPTIONS] <ROM>

mod audio;

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use famiclock::{
    CartridgeImage, Console, ConsoleConfig, Tick,
    controller::{
        BUTTON_A, BUTTON_B, BUTTON_DOWN, BUTTON_LEFT, BUTTON_RIGHT, BUTTON_SELECT, BUTTON_START,
        BUTTON_UP,
    },
    pacer::Pacer,
    ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};
use log::{LevelFilter, error, info};
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};

/// How often the window title shows a fresh FPS sample.
const FPS_INTERVAL: Duration = Duration::from_secs(3);

const KEYMAP: [(Key, u8); 8] = [
    (Key::Z, BUTTON_A),
    (Key::X, BUTTON_B),
    (Key::RightShift, BUTTON_SELECT),
    (Key::Enter, BUTTON_START),
    (Key::Up, BUTTON_UP),
    (Key::Down, BUTTON_DOWN),
    (Key::Left, BUTTON_LEFT),
    (Key::Right, BUTTON_RIGHT),
];

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// iNES cartridge image
    rom: PathBuf,

    /// JSON settings file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Halt on undocumented opcodes
    #[arg(long, default_value_t = false)]
    strict_opcodes: bool,

    /// Log every executed instruction (nestest format)
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Halt before executing this address (hex, repeatable)
    #[arg(long = "breakpoint", value_parser = parse_hex_address)]
    breakpoints: Vec<u16>,

    /// Run this many frames without a window, then print CPU state
    #[arg(long)]
    frames: Option<u64>,

    /// Disable audio output
    #[arg(long, default_value_t = false)]
    mute: bool,

    /// Window scale: 1, 2, 4 or 8
    #[arg(long, default_value_t = 2)]
    scale: u8,
}

fn parse_hex_address(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn init_logging(trace: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if trace {
        builder.filter_module("famiclock::cpu", LevelFilter::Trace);
    }
    builder.init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig::default(),
    };
    if args.strict_opcodes {
        config.illegal_opcodes = false;
    }
    if args.trace {
        config.trace = true;
    }
    init_logging(config.trace);

    let image = CartridgeImage::load(&args.rom)
        .with_context(|| format!("loading {}", args.rom.display()))?;
    let mut console = Console::new(config.clone());
    console.load(image);
    for &addr in &args.breakpoints {
        console.add_breakpoint(addr);
    }

    match args.frames {
        Some(frames) => run_headless(&mut console, frames),
        None => run_window(&mut console, &args, config.frame_rate),
    }
}

fn run_headless(console: &mut Console, frames: u64) -> anyhow::Result<()> {
    if console.breakpoints().is_empty() {
        for _ in 0..frames {
            console.step_frame()?;
        }
    } else {
        console.run_with_breakpoints(|_| {})?;
        let target = console.frame() + frames;
        while console.frame() < target {
            if let Tick::Breakpoint(pc) = console.tick()? {
                println!("breakpoint at ${pc:04X}");
                break;
            }
        }
        console.stop();
    }

    println!("{}", console.trace_line().colored());
    println!("frame {}  {}", console.frame(), console.registers());
    Ok(())
}

/// Resume in the mode the command line asked for.
fn resume(console: &mut Console, debugging: bool) -> famiclock::Result<()> {
    if debugging {
        console.run_with_breakpoints(|regs| log::debug!("{regs}"))
    } else {
        console.run(|_| {})
    }
}

fn run_window(console: &mut Console, args: &Args, frame_rate: f64) -> anyhow::Result<()> {
    let _audio = if args.mute {
        None
    } else {
        audio::start(console)
    };

    let scale = match args.scale {
        1 => Scale::X1,
        4 => Scale::X4,
        8 => Scale::X8,
        _ => Scale::X2,
    };
    let mut window = Window::new(
        "famiclock",
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        WindowOptions {
            scale,
            ..WindowOptions::default()
        },
    )?;

    let debugging = !args.breakpoints.is_empty();
    resume(console, debugging)?;
    info!("F5 resume, F6 pause, F10 step, Esc quit");

    let mut pacer = Pacer::new(frame_rate);
    let mut last_fps = Instant::now();
    console.fps();

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(pad) = console.controller_mut(0) {
            for (key, mask) in KEYMAP {
                pad.set_button(mask, window.is_key_down(key));
            }
        }

        if window.is_key_pressed(Key::F5, KeyRepeat::No) && !console.is_running() {
            resume(console, debugging)?;
        }
        if window.is_key_pressed(Key::F6, KeyRepeat::No) {
            console.stop();
        }
        if window.is_key_pressed(Key::F10, KeyRepeat::Yes) && !console.is_running() {
            info!("{}", console.trace_line().colored());
            if let Err(e) = console.step() {
                error!("{e}");
            }
        }

        match console.tick() {
            Ok(Tick::Breakpoint(pc)) => {
                info!("breakpoint at ${pc:04X}: {}", console.registers());
            }
            Ok(_) => {}
            // The console stops itself; keep the last frame on screen.
            Err(e) => error!("{e}"),
        }

        window.update_with_buffer(console.framebuffer(), SCREEN_WIDTH, SCREEN_HEIGHT)?;

        if last_fps.elapsed() >= FPS_INTERVAL {
            if let Some(fps) = console.fps() {
                window.set_title(&format!("famiclock - {fps:.1} fps"));
            }
            last_fps = Instant::now();
        }

        pacer.wait();
    }

    Ok(())
}
