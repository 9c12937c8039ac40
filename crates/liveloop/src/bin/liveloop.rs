//! # LIVELOOP Demo
//!
//! Opens a renderer with one orbiter named `o` and hands the terminal to
//! the live console.
//!
//! ```bash
//! # Window (needs --features window), default config
//! liveloop
//!
//! # Custom config, no window
//! liveloop liveloop.toml --headless
//!
//! # Smoke test: draw 300 frames headless, print stats, exit
//! liveloop --frames 300
//! ```

use std::io;
use std::process;
use std::time::Duration;

use liveloop::console::{self, Entity, Session, HELP};
use liveloop::core::Shared;
use liveloop::rendering::{HeadlessProbe, RendererConfig, RendererResult, ThreadedRenderer};
use liveloop::{Orbiter, Pulsar, Satellite};

const USAGE: &str = "usage: liveloop [config.toml] [--headless] [--frames N]";

struct Args {
    config: Option<String>,
    headless: bool,
    frames: Option<u64>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        headless: false,
        frames: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--headless" => args.headless = true,
            "--frames" => {
                let n = it.next().ok_or("--frames needs a count")?;
                let n = n.parse().map_err(|_| format!("'{n}' is not a frame count"))?;
                args.frames = Some(n);
            }
            "-h" | "--help" => return Err(USAGE.to_owned()),
            flag if flag.starts_with('-') => return Err(format!("unknown flag {flag}\n{USAGE}")),
            path if args.config.is_none() => args.config = Some(path.to_owned()),
            extra => return Err(format!("unexpected argument {extra}\n{USAGE}")),
        }
    }
    Ok(args)
}

fn headless_renderer(config: &RendererConfig) -> RendererResult<(ThreadedRenderer, Option<HeadlessProbe>)> {
    let (renderer, probe) = ThreadedRenderer::headless(config)?;
    Ok((renderer, Some(probe)))
}

#[cfg(feature = "window")]
fn open_renderer(
    config: &RendererConfig,
    headless: bool,
) -> RendererResult<(ThreadedRenderer, Option<HeadlessProbe>)> {
    if headless {
        headless_renderer(config)
    } else {
        Ok((ThreadedRenderer::windowed(config)?, None))
    }
}

#[cfg(not(feature = "window"))]
fn open_renderer(
    config: &RendererConfig,
    _headless: bool,
) -> RendererResult<(ThreadedRenderer, Option<HeadlessProbe>)> {
    headless_renderer(config)
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("liveloop: {message}");
    process::exit(1);
}

/// `--frames N`: draws a small scene headless and reports timing.
fn smoke(config: &RendererConfig, frames: u64) {
    let (mut renderer, probe) = headless_renderer(config).unwrap_or_else(|e| fail(e));
    let Some(probe) = probe else {
        fail("headless renderer has no probe");
    };

    let o = Shared::new(Orbiter::default());
    renderer.push(o.to_dyn());
    renderer.push(Shared::new(Pulsar::default()).to_dyn());
    renderer.push(Shared::new(Satellite::new(o)).to_dyn());
    renderer.start().unwrap_or_else(|e| fail(e));

    #[allow(clippy::cast_precision_loss)]
    let budget = Duration::from_secs_f64(frames as f64 / f64::from(config.fps) * 2.0 + 5.0);
    let reached = probe.wait_for_presents(frames, budget);
    renderer.stop();

    let stats = renderer.stats();
    println!("═══════════════════════════════════════════════");
    println!("  LIVELOOP smoke run");
    println!("═══════════════════════════════════════════════");
    println!("  Frames:      {} / {frames}", renderer.frame_count());
    println!("  Target fps:  {}", config.fps);
    println!("  Avg frame:   {}us", stats.avg_frame_us);
    println!("  Worst frame: {}us", stats.worst_frame_us);
    println!("  Late frames: {}", stats.late_frames);
    println!("  Headroom:    {:.0} fps", stats.headroom_fps());
    if let Some(fault) = renderer.last_error() {
        println!("  Fault:       {fault}");
    }
    if !reached {
        fail("frame target not reached in time");
    }
}

fn main() {
    let args = parse_args().unwrap_or_else(|e| fail(e));
    let config = match &args.config {
        Some(path) => RendererConfig::from_toml_file(path).unwrap_or_else(|e| fail(e)),
        None => RendererConfig::default(),
    };

    if let Some(frames) = args.frames {
        smoke(&config, frames);
        return;
    }

    let (mut renderer, probe) = open_renderer(&config, args.headless).unwrap_or_else(|e| fail(e));
    let o = Shared::new(Orbiter::default());
    renderer.start().unwrap_or_else(|e| fail(e));

    let mut session = Session::new(renderer);
    session
        .insert("o", Entity::Orbiter(o))
        .unwrap_or_else(|e| fail(e));

    println!("LIVELOOP {}x{} @ {} fps", config.width, config.height, config.fps);
    if probe.is_some() {
        println!("(headless: frames stay in memory, try 'status')");
    }
    println!("'o' is orbiting. {HELP}");

    let stdin = io::stdin();
    if let Err(e) = console::run(&mut session, stdin.lock(), io::stdout().lock()) {
        fail(e);
    }

    let frames = session.renderer().frame_count();
    drop(session);
    println!("bye after {frames} frames");
}
