//! # LIVELOOP Rendering
//!
//! A frame loop that runs on its own thread while the caller keeps
//! editing the objects it draws.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐            ┌──────────────────────────────┐
//! │  Foreground          │            │  Render thread               │
//! │                      │  push /    │                              │
//! │  ThreadedRenderer ───┼─ remove ──►│  instances: Vec<Shared<..>>  │
//! │   (RendererHandle)   │  bg / fps  │  settings: RwLock<..>        │
//! │                      │            │                              │
//! │  orbiter.lock() ─────┼── edits ──►│  update() + render()         │
//! │                      │            │          │                   │
//! │  last_error() ◄──────┼── faults ──┤          ▼                   │
//! │  stats()      ◄──────┼── timing ──┤  Display::present(surface)   │
//! └──────────────────────┘            └──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use liveloop_rendering::{RendererConfig, ThreadedRenderer};
//!
//! let (mut renderer, probe) = ThreadedRenderer::headless(&RendererConfig::default())?;
//! renderer.push(dot.to_dyn());
//! renderer.start()?;
//! dot.lock().x += 10.0;          // next frame shows it
//! renderer.stop();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod display;
pub mod error;
pub mod pacer;
pub mod renderer;
pub mod stats;

pub use config::{RendererConfig, MAX_FPS, MAX_PIXELS};
pub use display::{
    Display, DisplayEvent, DisplayFactory, DisplaySpec, EventKind, HeadlessDisplay, HeadlessFactory,
    HeadlessProbe, Key,
};
#[cfg(feature = "window")]
pub use display::{WindowDisplay, WindowFactory};
pub use error::{ConfigError, DisplayError, RendererError, RendererResult};
pub use pacer::FramePacer;
pub use renderer::{EventHandler, LiveSettings, RendererHandle, ThreadedRenderer};
pub use stats::{FaultCause, FrameFault, FrameStats};
