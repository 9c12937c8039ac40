//! # LIVELOOP
//!
//! Edit what you draw while it is being drawn.
//!
//! ```text
//! ┌──────────────────────┐        ┌────────────────────────────────┐
//! │  foreground          │        │  liveloop-render thread        │
//! │                      │        │                                │
//! │  console / your code │ Shared │  for each drawable:            │
//! │  o.lock().radius = 4 ├───────►│    update(); render(&mut surf) │
//! │                      │        │  present(); pace to fps        │
//! └──────────────────────┘        └────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `drawables`: [`Orbiter`], [`Pulsar`], [`Satellite`]
//! - `console`: the line-command session used by the `liveloop` binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use liveloop::core::Shared;
//! use liveloop::rendering::{RendererConfig, ThreadedRenderer};
//! use liveloop::Orbiter;
//!
//! # fn main() -> Result<(), liveloop::rendering::RendererError> {
//! let o = Shared::new(Orbiter::default());
//! let (mut renderer, _probe) = ThreadedRenderer::headless(&RendererConfig::default())?;
//! renderer.push(o.to_dyn());
//! renderer.start()?;
//!
//! o.lock().distance = 30.0;
//! o.lock().rotation = -0.02;
//! renderer.set_background(None);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod console;
pub mod drawables;

pub use liveloop_core as core;
pub use liveloop_rendering as rendering;

pub use console::{Command, ConsoleError, Session};
pub use drawables::{FieldError, Orbiter, Pulsar, Satellite, Shape, Tunable};
