//! # LIVELOOP Core
//!
//! Drawing primitives shared by the render thread and the foreground:
//! - [`Surface`]: an owned `0x00RRGGBB` software framebuffer
//! - [`Drawable`]: the per-frame `update` + `render` capability
//! - [`Shared`]: the handle both threads hold on a live object
//!
//! ## Threading Model
//!
//! ```text
//! Foreground (console / caller)        Render thread
//! ─────────────────────────────        ─────────────────────────────
//! orbiter.lock().radius = 4.0   ──┐
//!                                 ├──► Mutex<Orbiter> ◄──┬── lock
//!                                 │                      ├── update()
//!                                 │                      └── render(&mut surface)
//! ```
//!
//! Each object is guarded by its own lock, so a mutation is never observed
//! half-applied. Neither side holds a lock longer than one object's work.
//!
//! ## Example
//!
//! ```rust,ignore
//! use liveloop_core::{Shared, Surface, Color};
//!
//! let dot = Shared::new(MyDot::default());
//! dot.lock().color = Color::WHITE;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod color;
pub mod drawable;
pub mod error;
pub mod shared;
pub mod surface;

pub use color::Color;
pub use drawable::Drawable;
pub use error::{DrawError, DrawResult};
pub use shared::{Shared, SharedDrawable};
pub use surface::{Rect, Sprite, Surface};
