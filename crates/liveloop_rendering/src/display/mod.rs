//! # Display Backends
//!
//! A display is opened ON the render thread and never leaves it, so
//! backends built on thread-bound window handles need not be `Send`. Only
//! the factory crosses threads.
//!
//! ```text
//! foreground                render thread
//! ──────────                ─────────────────────────────────────
//! factory ──(Arc)──────────► factory.open(spec) ─► Box<dyn Display>
//!                           loop { poll_events(); ...; present(&surface) }
//! ```
//!
//! Backends:
//! - [`HeadlessDisplay`]: in-memory, always available, observable through
//!   a [`HeadlessProbe`]
//! - `WindowDisplay` (feature `window`): winit window + wgpu blit

mod headless;
#[cfg(feature = "window")]
mod window;

pub use headless::{HeadlessDisplay, HeadlessFactory, HeadlessProbe};
#[cfg(feature = "window")]
pub use window::{WindowDisplay, WindowFactory};

use liveloop_core::Surface;

use crate::error::DisplayError;

/// What a factory needs to open a display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySpec {
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Window pixels per surface pixel.
    pub scale: u32,
    /// Window title.
    pub title: String,
}

/// Keys the loop reports. Anything else arrives as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// Escape.
    Escape,
    /// Space bar.
    Space,
    /// Return / Enter.
    Enter,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Any other key.
    Other,
}

/// Input and window events delivered to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// The user asked to close the window.
    CloseRequested,
    /// A key went down.
    KeyPressed(Key),
    /// A mouse button went down at surface coordinates `(x, y)`.
    MouseDown {
        /// Surface x.
        x: f64,
        /// Surface y.
        y: f64,
    },
    /// The window was resized (window pixels).
    Resized {
        /// New width.
        width: u32,
        /// New height.
        height: u32,
    },
}

/// Discriminant of a [`DisplayEvent`], used to key event handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// [`DisplayEvent::CloseRequested`]
    CloseRequested,
    /// [`DisplayEvent::KeyPressed`]
    KeyPressed,
    /// [`DisplayEvent::MouseDown`]
    MouseDown,
    /// [`DisplayEvent::Resized`]
    Resized,
}

impl DisplayEvent {
    /// The event's kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::CloseRequested => EventKind::CloseRequested,
            Self::KeyPressed(_) => EventKind::KeyPressed,
            Self::MouseDown { .. } => EventKind::MouseDown,
            Self::Resized { .. } => EventKind::Resized,
        }
    }
}

/// A presentation target living on the render thread.
pub trait Display {
    /// Drains pending window/input events. Must not block.
    fn poll_events(&mut self) -> Vec<DisplayEvent>;

    /// Shows `surface` as the current frame.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError`] if the frame cannot be shown.
    fn present(&mut self, surface: &Surface) -> Result<(), DisplayError>;
}

/// Opens displays on the render thread.
pub trait DisplayFactory: Send + Sync + 'static {
    /// Opens a display of the requested size.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Init`] when the backend is unavailable.
    fn open(&self, spec: &DisplaySpec) -> Result<Box<dyn Display>, DisplayError>;
}

impl<F> DisplayFactory for F
where
    F: Fn(&DisplaySpec) -> Result<Box<dyn Display>, DisplayError> + Send + Sync + 'static,
{
    fn open(&self, spec: &DisplaySpec) -> Result<Box<dyn Display>, DisplayError> {
        self(spec)
    }
}
