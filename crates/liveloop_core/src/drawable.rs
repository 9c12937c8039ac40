//! The drawable capability.

use crate::error::DrawResult;
use crate::surface::Surface;

/// Anything the render loop can advance and paint, once per frame.
///
/// The loop calls `update` then `render` on every registered drawable, in
/// registration order, while holding that drawable's lock. Returning an
/// error (or panicking) ends the loop and is recorded as a frame fault.
///
/// ## Example
///
/// ```rust
/// use liveloop_core::{Color, Drawable, DrawResult, Rect, Surface};
///
/// struct Blink { on: bool }
///
/// impl Drawable for Blink {
///     fn update(&mut self) -> DrawResult<()> {
///         self.on = !self.on;
///         Ok(())
///     }
///
///     fn render(&mut self, surface: &mut Surface) -> DrawResult<()> {
///         if self.on {
///             surface.fill_rect(Rect::new(0, 0, 2, 2), Color::WHITE);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Drawable: Send {
    /// Advances internal state by one frame. No I/O.
    ///
    /// # Errors
    ///
    /// Returns an error when a field holds a value that cannot be advanced.
    fn update(&mut self) -> DrawResult<()>;

    /// Paints the current state onto `surface`.
    ///
    /// # Errors
    ///
    /// Returns an error when a field holds a value that cannot be drawn.
    fn render(&mut self, surface: &mut Surface) -> DrawResult<()>;

    /// Short label used in logs and fault reports.
    fn name(&self) -> &str {
        "drawable"
    }
}
