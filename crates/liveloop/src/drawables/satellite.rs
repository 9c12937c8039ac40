//! An orbiter that orbits another orbiter.

use liveloop_core::{DrawResult, Drawable, Shared, Surface};

use super::{FieldError, Orbiter, Tunable};

/// Follows `anchor`: each frame its orbit center is moved to the anchor's
/// current position, then the orbit advances.
///
/// Draw the anchor first in the instance list so the satellite tracks the
/// anchor's position from the same frame.
#[derive(Debug, Clone)]
pub struct Satellite {
    /// The orbit; its `center` is overwritten every frame.
    pub orbit: Orbiter,
    /// What to circle.
    pub anchor: Shared<Orbiter>,
}

impl Satellite {
    /// A small orbiter circling `anchor` at 16px, twice as fast as the default.
    #[must_use]
    pub fn new(anchor: Shared<Orbiter>) -> Self {
        let center = anchor.lock().position();
        let orbit = Orbiter::new(center, 16.0, 0.2).with_radius(2.0);
        Self { orbit, anchor }
    }

    /// Uses `orbit` as the satellite's orbit.
    #[must_use]
    pub fn with_orbit(mut self, orbit: Orbiter) -> Self {
        self.orbit = orbit;
        self
    }

    /// Where the satellite was last placed.
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        self.orbit.position()
    }
}

impl Drawable for Satellite {
    fn update(&mut self) -> DrawResult<()> {
        self.orbit.center = self.anchor.lock().position();
        self.orbit.update()
    }

    fn render(&mut self, surface: &mut Surface) -> DrawResult<()> {
        self.orbit.render(surface)
    }

    fn name(&self) -> &str {
        "satellite"
    }
}

impl Tunable for Satellite {
    fn kind(&self) -> &'static str {
        "satellite"
    }

    fn fields(&self) -> &'static [&'static str] {
        self.orbit.fields()
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        self.orbit.set_field(field, value)
    }

    fn describe(&self) -> String {
        self.orbit.describe()
    }
}
