//! A shape orbiting a point.

use std::f64::consts::TAU;

use liveloop_core::{Color, DrawError, DrawResult, Drawable, Rect, Sprite, Surface};

use super::{parse, FieldError, Shape, Tunable};

const FIELDS: &[&str] = &[
    "center", "angle", "distance", "rotation", "radius", "color", "shape",
];

/// Circles `center` at `distance`, advancing `rotation` radians per frame.
///
/// ```text
///            angle
///   center ────────► position = center + distance * (cos, sin)
/// ```
///
/// The drawn sprite is cached and rebuilt only when `radius`, `color` or
/// `shape` change.
#[derive(Debug, Clone)]
pub struct Orbiter {
    /// Point being orbited.
    pub center: (f64, f64),
    /// Current angle in radians, kept in `[0, TAU)` by `update()`.
    pub angle: f64,
    /// Orbit radius in pixels.
    pub distance: f64,
    /// Radians per frame. Negative orbits the other way.
    pub rotation: f64,
    /// Half the side (or the radius) of the drawn shape, in pixels.
    pub radius: f64,
    /// Fill color.
    pub color: Color,
    /// Square or disc.
    pub shape: Shape,
    position: (f64, f64),
    sprite: Option<CachedSprite>,
}

#[derive(Debug, Clone)]
struct CachedSprite {
    size: u32,
    color: Color,
    shape: Shape,
    sprite: Sprite,
}

impl Default for Orbiter {
    fn default() -> Self {
        Self::new((64.0, 64.0), 48.0, 0.1)
    }
}

impl Orbiter {
    /// An 8px white square orbiting `center` at `distance`, starting at angle 0.
    #[must_use]
    pub fn new(center: (f64, f64), distance: f64, rotation: f64) -> Self {
        let mut orbiter = Self {
            center,
            angle: 0.0,
            distance,
            rotation,
            radius: 8.0,
            color: Color::WHITE,
            shape: Shape::Square,
            position: center,
            sprite: None,
        };
        orbiter.position = orbiter.orbit_point();
        orbiter
    }

    /// Sets the starting angle.
    #[must_use]
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self.position = self.orbit_point();
        self
    }

    /// Sets the size.
    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the color.
    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the shape.
    #[must_use]
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    /// Where the shape was last placed (its center).
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        self.position
    }

    fn orbit_point(&self) -> (f64, f64) {
        (
            self.center.0 + self.distance * self.angle.cos(),
            self.center.1 + self.distance * self.angle.sin(),
        )
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn sprite(&mut self, radius: f64) -> &Sprite {
        let size = (radius * 2.0).round().min(f64::from(u32::MAX)) as u32;
        let (color, shape) = (self.color, self.shape);
        if matches!(&self.sprite, Some(c) if c.size != size || c.color != color || c.shape != shape) {
            self.sprite = None;
        }
        let cached = self.sprite.get_or_insert_with(|| CachedSprite {
            size,
            color,
            shape,
            sprite: match shape {
                Shape::Square => Sprite::square(size, color),
                Shape::Circle => Sprite::disc(size, color),
            },
        });
        &cached.sprite
    }
}

impl Drawable for Orbiter {
    fn update(&mut self) -> DrawResult<()> {
        DrawError::check_finite("rotation", self.rotation)?;
        DrawError::check_finite("distance", self.distance)?;
        DrawError::check_finite("center.x", self.center.0)?;
        DrawError::check_finite("center.y", self.center.1)?;
        DrawError::check_finite("angle", self.angle)?;

        self.angle = (self.angle + self.rotation).rem_euclid(TAU);
        self.position = self.orbit_point();
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, surface: &mut Surface) -> DrawResult<()> {
        let radius = DrawError::check_finite("radius", self.radius)?;
        if radius < 0.0 {
            return Err(DrawError::invalid_field("radius", format!("{radius} is negative")));
        }
        let (x, y) = self.position;
        if (radius * 2.0).round() > f64::from(surface.width().max(surface.height())) {
            // Covers the frame: clip straight onto it rather than cache a sprite.
            self.sprite = None;
            match self.shape {
                Shape::Square => surface.fill_rect(Rect::centered(x, y, radius), self.color),
                Shape::Circle => surface.fill_circle(x, y, radius, self.color),
            }
            return Ok(());
        }
        let left = (x - radius).round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
        let top = (y - radius).round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
        surface.blit(self.sprite(radius), left, top);
        Ok(())
    }

    fn name(&self) -> &str {
        "orbiter"
    }
}

impl Tunable for Orbiter {
    fn kind(&self) -> &'static str {
        "orbiter"
    }

    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "center" => self.center = parse::point("center", value)?,
            "angle" => self.angle = parse::number("angle", value)?,
            "distance" | "dist" => self.distance = parse::number("distance", value)?,
            "rotation" | "rot" => self.rotation = parse::number("rotation", value)?,
            "radius" => self.radius = parse::number("radius", value)?,
            "color" => self.color = parse::color("color", value)?,
            "shape" => self.shape = parse::shape("shape", value)?,
            _ => return Err(parse::unknown("orbiter", field, FIELDS)),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "center=({:.1},{:.1}) angle={:.3} distance={} rotation={} radius={} color={} shape={} at=({:.1},{:.1})",
            self.center.0,
            self.center.1,
            self.angle,
            self.distance,
            self.rotation,
            self.radius,
            self.color,
            self.shape,
            self.position.0,
            self.position.1,
        )
    }
}
