//! A square that pulses in place.

use std::f64::consts::TAU;

use liveloop_core::{Color, DrawError, DrawResult, Drawable, Rect, Surface};

use super::{parse, FieldError, Tunable};

const FIELDS: &[&str] = &[
    "center",
    "base_radius",
    "amplitude",
    "rate",
    "phase",
    "color",
    "pulse_color",
];

/// A square at `center` whose half-size swings between
/// `base_radius - amplitude` and `base_radius + amplitude`, and whose color
/// blends from `color` (smallest) to `pulse_color` (largest).
///
/// Per frame: `phase += rate` (wrapped to `[0, TAU)`), then
/// `half = base_radius + amplitude * sin(phase)` and
/// `mix = (1 + sin(phase)) / 2`. A swing below zero draws nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulsar {
    /// Fixed center.
    pub center: (f64, f64),
    /// Mean half-size in pixels.
    pub base_radius: f64,
    /// Swing of the half-size in pixels.
    pub amplitude: f64,
    /// Radians of phase per frame.
    pub rate: f64,
    /// Current phase.
    pub phase: f64,
    /// Color at the bottom of the swing.
    pub color: Color,
    /// Color at the top of the swing.
    pub pulse_color: Color,
    half_size: f64,
    current_color: Color,
}

impl Default for Pulsar {
    fn default() -> Self {
        Self::new((64.0, 64.0))
    }
}

impl Pulsar {
    /// A white-to-violet pulsar at `center`, 12 ± 6 px, 0.1 rad/frame.
    #[must_use]
    pub fn new(center: (f64, f64)) -> Self {
        let mut pulsar = Self {
            center,
            base_radius: 12.0,
            amplitude: 6.0,
            rate: 0.1,
            phase: 0.0,
            color: Color::WHITE,
            pulse_color: Color::VIOLET,
            half_size: 0.0,
            current_color: Color::WHITE,
        };
        pulsar.refresh();
        pulsar
    }

    /// Half-size drawn on the last frame.
    #[must_use]
    pub const fn half_size(&self) -> f64 {
        self.half_size
    }

    /// Color drawn on the last frame.
    #[must_use]
    pub const fn current_color(&self) -> Color {
        self.current_color
    }

    fn refresh(&mut self) {
        let s = self.phase.sin();
        self.half_size = self.base_radius + self.amplitude * s;
        self.current_color = self.color.lerp(self.pulse_color, (1.0 + s) / 2.0);
    }
}

impl Drawable for Pulsar {
    fn update(&mut self) -> DrawResult<()> {
        DrawError::check_finite("rate", self.rate)?;
        DrawError::check_finite("phase", self.phase)?;
        DrawError::check_finite("amplitude", self.amplitude)?;
        DrawError::check_finite("base_radius", self.base_radius)?;
        if self.base_radius < 0.0 {
            return Err(DrawError::invalid_field(
                "base_radius",
                format!("{} is negative", self.base_radius),
            ));
        }

        self.phase = (self.phase + self.rate).rem_euclid(TAU);
        self.refresh();
        Ok(())
    }

    fn render(&mut self, surface: &mut Surface) -> DrawResult<()> {
        DrawError::check_finite("center.x", self.center.0)?;
        DrawError::check_finite("center.y", self.center.1)?;
        surface.fill_rect(
            Rect::centered(self.center.0, self.center.1, self.half_size),
            self.current_color,
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "pulsar"
    }
}

impl Tunable for Pulsar {
    fn kind(&self) -> &'static str {
        "pulsar"
    }

    fn fields(&self) -> &'static [&'static str] {
        FIELDS
    }

    fn set_field(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "center" => self.center = parse::point("center", value)?,
            "base_radius" | "radius" => self.base_radius = parse::number("base_radius", value)?,
            "amplitude" => self.amplitude = parse::number("amplitude", value)?,
            "rate" => self.rate = parse::number("rate", value)?,
            "phase" => self.phase = parse::number("phase", value)?,
            "color" => self.color = parse::color("color", value)?,
            "pulse_color" => self.pulse_color = parse::color("pulse_color", value)?,
            _ => return Err(parse::unknown("pulsar", field, FIELDS)),
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "center=({:.1},{:.1}) base_radius={} amplitude={} rate={} phase={:.3} color={} pulse_color={} size={:.1}",
            self.center.0,
            self.center.1,
            self.base_radius,
            self.amplitude,
            self.rate,
            self.phase,
            self.color,
            self.pulse_color,
            self.half_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_pulse_peaks_at_quarter_turn() {
        let mut p = Pulsar::new((16.0, 16.0));
        p.rate = FRAC_PI_2;
        p.update().unwrap();

        assert!((p.half_size() - 18.0).abs() < 1e-9);
        assert_eq!(p.current_color(), Color::VIOLET);

        p.update().unwrap();
        p.update().unwrap();
        assert!((p.half_size() - 6.0).abs() < 1e-9);
        assert_eq!(p.current_color(), Color::WHITE);
    }

    #[test]
    fn test_phase_wraps() {
        let mut p = Pulsar::default();
        p.rate = 4.0;
        for _ in 0..10 {
            p.update().unwrap();
            assert!((0.0..TAU).contains(&p.phase));
        }
    }

    #[test]
    fn test_render_draws_current_size() {
        let mut p = Pulsar::new((16.0, 16.0));
        p.base_radius = 2.0;
        p.amplitude = 0.0;
        p.update().unwrap();

        let mut surface = Surface::new(32, 32);
        p.render(&mut surface).unwrap();
        let painted = surface.pixels().iter().filter(|&&px| px != 0).count();
        assert_eq!(painted, 16);
    }

    #[test]
    fn test_swing_below_zero_draws_nothing() {
        let mut p = Pulsar::new((16.0, 16.0));
        p.base_radius = 1.0;
        p.amplitude = 4.0;
        p.phase = 3.0 * FRAC_PI_2 - p.rate;
        p.update().unwrap();
        assert!(p.half_size() < 0.0);

        let mut surface = Surface::new(32, 32);
        p.render(&mut surface).unwrap();
        assert_eq!(surface.count(Color::BLACK), 32 * 32);
    }

    #[test]
    fn test_negative_base_radius_faults() {
        let mut p = Pulsar::default();
        p.set_field("radius", "-1").unwrap();
        assert!(matches!(
            p.update(),
            Err(DrawError::InvalidField { field: "base_radius", .. })
        ));
    }
}
