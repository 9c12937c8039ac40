//! # Example Drawables
//!
//! - [`Orbiter`]: a square (or disc) circling a point
//! - [`Pulsar`]: a square that breathes in size and color
//! - [`Satellite`]: an orbiter whose orbit follows another orbiter
//!
//! All fields are public and may be changed at any time from the
//! foreground. Values are checked when the loop uses them, not when they
//! are set, so a bad value shows up as a frame fault.
//!
//! The console edits fields by name through [`Tunable`].

mod orbiter;
mod pulsar;
mod satellite;

pub use orbiter::Orbiter;
pub use pulsar::Pulsar;
pub use satellite::Satellite;

use std::fmt;
use std::str::FromStr;

use liveloop_core::{Color, Drawable};
use thiserror::Error;

/// Errors from setting a field by name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The drawable has no such field.
    #[error("{kind} has no field '{field}' (fields: {known})")]
    Unknown {
        /// Drawable kind.
        kind: &'static str,
        /// Requested field.
        field: String,
        /// Comma-separated list of settable fields.
        known: String,
    },

    /// The value text could not be parsed for that field.
    #[error("cannot set {field} to '{value}': expected {expected}")]
    BadValue {
        /// Field being set.
        field: &'static str,
        /// Text given.
        value: String,
        /// What the field accepts.
        expected: &'static str,
    },
}

/// A drawable whose fields can be read and written by name.
pub trait Tunable: Drawable {
    /// Kind name shown by the console (`orbiter`, `pulsar`, ...).
    fn kind(&self) -> &'static str;

    /// Names of settable fields.
    fn fields(&self) -> &'static [&'static str];

    /// Parses `value` and stores it in `field`.
    ///
    /// Only the text format is checked here. Range checks happen on the
    /// render thread.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] for an unknown field or unparsable value.
    fn set_field(&mut self, field: &str, value: &str) -> Result<(), FieldError>;

    /// `field=value` pairs describing the current state.
    fn describe(&self) -> String;
}

/// How an [`Orbiter`] draws itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Filled square of side `2 * radius`.
    #[default]
    Square,
    /// Filled disc of diameter `2 * radius`.
    Circle,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Square => "square",
            Self::Circle => "circle",
        })
    }
}

impl FromStr for Shape {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" => Ok(Self::Square),
            "circle" | "disc" => Ok(Self::Circle),
            _ => Err(()),
        }
    }
}

/// Field value parsers shared by the drawables.
pub(crate) mod parse {
    use super::{Color, FieldError, Shape};

    /// Any `f64`, including NaN and negatives.
    pub fn number(field: &'static str, value: &str) -> Result<f64, FieldError> {
        value.trim().parse().map_err(|_| bad(field, value, "a number"))
    }

    /// `x,y` or `(x, y)`.
    pub fn point(field: &'static str, value: &str) -> Result<(f64, f64), FieldError> {
        let inner = value.trim().trim_start_matches('(').trim_end_matches(')');
        let mut parts = inner.split(',').map(|p| p.trim().parse::<f64>());
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), None) => Ok((x, y)),
            _ => Err(bad(field, value, "a point like 20,78")),
        }
    }

    pub fn color(field: &'static str, value: &str) -> Result<Color, FieldError> {
        value
            .parse()
            .map_err(|_| bad(field, value, "a color: name, #rrggbb or r,g,b"))
    }

    pub fn shape(field: &'static str, value: &str) -> Result<Shape, FieldError> {
        value.parse().map_err(|()| bad(field, value, "square or circle"))
    }

    pub fn unknown(kind: &'static str, field: &str, known: &[&str]) -> FieldError {
        FieldError::Unknown {
            kind,
            field: field.to_owned(),
            known: known.join(", "),
        }
    }

    fn bad(field: &'static str, value: &str, expected: &'static str) -> FieldError {
        FieldError::BadValue {
            field,
            value: value.to_owned(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_parse() {
        assert_eq!("Circle".parse(), Ok(Shape::Circle));
        assert_eq!(" square ".parse(), Ok(Shape::Square));
        assert!("hexagon".parse::<Shape>().is_err());
        assert_eq!(Shape::Circle.to_string(), "circle");
    }

    #[test]
    fn test_point_forms() {
        assert_eq!(parse::point("center", "20,78"), Ok((20.0, 78.0)));
        assert_eq!(parse::point("center", "(20, 78.5)"), Ok((20.0, 78.5)));
        assert!(parse::point("center", "20").is_err());
        assert!(parse::point("center", "1,2,3").is_err());
    }

    #[test]
    fn test_number_accepts_values_checked_later() {
        assert_eq!(parse::number("radius", "-4"), Ok(-4.0));
        assert!(parse::number("radius", "nan").unwrap().is_nan());
        assert!(matches!(
            parse::number("radius", "big"),
            Err(FieldError::BadValue { field: "radius", .. })
        ));
    }
}
