//! RGB colors.
//!
//! Colors are plain `u8` triples, so an out-of-range channel cannot be
//! represented. The only way to get a bad color is to parse one, and that
//! fails with [`DrawError::InvalidColor`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DrawError;

/// Opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Solid black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Solid white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Pure red.
    pub const RED: Self = Self::rgb(255, 0, 0);
    /// Pure green.
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    /// Pure blue.
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    /// Yellow.
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    /// Cyan.
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    /// Magenta.
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    /// Violet, the classic "200, 0, 255".
    pub const VIOLET: Self = Self::rgb(200, 0, 255);

    /// Creates a color from its channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a color from a `0xRRGGBB` value. The top byte is ignored.
    #[must_use]
    pub const fn hex(hex: u32) -> Self {
        Self::rgb(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// Packs into a `0x00RRGGBB` pixel.
    #[must_use]
    pub const fn to_pixel(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Unpacks a `0x00RRGGBB` pixel.
    #[must_use]
    pub const fn from_pixel(pixel: u32) -> Self {
        Self::hex(pixel)
    }

    /// Linearly interpolates towards `other`. `t` is clamped to 0-1.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| -> u8 {
            let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            // Clamped to 0-255 above, truncation is exact.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let out = v.round().clamp(0.0, 255.0) as u8;
            out
        };
        Self::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Looks up a named color.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "red" => Self::RED,
            "green" => Self::GREEN,
            "blue" => Self::BLUE,
            "yellow" => Self::YELLOW,
            "cyan" => Self::CYAN,
            "magenta" => Self::MAGENTA,
            "violet" => Self::VIOLET,
            _ => return None,
        };
        Some(color)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = DrawError;

    /// Accepts `#rrggbb`, `rrggbb`, `r,g,b` (0-255 each) or a color name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || DrawError::InvalidColor(s.to_owned());

        if let Some(color) = Self::named(text) {
            return Ok(color);
        }

        if text.contains(',') {
            let channels = text
                .trim_start_matches('(')
                .trim_end_matches(')')
                .split(',')
                .map(|part| part.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            return match channels.as_slice() {
                [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
                _ => Err(invalid()),
            };
        }

        let digits = text.strip_prefix('#').unwrap_or(text);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        u32::from_str_radix(digits, 16)
            .map(Self::hex)
            .map_err(|_| invalid())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::rgb(r, g, b)
    }
}

/// On-disk forms of a color: `"#ff00aa"`, `"white"` or `[255, 0, 170]`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ColorRepr {
    Text(String),
    Channels([u8; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = DrawError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Text(text) => text.parse(),
            ColorRepr::Channels(channels) => Ok(channels.into()),
        }
    }
}

/// Serde helpers for an optional color where the string `"none"` means
/// "no color". Used for backgrounds, where `None` disables clearing.
pub mod optional {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Color, ColorRepr};

    /// Deserializes `"none"` as `None`, anything else as a color.
    ///
    /// # Errors
    ///
    /// Fails when the value is neither `"none"` nor a valid color.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match ColorRepr::deserialize(deserializer)? {
            ColorRepr::Text(text) if text.trim().eq_ignore_ascii_case("none") => Ok(None),
            repr => Color::try_from(repr)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    /// Serializes `None` as `"none"`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn serialize<S>(color: &Option<Color>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match color {
            Some(color) => serializer.serialize_str(&color.to_string()),
            None => serializer.serialize_str("none"),
        }
    }
}
