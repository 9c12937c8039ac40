//! Software framebuffer.
//!
//! ```text
//! pixels: [u32; width * height], row-major, 0x00RRGGBB
//!         little-endian bytes = B G R 0  (BGRA8 with a dead alpha)
//! ```
//!
//! All drawing calls clip against the surface bounds, so a drawable that
//! wanders off screen simply stops being visible.

use crate::color::Color;

/// Marker for a transparent sprite texel. Real pixels never set the top byte.
const TRANSPARENT: u32 = 0xFF00_0000;

/// Integer rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
}

impl Rect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Square of side `2 * half` centered on `(cx, cy)`.
    ///
    /// Coordinates are rounded to the nearest pixel; a negative `half`
    /// yields an empty rectangle.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn centered(cx: f64, cy: f64, half: f64) -> Self {
        let half = half.max(0.0);
        let side = (half * 2.0).round();
        Self {
            x: saturate_i32((cx - half).round()),
            y: saturate_i32((cy - half).round()),
            w: side.min(f64::from(u32::MAX)) as u32,
            h: side.min(f64::from(u32::MAX)) as u32,
        }
    }

    /// Returns true if the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

#[allow(clippy::cast_possible_truncation)]
fn saturate_i32(v: f64) -> i32 {
    v.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// A small pre-rendered image that can be blitted onto a [`Surface`].
///
/// Texels outside the drawn shape are transparent, so corners of a
/// circle sprite do not paint over the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    width: u32,
    height: u32,
    texels: Vec<u32>,
}

impl Sprite {
    /// Creates a fully transparent sprite.
    #[must_use]
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![TRANSPARENT; width as usize * height as usize],
        }
    }

    /// A solid square of side `size`.
    #[must_use]
    pub fn square(size: u32, color: Color) -> Self {
        Self {
            width: size,
            height: size,
            texels: vec![color.to_pixel(); size as usize * size as usize],
        }
    }

    /// A filled disc inscribed in a `size x size` square.
    #[must_use]
    pub fn disc(size: u32, color: Color) -> Self {
        let mut sprite = Self::transparent(size, size);
        let r = f64::from(size) / 2.0;
        for y in 0..size {
            for x in 0..size {
                let dx = f64::from(x) + 0.5 - r;
                let dy = f64::from(y) + 0.5 - r;
                if dx * dx + dy * dy <= r * r {
                    sprite.texels[(y * size + x) as usize] = color.to_pixel();
                }
            }
        }
        sprite
    }

    /// Sprite width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Sprite height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Color at `(x, y)`, or `None` if transparent or out of bounds.
    #[must_use]
    pub fn texel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        match self.texels[(y * self.width + x) as usize] {
            TRANSPARENT => None,
            pixel => Some(Color::from_pixel(pixel)),
        }
    }
}

/// Owned RGB framebuffer the render loop hands to every drawable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Surface {
    /// Creates a black surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Surface width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Surface height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Fills the whole surface.
    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color.to_pixel());
    }

    /// Fills `rect`, clipped to the surface.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let pixel = color.to_pixel();
        let stride = self.width as usize;
        for y in y0..y1 {
            self.pixels[y * stride + x0..y * stride + x1].fill(pixel);
        }
    }

    /// Fills a disc of `radius` centered on `(cx, cy)`, clipped.
    #[allow(clippy::cast_precision_loss)]
    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Color) {
        if radius.is_nan() || radius <= 0.0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(Rect::centered(cx, cy, radius)) else {
            return;
        };
        let pixel = color.to_pixel();
        let stride = self.width as usize;
        let r2 = radius * radius;
        for y in y0..y1 {
            let dy = y as f64 + 0.5 - cy;
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.pixels[y * stride + x] = pixel;
                }
            }
        }
    }

    /// Copies the opaque texels of `sprite` with its top-left at `(x, y)`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn blit(&mut self, sprite: &Sprite, x: i32, y: i32) {
        let target = Rect::new(x, y, sprite.width, sprite.height);
        let Some((x0, y0, x1, y1)) = self.clip(target) else {
            return;
        };
        let stride = self.width as usize;
        for sy in y0..y1 {
            // Clipped rows and columns are inside the sprite by construction.
            let row = (sy as i64 - i64::from(y)) as usize;
            for sx in x0..x1 {
                let col = (sx as i64 - i64::from(x)) as usize;
                let texel = sprite.texels[row * sprite.width as usize + col];
                if texel != TRANSPARENT {
                    self.pixels[sy * stride + sx] = texel;
                }
            }
        }
    }

    /// Color at `(x, y)`, or `None` out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(Color::from_pixel(self.pixels[(y * self.width + x) as usize]))
    }

    /// Raw `0x00RRGGBB` pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixels as bytes, ready for a BGRA8 texture upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Number of pixels equal to `color`.
    #[must_use]
    pub fn count(&self, color: Color) -> usize {
        let pixel = color.to_pixel();
        self.pixels.iter().filter(|&&p| p == pixel).count()
    }

    /// Intersects `rect` with the surface: `(x0, y0, x1, y1)`, exclusive ends.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn clip(&self, rect: Rect) -> Option<(usize, usize, usize, usize)> {
        if rect.is_empty() {
            return None;
        }
        let x0 = i64::from(rect.x).max(0);
        let y0 = i64::from(rect.y).max(0);
        let x1 = (i64::from(rect.x) + i64::from(rect.w)).min(i64::from(self.width));
        let y1 = (i64::from(rect.y) + i64::from(rect.h)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}
