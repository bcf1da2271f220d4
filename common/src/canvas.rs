use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;

/// One-bit framebuffer with the geometry of the 128x64 OLED.
///
/// Everything shown on the display is drawn here first, then handed to a
/// [`MonoDisplay`](crate::display::MonoDisplay).
#[derive(Clone, PartialEq, Eq)]
pub struct Canvas {
    pixels: Box<[bool; WIDTH * HEIGHT]>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; WIDTH * HEIGHT]),
        }
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("lit", &self.lit_count())
            .finish()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the pixel at (`x`, `y`); out-of-range coordinates read as off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        Self::index(x, y).is_some_and(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if let Some(i) = Self::index(x, y) {
            self.pixels[i] = on;
        }
    }

    /// Inverts the pixel at (`x`, `y`).
    pub fn toggle(&mut self, x: usize, y: usize) {
        if let Some(i) = Self::index(x, y) {
            self.pixels[i] ^= true;
        }
    }

    /// Turns off every pixel from `row` to the bottom edge.
    pub fn clear_from_row(&mut self, row: usize) {
        let start = row.min(HEIGHT) * WIDTH;
        self.pixels[start..].fill(false);
    }

    pub fn erase(&mut self) {
        self.clear_from_row(0);
    }

    /// All pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = bool> + '_ {
        self.pixels.iter().copied()
    }

    /// Number of pixels that are on.
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&on| on).count()
    }

    /// Whether any pixel in `rows` is on.
    #[cfg(test)]
    pub fn any_lit_in_rows(&self, rows: std::ops::Range<usize>) -> bool {
        rows.filter(|&y| y < HEIGHT)
            .any(|y| (0..WIDTH).any(|x| self.pixel(x, y)))
    }

    /// Runs an `embedded-graphics` drawing routine on the canvas.
    ///
    /// Drawing on a canvas cannot fail, this unwraps the `Infallible` result.
    pub fn draw_with<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self) -> Result<(), Infallible>,
    {
        f(self).unwrap_or_else(|never| match never {})
    }

    fn index(x: usize, y: usize) -> Option<usize> {
        (x < WIDTH && y < HEIGHT).then_some(y * WIDTH + x)
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Primitives may reach past the edges.
            if let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) {
                self.set(x, y, color.is_on());
            }
        }
        Ok(())
    }
}
