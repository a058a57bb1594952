use std::ops::Range;

use crate::style::Rgb;

/// A 2D raster addressed in device pixels.
pub trait Surface {
  fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

  fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgb);
}

/// An in-memory canvas. Pixels are either transparent or a solid color.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelCanvas {
  width: u32,
  height: u32,
  pixels: Vec<Option<Rgb>>,
}

impl PixelCanvas {
  pub fn new(width: u32, height: u32) -> PixelCanvas {
    PixelCanvas {
      width,
      height,
      pixels: vec![None; width as usize * height as usize],
    }
  }

  /// Sets the declared size. Changing it wipes the canvas, unchanged sizes keep
  /// the contents.
  pub fn set_size(&mut self, width: u32, height: u32) {
    if (width, height) != (self.width, self.height) {
      *self = PixelCanvas::new(width, height);
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
    if x >= self.width || y >= self.height {
      return None;
    }
    self.pixels[(y * self.width + x) as usize]
  }

  fn paint(&mut self, x: f64, y: f64, width: f64, height: f64, color: Option<Rgb>) {
    let cols = span(x, width, self.width);
    for row in span(y, height, self.height) {
      let start = (row * self.width) as usize;
      for col in cols.clone() {
        self.pixels[start + col as usize] = color;
      }
    }
  }
}

/// Pixels whose centers fall inside `[start, start + len)`, clipped to
/// `0..limit`. Negative lengths extend to the left.
fn span(start: f64, len: f64, limit: u32) -> Range<u32> {
  let (a, b) = if len < 0.0 {
    (start + len, start)
  } else {
    (start, start + len)
  };
  if !a.is_finite() || !b.is_finite() {
    return 0..0;
  }
  let lo = (a - 0.5).ceil().clamp(0.0, limit as f64) as u32;
  let hi = (b - 0.5).ceil().clamp(0.0, limit as f64) as u32;
  lo..hi.max(lo)
}

impl Surface for PixelCanvas {
  fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
    self.paint(x, y, width, height, None);
  }

  fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgb) {
    self.paint(x, y, width, height, Some(color));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::style::PRIMARY;

  #[test]
  fn fill_covers_pixel_centers() {
    let mut canvas = PixelCanvas::new(10, 4);
    canvas.fill_rect(1.0, 1.0, 2.0, 3.0, PRIMARY);
    assert_eq!(canvas.pixel(0, 1), None);
    assert_eq!(canvas.pixel(1, 1), Some(PRIMARY));
    assert_eq!(canvas.pixel(2, 3), Some(PRIMARY));
    assert_eq!(canvas.pixel(3, 1), None);
    assert_eq!(canvas.pixel(1, 0), None);
  }

  #[test]
  fn fractional_rects_round_to_centers() {
    let mut canvas = PixelCanvas::new(10, 1);
    canvas.fill_rect(0.6, 0.0, 1.0, 1.0, PRIMARY);
    assert_eq!(canvas.pixel(0, 0), None);
    assert_eq!(canvas.pixel(1, 0), Some(PRIMARY));
    assert_eq!(canvas.pixel(2, 0), None);
  }

  #[test]
  fn negative_width_extends_left() {
    let mut canvas = PixelCanvas::new(10, 1);
    canvas.fill_rect(5.0, 0.0, -2.0, 1.0, PRIMARY);
    assert_eq!(canvas.pixel(3, 0), Some(PRIMARY));
    assert_eq!(canvas.pixel(4, 0), Some(PRIMARY));
    assert_eq!(canvas.pixel(5, 0), None);
  }

  #[test]
  fn out_of_bounds_is_clipped() {
    let mut canvas = PixelCanvas::new(4, 4);
    canvas.fill_rect(-10.0, -10.0, 100.0, 100.0, PRIMARY);
    assert!((0..4).all(|x| (0..4).all(|y| canvas.pixel(x, y) == Some(PRIMARY))));
    canvas.clear_rect(0.0, 0.0, 4.0, 4.0);
    assert!((0..4).all(|x| (0..4).all(|y| canvas.pixel(x, y).is_none())));
  }

  #[test]
  fn resizing_wipes() {
    let mut canvas = PixelCanvas::new(4, 4);
    canvas.fill_rect(0.0, 0.0, 4.0, 4.0, PRIMARY);
    canvas.set_size(4, 4);
    assert_eq!(canvas.pixel(0, 0), Some(PRIMARY));
    canvas.set_size(8, 3);
    assert_eq!((canvas.width(), canvas.height()), (8, 3));
    assert_eq!(canvas.pixel(0, 0), None);
  }
}
