use crate::analyser::Analyser;
use crate::sizing::SizeRef;
use crate::style::{Rgb, PRIMARY};
use crate::surface::Surface;

/// Height in pixels of the bar for `magnitude` on a canvas `height` tall.
pub fn bar_height(magnitude: u8, height: f64) -> f64 {
  (magnitude as f64 / 255.0 * height).floor()
}

/// Width of each bar so that `bins` bars plus one pixel gaps fill `width`.
pub fn bar_width(width: f64, bins: usize) -> f64 {
  let bins = bins as f64;
  (width - bins) / bins
}

/// The periodic bar graph painter.
///
/// Holds the sample buffer it overwrites every frame and a handle to the live
/// canvas width. Nothing carries over between frames.
#[derive(Debug)]
pub struct DrawLoop {
  size: SizeRef,
  data: Vec<u8>,
  color: Rgb,
}

impl DrawLoop {
  pub fn new(size: SizeRef, bins: usize) -> DrawLoop {
    DrawLoop {
      size,
      data: vec![0; bins],
      color: PRIMARY,
    }
  }

  pub fn draw<S: Surface>(&mut self, surface: &mut S, analyser: &mut Analyser) {
    let width = self.size.width() as f64;
    let height = self.size.height();

    analyser.get_byte_frequency_data(&mut self.data);
    surface.clear_rect(0.0, 0.0, width, height);

    if self.data.is_empty() {
      return;
    }
    let bar_width = bar_width(width, self.data.len());
    let mut x = 0.0;
    for &magnitude in &self.data {
      let bar_height = bar_height(magnitude, height);
      surface.fill_rect(x, height - bar_height, bar_width, bar_height, self.color);
      x += bar_width + 1.0;
    }
  }
}
