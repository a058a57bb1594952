use std::{cell::Cell, rc::Rc};

use crate::style::TABLET_BREAKPOINT;

/// Widest the canvas ever gets.
pub const MAX_CANVAS_WIDTH: u32 = 800;
/// Horizontal margin around the canvas.
pub const MARGIN: u32 = 64;
/// Space kept free for a side navigation on wide viewports.
pub const NAV_WIDTH: u32 = 162;
/// What is actually subtracted from narrow viewports.
pub const GUTTER: u32 = 66;
/// Width over height of the canvas.
pub const RATIO: f64 = 2.6666;

/// Viewport width above which the canvas stops growing.
pub const fn max_width() -> u32 {
  MAX_CANVAS_WIDTH + MARGIN + NAV_WIDTH
}

/// Computes the canvas width for a viewport `viewport_width` pixels wide.
pub fn get_width(viewport_width: u32) -> u32 {
  if viewport_width > max_width() {
    return MAX_CANVAS_WIDTH;
  }
  let nav = if viewport_width > TABLET_BREAKPOINT {
    NAV_WIDTH
  } else {
    0
  };
  viewport_width.saturating_sub(GUTTER).saturating_sub(nav)
}

/// Canvas height for a given width.
pub fn height_for(width: u32) -> f64 {
  width as f64 / RATIO
}

/// The width cell read by the draw loop.
///
/// The resize handler is its only writer; the draw loop holds a clone and only
/// reads it, so it never acts on a width captured at setup time.
#[derive(Debug, Clone, Default)]
pub struct SizeRef(Rc<Cell<u32>>);

impl SizeRef {
  pub fn new(width: u32) -> SizeRef {
    SizeRef(Rc::new(Cell::new(width)))
  }

  pub fn width(&self) -> u32 {
    self.0.get()
  }

  pub fn height(&self) -> f64 {
    height_for(self.width())
  }

  pub(crate) fn set(&self, width: u32) {
    self.0.set(width)
  }
}
