//! Named colors and breakpoints shared by the canvas and the controls.

/// A plain 24-bit color, independent of the terminal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Accent used for the bars and for highlighted controls.
pub const PRIMARY: Rgb = Rgb(0xff, 0x57, 0x33);

/// Color of errors shown under the controls.
pub const ERROR: Rgb = Rgb(0xd0, 0x30, 0x30);

/// Viewport width (device pixels) at which the side reserve kicks in.
pub const TABLET_BREAKPOINT: u32 = 800;

/// Viewport width (device pixels) below which the controls go compact.
pub const MOBILE_BREAKPOINT: u32 = 500;
