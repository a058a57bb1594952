use std::time::Duration;

pub mod analyser;
pub mod app;
pub mod config;
pub mod decode;
pub mod draw;
pub mod engine;
pub mod error;
pub mod picker;
pub mod scheduler;
pub mod sizing;
pub mod style;
pub mod surface;
pub mod ui;
pub mod visualizer;

/// Window length of the analyser; half of it is the number of bars.
pub const FFT_SIZE: usize = 256;
/// How often the draw timer fires.
pub const DRAW_RATE_HZ: u64 = 40;
pub const DRAW_INTERVAL: Duration = Duration::from_millis(1000 / DRAW_RATE_HZ);
/// The only media type accepted by the file intake.
pub const MP3_MEDIA_TYPE: &str = "audio/mp3";
