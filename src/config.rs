use std::{env::temp_dir, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};

/// Largest accepted `--cell-px`.
pub const MAX_CELL_PX: u32 = 64;

/// Runtime settings, usually built from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Selection made at startup, if any.
  pub paths: Vec<PathBuf>,
  /// Device pixels per terminal column.
  pub cell_px: u32,
  /// Most frames drawn per second.
  pub fps: u32,
  pub log_file: PathBuf,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      paths: vec![],
      cell_px: 8,
      fps: 60,
      log_file: default_log_file(),
    }
  }
}

impl Config {
  pub fn validate(self) -> Result<Config> {
    if self.cell_px == 0 || self.cell_px > MAX_CELL_PX {
      return Err(anyhow!("--cell-px must be between 1 and {}", MAX_CELL_PX));
    }
    if self.fps == 0 {
      return Err(anyhow!("--fps must be at least 1"));
    }
    Ok(self)
  }

  pub fn frame_interval(&self) -> Duration {
    Duration::from_secs(1) / self.fps.max(1)
  }

  /// Width in device pixels of a terminal `columns` wide.
  pub fn viewport_width(&self, columns: u16) -> u32 {
    (columns as u32).saturating_mul(self.cell_px)
  }
}

pub fn default_log_file() -> PathBuf {
  let mut path = temp_dir();
  path.push("tuibars.log");
  path
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = Config::default().validate().unwrap();
    assert_eq!(config.frame_interval(), Duration::from_secs(1) / 60);
    assert_eq!(config.viewport_width(100), 800);
    assert!(config.log_file.ends_with("tuibars.log"));
  }

  #[test]
  fn zero_values_are_rejected() {
    let no_px = Config {
      cell_px: 0,
      ..Config::default()
    };
    assert!(no_px.validate().is_err());
    let no_fps = Config {
      fps: 0,
      ..Config::default()
    };
    assert!(no_fps.validate().is_err());
  }

  #[test]
  fn huge_cell_px_is_rejected() {
    let huge = Config {
      cell_px: 100_000_000,
      ..Config::default()
    };
    assert!(huge.clone().validate().is_err());
    assert_eq!(huge.viewport_width(80), u32::MAX);
    assert_eq!(huge.viewport_width(u16::MAX), u32::MAX);

    let widest = Config {
      cell_px: MAX_CELL_PX,
      ..Config::default()
    };
    let widest = widest.validate().unwrap();
    assert_eq!(widest.viewport_width(u16::MAX), u16::MAX as u32 * MAX_CELL_PX);
  }
}
