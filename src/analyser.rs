use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
};

use spectrum_analyzer::scaling::divide_by_N;
use spectrum_analyzer::windows::blackman_harris_4term;
use spectrum_analyzer::{samples_fft_to_spectrum, FrequencyLimit};

/// Largest window the analyser accepts; the tap keeps this many samples.
pub const MAX_FFT_SIZE: usize = 32768;
const MIN_FFT_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserConfig {
  pub min_decibels: f32,
  pub max_decibels: f32,
  pub smoothing_time_constant: f32,
  pub fft_size: usize,
}

impl AnalyserConfig {
  /// The parameters the bar graph runs with.
  pub const BAR_GRAPH: AnalyserConfig = AnalyserConfig {
    min_decibels: -90.0,
    max_decibels: -10.0,
    smoothing_time_constant: 0.85,
    fft_size: crate::FFT_SIZE,
  };

  fn is_valid(&self) -> bool {
    self.fft_size.is_power_of_two()
      && (MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
      && self.min_decibels < self.max_decibels
      && (0.0..=1.0).contains(&self.smoothing_time_constant)
  }
}

impl Default for AnalyserConfig {
  fn default() -> Self {
    AnalyserConfig {
      min_decibels: -100.0,
      max_decibels: -30.0,
      smoothing_time_constant: 0.8,
      fft_size: 2048,
    }
  }
}

/// The most recent mono samples that went to the output device.
///
/// Written from the audio thread, read by the analyser on the UI thread.
#[derive(Debug, Clone, Default)]
pub struct SignalTap(Arc<Mutex<VecDeque<f32>>>);

impl SignalTap {
  pub fn new() -> SignalTap {
    SignalTap(Arc::new(Mutex::new(VecDeque::with_capacity(MAX_FFT_SIZE))))
  }

  pub fn push(&self, samples: &[f32]) {
    let mut ring = match self.0.lock() {
      Ok(ring) => ring,
      Err(poisoned) => poisoned.into_inner(),
    };
    for &s in samples {
      if ring.len() == MAX_FFT_SIZE {
        ring.pop_front();
      }
      ring.push_back(s);
    }
  }

  pub fn clear(&self) {
    let mut ring = match self.0.lock() {
      Ok(ring) => ring,
      Err(poisoned) => poisoned.into_inner(),
    };
    ring.clear();
  }

  /// Copies the newest `out.len()` samples into `out`, zero padding the front
  /// when fewer are available.
  pub(crate) fn latest(&self, out: &mut [f32]) {
    out.iter_mut().for_each(|s| *s = 0.0);
    let ring = match self.0.lock() {
      Ok(ring) => ring,
      Err(poisoned) => poisoned.into_inner(),
    };
    let n = ring.len().min(out.len());
    let offset = out.len() - n;
    for (dst, src) in out[offset..].iter_mut().zip(ring.iter().skip(ring.len() - n)) {
      *dst = *src;
    }
  }
}

/// Produces per-bin byte magnitudes from the live signal.
pub struct Analyser {
  config: AnalyserConfig,
  sample_rate: u32,
  tap: SignalTap,
  window: Vec<f32>,
  smoothed: Vec<f32>,
}

impl Analyser {
  pub fn new(tap: SignalTap) -> Analyser {
    let config = AnalyserConfig::default();
    Analyser {
      sample_rate: 44100,
      tap,
      window: vec![0.0; config.fft_size],
      smoothed: vec![0.0; config.fft_size / 2],
      config,
    }
  }

  /// Applies `config`, resetting the smoothing history when the window size
  /// changes. Invalid configurations are ignored.
  pub fn configure(&mut self, config: AnalyserConfig) {
    if !config.is_valid() {
      log::warn!("ignoring invalid analyser config {:?}", config);
      return;
    }
    if config.fft_size != self.config.fft_size {
      self.window = vec![0.0; config.fft_size];
      self.smoothed = vec![0.0; config.fft_size / 2];
    }
    self.config = config;
  }

  pub fn config(&self) -> AnalyserConfig {
    self.config
  }

  pub fn set_sample_rate(&mut self, sample_rate: u32) {
    if sample_rate > 0 {
      self.sample_rate = sample_rate;
    }
  }

  pub fn tap(&self) -> &SignalTap {
    &self.tap
  }

  pub fn frequency_bin_count(&self) -> usize {
    self.config.fft_size / 2
  }

  /// Overwrites `out` with the current magnitudes, one byte per bin. Extra
  /// entries in `out` are left alone.
  pub fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
    self.update_smoothed();
    let AnalyserConfig {
      min_decibels,
      max_decibels,
      ..
    } = self.config;
    let scale = 255.0 / (max_decibels - min_decibels);
    for (dst, &mag) in out.iter_mut().zip(self.smoothed.iter()) {
      let db = 20.0 * mag.log10();
      let byte = (scale * (db - min_decibels)).floor();
      *dst = if byte.is_nan() {
        0
      } else {
        byte.clamp(0.0, 255.0) as u8
      };
    }
  }

  fn update_smoothed(&mut self) {
    self.tap.latest(&mut self.window);
    let windowed = blackman_harris_4term(&self.window);
    let spectrum = match samples_fft_to_spectrum(
      &windowed,
      self.sample_rate,
      FrequencyLimit::All,
      Some(&divide_by_N),
    ) {
      Ok(spectrum) => spectrum,
      Err(e) => {
        log::warn!("spectrum analysis failed: {:?}", e);
        return;
      }
    };
    let tau = self.config.smoothing_time_constant;
    let mut bins = spectrum.data().iter().map(|(_, v)| v.val());
    for prev in self.smoothed.iter_mut() {
      let mag = bins.next().unwrap_or_default();
      let next = tau * *prev + (1.0 - tau) * mag;
      *prev = if next.is_finite() { next } else { 0.0 };
    }
  }
}
