use std::{io::Cursor, time::Duration};

use rodio::{Decoder, Source};

use crate::error::DecodeError;

/// Interleaved linear PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
  pub channels: u16,
  pub sample_rate: u32,
  pub samples: Vec<f32>,
}

impl DecodedAudio {
  pub fn frames(&self) -> usize {
    self.samples.len() / self.channels.max(1) as usize
  }

  pub fn duration(&self) -> Duration {
    if self.sample_rate == 0 {
      return Duration::ZERO;
    }
    Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
  }
}

/// Turns an encoded byte buffer into PCM.
pub trait AudioDecoder: Send + Sync {
  fn decode(&self, bytes: Vec<u8>) -> Result<DecodedAudio, DecodeError>;
}

/// Decodes with rodio's symphonia backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioDecoder;

impl AudioDecoder for RodioDecoder {
  fn decode(&self, bytes: Vec<u8>) -> Result<DecodedAudio, DecodeError> {
    let decoder =
      Decoder::new(Cursor::new(bytes)).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples = decoder.convert_samples::<f32>().collect::<Vec<f32>>();
    if samples.is_empty() || channels == 0 {
      return Err(DecodeError::Empty);
    }
    Ok(DecodedAudio {
      channels,
      sample_rate,
      samples,
    })
  }
}
