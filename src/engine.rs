use std::time::Duration;

use anyhow::anyhow;
use rodio::{buffer::SamplesBuffer, OutputStream, OutputStreamHandle, Sink, Source};

use crate::analyser::{Analyser, SignalTap};
use crate::decode::DecodedAudio;

/// Whether the audio context is producing sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
  Suspended,
  Running,
  Closed,
}

/// Decoded audio waiting to be played. A node is consumed by `start` and cannot
/// be reused.
#[derive(Debug)]
pub struct SourceNode {
  buffer: DecodedAudio,
}

impl SourceNode {
  pub fn new(buffer: DecodedAudio) -> SourceNode {
    SourceNode { buffer }
  }

  pub fn buffer(&self) -> &DecodedAudio {
    &self.buffer
  }

  /// Interleaved samples from `offset` onwards.
  pub fn into_samples_from(self, offset: Duration) -> (u16, u32, Vec<f32>) {
    let DecodedAudio {
      channels,
      sample_rate,
      mut samples,
    } = self.buffer;
    let skip_frames = (offset.as_secs_f64() * sample_rate as f64) as usize;
    let skip = (skip_frames * channels as usize).min(samples.len());
    samples.drain(..skip);
    (channels, sample_rate, samples)
  }
}

/// The audio subsystem: one analyser, one connected source, one output.
pub trait AudioContext {
  fn state(&self) -> ContextState;

  fn analyser(&mut self) -> &mut Analyser;

  /// Wires `source` → analyser → destination.
  fn connect(&mut self, source: SourceNode) -> anyhow::Result<()>;

  /// Starts the connected source `offset` into the audio, replacing whatever
  /// was playing before.
  fn start(&mut self, offset: Duration) -> anyhow::Result<()>;

  fn resume(&mut self) -> anyhow::Result<()>;

  fn suspend(&mut self) -> anyhow::Result<()>;

  /// Releases the output. The context cannot be used afterwards.
  fn close(&mut self);
}

/// Passes samples through unchanged while copying a mono mix to a tap.
struct Tapped<S> {
  inner: S,
  tap: SignalTap,
  channels: u16,
  frame: Vec<f32>,
  pending: Vec<f32>,
}

const TAP_BATCH: usize = 512;

impl<S> Tapped<S>
where
  S: Source<Item = f32>,
{
  fn new(inner: S, tap: SignalTap) -> Tapped<S> {
    let channels = inner.channels().max(1);
    Tapped {
      inner,
      tap,
      channels,
      frame: Vec::with_capacity(channels as usize),
      pending: Vec::with_capacity(TAP_BATCH),
    }
  }

  fn flush(&mut self) {
    if !self.pending.is_empty() {
      self.tap.push(&self.pending);
      self.pending.clear();
    }
  }
}

impl<S> Iterator for Tapped<S>
where
  S: Source<Item = f32>,
{
  type Item = f32;

  fn next(&mut self) -> Option<f32> {
    let sample = match self.inner.next() {
      Some(s) => s,
      None => {
        self.flush();
        return None;
      }
    };
    self.frame.push(sample);
    if self.frame.len() == self.channels as usize {
      let mono = self.frame.iter().sum::<f32>() / self.channels as f32;
      self.frame.clear();
      self.pending.push(mono);
      if self.pending.len() == TAP_BATCH {
        self.flush();
      }
    }
    Some(sample)
  }
}

impl<S> Source for Tapped<S>
where
  S: Source<Item = f32>,
{
  fn current_frame_len(&self) -> Option<usize> {
    self.inner.current_frame_len()
  }

  fn channels(&self) -> u16 {
    self.inner.channels()
  }

  fn sample_rate(&self) -> u32 {
    self.inner.sample_rate()
  }

  fn total_duration(&self) -> Option<Duration> {
    self.inner.total_duration()
  }
}

/// Plays through the default output device.
pub struct RodioContext {
  _stream: OutputStream,
  handle: OutputStreamHandle,
  analyser: Analyser,
  connected: Option<SourceNode>,
  sink: Option<Sink>,
  state: ContextState,
}

impl RodioContext {
  pub fn try_default() -> anyhow::Result<RodioContext> {
    let (stream, handle) = OutputStream::try_default()?;
    Ok(RodioContext {
      _stream: stream,
      handle,
      analyser: Analyser::new(SignalTap::new()),
      connected: None,
      sink: None,
      state: ContextState::Running,
    })
  }

  fn ensure_open(&self) -> anyhow::Result<()> {
    if self.state == ContextState::Closed {
      return Err(anyhow!("audio context is closed"));
    }
    Ok(())
  }
}

impl AudioContext for RodioContext {
  fn state(&self) -> ContextState {
    self.state
  }

  fn analyser(&mut self) -> &mut Analyser {
    &mut self.analyser
  }

  fn connect(&mut self, source: SourceNode) -> anyhow::Result<()> {
    self.ensure_open()?;
    self.analyser.set_sample_rate(source.buffer().sample_rate);
    self.connected = Some(source);
    Ok(())
  }

  fn start(&mut self, offset: Duration) -> anyhow::Result<()> {
    self.ensure_open()?;
    let source = self
      .connected
      .take()
      .ok_or_else(|| anyhow!("no source connected"))?;
    if let Some(old) = self.sink.take() {
      old.stop();
    }
    let sink = Sink::try_new(&self.handle)?;
    if self.state == ContextState::Suspended {
      sink.pause();
    }
    let (channels, sample_rate, samples) = source.into_samples_from(offset);
    let tap = self.analyser.tap().clone();
    tap.clear();
    sink.append(Tapped::new(
      SamplesBuffer::new(channels, sample_rate, samples),
      tap,
    ));
    self.sink = Some(sink);
    Ok(())
  }

  fn resume(&mut self) -> anyhow::Result<()> {
    self.ensure_open()?;
    if let Some(sink) = &self.sink {
      sink.play();
    }
    self.state = ContextState::Running;
    Ok(())
  }

  fn suspend(&mut self) -> anyhow::Result<()> {
    self.ensure_open()?;
    if let Some(sink) = &self.sink {
      sink.pause();
    }
    self.state = ContextState::Suspended;
    Ok(())
  }

  fn close(&mut self) {
    if let Some(sink) = self.sink.take() {
      sink.stop();
    }
    self.connected = None;
    self.state = ContextState::Closed;
  }
}
