use std::{
  fs,
  sync::{
    mpsc::{self, Receiver, Sender},
    Arc,
  },
  thread,
  time::{Duration, Instant},
};

use crate::analyser::AnalyserConfig;
use crate::decode::{AudioDecoder, DecodedAudio};
use crate::draw::DrawLoop;
use crate::engine::{AudioContext, ContextState, SourceNode};
use crate::error::{IntakeError, LoadError};
use crate::picker::PickedFile;
use crate::scheduler::DrawSchedule;
use crate::sizing::{get_width, height_for, SizeRef};
use crate::style::MOBILE_BREAKPOINT;
use crate::surface::PixelCanvas;

/// The transport icon as last confirmed by a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconState {
  /// No audio has been started yet; no icon is shown.
  Hidden,
  Play,
  Pause,
}

/// The icon actually rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportIcon {
  Play,
  Pause,
}

/// Completion of a background read + decode.
#[derive(Debug)]
struct LoadEvent {
  generation: u64,
  name: String,
  result: Result<DecodedAudio, LoadError>,
}

/// Everything the terminal needs to paint the visualizer.
#[derive(Debug, Clone, Copy)]
pub struct View<'a> {
  pub canvas: &'a PixelCanvas,
  pub file_name: &'a str,
  pub icon: Option<TransportIcon>,
  pub error: Option<&'a str>,
  pub alert: Option<&'a str>,
  pub compact: bool,
}

/// Owns the audio context, the canvas and the draw cadence, and reacts to file
/// selection, transport and resize input.
pub struct Visualizer<C, D> {
  context: C,
  decoder: Arc<D>,
  file_name: String,
  viewport_width: u32,
  state_width: u32,
  size: SizeRef,
  canvas: PixelCanvas,
  icon: IconState,
  draw_loop: Option<DrawLoop>,
  schedule: DrawSchedule,
  alert: Option<String>,
  error: Option<String>,
  generation: u64,
  loads_tx: Sender<LoadEvent>,
  loads_rx: Receiver<LoadEvent>,
}

impl<C, D> Visualizer<C, D>
where
  C: AudioContext,
  D: AudioDecoder + 'static,
{
  pub fn mount(context: C, decoder: D, viewport_width: u32, frame_interval: Duration) -> Self {
    let width = get_width(viewport_width);
    let (loads_tx, loads_rx) = mpsc::channel();
    log::info!("mounted with canvas width {}", width);
    Visualizer {
      context,
      decoder: Arc::new(decoder),
      file_name: String::new(),
      viewport_width,
      state_width: width,
      size: SizeRef::new(width),
      canvas: PixelCanvas::new(width, height_for(width) as u32),
      icon: IconState::Hidden,
      draw_loop: None,
      schedule: DrawSchedule::new(frame_interval),
      alert: None,
      error: None,
      generation: 0,
      loads_tx,
      loads_rx,
    }
  }

  /// Recomputes the canvas size for a new viewport width.
  pub fn on_resize(&mut self, viewport_width: u32) {
    let width = get_width(viewport_width);
    self.viewport_width = viewport_width;
    self.state_width = width;
    self.size.set(width);
    self.canvas.set_size(width, height_for(width) as u32);
    self.schedule.request_frame();
  }

  /// Validates a picker selection and starts loading it in the background.
  ///
  /// Rejections raise the alert and change nothing else.
  pub fn select_files(&mut self, files: Vec<PickedFile>) -> Result<(), IntakeError> {
    let file = match validate(files) {
      Ok(file) => file,
      Err(e) => {
        log::info!("rejected selection: {}", e);
        self.alert = Some(e.to_string());
        return Err(e);
      }
    };

    log::info!("loading {} ({})", file.name, file.path.display());
    self.file_name = file.name.clone();
    self.generation += 1;

    let tx = self.loads_tx.clone();
    let decoder = Arc::clone(&self.decoder);
    let generation = self.generation;
    let spawned = thread::Builder::new()
      .name("load".to_string())
      .spawn(move || {
        let event = LoadEvent {
          generation,
          name: file.name.clone(),
          result: read_and_decode(&*decoder, &file),
        };
        if tx.send(event).is_err() {
          log::debug!("visualizer went away before {} finished loading", file.name);
        }
      });
    if let Err(e) = spawned {
      self.report(format!("could not start loading: {}", e));
    }
    Ok(())
  }

  /// Applies every finished load without blocking.
  pub fn pump_loads(&mut self, now: Instant) {
    while let Ok(event) = self.loads_rx.try_recv() {
      self.on_loaded(event, now);
    }
  }

  /// Blocks up to `timeout` for one finished load and applies it.
  pub fn wait_for_load(&mut self, timeout: Duration, now: Instant) -> bool {
    match self.loads_rx.recv_timeout(timeout) {
      Ok(event) => {
        self.on_loaded(event, now);
        true
      }
      Err(_) => false,
    }
  }

  fn on_loaded(&mut self, event: LoadEvent, now: Instant) {
    if event.generation != self.generation {
      log::info!("discarding superseded load of {}", event.name);
      return;
    }
    let audio = match event.result {
      Ok(audio) => audio,
      Err(e) => {
        self.report(e.to_string());
        return;
      }
    };
    log::info!(
      "decoded {}: {} channel(s) at {} Hz, {:.1}s",
      event.name,
      audio.channels,
      audio.sample_rate,
      audio.duration().as_secs_f64()
    );
    let wired = self
      .context
      .connect(SourceNode::new(audio))
      .and_then(|_| self.set_up(now));
    if let Err(source) = wired {
      self.report(
        LoadError::Start {
          name: event.name,
          source,
        }
        .to_string(),
      );
    }
  }

  fn set_up(&mut self, now: Instant) -> anyhow::Result<()> {
    let analyser = self.context.analyser();
    analyser.configure(AnalyserConfig::BAR_GRAPH);
    let bins = analyser.frequency_bin_count();
    self.draw_loop = Some(DrawLoop::new(self.size.clone(), bins));

    self.context.start(Duration::ZERO)?;
    self.icon = IconState::Pause;
    self.error = None;
    self.schedule.set_interval(crate::DRAW_INTERVAL, now);
    log::info!("playing {}", self.file_name);
    Ok(())
  }

  /// Draws a frame if one is due. Returns whether the canvas changed.
  pub fn tick(&mut self, now: Instant) -> bool {
    if !self.schedule.poll(now) {
      return false;
    }
    match &mut self.draw_loop {
      Some(draw_loop) => {
        draw_loop.draw(&mut self.canvas, self.context.analyser());
        true
      }
      None => false,
    }
  }

  pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
    self.schedule.next_wakeup(now)
  }

  /// Resumes a suspended context. No-op in any other state.
  pub fn play(&mut self) {
    if self.context.state() != ContextState::Suspended {
      return;
    }
    match self.context.resume() {
      Ok(()) => {
        log::info!("resumed");
        self.icon = IconState::Pause;
      }
      Err(e) => self.report(format!("could not resume playback: {}", e)),
    }
  }

  /// Suspends a running context. No-op in any other state.
  pub fn pause(&mut self) {
    if self.context.state() != ContextState::Running {
      return;
    }
    match self.context.suspend() {
      Ok(()) => {
        log::info!("suspended");
        self.icon = IconState::Play;
      }
      Err(e) => self.report(format!("could not pause playback: {}", e)),
    }
  }

  /// Does what the visible icon offers.
  pub fn activate_transport(&mut self) {
    match self.transport_icon() {
      Some(TransportIcon::Play) => self.play(),
      Some(TransportIcon::Pause) => self.pause(),
      None => (),
    }
  }

  /// Which icon to show: none before the first start, then whatever the live
  /// context state offers.
  pub fn transport_icon(&self) -> Option<TransportIcon> {
    if self.icon == IconState::Hidden {
      return None;
    }
    match self.context.state() {
      ContextState::Running => Some(TransportIcon::Pause),
      _ => Some(TransportIcon::Play),
    }
  }

  pub fn icon_state(&self) -> IconState {
    self.icon
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  pub fn alert(&self) -> Option<&str> {
    self.alert.as_deref()
  }

  pub fn dismiss_alert(&mut self) {
    self.alert = None;
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn state_width(&self) -> u32 {
    self.state_width
  }

  pub fn loop_width(&self) -> u32 {
    self.size.width()
  }

  pub fn canvas(&self) -> &PixelCanvas {
    &self.canvas
  }

  pub fn view(&self) -> View<'_> {
    View {
      canvas: &self.canvas,
      file_name: &self.file_name,
      icon: self.transport_icon(),
      error: self.error(),
      alert: self.alert(),
      compact: self.viewport_width < MOBILE_BREAKPOINT,
    }
  }

  /// Stops drawing and releases the audio context.
  pub fn unmount(mut self) {
    self.teardown();
  }

  fn teardown(&mut self) {
    self.schedule.clear_interval();
    self.draw_loop = None;
    self.context.close();
    log::info!("unmounted");
  }

  fn report(&mut self, message: String) {
    log::error!("{}", message);
    self.error = Some(message);
  }
}

fn validate(mut files: Vec<PickedFile>) -> Result<PickedFile, IntakeError> {
  if files.len() != 1 {
    return Err(IntakeError::FileCount(files.len()));
  }
  let file = files.remove(0);
  if file.media_type != crate::MP3_MEDIA_TYPE {
    return Err(IntakeError::MediaType(file.media_type.to_string()));
  }
  Ok(file)
}

fn read_and_decode<D: AudioDecoder + ?Sized>(
  decoder: &D,
  file: &PickedFile,
) -> Result<DecodedAudio, LoadError> {
  let bytes = fs::read(&file.path).map_err(|source| LoadError::Read {
    name: file.name.clone(),
    source,
  })?;
  log::debug!("read {} bytes from {}", bytes.len(), file.name);
  decoder.decode(bytes).map_err(|source| LoadError::Decode {
    name: file.name.clone(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analyser::{Analyser, SignalTap};
  use crate::error::DecodeError;
  use crate::style::PRIMARY;
  use anyhow::anyhow;
  use std::{
    cell::RefCell,
    f32::consts::PI,
    path::Path,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
  };

  const WAIT: Duration = Duration::from_secs(5);

  #[derive(Debug, Default)]
  struct Calls {
    connects: usize,
    starts: Vec<Duration>,
    resumes: usize,
    suspends: usize,
    closed: bool,
  }

  struct FakeContext {
    state: ContextState,
    analyser: Analyser,
    connected: bool,
    fail_transitions: bool,
    calls: Rc<RefCell<Calls>>,
  }

  impl FakeContext {
    fn new() -> (FakeContext, Rc<RefCell<Calls>>) {
      let calls = Rc::new(RefCell::new(Calls::default()));
      let context = FakeContext {
        state: ContextState::Running,
        analyser: Analyser::new(SignalTap::new()),
        connected: false,
        fail_transitions: false,
        calls: calls.clone(),
      };
      (context, calls)
    }
  }

  impl AudioContext for FakeContext {
    fn state(&self) -> ContextState {
      self.state
    }

    fn analyser(&mut self) -> &mut Analyser {
      &mut self.analyser
    }

    fn connect(&mut self, _source: SourceNode) -> anyhow::Result<()> {
      self.calls.borrow_mut().connects += 1;
      self.connected = true;
      Ok(())
    }

    fn start(&mut self, offset: Duration) -> anyhow::Result<()> {
      if !std::mem::take(&mut self.connected) {
        return Err(anyhow!("no source connected"));
      }
      self.calls.borrow_mut().starts.push(offset);
      Ok(())
    }

    fn resume(&mut self) -> anyhow::Result<()> {
      if self.fail_transitions {
        return Err(anyhow!("device lost"));
      }
      self.calls.borrow_mut().resumes += 1;
      self.state = ContextState::Running;
      Ok(())
    }

    fn suspend(&mut self) -> anyhow::Result<()> {
      if self.fail_transitions {
        return Err(anyhow!("device lost"));
      }
      self.calls.borrow_mut().suspends += 1;
      self.state = ContextState::Suspended;
      Ok(())
    }

    fn close(&mut self) {
      self.calls.borrow_mut().closed = true;
      self.state = ContextState::Closed;
    }
  }

  #[derive(Default)]
  struct FakeDecoder {
    calls: Arc<AtomicUsize>,
    fail: bool,
  }

  impl AudioDecoder for FakeDecoder {
    fn decode(&self, _bytes: Vec<u8>) -> Result<DecodedAudio, DecodeError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.fail {
        return Err(DecodeError::Malformed("bad frame header".to_string()));
      }
      Ok(DecodedAudio {
        channels: 1,
        sample_rate: 8000,
        samples: vec![0.0; 800],
      })
    }
  }

  type TestVisualizer = Visualizer<FakeContext, FakeDecoder>;

  fn mount(decoder: FakeDecoder) -> (TestVisualizer, Rc<RefCell<Calls>>) {
    let (context, calls) = FakeContext::new();
    let vis = Visualizer::mount(context, decoder, 1920, Duration::from_millis(1));
    (vis, calls)
  }

  fn write_file(dir: &Path, name: &str) -> PickedFile {
    let path = dir.join(name);
    fs::write(&path, b"ID3").unwrap();
    PickedFile::from_path(path)
  }

  #[test]
  fn two_files_raise_the_alert() {
    let dir = tempfile::tempdir().unwrap();
    let decoder = FakeDecoder::default();
    let decodes = decoder.calls.clone();
    let (mut vis, calls) = mount(decoder);

    let files = vec![write_file(dir.path(), "a.mp3"), write_file(dir.path(), "b.mp3")];
    assert_eq!(vis.select_files(files), Err(IntakeError::FileCount(2)));
    assert_eq!(vis.alert(), Some("You may only select a single file!"));
    assert_eq!(vis.file_name(), "");
    assert!(!vis.wait_for_load(Duration::from_millis(50), Instant::now()));
    assert_eq!(calls.borrow().connects, 0);
    assert_eq!(decodes.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn nothing_selected_raises_the_alert() {
    let (mut vis, _) = mount(FakeDecoder::default());
    assert_eq!(vis.select_files(vec![]), Err(IntakeError::FileCount(0)));
    assert!(vis.alert().is_some());
    vis.dismiss_alert();
    assert_eq!(vis.alert(), None);
  }

  #[test]
  fn wav_is_rejected_without_decoding() {
    let dir = tempfile::tempdir().unwrap();
    let decoder = FakeDecoder::default();
    let decodes = decoder.calls.clone();
    let (mut vis, _) = mount(decoder);

    let res = vis.select_files(vec![write_file(dir.path(), "a.wav")]);
    assert_eq!(res, Err(IntakeError::MediaType("audio/wav".to_string())));
    assert_eq!(vis.alert(), Some("The file selected must be an mp3!"));
    assert!(!vis.wait_for_load(Duration::from_millis(50), Instant::now()));
    assert_eq!(decodes.load(Ordering::SeqCst), 0);
    assert_eq!(vis.file_name(), "");
  }

  #[test]
  fn mp3_loads_and_starts_playing() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, calls) = mount(FakeDecoder::default());

    vis.select_files(vec![write_file(dir.path(), "song.mp3")]).unwrap();
    assert_eq!(vis.file_name(), "song.mp3");
    assert_eq!(vis.icon_state(), IconState::Hidden);
    assert_eq!(vis.transport_icon(), None);

    assert!(vis.wait_for_load(WAIT, Instant::now()));
    assert_eq!(vis.icon_state(), IconState::Pause);
    assert_eq!(vis.transport_icon(), Some(TransportIcon::Pause));
    assert_eq!(calls.borrow().connects, 1);
    assert_eq!(calls.borrow().starts, vec![Duration::ZERO]);
    assert_eq!(vis.alert(), None);
    assert_eq!(vis.error(), None);
  }

  #[test]
  fn transport_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, calls) = mount(FakeDecoder::default());
    vis.select_files(vec![write_file(dir.path(), "song.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, Instant::now()));

    vis.play();
    assert_eq!(calls.borrow().resumes, 0);
    assert_eq!(vis.icon_state(), IconState::Pause);

    vis.pause();
    assert_eq!(vis.icon_state(), IconState::Play);
    assert_eq!(vis.transport_icon(), Some(TransportIcon::Play));
    vis.pause();
    assert_eq!(calls.borrow().suspends, 1);
    assert_eq!(vis.icon_state(), IconState::Play);

    vis.activate_transport();
    assert_eq!(calls.borrow().resumes, 1);
    assert_eq!(vis.transport_icon(), Some(TransportIcon::Pause));
  }

  #[test]
  fn icon_follows_the_live_state() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, _) = mount(FakeDecoder::default());
    vis.select_files(vec![write_file(dir.path(), "song.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, Instant::now()));

    vis.context.state = ContextState::Suspended;
    assert_eq!(vis.icon_state(), IconState::Pause);
    assert_eq!(vis.transport_icon(), Some(TransportIcon::Play));
  }

  #[test]
  fn no_icon_before_anything_played() {
    let (mut vis, calls) = mount(FakeDecoder::default());
    vis.activate_transport();
    assert_eq!(vis.transport_icon(), None);
    assert_eq!(calls.borrow().suspends, 0);
  }

  #[test]
  fn failed_transitions_surface_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, _) = mount(FakeDecoder::default());
    vis.select_files(vec![write_file(dir.path(), "song.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, Instant::now()));

    vis.context.fail_transitions = true;
    vis.pause();
    assert_eq!(vis.icon_state(), IconState::Pause);
    assert!(vis.error().unwrap().contains("device lost"));
    assert_eq!(vis.alert(), None);
  }

  #[test]
  fn decode_failure_surfaces_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, calls) = mount(FakeDecoder {
      fail: true,
      ..FakeDecoder::default()
    });
    vis.select_files(vec![write_file(dir.path(), "song.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, Instant::now()));

    let error = vis.error().unwrap();
    assert!(error.contains("song.mp3"));
    assert!(error.contains("bad frame header"));
    assert_eq!(vis.icon_state(), IconState::Hidden);
    assert_eq!(calls.borrow().connects, 0);
    assert_eq!(vis.alert(), None);
  }

  #[test]
  fn unreadable_file_surfaces_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, _) = mount(FakeDecoder::default());
    let missing = PickedFile::from_path(dir.path().join("gone.mp3"));
    vis.select_files(vec![missing]).unwrap();
    assert!(vis.wait_for_load(WAIT, Instant::now()));
    assert!(vis.error().unwrap().starts_with("could not read gone.mp3"));
  }

  #[test]
  fn superseded_loads_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, calls) = mount(FakeDecoder::default());
    vis.select_files(vec![write_file(dir.path(), "a.mp3")]).unwrap();
    vis.select_files(vec![write_file(dir.path(), "b.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, Instant::now()));
    assert!(vis.wait_for_load(WAIT, Instant::now()));

    assert_eq!(vis.file_name(), "b.mp3");
    assert_eq!(calls.borrow().connects, 1);
    assert_eq!(calls.borrow().starts.len(), 1);
  }

  #[test]
  fn reloading_keeps_one_draw_cadence() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, _) = mount(FakeDecoder::default());
    let t0 = Instant::now();
    vis.select_files(vec![write_file(dir.path(), "a.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, t0));
    vis.select_files(vec![write_file(dir.path(), "b.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, t0));

    assert!(!vis.tick(t0 + Duration::from_millis(10)));
    assert!(vis.tick(t0 + Duration::from_millis(25)));
    assert!(!vis.tick(t0 + Duration::from_millis(30)));
    assert!(vis.tick(t0 + Duration::from_millis(50)));
  }

  #[test]
  fn ticks_paint_bars() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, _) = mount(FakeDecoder::default());
    let t0 = Instant::now();
    vis.select_files(vec![write_file(dir.path(), "song.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, t0));

    let tone = (0..256)
      .map(|i| (2.0 * PI * 8.0 * i as f32 / 256.0).sin())
      .collect::<Vec<f32>>();
    vis.context.analyser().tap().push(&tone);
    assert!(vis.tick(t0 + crate::DRAW_INTERVAL));

    let canvas = vis.canvas();
    let bottom = canvas.height() - 1;
    // bar 8 starts at x = 8 * 6.25
    assert_eq!(canvas.pixel(52, bottom), Some(PRIMARY));
    assert_eq!(canvas.pixel(700, bottom), None);
  }

  #[test]
  fn resize_keeps_both_widths_equal() {
    let (mut vis, _) = mount(FakeDecoder::default());
    assert_eq!(vis.state_width(), 800);
    for viewport in [1920, 1000, 640, 801, 30] {
      vis.on_resize(viewport);
      assert_eq!(vis.state_width(), get_width(viewport));
      assert_eq!(vis.state_width(), vis.loop_width());
      assert_eq!(vis.canvas().width(), vis.state_width());
      assert_eq!(vis.canvas().height(), height_for(vis.state_width()) as u32);
    }
    assert!(vis.view().compact);
  }

  #[test]
  fn unmount_closes_the_context() {
    let (vis, calls) = mount(FakeDecoder::default());
    vis.unmount();
    assert!(calls.borrow().closed);
  }

  #[test]
  fn teardown_cancels_the_draw_timer() {
    let dir = tempfile::tempdir().unwrap();
    let (mut vis, calls) = mount(FakeDecoder::default());
    let start = Instant::now();
    vis.select_files(vec![write_file(dir.path(), "song.mp3")]).unwrap();
    assert!(vis.wait_for_load(WAIT, start));
    assert!(vis.schedule.is_active());
    assert!(vis.tick(start + crate::DRAW_INTERVAL));

    vis.teardown();
    assert!(!vis.schedule.is_active());
    assert!(calls.borrow().closed);
    assert_eq!(vis.next_wakeup(start), None);
    for n in 2..6 {
      assert!(!vis.tick(start + crate::DRAW_INTERVAL * n));
    }
    vis.on_resize(640);
    assert!(!vis.tick(start + crate::DRAW_INTERVAL * 7));
  }
}
