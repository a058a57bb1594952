use crossterm::{
  event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseButton, MouseEvent,
    MouseEventKind,
  },
  execute,
  terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

use crate::config::Config;
use crate::decode::{AudioDecoder, RodioDecoder};
use crate::engine::{AudioContext, RodioContext};
use crate::picker::{get_search_dir, pick, pick_all, suggestions};
use crate::ui::{main_ui, select_file_popup, Hitboxes};
use crate::visualizer::Visualizer;
use std::{
  io,
  time::{Duration, Instant},
};
use tui::{
  backend::{Backend, CrosstermBackend},
  Terminal,
};

/// Longest the loop sleeps, so finished loads are picked up promptly.
const IDLE_POLL: Duration = Duration::from_millis(50);
const MAX_SUGGESTIONS: usize = 20;

/// What keyboard input currently goes to.
enum Mode {
  Visualize,
  /// The path prompt, with what has been typed so far.
  SelectFile(String),
}

/// Sets up the terminal, and runs the UI.
pub fn run(config: Config) -> anyhow::Result<()> {
  let context = RodioContext::try_default()?;
  let (columns, _) = terminal::size()?;

  // setup terminal
  enable_raw_mode()?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend)?;

  let mut visualizer = Visualizer::mount(
    context,
    RodioDecoder,
    config.viewport_width(columns),
    config.frame_interval(),
  );

  // run application
  let res = run_app(&mut terminal, &mut visualizer, &config);
  visualizer.unmount();

  // restore terminal
  disable_raw_mode()?;
  execute!(
    terminal.backend_mut(),
    LeaveAlternateScreen,
    DisableMouseCapture
  )?;
  terminal.show_cursor()?;

  res
}

/// Runs the UI loop, assuming the terminal has been prepared.
fn run_app<B, C, D>(
  terminal: &mut Terminal<B>,
  visualizer: &mut Visualizer<C, D>,
  config: &Config,
) -> anyhow::Result<()>
where
  B: Backend,
  C: AudioContext,
  D: AudioDecoder + 'static,
{
  if !config.paths.is_empty() {
    match pick_all(&config.paths) {
      Ok(files) => {
        // rejections show up as the alert
        let _ = visualizer.select_files(files);
      }
      Err(e) => log::warn!("could not open startup selection: {}", e),
    }
  }

  let mut mode = Mode::Visualize;
  let mut hits = Hitboxes::default();
  let mut dirty = true;

  loop {
    let now = Instant::now();
    visualizer.pump_loads(now);
    if visualizer.tick(now) {
      dirty = true;
    }

    if dirty {
      terminal.draw(|f| {
        hits = main_ui(f, &visualizer.view(), config.cell_px);
        if let Mode::SelectFile(buf) = &mode {
          select_file_popup(f, buf, &suggestions(buf, MAX_SUGGESTIONS));
        }
      })?;
      dirty = false;
    }

    let timeout = visualizer
      .next_wakeup(Instant::now())
      .map_or(IDLE_POLL, |d| d.min(IDLE_POLL));
    if !event::poll(timeout)? {
      continue;
    }
    dirty = true;

    match event::read()? {
      Event::Resize(columns, _) => visualizer.on_resize(config.viewport_width(columns)),
      // the alert blocks everything until it is dismissed
      Event::Key(key) if visualizer.alert().is_some() => {
        if let KeyCode::Enter | KeyCode::Esc = key.code {
          visualizer.dismiss_alert();
        }
      }
      Event::Key(key) => match &mut mode {
        Mode::Visualize => match key.code {
          KeyCode::Char('q') => return Ok(()),
          KeyCode::Char('o') => mode = Mode::SelectFile(get_search_dir()),
          KeyCode::Char(' ') | KeyCode::Char('p') => visualizer.activate_transport(),
          _ => (),
        },
        Mode::SelectFile(buf) => match key.code {
          KeyCode::Esc => mode = Mode::Visualize,
          KeyCode::Enter => {
            match pick(buf.as_str()) {
              Ok(files) => {
                // rejections show up as the alert
                let _ = visualizer.select_files(files);
              }
              Err(e) => {
                log::info!("could not open {}: {}", buf, e);
                // nothing to open counts as an empty selection, which alerts
                let _ = visualizer.select_files(vec![]);
              }
            }
            mode = Mode::Visualize;
          }
          KeyCode::Tab => {
            if let [only] = suggestions(buf, 2).as_slice() {
              let keep = buf.rfind(std::path::MAIN_SEPARATOR).map_or(0, |i| i + 1);
              buf.truncate(keep);
              buf.push_str(only);
            }
          }
          KeyCode::Backspace => {
            buf.pop();
          }
          KeyCode::Char(c) => {
            buf.push(c);
          }
          _ => (),
        },
      },
      Event::Mouse(MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column,
        row,
        ..
      }) if visualizer.alert().is_none() && matches!(mode, Mode::Visualize) => {
        if hits.hits_transport(column, row) {
          visualizer.activate_transport();
        } else if hits.hits_select(column, row) {
          mode = Mode::SelectFile(get_search_dir());
        }
      }
      _ => (),
    }
  }
}
