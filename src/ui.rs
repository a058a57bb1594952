use tui::{
  backend::Backend,
  buffer::Buffer,
  layout::{Alignment, Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Span, Spans},
  widgets::{self, Block, Borders, Clear, List, ListItem, Paragraph, Widget, Wrap},
  Frame,
};

use crate::style::{Rgb, ERROR, PRIMARY};
use crate::surface::PixelCanvas;
use crate::visualizer::{TransportIcon, View};

const CONTROLS_HEIGHT: u16 = 3;
const ERROR_HEIGHT: u16 = 1;
const MIN_WIDTH: u16 = 24;
const ICON_WIDTH: u16 = 4;

/// Where the clickable controls ended up on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hitboxes {
  pub select: Rect,
  pub transport: Option<Rect>,
}

impl Hitboxes {
  pub fn hits_select(&self, column: u16, row: u16) -> bool {
    contains(self.select, column, row)
  }

  pub fn hits_transport(&self, column: u16, row: u16) -> bool {
    self
      .transport
      .map(|r| contains(r, column, row))
      .unwrap_or(false)
  }
}

fn contains(r: Rect, column: u16, row: u16) -> bool {
  column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
}

pub fn to_color(rgb: Rgb) -> Color {
  Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Cells needed to show `px` device pixels at `px_per_cell`.
fn cells(px: u32, px_per_cell: u32) -> u16 {
  let px_per_cell = px_per_cell.max(1);
  (px.saturating_add(px_per_cell - 1) / px_per_cell).min(u16::MAX as u32) as u16
}

/// The main UI: the visualizer centered in the terminal.
pub fn main_ui<B: Backend>(f: &mut Frame<B>, view: &View, cell_px: u32) -> Hitboxes {
  let size = f.size();
  let reserved = 2 + CONTROLS_HEIGHT + ERROR_HEIGHT;
  let canvas_cols = cells(view.canvas.width(), cell_px).min(size.width.saturating_sub(2));
  let canvas_rows = cells(view.canvas.height(), cell_px.saturating_mul(2))
    .min(size.height.saturating_sub(reserved));

  let area = centered_area(
    (canvas_cols + 2).max(MIN_WIDTH),
    canvas_rows + reserved,
    size,
  );
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints(
      [
        Constraint::Length(canvas_rows + 2),
        Constraint::Length(CONTROLS_HEIGHT),
        Constraint::Length(ERROR_HEIGHT),
      ]
      .as_ref(),
    )
    .split(area);

  let canvas_area = Rect {
    width: (canvas_cols + 2).min(chunks[0].width),
    ..chunks[0]
  };
  f.render_widget(
    CanvasView::new(view.canvas).block(Block::default().title("tuibars").borders(Borders::ALL)),
    canvas_area,
  );

  let controls_block = Block::default().borders(Borders::ALL);
  let controls_inner = controls_block.inner(chunks[1]);
  f.render_widget(controls_block, chunks[1]);
  let controls = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(0), Constraint::Length(ICON_WIDTH)].as_ref())
    .split(controls_inner);

  f.render_widget(select_and_title(view), controls[0]);
  let transport = view.icon.map(|icon| {
    f.render_widget(transport_button(icon), controls[1]);
    controls[1]
  });

  if let Some(error) = view.error {
    f.render_widget(error_line(error), chunks[2]);
  }

  if let Some(alert) = view.alert {
    alert_popup(f, alert);
  }

  Hitboxes {
    select: controls[0],
    transport,
  }
}

/// The select-file button followed by the current file name.
fn select_and_title<'a>(view: &View<'a>) -> Paragraph<'a> {
  let label = if view.compact {
    "[o] File"
  } else {
    "[o] Select File"
  };
  Paragraph::new(Spans::from(vec![
    Span::styled(
      label,
      Style::default()
        .fg(to_color(PRIMARY))
        .add_modifier(Modifier::BOLD),
    ),
    Span::raw("  "),
    Span::raw(view.file_name),
  ]))
}

fn transport_button(icon: TransportIcon) -> Paragraph<'static> {
  let symbol = match icon {
    TransportIcon::Play => "▶",
    TransportIcon::Pause => "⏸",
  };
  Paragraph::new(symbol)
    .alignment(Alignment::Right)
    .style(Style::default().add_modifier(Modifier::BOLD))
}

fn error_line(error: &str) -> Paragraph {
  Paragraph::new(error).style(Style::default().fg(to_color(ERROR)))
}

/// Creates a rectangle centered in the middle of the terminal.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
  let popup_layout = Layout::default()
    .direction(Direction::Vertical)
    .constraints(
      [
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
      ]
      .as_ref(),
    )
    .split(r);

  Layout::default()
    .direction(Direction::Horizontal)
    .constraints(
      [
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
      ]
      .as_ref(),
    )
    .split(popup_layout[1])[1]
}

/// A `width` x `height` rectangle centered in `r`, shrunk to fit.
pub fn centered_area(width: u16, height: u16, r: Rect) -> Rect {
  let width = width.min(r.width);
  let height = height.min(r.height);
  Rect {
    x: r.x + (r.width - width) / 2,
    y: r.y + (r.height - height) / 2,
    width,
    height,
  }
}

/// The blocking alert.
fn alert_popup<B: Backend>(f: &mut Frame<B>, message: &str) {
  let area = centered_rect(60, 30, f.size());
  let text = format!("{}\n\nenter: ok", message);
  let popup = Paragraph::new(text)
    .block(Block::default().title("alert").borders(Borders::ALL))
    .style(Style::default().fg(to_color(PRIMARY)))
    .wrap(Wrap { trim: true });
  f.render_widget(Clear, area);
  f.render_widget(popup, area);
}

/// The popup which lets users type the path of the file to play.
pub fn select_file_popup<B: Backend>(f: &mut Frame<B>, text: &str, suggestions: &[String]) {
  let ui_color = to_color(PRIMARY);
  let input = widgets::Paragraph::new(text)
    .block(
      Block::default()
        .title("enter-path-to-mp3")
        .borders(Borders::ALL),
    )
    .style(Style::default().fg(ui_color));
  let area = centered_rect(60, 60, f.size());

  let matches = List::new(
    suggestions
      .iter()
      .map(|s| ListItem::new(s.as_str()))
      .collect::<Vec<ListItem>>(),
  )
  .block(Block::default().borders(Borders::ALL))
  .style(Style::default().fg(ui_color).add_modifier(Modifier::ITALIC));

  let layout = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
    .split(area);

  f.render_widget(Clear, area);
  f.render_widget(input, layout[0]);
  f.render_widget(matches, layout[1]);
}

/// Shows a `PixelCanvas` with half-block characters, two pixel rows per cell.
pub struct CanvasView<'a> {
  canvas: &'a PixelCanvas,
  block: Option<Block<'a>>,
}

impl<'a> CanvasView<'a> {
  pub fn new(canvas: &'a PixelCanvas) -> CanvasView<'a> {
    CanvasView {
      canvas,
      block: None,
    }
  }

  pub fn block(mut self, block: Block<'a>) -> CanvasView<'a> {
    self.block = Some(block);
    self
  }

  fn sample(&self, col: u16, sub_row: u16, cols: u16, sub_rows: u16) -> Option<Rgb> {
    let x = (col as f64 + 0.5) * self.canvas.width() as f64 / cols as f64;
    let y = (sub_row as f64 + 0.5) * self.canvas.height() as f64 / sub_rows as f64;
    self.canvas.pixel(x as u32, y as u32)
  }
}

impl<'a> Widget for CanvasView<'a> {
  fn render(mut self, area: Rect, buf: &mut Buffer) {
    let area = match self.block.take() {
      Some(block) => {
        let inner = block.inner(area);
        block.render(area, buf);
        inner
      }
      None => area,
    };
    if area.width == 0 || area.height == 0 {
      return;
    }
    let sub_rows = area.height * 2;
    for row in 0..area.height {
      for col in 0..area.width {
        let top = self.sample(col, row * 2, area.width, sub_rows);
        let bottom = self.sample(col, row * 2 + 1, area.width, sub_rows);
        let cell = buf.get_mut(area.x + col, area.y + row);
        match (top, bottom) {
          (None, None) => {}
          (Some(t), None) => {
            cell.set_symbol("▀").set_fg(to_color(t));
          }
          (None, Some(b)) => {
            cell.set_symbol("▄").set_fg(to_color(b));
          }
          (Some(t), Some(b)) if t == b => {
            cell.set_symbol("█").set_fg(to_color(t));
          }
          (Some(t), Some(b)) => {
            cell.set_symbol("▀").set_fg(to_color(t)).set_bg(to_color(b));
          }
        }
      }
    }
  }
}
