use std::time::{Duration, Instant};

/// A fixed-rate timer.
#[derive(Debug, Clone)]
struct Interval {
  period: Duration,
  next_due: Instant,
}

impl Interval {
  fn new(period: Duration, now: Instant) -> Interval {
    Interval {
      period,
      next_due: now + period,
    }
  }

  /// Fires at most once per call; missed periods are dropped.
  fn fire(&mut self, now: Instant) -> bool {
    if now < self.next_due {
      return false;
    }
    self.next_due += self.period;
    if self.next_due <= now {
      self.next_due = now + self.period;
    }
    true
  }
}

/// Limits how often frames are produced.
#[derive(Debug, Clone)]
struct FrameClock {
  frame_interval: Duration,
  last_frame: Option<Instant>,
}

impl FrameClock {
  fn wait(&self, now: Instant) -> Duration {
    match self.last_frame {
      Some(last) => (last + self.frame_interval).saturating_duration_since(now),
      None => Duration::ZERO,
    }
  }
}

/// The draw cadence: a fixed-rate timer whose firings request a frame, and
/// the frame clock deciding when a requested frame may run.
///
/// At most one timer exists at a time.
#[derive(Debug, Clone)]
pub struct DrawSchedule {
  timer: Option<Interval>,
  frames: FrameClock,
  frame_requested: bool,
}

impl DrawSchedule {
  pub fn new(frame_interval: Duration) -> DrawSchedule {
    DrawSchedule {
      timer: None,
      frames: FrameClock {
        frame_interval,
        last_frame: None,
      },
      frame_requested: false,
    }
  }

  /// Starts a timer firing every `period`, cancelling any running one.
  pub fn set_interval(&mut self, period: Duration, now: Instant) {
    if self.timer.replace(Interval::new(period, now)).is_some() {
      log::debug!("replaced running draw timer");
    }
  }

  pub fn clear_interval(&mut self) {
    self.timer = None;
    self.frame_requested = false;
  }

  #[cfg(test)]
  pub(crate) fn is_active(&self) -> bool {
    self.timer.is_some()
  }

  pub fn request_frame(&mut self) {
    self.frame_requested = true;
  }

  /// Advances the timer and reports whether a frame should be drawn now.
  pub fn poll(&mut self, now: Instant) -> bool {
    if let Some(timer) = &mut self.timer {
      if timer.fire(now) {
        self.frame_requested = true;
      }
    }
    if self.frame_requested && self.frames.wait(now).is_zero() {
      self.frame_requested = false;
      self.frames.last_frame = Some(now);
      return true;
    }
    false
  }

  /// How long until `poll` could next return true. `None` when nothing is
  /// scheduled.
  pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
    if self.frame_requested {
      return Some(self.frames.wait(now));
    }
    self
      .timer
      .as_ref()
      .map(|t| t.next_due.saturating_duration_since(now))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const PERIOD: Duration = Duration::from_millis(25);

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  #[test]
  fn idle_schedule_never_draws() {
    let now = Instant::now();
    let mut schedule = DrawSchedule::new(ms(16));
    assert!(!schedule.poll(now + ms(1000)));
    assert_eq!(schedule.next_wakeup(now), None);
  }

  #[test]
  fn timer_fires_every_period() {
    let start = Instant::now();
    let mut schedule = DrawSchedule::new(ms(1));
    schedule.set_interval(PERIOD, start);
    assert!(!schedule.poll(start + ms(10)));
    assert_eq!(schedule.next_wakeup(start + ms(10)), Some(ms(15)));
    assert!(schedule.poll(start + ms(25)));
    assert!(!schedule.poll(start + ms(30)));
    assert!(schedule.poll(start + ms(50)));
  }

  #[test]
  fn slow_frames_throttle_the_timer() {
    let start = Instant::now();
    let mut schedule = DrawSchedule::new(ms(100));
    schedule.set_interval(PERIOD, start);
    assert!(schedule.poll(start + ms(25)));
    // fired, but the frame clock holds it back
    assert!(!schedule.poll(start + ms(50)));
    assert_eq!(schedule.next_wakeup(start + ms(50)), Some(ms(75)));
    assert!(!schedule.poll(start + ms(100)));
    assert!(schedule.poll(start + ms(125)));
  }

  #[test]
  fn replacing_keeps_a_single_cadence() {
    let start = Instant::now();
    let mut schedule = DrawSchedule::new(ms(1));
    schedule.set_interval(PERIOD, start);
    schedule.set_interval(PERIOD, start + ms(10));
    assert!(!schedule.poll(start + ms(25)));
    assert!(schedule.poll(start + ms(35)));
    assert!(!schedule.poll(start + ms(40)));
  }

  #[test]
  fn clearing_stops_drawing() {
    let start = Instant::now();
    let mut schedule = DrawSchedule::new(ms(1));
    schedule.set_interval(PERIOD, start);
    schedule.clear_interval();
    assert!(!schedule.is_active());
    assert!(!schedule.poll(start + ms(100)));
  }

  #[test]
  fn explicit_requests_draw_once() {
    let now = Instant::now();
    let mut schedule = DrawSchedule::new(ms(16));
    schedule.request_frame();
    schedule.request_frame();
    assert!(schedule.poll(now));
    assert!(!schedule.poll(now + ms(20)));
  }
}
