use std::time::{Duration, Instant};

/// Wall clock stopwatch for warp budgets and block timers.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
  started: Instant,
}

impl Timer {
  pub fn start() -> Self {
    Timer {
      started: Instant::now(),
    }
  }

  pub fn time_elapsed(&self) -> Duration {
    self.started.elapsed()
  }
}
