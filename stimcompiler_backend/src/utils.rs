//! Small helpers shared by the synthesis modules.

use std::time::Instant;

/// Lap timer for debug logging. Each [`tick`](TickTimer::tick) returns the milliseconds since
/// the previous tick (or since construction).
pub struct TickTimer {
    last: Instant,
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TickTimer {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let diff = now.duration_since(self.last).as_secs_f64() * 1e3;
        self.last = now;
        diff
    }

    pub fn tick_log(&mut self, msg: &str) -> f64 {
        let diff = self.tick();
        log::debug!("{}: {:.3}ms", msg, diff);
        diff
    }
}
