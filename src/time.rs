use std::time::{Duration, Instant};

/// Longest frame delta handed to simulation. A stall (window drag, room
/// load hitch, minimized window) lands as one clamped step instead of
/// catapulting the orbit damping.
const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

pub struct Time {
    start: Instant,
    last: Instant,
    delta: Duration,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, delta: Duration::ZERO }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now.duration_since(self.last).min(MAX_FRAME_DELTA);
        self.last = now;
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.last.duration_since(self.start).as_secs_f32()
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
