//! Fixed-period tick clock using an accumulator pattern.
//!
//! `draw_web()` calls at ~60fps with variable delta. TickClock converts
//! this into whole simulation periods (1 second each for both games),
//! so the engines only ever see discrete ticks. The clock has an explicit
//! start/stop lifecycle: a stopped clock swallows elapsed time and yields
//! no ticks until it is started again.

/// Milliseconds per simulation tick.
pub const TICK_PERIOD_MS: f64 = 1000.0;

/// Largest frame delta fed into the accumulator. A backgrounded tab
/// otherwise returns with minutes of backlog.
const MAX_FRAME_DELTA_MS: f64 = 5.0 * TICK_PERIOD_MS;

pub struct TickClock {
    ms_per_tick: f64,
    /// Accumulated milliseconds not yet consumed as ticks
    accumulator: f64,
    /// Total elapsed ticks since creation
    pub total_ticks: u64,
    /// Timestamp of the last update (ms), None if first frame
    last_timestamp: Option<f64>,
    running: bool,
}

impl TickClock {
    /// A running clock with the given period.
    pub fn new(ms_per_tick: f64) -> Self {
        Self {
            ms_per_tick,
            accumulator: 0.0,
            total_ticks: 0,
            last_timestamp: None,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resume ticking. The first update after a start only records the
    /// timestamp, so time spent stopped is never replayed.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.last_timestamp = None;
            self.accumulator = 0.0;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = 0.0;
    }

    /// Feed wall-clock timestamp (from `Date.now()` or similar).
    /// Returns the number of whole periods to simulate this frame.
    pub fn update(&mut self, now_ms: f64) -> u32 {
        if !self.running {
            return 0;
        }
        let delta = match self.last_timestamp {
            Some(prev) => (now_ms - prev).clamp(0.0, MAX_FRAME_DELTA_MS),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += delta;
        let ticks = (self.accumulator / self.ms_per_tick) as u32;
        self.accumulator -= ticks as f64 * self.ms_per_tick;
        self.total_ticks += ticks as u64;
        ticks
    }
}

/// Wall-clock milliseconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

/// Wall-clock milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
