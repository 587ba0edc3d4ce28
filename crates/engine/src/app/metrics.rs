use std::time::{Duration, Instant};

/// One reporting window of the loop, as logged by `loop_metrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopReport {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    /// Simulation time thrown away by the tick cap during the window.
    pub dropped_backlog_ms: u64,
    pub entity_count: usize,
    /// Largest scene graph seen in the window; ghosts and interiors come and go between frames.
    pub peak_node_count: usize,
}

#[derive(Debug, Default)]
struct WindowCounters {
    frames: u32,
    ticks: u32,
    frame_time: Duration,
    dropped_backlog: Duration,
    entity_count: usize,
    peak_node_count: usize,
}

#[derive(Debug)]
pub(crate) struct LoopStats {
    started: Instant,
    window: Duration,
    counters: WindowCounters,
}

impl LoopStats {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            started: Instant::now(),
            window,
            counters: WindowCounters::default(),
        }
    }

    pub(crate) fn frame_presented(&mut self, frame_dt: Duration, entity_count: usize, node_count: usize) {
        let counters = &mut self.counters;
        counters.frames = counters.frames.saturating_add(1);
        counters.frame_time = counters.frame_time.saturating_add(frame_dt);
        counters.entity_count = entity_count;
        counters.peak_node_count = counters.peak_node_count.max(node_count);
    }

    pub(crate) fn tick_ran(&mut self) {
        self.counters.ticks = self.counters.ticks.saturating_add(1);
    }

    pub(crate) fn backlog_dropped(&mut self, dropped: Duration) {
        self.counters.dropped_backlog = self.counters.dropped_backlog.saturating_add(dropped);
    }

    /// Closes the window once it has run its length and starts the next one.
    pub(crate) fn take_report(&mut self, now: Instant) -> Option<LoopReport> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.window {
            return None;
        }
        let counters = std::mem::take(&mut self.counters);
        self.started = now;

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match counters.frames {
            0 => 0.0,
            frames => counters.frame_time.as_secs_f32() * 1000.0 / frames as f32,
        };
        Some(LoopReport {
            fps: counters.frames as f32 / seconds,
            tps: counters.ticks as f32 / seconds,
            frame_time_ms,
            dropped_backlog_ms: counters.dropped_backlog.as_millis() as u64,
            entity_count: counters.entity_count,
            peak_node_count: counters.peak_node_count,
        })
    }
}
