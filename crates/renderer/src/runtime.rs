use std::time::{Duration, Instant};

/// Snapshot of the clock handed to `update`/`draw`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or frozen time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp while still counting frames.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time, frame: 0 }
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Picks the wall clock unless a frozen timestamp was requested.
pub fn time_source(fixed_time: Option<f32>) -> BoxedTimeSource {
    match fixed_time {
        Some(time) => Box::new(FixedTimeSource::new(time)),
        None => Box::new(SystemTimeSource::new()),
    }
}

/// Decides when the next frame should be rendered under an optional FPS cap.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            next_deadline: None,
        }
    }

    /// Frame interval, or None when uncapped.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match self.next_deadline {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    /// Records that a frame was presented at `now` and schedules the next one.
    pub fn mark_rendered(&mut self, now: Instant) {
        let Some(interval) = self.interval else {
            self.next_deadline = None;
            return;
        };
        let next = match self.next_deadline {
            // Keep cadence when on time; re-anchor after a stall so we don't burst.
            Some(deadline) if now.saturating_duration_since(deadline) < interval => {
                deadline + interval
            }
            _ => now + interval,
        };
        self.next_deadline = Some(next);
    }

    pub fn reset(&mut self) {
        self.next_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_source_freezes_time_but_counts_frames() {
        let mut source = FixedTimeSource::new(12.5);
        let first = source.sample();
        let second = source.sample();
        assert_eq!(first.seconds, 12.5);
        assert_eq!(second.seconds, 12.5);
        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        source.reset();
        assert_eq!(source.sample().frame_index, 0);
    }

    #[test]
    fn system_source_is_monotonic() {
        let mut source = SystemTimeSource::new();
        let first = source.sample();
        let second = source.sample();
        assert!(second.seconds >= first.seconds);
        assert_eq!(second.frame_index, first.frame_index + 1);
    }

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = FrameScheduler::new(None);
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert!(scheduler.next_deadline().is_none());
    }

    #[test]
    fn non_positive_cap_is_treated_as_uncapped() {
        assert!(FrameScheduler::new(Some(0.0)).interval().is_none());
        assert!(FrameScheduler::new(Some(-30.0)).interval().is_none());
    }

    #[test]
    fn capped_scheduler_waits_one_interval() {
        let mut scheduler = FrameScheduler::new(Some(50.0));
        let interval = scheduler.interval().expect("capped interval");
        let start = Instant::now();
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered(start);

        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(5)));
        assert!(scheduler.ready_for_frame(start + interval));
        assert_eq!(scheduler.next_deadline(), Some(start + interval));
    }

    #[test]
    fn scheduler_keeps_cadence_when_slightly_late() {
        let mut scheduler = FrameScheduler::new(Some(50.0));
        let interval = scheduler.interval().expect("capped interval");
        let start = Instant::now();
        scheduler.mark_rendered(start);
        let deadline = start + interval;

        scheduler.mark_rendered(deadline + Duration::from_millis(3));
        assert_eq!(scheduler.next_deadline(), Some(deadline + interval));
    }

    #[test]
    fn scheduler_reanchors_after_stall() {
        let mut scheduler = FrameScheduler::new(Some(50.0));
        let interval = scheduler.interval().expect("capped interval");
        let start = Instant::now();
        scheduler.mark_rendered(start);

        let late = start + Duration::from_millis(500);
        scheduler.mark_rendered(late);
        assert_eq!(scheduler.next_deadline(), Some(late + interval));
    }
}
