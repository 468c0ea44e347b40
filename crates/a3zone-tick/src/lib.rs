//! Housekeeping clock for the zone server.
//!
//! Players drive the zone: nothing moves unless a command arrives. A few
//! chores still run on a clock (pruning the auth limiter, logging a
//! heartbeat), and [`ZoneClock`] wakes the server loop for them.
//!
//! A late wakeup never triggers a burst of catch-up beats. Whole intervals
//! that were missed are counted in [`Beat::skipped`] and the next beat is
//! due one interval after the late one.
//!
//! ```ignore
//! let mut clock = ZoneClock::new(ClockConfig::every(Duration::from_secs(1)));
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         beat = clock.next_beat() => {
//!             chores(beat.number);
//!             clock.finish_beat();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// How often the clock beats and how much of each interval the chores may
/// use before a warning is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockConfig {
    pub interval: Duration,
    /// Fraction of `interval`, clamped to `0.0..=1.0`.
    pub work_budget: f64,
}

impl ClockConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_WORK_BUDGET: f64 = 0.8;

    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            work_budget: Self::DEFAULT_WORK_BUDGET,
        }
    }

    /// Replaces a zero interval with the default and clamps the budget.
    pub fn validated(mut self) -> Self {
        if self.interval.is_zero() {
            warn!("zone clock interval is zero, using default");
            self.interval = Self::DEFAULT_INTERVAL;
        }
        if !self.work_budget.is_finite() {
            self.work_budget = Self::DEFAULT_WORK_BUDGET;
        }
        self.work_budget = self.work_budget.clamp(0.0, 1.0);
        self
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::every(Self::DEFAULT_INTERVAL)
    }
}

/// One beat of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    /// 1 for the first beat.
    pub number: u64,
    /// The wakeup came more than a tenth of an interval after it was due.
    pub late: bool,
    /// Whole intervals that passed unobserved.
    pub skipped: u64,
}

/// Running totals since the clock was created.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClockStats {
    pub beats: u64,
    pub late_beats: u64,
    pub skipped: u64,
    pub slowest_work: Duration,
    /// Work time of the last finished beat as a fraction of the interval.
    pub last_load: f64,
}

#[derive(Debug)]
pub struct ZoneClock {
    config: ClockConfig,
    due: TokioInstant,
    work_started: Option<Instant>,
    stats: ClockStats,
}

impl ZoneClock {
    /// The first beat is due one interval from now.
    pub fn new(config: ClockConfig) -> Self {
        let config = config.validated();
        debug!(interval_ms = config.interval.as_millis() as u64, "zone clock started");
        Self {
            due: TokioInstant::now() + config.interval,
            config,
            work_started: None,
            stats: ClockStats::default(),
        }
    }

    /// Sleeps until the next beat is due and starts timing its work.
    pub async fn next_beat(&mut self) -> Beat {
        time::sleep_until(self.due).await;

        let woke = TokioInstant::now();
        let interval = self.config.interval;
        let lag = woke.saturating_duration_since(self.due);
        let late = lag > interval / 10;
        let skipped = if late {
            (lag.as_nanos() / interval.as_nanos()) as u64
        } else {
            0
        };

        self.stats.beats += 1;
        self.stats.skipped += skipped;
        if late {
            self.stats.late_beats += 1;
        }
        if skipped > 0 {
            warn!(
                beat = self.stats.beats,
                skipped,
                lag_ms = lag.as_millis() as u64,
                "zone clock fell behind"
            );
        }

        self.due = woke + interval;
        self.work_started = Some(Instant::now());
        trace!(beat = self.stats.beats, late, "beat");
        Beat {
            number: self.stats.beats,
            late,
            skipped,
        }
    }

    /// Stops timing the current beat's work. A no-op if no beat is open.
    pub fn finish_beat(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let worked = started.elapsed();
        let load = worked.as_secs_f64() / self.config.interval.as_secs_f64();
        self.stats.last_load = load;
        self.stats.slowest_work = self.stats.slowest_work.max(worked);

        if load >= self.config.work_budget {
            warn!(
                beat = self.stats.beats,
                worked_ms = worked.as_millis() as u64,
                interval_ms = self.config.interval.as_millis() as u64,
                "zone chores used most of the beat"
            );
        }
    }

    pub fn beats(&self) -> u64 {
        self.stats.beats
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn stats(&self) -> ClockStats {
        self.stats
    }
}
