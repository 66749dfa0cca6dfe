//! Two-tier refresh for the live execution graph.
//!
//! Correlation is memoized on the event log generation; windowing runs on a
//! fixed tick so the view keeps sliding when nothing arrives.

use std::time::Duration;

use crate::config::WindowConfig;
use crate::dataflow::Memo;
use crate::ingest::EventLog;
use crate::time::Timestamp;
use crate::timeline::{correlate, window, ColorAssignment, CoreLanes, Correlation};

#[derive(Debug, Default)]
pub struct LiveTimeline {
    config: WindowConfig,
    correlation: Memo<Correlation>,
    lanes: CoreLanes,
    last_tick: Option<Timestamp>,
    correlations: usize,
    windows: usize,
}

impl LiveTimeline {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Brings the lanes up to date for `now`. Returns true when they were
    /// recomputed.
    pub fn update(&mut self, log: &EventLog, now: Timestamp) -> bool {
        let config = &self.config;
        let (_, correlated) = self
            .correlation
            .refresh(log.state(), |events| correlate(events, config));
        if correlated {
            self.correlations += 1;
        }

        let tick_due = match self.last_tick {
            None => true,
            Some(last) => now < last || now - last >= self.config.refresh_interval(),
        };
        if !(correlated || tick_due) {
            return false;
        }

        let segments = self
            .correlation
            .ready()
            .map(|c| c.segments.as_slice())
            .unwrap_or(&[]);
        self.lanes = window(segments, now, &self.config);
        self.last_tick = Some(now);
        self.windows += 1;
        true
    }

    pub fn lanes(&self) -> &CoreLanes {
        &self.lanes
    }

    pub fn colors(&self) -> Option<&ColorAssignment> {
        self.correlation.ready().map(|c| &c.colors)
    }

    /// Time until the next window tick is due.
    pub fn next_tick_in(&self, now: Timestamp) -> Duration {
        let interval = self.config.refresh_interval();
        let remaining = match self.last_tick {
            Some(last) if now >= last => (interval - (now - last)).max(Timestamp::ZERO),
            _ => Timestamp::ZERO,
        };
        Duration::from_millis(u64::try_from(remaining.get()).unwrap_or(0))
    }

    /// How many times correlation and windowing have run.
    pub fn pass_counts(&self) -> (usize, usize) {
        (self.correlations, self.windows)
    }
}
