//! The ingestion boundary: decoded records in, stamped events out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::dataflow::{Dependency, NotifiedState};
use crate::error::DecodeError;
use crate::event::{CoreId, TraceEvent, TrackedTraceEvent};
use crate::time::Timestamp;

/// Source of wall-clock receipt times in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Timestamp::new(ms as i128)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self(AtomicI64::new(start_ms))
    }

    pub fn set(&self, ms: i64) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        Timestamp::from(self.0.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> Timestamp {
        (**self).now_ms()
    }
}

/// Append-only log of every event received so far.
#[derive(Debug, Default)]
pub struct EventLog {
    events: NotifiedState<Vec<TrackedTraceEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TrackedTraceEvent) {
        self.events.update(|events| events.push(event));
    }

    pub fn extend(&mut self, batch: impl IntoIterator<Item = TrackedTraceEvent>) {
        self.events.update(|events| events.extend(batch));
    }

    /// Drops everything; counts as a new generation.
    pub fn clear(&mut self) {
        self.events.update(Vec::clear);
    }

    pub fn events(&self) -> &[TrackedTraceEvent] {
        self.events.as_slice()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn generation(&self) -> usize {
        self.events.generation()
    }

    pub fn state(&self) -> &NotifiedState<Vec<TrackedTraceEvent>> {
        &self.events
    }
}

/// A restart seen for the first time; shown to the user once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestartNotice {
    pub core_id: CoreId,
    pub reason: String,
    pub packet_id: String,
    pub received_at: Timestamp,
}

pub struct Ingestor<C: Clock> {
    log: Arc<RwLock<EventLog>>,
    clock: C,
    notified: HashSet<String>,
}

impl<C: Clock> Ingestor<C> {
    pub fn new(clock: C) -> Self {
        Self::with_log(Arc::new(RwLock::new(EventLog::new())), clock)
    }

    pub fn with_log(log: Arc<RwLock<EventLog>>, clock: C) -> Self {
        Self {
            log,
            clock,
            notified: HashSet::new(),
        }
    }

    pub fn log(&self) -> Arc<RwLock<EventLog>> {
        self.log.clone()
    }

    /// Stamps and appends one event.
    pub fn ingest(&mut self, event: TraceEvent) -> Option<RestartNotice> {
        let received_at = self.clock.now_ms();
        let notice = match &event {
            TraceEvent::Restart(restart) if self.notified.insert(restart.packet_id.clone()) => {
                log::info!(
                    "core {} restarted: {}",
                    restart.core_id,
                    restart.restart_reason
                );
                Some(RestartNotice {
                    core_id: restart.core_id,
                    reason: restart.restart_reason.clone(),
                    packet_id: restart.packet_id.clone(),
                    received_at,
                })
            }
            TraceEvent::Restart(restart) => {
                log::debug!("duplicate restart packet {}", restart.packet_id);
                None
            }
            TraceEvent::Enter(_) | TraceEvent::Exit(_) | TraceEvent::Panic(_) => None,
        };
        self.log
            .write()
            .push(TrackedTraceEvent::new(event, received_at));
        notice
    }

    /// Decodes one JSON line and ingests it. Blank lines are skipped.
    pub fn ingest_json(&mut self, line: &str) -> Result<Option<RestartNotice>, DecodeError> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let event = TraceEvent::from_json(line)?;
        Ok(self.ingest(event))
    }
}
