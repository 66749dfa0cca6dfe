//! Flame graph viewport engine: camera state, scene rendering and hit testing.
//!
//! Everything here is plain data in, plain data out. The egui widget in
//! [`crate::widgets::flame_graph`] owns a [`Viewport`] and a cached
//! [`FlameScene`] and only re-renders when something marks it dirty.

mod hit;
mod render;
mod viewport;

pub use hit::HitMap;
pub use render::{format_axis_seconds, render, AxisTick, FlameRect, FlameScene};
pub use viewport::{NavCommand, Surface, Viewport};

use crate::callstack::CallStackEntry;
use crate::time::Timestamp;

/// Time extent of a set of entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub start: Timestamp,
    pub end: Timestamp,
    pub duration: Timestamp,
}

/// Earliest start and latest end over `entries`; `None` when there are none.
pub fn bounds(entries: &[CallStackEntry]) -> Option<Bounds> {
    let start = entries.iter().map(|e| e.start_time).min()?;
    let end = entries.iter().map(|e| e.end_time).max()?;
    Some(Bounds {
        start,
        end,
        duration: end - start,
    })
}
