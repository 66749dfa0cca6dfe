// Preludes: re-export commonly used items for convenience
pub use crate::callstack::{build_call_stacks, CallStackEntry, CallStacks, CoreSelection};
pub use crate::config::{Config, DuplicateEnterPolicy, FlameConfig, WindowConfig};
pub use crate::error::{ConfigError, DecodeError, PlaybackError};
pub use crate::event::{CoreId, TraceEvent, TrackedTraceEvent};
pub use crate::flame::{bounds, render, FlameScene, NavCommand, Surface, Viewport};
pub use crate::ingest::{Clock, EventLog, Ingestor, RestartNotice, SystemClock};
pub use crate::live::LiveTimeline;
pub use crate::time::Timestamp;
pub use crate::timeline::{correlate, window, CoreLanes, Segment};
pub use crate::widgets::{ExecutionGraph, FlameGraph};
