//! Pre-correlated call stacks for the flame graph.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;
use crate::event::{strip_nul, CoreId, CorrelationKey, TraceEvent, TrackedTraceEvent};
use crate::time::Timestamp;

/// One function activation with its nesting depth. `end_time >= start_time`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStackEntry {
    pub func_name: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub depth: u32,
    #[serde(default)]
    pub arg_count: u8,
    #[serde(default)]
    pub func_args: Vec<u32>,
    #[serde(default)]
    pub return_val: Option<u32>,
    #[serde(default)]
    pub core_id: CoreId,
}

impl CallStackEntry {
    pub fn duration(&self) -> Timestamp {
        self.end_time - self.start_time
    }

    pub fn display_name(&self) -> std::borrow::Cow<'_, str> {
        strip_nul(&self.func_name)
    }

    /// The first `arg_count` arguments.
    pub fn args(&self) -> &[u32] {
        let count = usize::from(self.arg_count).min(self.func_args.len());
        &self.func_args[..count]
    }
}

/// Which cores the flame graph shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoreSelection {
    #[default]
    All,
    Core(CoreId),
}

impl fmt::Display for CoreSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreSelection::All => f.write_str("All cores"),
            CoreSelection::Core(id) => write!(f, "Core {id}"),
        }
    }
}

/// Call-stack entries per core, each list ordered by start time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallStacks {
    per_core: BTreeMap<CoreId, Vec<CallStackEntry>>,
}

impl CallStacks {
    pub fn from_entries(entries: impl IntoIterator<Item = CallStackEntry>) -> Self {
        let mut per_core: BTreeMap<CoreId, Vec<CallStackEntry>> = BTreeMap::new();
        for entry in entries {
            per_core.entry(entry.core_id).or_default().push(entry);
        }
        for entries in per_core.values_mut() {
            sort_entries(entries);
        }
        Self { per_core }
    }

    /// Loads a JSON array of entries, rejecting any that end before they start.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PlaybackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: Vec<CallStackEntry> =
            serde_json::from_str(&text).map_err(|source| PlaybackError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(index) = entries.iter().position(|e| e.end_time < e.start_time) {
            return Err(PlaybackError::Inverted { index });
        }
        Ok(Self::from_entries(entries))
    }

    pub fn is_empty(&self) -> bool {
        self.per_core.values().all(Vec::is_empty)
    }

    pub fn cores(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.per_core.keys().copied()
    }

    /// Choices for the core picker: one per core, plus `All` when there is
    /// more than one.
    pub fn options(&self) -> Vec<CoreSelection> {
        let mut options: Vec<_> = self.cores().map(CoreSelection::Core).collect();
        if options.len() > 1 {
            options.push(CoreSelection::All);
        }
        options
    }

    /// The entries for `selection`, ordered by start time.
    pub fn select(&self, selection: CoreSelection) -> Vec<CallStackEntry> {
        match selection {
            CoreSelection::Core(id) => self.per_core.get(&id).cloned().unwrap_or_default(),
            CoreSelection::All => {
                let mut all: Vec<_> = self.per_core.values().flatten().cloned().collect();
                sort_entries(&mut all);
                all
            }
        }
    }
}

fn sort_entries(entries: &mut [CallStackEntry]) {
    entries.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.depth.cmp(&b.depth))
    });
}

struct OpenFrame {
    key: CorrelationKey,
    entry: CallStackEntry,
}

/// Replays the event log on device time into nested call stacks.
pub fn build_call_stacks(events: &[TrackedTraceEvent]) -> CallStacks {
    let _span = tracing::debug_span!("build_call_stacks", events = events.len()).entered();

    let mut sorted: Vec<&TraceEvent> = events.iter().map(|t| &t.event).collect();
    sorted.sort_by_key(|event| event.timestamp());

    let mut stacks: BTreeMap<CoreId, Vec<OpenFrame>> = BTreeMap::new();
    let mut last_seen: BTreeMap<CoreId, Timestamp> = BTreeMap::new();
    let mut done: Vec<CallStackEntry> = Vec::new();

    fn close(frame: OpenFrame, at: Timestamp, done: &mut Vec<CallStackEntry>) {
        let mut entry = frame.entry;
        entry.end_time = at.max(entry.start_time);
        done.push(entry);
    }

    for event in sorted {
        let at = event.timestamp();
        match event {
            TraceEvent::Enter(enter) => {
                last_seen.insert(enter.core_id, at);
                let stack = stacks.entry(enter.core_id).or_default();
                stack.push(OpenFrame {
                    key: CorrelationKey::new(enter.core_id, enter.trace_id, enter.func_call_id),
                    entry: CallStackEntry {
                        func_name: enter.func_name.clone(),
                        start_time: at,
                        end_time: at,
                        depth: stack.len() as u32,
                        arg_count: enter.arg_count,
                        func_args: enter.func_args.clone(),
                        return_val: None,
                        core_id: enter.core_id,
                    },
                });
            }
            TraceEvent::Exit(exit) => {
                last_seen.insert(exit.core_id, at);
                let key = CorrelationKey::new(exit.core_id, exit.trace_id, exit.func_call_id);
                let stack = stacks.entry(exit.core_id).or_default();
                let Some(pos) = stack.iter().rposition(|frame| frame.key == key) else {
                    log::debug!("exit {key:?} has no open frame; skipped");
                    continue;
                };
                while stack.len() > pos + 1 {
                    if let Some(frame) = stack.pop() {
                        log::debug!("frame {:?} closed by parent exit", frame.key);
                        close(frame, at, &mut done);
                    }
                }
                if let Some(mut frame) = stack.pop() {
                    frame.entry.return_val = Some(exit.return_val);
                    close(frame, at, &mut done);
                }
            }
            TraceEvent::Panic(panic) => {
                last_seen.insert(panic.core_id, at);
                if let Some(stack) = stacks.get_mut(&panic.core_id) {
                    for frame in stack.drain(..).rev() {
                        close(frame, at, &mut done);
                    }
                }
            }
            TraceEvent::Restart(_) => {
                for stack in stacks.values_mut() {
                    for frame in stack.drain(..).rev() {
                        close(frame, at, &mut done);
                    }
                }
            }
        }
    }

    for (core, stack) in stacks {
        let at = last_seen.get(&core).copied().unwrap_or_default();
        for frame in stack.into_iter().rev() {
            close(frame, at, &mut done);
        }
    }

    CallStacks::from_entries(done)
}

/// Tooltip contents for a hovered entry.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryDetails {
    pub name: String,
    pub depth: u32,
    pub duration_ms: f64,
    pub args: Option<String>,
    pub return_val: Option<u32>,
}

impl EntryDetails {
    pub fn of(entry: &CallStackEntry, units_per_second: u64) -> Self {
        let units_per_ms = units_per_second as f64 / 1_000.0;
        let args = entry.args();
        Self {
            name: entry.display_name().into_owned(),
            depth: entry.depth,
            duration_ms: entry.duration().as_f64() / units_per_ms,
            args: (!args.is_empty()).then(|| {
                let parts: Vec<String> = args.iter().map(u32::to_string).collect();
                format!("[{}]", parts.join(", "))
            }),
            return_val: entry.return_val,
        }
    }

    pub fn duration_label(&self) -> String {
        format!("{:.3} ms", self.duration_ms)
    }
}
