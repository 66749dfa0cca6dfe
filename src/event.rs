//! The trace event vocabulary shared by both pipelines.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::time::Timestamp;

/// Identifier of an execution core. Negative values are reserved for
/// synthetic lanes such as [`RESTART_LANE`].
pub type CoreId = i32;

/// Lane that restart markers are placed on; restarts are not tied to a core.
pub const RESTART_LANE: CoreId = -1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enter {
    pub core_id: CoreId,
    pub timestamp: Timestamp,
    pub trace_id: u32,
    pub func_call_id: u32,
    pub arg_count: u8,
    #[serde(default)]
    pub func_args: Vec<u32>,
    pub func_name: String,
    pub packet_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exit {
    pub core_id: CoreId,
    pub timestamp: Timestamp,
    pub trace_id: u32,
    pub func_call_id: u32,
    pub return_val: u32,
    pub func_name: String,
    pub packet_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panic {
    pub core_id: CoreId,
    pub timestamp: Timestamp,
    pub trace_id: u32,
    pub func_call_id: u32,
    #[serde(rename = "faultingPC")]
    pub faulting_pc: u32,
    pub exception_reason: String,
    pub packet_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restart {
    pub core_id: CoreId,
    pub timestamp: Timestamp,
    pub restart_reason: String,
    pub packet_id: String,
}

/// One decoded record from an execution core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Enter(Enter),
    Exit(Exit),
    Panic(Panic),
    Restart(Restart),
}

/// Numeric discriminant used on the wire (`traceType`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceKind {
    Enter = 0,
    Exit = 1,
    Panic = 2,
    Restart = 3,
}

impl TryFrom<u64> for TraceKind {
    type Error = DecodeError;

    fn try_from(value: u64) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(TraceKind::Enter),
            1 => Ok(TraceKind::Exit),
            2 => Ok(TraceKind::Panic),
            3 => Ok(TraceKind::Restart),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

impl TraceEvent {
    pub fn kind(&self) -> TraceKind {
        match self {
            TraceEvent::Enter(_) => TraceKind::Enter,
            TraceEvent::Exit(_) => TraceKind::Exit,
            TraceEvent::Panic(_) => TraceKind::Panic,
            TraceEvent::Restart(_) => TraceKind::Restart,
        }
    }

    pub fn core_id(&self) -> CoreId {
        match self {
            TraceEvent::Enter(e) => e.core_id,
            TraceEvent::Exit(e) => e.core_id,
            TraceEvent::Panic(e) => e.core_id,
            TraceEvent::Restart(e) => e.core_id,
        }
    }

    /// Device-reported timestamp. Not comparable with wall-clock time.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            TraceEvent::Enter(e) => e.timestamp,
            TraceEvent::Exit(e) => e.timestamp,
            TraceEvent::Panic(e) => e.timestamp,
            TraceEvent::Restart(e) => e.timestamp,
        }
    }

    pub fn packet_id(&self) -> &str {
        match self {
            TraceEvent::Enter(e) => &e.packet_id,
            TraceEvent::Exit(e) => &e.packet_id,
            TraceEvent::Panic(e) => &e.packet_id,
            TraceEvent::Restart(e) => &e.packet_id,
        }
    }

    /// The activation this event belongs to, if it belongs to one at all.
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        match self {
            TraceEvent::Enter(e) => Some(CorrelationKey::new(e.core_id, e.trace_id, e.func_call_id)),
            TraceEvent::Exit(e) => Some(CorrelationKey::new(e.core_id, e.trace_id, e.func_call_id)),
            TraceEvent::Panic(e) => Some(CorrelationKey::new(e.core_id, e.trace_id, e.func_call_id)),
            TraceEvent::Restart(_) => None,
        }
    }

    /// Decodes one JSON record.
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, DecodeError> {
        let kind = value
            .get("traceType")
            .ok_or(DecodeError::MissingKind)?
            .as_u64()
            .ok_or(DecodeError::MissingKind)?;
        let event = match TraceKind::try_from(kind)? {
            TraceKind::Enter => TraceEvent::Enter(serde_json::from_value(value)?),
            TraceKind::Exit => TraceEvent::Exit(serde_json::from_value(value)?),
            TraceKind::Panic => TraceEvent::Panic(serde_json::from_value(value)?),
            TraceKind::Restart => TraceEvent::Restart(serde_json::from_value(value)?),
        };
        Ok(event)
    }

    pub fn to_value(&self) -> serde_json::Value {
        let (kind, body) = match self {
            TraceEvent::Enter(e) => (TraceKind::Enter, serde_json::to_value(e)),
            TraceEvent::Exit(e) => (TraceKind::Exit, serde_json::to_value(e)),
            TraceEvent::Panic(e) => (TraceKind::Panic, serde_json::to_value(e)),
            TraceEvent::Restart(e) => (TraceKind::Restart, serde_json::to_value(e)),
        };
        let mut body = body.unwrap_or(serde_json::Value::Null);
        if let Some(map) = body.as_object_mut() {
            map.insert("traceType".to_owned(), serde_json::Value::from(kind as u64));
        }
        body
    }
}

/// A trace event stamped with the wall-clock time (ms) it was received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedTraceEvent {
    pub event: TraceEvent,
    pub received_at: Timestamp,
}

impl TrackedTraceEvent {
    pub fn new(event: TraceEvent, received_at: Timestamp) -> Self {
        Self { event, received_at }
    }
}

/// Identifies one call activation across its Enter/Exit pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey {
    pub core_id: CoreId,
    pub trace_id: u32,
    pub func_call_id: u32,
}

impl CorrelationKey {
    pub fn new(core_id: CoreId, trace_id: u32, func_call_id: u32) -> Self {
        Self {
            core_id,
            trace_id,
            func_call_id,
        }
    }
}

/// Removes the NUL padding fixed-width device name fields carry.
pub fn strip_nul(name: &str) -> std::borrow::Cow<'_, str> {
    if name.contains('\0') {
        std::borrow::Cow::Owned(name.replace('\0', ""))
    } else {
        std::borrow::Cow::Borrowed(name)
    }
}
