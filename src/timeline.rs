//! Windowed execution timeline.
//!
//! [`correlate`] pairs Enter/Exit records by receipt time into call
//! [`Segment`]s; [`window`] clips those segments to the trailing window ending
//! at "now" and groups them into per-core lanes. Both are pure: the live view
//! reruns `correlate` when the event log changes and `window` on every tick.

use std::collections::{BTreeMap, HashMap};

use crate::config::{DuplicateEnterPolicy, WindowConfig};
use crate::event::{CoreId, CorrelationKey, TraceEvent, TrackedTraceEvent, RESTART_LANE};
use crate::themes::colorhash::FUNCTION_PALETTE;
use crate::time::Timestamp;

pub const PANIC_LABEL: &str = "PANIC";
pub const RESTART_LABEL: &str = "RESTART";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Exit,
    Panic,
    Restart,
}

/// How a segment is colored: a slot in the function palette or one of the
/// fixed marker colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorKey {
    Function(usize),
    Panic,
    Restart,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub core_id: CoreId,
    pub func_name: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub kind: SegmentKind,
    pub color: ColorKey,
}

impl Segment {
    pub fn duration(&self) -> Timestamp {
        self.end - self.start
    }
}

/// Function name to palette slot, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorAssignment {
    order: Vec<String>,
    slots: HashMap<String, usize>,
}

impl ColorAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, name: &str) -> ColorKey {
        if let Some(&slot) = self.slots.get(name) {
            return ColorKey::Function(slot);
        }
        let slot = self.order.len() % FUNCTION_PALETTE.len();
        self.order.push(name.to_owned());
        self.slots.insert(name.to_owned(), slot);
        ColorKey::Function(slot)
    }

    pub fn get(&self, name: &str) -> Option<ColorKey> {
        self.slots.get(name).map(|&slot| ColorKey::Function(slot))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Legend entries in first-seen order.
    pub fn legend(&self) -> impl Iterator<Item = (&str, ColorKey)> + '_ {
        self.order
            .iter()
            .map(|name| (name.as_str(), ColorKey::Function(self.slots[name])))
    }
}

/// Output of one correlation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Correlation {
    pub segments: Vec<Segment>,
    pub colors: ColorAssignment,
}

/// Pairs Enter/Exit records into segments.
///
/// The input does not need to be ordered; a copy is stably sorted by receipt
/// time first, since arrival order over a channel is not reliable.
pub fn correlate(events: &[TrackedTraceEvent], config: &WindowConfig) -> Correlation {
    let _span = tracing::debug_span!("correlate", events = events.len()).entered();

    let mut sorted: Vec<&TrackedTraceEvent> = events.iter().collect();
    sorted.sort_by_key(|event| event.received_at);

    let min_segment = config.min_segment();
    let mut open: HashMap<CorrelationKey, &TrackedTraceEvent> = HashMap::new();
    let mut out = Correlation::default();

    for tracked in sorted {
        match &tracked.event {
            TraceEvent::Enter(enter) => {
                let key = CorrelationKey::new(enter.core_id, enter.trace_id, enter.func_call_id);
                match config.duplicate_enter {
                    DuplicateEnterPolicy::Replace => {
                        if open.insert(key, tracked).is_some() {
                            log::trace!("enter {key:?} replaced an open call");
                        }
                    }
                    DuplicateEnterPolicy::KeepFirst => {
                        open.entry(key).or_insert(tracked);
                    }
                }
            }
            TraceEvent::Exit(exit) => {
                let key = CorrelationKey::new(exit.core_id, exit.trace_id, exit.func_call_id);
                let start = match open.remove(&key) {
                    Some(enter) => enter.received_at,
                    None => {
                        log::debug!("exit {key:?} has no open enter; using its arrival time");
                        tracked.received_at
                    }
                };
                let color = out.colors.assign(&exit.func_name);
                out.segments.push(Segment {
                    core_id: exit.core_id,
                    func_name: exit.func_name.clone(),
                    start,
                    end: tracked.received_at.max(start),
                    kind: SegmentKind::Exit,
                    color,
                });
            }
            TraceEvent::Panic(panic) => out.segments.push(Segment {
                core_id: panic.core_id,
                func_name: PANIC_LABEL.to_owned(),
                start: tracked.received_at,
                end: tracked.received_at + min_segment,
                kind: SegmentKind::Panic,
                color: ColorKey::Panic,
            }),
            TraceEvent::Restart(_) => out.segments.push(Segment {
                core_id: RESTART_LANE,
                func_name: RESTART_LABEL.to_owned(),
                start: tracked.received_at,
                end: tracked.received_at + min_segment,
                kind: SegmentKind::Restart,
                color: ColorKey::Restart,
            }),
        }
    }

    out
}

/// Segments clipped to a window, one lane per core in ascending core order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreLanes {
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub lanes: BTreeMap<CoreId, Vec<Segment>>,
}

impl CoreLanes {
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn lane(&self, core_id: CoreId) -> &[Segment] {
        self.lanes.get(&core_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn duration(&self) -> Timestamp {
        self.window_end - self.window_start
    }

    /// `intervals + 1` evenly spaced axis positions across the window, as a
    /// fraction of its width, labelled with their offset from the window end.
    pub fn ticks(&self, intervals: u32) -> Vec<WindowTick> {
        let intervals = intervals.max(1);
        let span = self.duration().as_f64();
        (0..=intervals)
            .map(|i| {
                let fraction = i as f64 / intervals as f64;
                let before_end = span * (1.0 - fraction);
                let label = if before_end <= 0.0 {
                    "now".to_owned()
                } else {
                    format!("-{:.1}s", before_end / 1_000.0)
                };
                WindowTick { fraction, label }
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowTick {
    pub fraction: f64,
    pub label: String,
}

/// Clips `segments` to `[now - window_ms, now]` and groups them by core.
///
/// Every surviving segment is at least `min_segment_ms` wide, so very short
/// calls and calls cut at a window edge stay visible.
pub fn window(segments: &[Segment], now: Timestamp, config: &WindowConfig) -> CoreLanes {
    let window_start = now - config.window();
    let min_segment = config.min_segment();
    let mut lanes: BTreeMap<CoreId, Vec<Segment>> = BTreeMap::new();

    for segment in segments {
        if segment.end < window_start || segment.start > now {
            continue;
        }
        let start = segment.start.max(window_start);
        let end = (start + min_segment).max(segment.end.min(now));
        lanes.entry(segment.core_id).or_default().push(Segment {
            start,
            end,
            ..segment.clone()
        });
    }

    for lane in lanes.values_mut() {
        lane.sort_by_key(|segment| segment.start);
    }

    CoreLanes {
        window_start,
        window_end: now,
        lanes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Enter, Exit, Panic, Restart};
    use rstest::rstest;

    fn ts(v: i128) -> Timestamp {
        Timestamp::new(v)
    }

    fn enter(core: CoreId, call: u32, name: &str, at: i128) -> TrackedTraceEvent {
        TrackedTraceEvent::new(
            TraceEvent::Enter(Enter {
                core_id: core,
                timestamp: ts(at),
                trace_id: 1,
                func_call_id: call,
                arg_count: 0,
                func_args: Vec::new(),
                func_name: name.to_owned(),
                packet_id: format!("en-{core}-{call}-{at}"),
            }),
            ts(at),
        )
    }

    fn exit(core: CoreId, call: u32, name: &str, at: i128) -> TrackedTraceEvent {
        TrackedTraceEvent::new(
            TraceEvent::Exit(Exit {
                core_id: core,
                timestamp: ts(at),
                trace_id: 1,
                func_call_id: call,
                return_val: 0,
                func_name: name.to_owned(),
                packet_id: format!("ex-{core}-{call}-{at}"),
            }),
            ts(at),
        )
    }

    fn segment(core: CoreId, start: i128, end: i128) -> Segment {
        Segment {
            core_id: core,
            func_name: "f".to_owned(),
            start: ts(start),
            end: ts(end),
            kind: SegmentKind::Exit,
            color: ColorKey::Function(0),
        }
    }

    #[test]
    fn pairs_enter_with_exit() {
        let events = [enter(0, 1, "f", 10), exit(0, 1, "f", 50)];
        let out = correlate(&events, &WindowConfig::default());
        assert_eq!(out.segments.len(), 1);
        let seg = &out.segments[0];
        assert_eq!((seg.start, seg.end, seg.kind), (ts(10), ts(50), SegmentKind::Exit));
    }

    #[test]
    fn unmatched_exit_is_zero_length_at_arrival() {
        let out = correlate(&[exit(2, 9, "orphan", 70)], &WindowConfig::default());
        let seg = &out.segments[0];
        assert_eq!((seg.start, seg.end), (ts(70), ts(70)));
        assert_eq!(seg.core_id, 2);
    }

    #[test]
    fn input_order_does_not_matter() {
        let ordered = [enter(0, 1, "f", 10), exit(0, 1, "f", 50)];
        let shuffled = [exit(0, 1, "f", 50), enter(0, 1, "f", 10)];
        let config = WindowConfig::default();
        assert_eq!(correlate(&ordered, &config), correlate(&shuffled, &config));
    }

    #[test]
    fn duplicate_enter_policy() {
        let events = [enter(0, 1, "f", 10), enter(0, 1, "f", 20), exit(0, 1, "f", 30)];

        let replace = correlate(&events, &WindowConfig::default());
        assert_eq!(replace.segments[0].start, ts(20));

        let keep_first = correlate(
            &events,
            &WindowConfig {
                duplicate_enter: DuplicateEnterPolicy::KeepFirst,
                ..WindowConfig::default()
            },
        );
        assert_eq!(keep_first.segments[0].start, ts(10));
    }

    #[test]
    fn markers_get_fixed_colors_and_minimum_width() {
        let panic = TrackedTraceEvent::new(
            TraceEvent::Panic(Panic {
                core_id: 1,
                timestamp: ts(0),
                trace_id: 1,
                func_call_id: 1,
                faulting_pc: 0x4000,
                exception_reason: "IllegalInstruction".to_owned(),
                packet_id: "p".to_owned(),
            }),
            ts(100),
        );
        let restart = TrackedTraceEvent::new(
            TraceEvent::Restart(Restart {
                core_id: 0,
                timestamp: ts(0),
                restart_reason: "wdt".to_owned(),
                packet_id: "r".to_owned(),
            }),
            ts(200),
        );
        let out = correlate(&[panic, restart], &WindowConfig::default());
        assert_eq!(out.segments[0].core_id, 1);
        assert_eq!(out.segments[0].color, ColorKey::Panic);
        assert_eq!(out.segments[0].duration(), ts(30));
        assert_eq!(out.segments[1].core_id, RESTART_LANE);
        assert_eq!(out.segments[1].func_name, RESTART_LABEL);
        assert!(out.colors.is_empty());
    }

    #[test]
    fn colors_follow_first_seen_order_and_wrap() {
        let mut events = Vec::new();
        for i in 0..(FUNCTION_PALETTE.len() as u32 + 1) {
            let at = i as i128 * 10;
            events.push(enter(0, i, &format!("fn{i}"), at));
            events.push(exit(0, i, &format!("fn{i}"), at + 5));
        }
        events.push(exit(0, 99, "fn1", 500));

        let out = correlate(&events, &WindowConfig::default());
        assert_eq!(out.colors.get("fn0"), Some(ColorKey::Function(0)));
        assert_eq!(out.colors.get("fn1"), Some(ColorKey::Function(1)));
        let wrapped = format!("fn{}", FUNCTION_PALETTE.len());
        assert_eq!(out.colors.get(&wrapped), Some(ColorKey::Function(0)));
        assert_eq!(out.segments.last().unwrap().color, ColorKey::Function(1));
        let legend: Vec<_> = out.colors.legend().map(|(name, _)| name).collect();
        assert_eq!(legend[0], "fn0");
        assert_eq!(legend.len(), FUNCTION_PALETTE.len() + 1);
    }

    #[test]
    fn correlate_is_idempotent() {
        let events = [
            enter(0, 1, "a", 0),
            enter(1, 1, "b", 3),
            exit(1, 1, "b", 9),
            exit(0, 1, "a", 12),
            exit(0, 4, "c", 14),
        ];
        let config = WindowConfig::default();
        assert_eq!(correlate(&events, &config), correlate(&events, &config));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let config = WindowConfig::default();
        let out = correlate(&[], &config);
        assert!(out.segments.is_empty());
        let lanes = window(&out.segments, ts(10_000), &config);
        assert!(lanes.is_empty());
        assert_eq!(lanes.window_start, ts(8_000));
    }

    #[test]
    fn short_segment_expands_to_minimum() {
        let lanes = window(&[segment(0, 9_000, 9_005)], ts(10_000), &WindowConfig::default());
        let seg = &lanes.lane(0)[0];
        assert_eq!(seg.start, ts(9_000));
        assert_eq!(seg.duration(), ts(30));
    }

    #[rstest]
    #[case::entirely_before(7_000, 7_500, None)]
    #[case::straddles_start(7_500, 8_500, Some((8_000, 8_500)))]
    #[case::ends_on_boundary(7_900, 8_000, Some((8_000, 8_030)))]
    #[case::running_past_now(9_900, 12_000, Some((9_900, 10_000)))]
    #[case::starts_after_now(10_001, 10_100, None)]
    fn window_clipping(#[case] start: i128, #[case] end: i128, #[case] expected: Option<(i128, i128)>) {
        let lanes = window(&[segment(3, start, end)], ts(10_000), &WindowConfig::default());
        let got = lanes.lane(3).first().map(|s| (s.start.get(), s.end.get()));
        assert_eq!(got, expected);
    }

    #[test]
    fn lanes_are_grouped_and_sorted() {
        let segments = [segment(1, 9_500, 9_600), segment(0, 9_700, 9_800), segment(1, 9_100, 9_200)];
        let lanes = window(&segments, ts(10_000), &WindowConfig::default());
        let cores: Vec<_> = lanes.lanes.keys().copied().collect();
        assert_eq!(cores, vec![0, 1]);
        let starts: Vec<_> = lanes.lane(1).iter().map(|s| s.start.get()).collect();
        assert_eq!(starts, vec![9_100, 9_500]);
    }

    #[test]
    fn nested_calls_end_to_end() {
        let events = [
            enter(0, 1, "outer", 0),
            enter(0, 2, "inner", 5),
            exit(0, 2, "inner", 15),
            exit(0, 1, "outer", 40),
        ];
        let config = WindowConfig::default();
        let out = correlate(&events, &config);
        let spans: Vec<_> = out
            .segments
            .iter()
            .map(|s| (s.func_name.as_str(), s.kind, s.start.get(), s.end.get()))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("inner", SegmentKind::Exit, 5, 15),
                ("outer", SegmentKind::Exit, 0, 40),
            ]
        );

        // Both sit well inside the window, so starts are untouched; the
        // 10 ms inner call is widened to the visual minimum.
        let lanes = window(&out.segments, ts(100), &config);
        let laned: Vec<_> = lanes
            .lane(0)
            .iter()
            .map(|s| (s.func_name.as_str(), s.start.get(), s.end.get()))
            .collect();
        assert_eq!(laned, vec![("outer", 0, 40), ("inner", 5, 35)]);
    }

    #[test]
    fn ticks_span_the_window() {
        let lanes = window(&[], ts(10_000), &WindowConfig::default());
        let ticks = lanes.ticks(4);
        assert_eq!(ticks.len(), 5);
        assert_eq!(ticks[0].label, "-2.0s");
        assert_eq!(ticks[2].label, "-1.0s");
        assert_eq!(ticks[4].label, "now");
    }
}
