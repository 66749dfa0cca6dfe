use std::fs;
use std::sync::Arc;

use hermes_timeline::callstack::{build_call_stacks, CallStacks, CoreSelection};
use hermes_timeline::config::{Config, FlameConfig, WindowConfig};
use hermes_timeline::flame::{bounds, render, NavCommand, Surface, Viewport};
use hermes_timeline::ingest::{Ingestor, ManualClock};
use hermes_timeline::live::LiveTimeline;
use hermes_timeline::time::Timestamp;
use hermes_timeline::timeline::{correlate, SegmentKind};
use rstest::{fixture, rstest};
use tempfile::TempDir;

fn enter(call: u32, name: &str, at: u64) -> String {
    format!(
        r#"{{"traceType":0,"coreId":0,"timestamp":{at},"traceId":1,"funcCallId":{call},"argCount":1,"funcArgs":[{call},0,0,0],"funcName":"{name}\u0000\u0000","packetId":"en-{call}"}}"#
    )
}

fn exit(call: u32, name: &str, at: u64) -> String {
    format!(
        r#"{{"traceType":1,"coreId":0,"timestamp":{at},"traceId":1,"funcCallId":{call},"returnVal":{at},"funcName":"{name}","packetId":"ex-{call}"}}"#
    )
}

#[fixture]
fn nested() -> (Ingestor<Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let mut ingestor = Ingestor::new(clock.clone());
    for (at, line) in [
        (0, enter(1, "outer", 0)),
        (5, enter(2, "inner", 5)),
        (15, exit(2, "inner", 15)),
        (40, exit(1, "outer", 40)),
    ] {
        clock.set(at);
        ingestor.ingest_json(&line).unwrap();
    }
    (ingestor, clock)
}

#[rstest]
fn json_lines_correlate_into_nested_segments(nested: (Ingestor<Arc<ManualClock>>, Arc<ManualClock>)) {
    let (ingestor, _clock) = nested;
    let log = ingestor.log();
    let log = log.read();

    let correlation = correlate(log.events(), &WindowConfig::default());
    let spans: Vec<_> = correlation
        .segments
        .iter()
        .map(|s| (s.start.get(), s.end.get(), s.kind))
        .collect();
    assert_eq!(
        spans,
        vec![(5, 15, SegmentKind::Exit), (0, 40, SegmentKind::Exit)]
    );

    let mut live = LiveTimeline::new(WindowConfig::default());
    assert!(live.update(&log, Timestamp::new(100)));
    let lane = live.lanes().lane(0);
    assert_eq!(lane.len(), 2);
    assert_eq!((lane[0].start.get(), lane[0].end.get()), (0, 40));
    assert_eq!((lane[1].start.get(), lane[1].end.get()), (5, 35));
}

#[rstest]
fn captured_call_stacks_render_and_navigate(
    nested: (Ingestor<Arc<ManualClock>>, Arc<ManualClock>),
) {
    let (ingestor, _clock) = nested;
    let stacks = build_call_stacks(ingestor.log().read().events());
    assert_eq!(stacks.options(), vec![CoreSelection::Core(0)]);
    let entries = stacks.select(CoreSelection::Core(0));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].depth, 1);
    assert_eq!(entries[1].args(), &[2]);

    let config = FlameConfig::default();
    let surface = Surface::new(400.0, 200.0);
    let extent = bounds(&entries).unwrap();
    let mut viewport = Viewport::fit(&extent, surface.width, &config);
    let scene = render(&entries, &viewport, &surface, extent.start, &config);

    assert_eq!(scene.rects.len(), 2);
    assert_eq!(scene.axis.len(), 11);
    let outer = scene.rects.iter().find(|r| r.index == 0).unwrap();
    assert_eq!(outer.label.as_deref(), Some("outer"));
    assert_eq!(scene.hit_test(outer.rect.center()), Some(0));

    let before = viewport.center(surface.width);
    assert!(viewport.apply(NavCommand::ZoomIn, &entries, surface.width, &config));
    let drift = (viewport.center(surface.width) - before).get().abs();
    assert!(drift <= 1);
}

#[test]
fn playback_file_feeds_the_flame_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("playback.json");
    fs::write(
        &path,
        r#"[
            {"funcName":"boot","startTime":1000,"endTime":9000,"depth":0,"coreId":0},
            {"funcName":"init","startTime":1500,"endTime":4000,"depth":1,"coreId":0},
            {"funcName":"idle","startTime":2000,"endTime":8000,"depth":0,"coreId":1}
        ]"#,
    )
    .unwrap();

    let stacks = CallStacks::load(&path).unwrap();
    assert_eq!(
        stacks.options(),
        vec![
            CoreSelection::Core(0),
            CoreSelection::Core(1),
            CoreSelection::All
        ]
    );
    let all = stacks.select(CoreSelection::All);
    let names: Vec<_> = all.iter().map(|e| e.func_name.as_str()).collect();
    assert_eq!(names, vec!["boot", "init", "idle"]);

    let config = Config::default();
    let extent = bounds(&all).unwrap();
    assert_eq!(extent.duration, Timestamp::new(8_000));
    let viewport = Viewport::fit(&extent, 800.0, &config.flame);
    assert_eq!(viewport.offset, Timestamp::new(800));
}
