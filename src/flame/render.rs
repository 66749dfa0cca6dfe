use egui::{pos2, vec2, Align2, Color32, Pos2, Rect, Vec2};

use super::{HitMap, Surface, Viewport};
use crate::callstack::CallStackEntry;
use crate::config::FlameConfig;
use crate::themes::colorhash::flame_color;
use crate::time::Timestamp;

/// One drawn call-stack entry.
#[derive(Clone, Debug, PartialEq)]
pub struct FlameRect {
    pub rect: Rect,
    /// Index into the entry slice the scene was rendered from.
    pub index: usize,
    pub label: Option<String>,
    pub fill: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AxisTick {
    pub x: f32,
    pub time: Timestamp,
    pub label: String,
    pub align: Align2,
}

/// Everything needed to paint one frame of the flame graph.
#[derive(Clone, Debug, Default)]
pub struct FlameScene {
    pub size: Vec2,
    pub rects: Vec<FlameRect>,
    /// Top edge of the axis strip.
    pub axis_top: f32,
    pub axis: Vec<AxisTick>,
    pub hit_map: HitMap,
}

impl FlameScene {
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty() && self.axis.is_empty()
    }

    /// Entry index under a point relative to the scene origin.
    pub fn hit_test(&self, pos: Pos2) -> Option<usize> {
        self.hit_map.hit_test(pos)
    }
}

/// Lays out the entries visible through `viewport` on `surface`.
///
/// Entries are drawn in slice order so deeper frames listed later paint over
/// their parents. Axis labels are relative to `global_start`.
pub fn render(
    entries: &[CallStackEntry],
    viewport: &Viewport,
    surface: &Surface,
    global_start: Timestamp,
    config: &FlameConfig,
) -> FlameScene {
    let _span = tracing::debug_span!("flame_render", entries = entries.len()).entered();

    let mut scene = FlameScene {
        size: surface.size(),
        axis_top: surface.height - config.axis_height,
        ..FlameScene::default()
    };
    if entries.is_empty() || surface.width <= 0.0 {
        return scene;
    }

    let visible_end = viewport.visible_end(surface.width);
    let height = config.row_height - config.row_gap;
    for (index, entry) in entries.iter().enumerate() {
        if entry.end_time < viewport.offset || entry.start_time > visible_end {
            continue;
        }
        let raw = (entry.duration().as_f64() * viewport.zoom) as f32;
        let width = raw.max(config.min_rect_px);
        if width < config.cull_px {
            continue;
        }
        let rect = Rect::from_min_size(
            pos2(viewport.x_of(entry.start_time), entry.depth as f32 * config.row_height),
            vec2(width, height),
        );
        scene.hit_map.insert(rect, index);
        scene.rects.push(FlameRect {
            rect,
            index,
            label: (width > config.label_min_px).then(|| entry.display_name().into_owned()),
            fill: flame_color(&entry.func_name, entry.depth),
        });
    }

    scene.axis = axis_ticks(viewport, surface, global_start, config);
    log::trace!(
        "flame scene: {} of {} entries drawn",
        scene.rects.len(),
        entries.len()
    );
    scene
}

fn axis_ticks(
    viewport: &Viewport,
    surface: &Surface,
    global_start: Timestamp,
    config: &FlameConfig,
) -> Vec<AxisTick> {
    let intervals = config.axis_intervals.max(1);
    let step = surface.width / intervals as f32;
    (0..=intervals)
        .map(|i| {
            let x = step * i as f32;
            let time = viewport.time_at(x);
            let align = match i {
                0 => Align2::LEFT_TOP,
                i if i == intervals => Align2::RIGHT_TOP,
                _ => Align2::CENTER_TOP,
            };
            AxisTick {
                x,
                time,
                label: format_axis_seconds(time - global_start, config.units_per_second),
                align,
            }
        })
        .collect()
}

/// `+0.0123s` style label; non-negative values carry an explicit plus sign.
pub fn format_axis_seconds(delta: Timestamp, units_per_second: u64) -> String {
    let seconds = delta.as_f64() / units_per_second.max(1) as f64;
    let sign = if seconds >= 0.0 { "+" } else { "" };
    format!("{sign}{seconds:.4}s")
}
