use egui::{Key, Vec2};

use super::Bounds;
use crate::callstack::CallStackEntry;
use crate::config::FlameConfig;
use crate::time::Timestamp;

/// Logical size of the drawing area plus its pixel density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
    pub pixels_per_point: f32,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            pixels_per_point: 1.0,
        }
    }
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn size(&self) -> Vec2 {
        egui::vec2(self.width, self.height)
    }

    /// Backing-store size in physical pixels.
    pub fn physical_size(&self) -> [u32; 2] {
        let scale = |v: f32| (v * self.pixels_per_point).round().max(0.0) as u32;
        [scale(self.width), scale(self.height)]
    }

    /// Adopts `size` and `pixels_per_point`; returns true only when the
    /// physical dimensions change.
    pub fn sync(&mut self, size: Vec2, pixels_per_point: f32) -> bool {
        let next = Surface {
            width: size.x.max(0.0),
            height: size.y.max(0.0),
            pixels_per_point,
        };
        if next.physical_size() == self.physical_size() {
            return false;
        }
        log::trace!("flame surface resized to {:?}", next.physical_size());
        *self = next;
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavCommand {
    PanLeft,
    PanRight,
    ZoomIn,
    ZoomOut,
    JumpPrevious,
    JumpNext,
}

impl NavCommand {
    /// A/D pan, W/S zoom, Q/E jump between entries.
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::A => Some(NavCommand::PanLeft),
            Key::D => Some(NavCommand::PanRight),
            Key::W => Some(NavCommand::ZoomIn),
            Key::S => Some(NavCommand::ZoomOut),
            Key::Q => Some(NavCommand::JumpPrevious),
            Key::E => Some(NavCommand::JumpNext),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragAnchor {
    x: f32,
    offset: Timestamp,
}

/// Camera over the time axis: `offset` is the time at the left edge, `zoom`
/// is pixels per time unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub offset: Timestamp,
    pub zoom: f64,
    drag: Option<DragAnchor>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Timestamp::ZERO,
            zoom: 1.0,
            drag: None,
        }
    }
}

impl Viewport {
    pub fn new(offset: Timestamp, zoom: f64) -> Self {
        Self {
            offset,
            zoom,
            drag: None,
        }
    }

    /// Frames `bounds` with a 2.5% margin on the left and 95% of the width used.
    pub fn fit(bounds: &Bounds, width: f32, config: &FlameConfig) -> Self {
        let duration = bounds.duration.max(Timestamp::ONE);
        let zoom = config.clamp_zoom(f64::from(width) / duration.as_f64() * 0.95);
        let d = duration.get();
        // floor(d * 25 / 1000) without the intermediate product.
        let margin = Timestamp::new(d / 1_000 * 25 + d % 1_000 * 25 / 1_000);
        Self::new(bounds.start - margin, zoom)
    }

    pub fn visible_duration(&self, width: f32) -> Timestamp {
        Timestamp::from_f64_floor(f64::from(width) / self.zoom)
    }

    pub fn visible_end(&self, width: f32) -> Timestamp {
        self.offset + self.visible_duration(width)
    }

    pub fn center(&self, width: f32) -> Timestamp {
        self.offset + self.visible_duration(width) / 2
    }

    /// Time under the horizontal pixel position `x`.
    pub fn time_at(&self, x: f32) -> Timestamp {
        self.offset + Timestamp::from_f64_floor(f64::from(x) / self.zoom)
    }

    /// Horizontal pixel position of `time`.
    pub fn x_of(&self, time: Timestamp) -> f32 {
        ((time - self.offset).as_f64() * self.zoom) as f32
    }

    /// Applies one navigation step. Returns true when the viewport moved.
    pub fn apply(
        &mut self,
        command: NavCommand,
        entries: &[CallStackEntry],
        width: f32,
        config: &FlameConfig,
    ) -> bool {
        let before = (self.offset, self.zoom);
        match command {
            NavCommand::PanLeft => {
                let step = self.pan_step(width, config);
                self.offset -= step;
            }
            NavCommand::PanRight => {
                let step = self.pan_step(width, config);
                self.offset += step;
            }
            NavCommand::ZoomIn => self.zoom_to(self.zoom * config.zoom_factor, width, config),
            NavCommand::ZoomOut => self.zoom_to(self.zoom / config.zoom_factor, width, config),
            NavCommand::JumpPrevious => {
                let center = self.center(width);
                if let Some(entry) = entries.iter().rev().find(|e| e.start_time < center) {
                    self.center_on(entry.start_time, width);
                }
            }
            NavCommand::JumpNext => {
                let center = self.center(width);
                if let Some(entry) = entries.iter().find(|e| e.start_time > center) {
                    self.center_on(entry.start_time, width);
                }
            }
        }
        let moved = before != (self.offset, self.zoom);
        if moved {
            log::trace!(
                "{command:?}: offset {} zoom {:.6}",
                self.offset,
                self.zoom
            );
        }
        moved
    }

    fn pan_step(&self, width: f32, config: &FlameConfig) -> Timestamp {
        Timestamp::from_f64_floor(self.visible_duration(width).as_f64() * config.pan_fraction)
    }

    fn zoom_to(&mut self, zoom: f64, width: f32, config: &FlameConfig) {
        let zoom = config.clamp_zoom(zoom);
        if zoom == self.zoom {
            return;
        }
        let center = self.center(width);
        self.zoom = zoom;
        self.offset = center - Timestamp::from_f64_floor(f64::from(width) / zoom / 2.0);
    }

    fn center_on(&mut self, target: Timestamp, width: f32) {
        self.offset = target - self.visible_duration(width) / 2;
    }

    pub fn begin_drag(&mut self, x: f32) {
        self.drag = Some(DragAnchor {
            x,
            offset: self.offset,
        });
    }

    /// Moves the view with the pointer. Returns true when the offset changed.
    pub fn drag_to(&mut self, x: f32) -> bool {
        let Some(anchor) = self.drag else {
            return false;
        };
        let offset = anchor.offset - Timestamp::from_f64_floor(f64::from(x - anchor.x) / self.zoom);
        let moved = offset != self.offset;
        self.offset = offset;
        moved
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flame::bounds;
    use crate::flame::fixtures::entry;
    use proptest::prelude::*;
    use rstest::rstest;

    fn t(v: i128) -> Timestamp {
        Timestamp::new(v)
    }

    #[test]
    fn fit_leaves_margin_and_uses_most_of_the_width() {
        let config = FlameConfig::default();
        let entries = [entry("a", 1_000, 11_000, 0)];
        let view = Viewport::fit(&bounds(&entries).unwrap(), 1_000.0, &config);
        assert!((view.zoom - 0.095).abs() < 1e-12);
        assert_eq!(view.offset, t(750));
    }

    #[test]
    fn fit_of_zero_duration_uses_one_unit() {
        let config = FlameConfig::default();
        let entries = [entry("blip", 500, 500, 0)];
        let view = Viewport::fit(&bounds(&entries).unwrap(), 10.0, &config);
        assert!((view.zoom - 9.5).abs() < 1e-9);
        assert_eq!(view.offset, t(500));
    }

    #[test]
    fn fit_of_near_max_duration_does_not_overflow() {
        let config = FlameConfig::default();
        let end = i128::MAX / 10;
        let entries = [entry("epoch", 0, end, 0)];
        let view = Viewport::fit(&bounds(&entries).unwrap(), 800.0, &config);
        assert_eq!(view.offset, t(-(end / 40)));
        assert_eq!(view.zoom, config.min_zoom);
    }

    #[test]
    fn fit_clamps_zoom() {
        let config = FlameConfig::default();
        let entries = [entry("huge", 0, 1_000_000_000_000, 0)];
        let view = Viewport::fit(&bounds(&entries).unwrap(), 100.0, &config);
        assert_eq!(view.zoom, config.min_zoom);
    }

    #[rstest]
    #[case(NavCommand::PanLeft, -150)]
    #[case(NavCommand::PanRight, 150)]
    fn pan_moves_by_fraction_of_visible_range(#[case] command: NavCommand, #[case] delta: i128) {
        let config = FlameConfig::default();
        let mut view = Viewport::new(t(0), 1.0);
        assert!(view.apply(command, &[], 1_000.0, &config));
        assert_eq!(view.offset, t(delta));
        assert_eq!(view.zoom, 1.0);
    }

    #[test]
    fn zoom_keeps_center() {
        let config = FlameConfig::default();
        let mut view = Viewport::new(t(0), 1.0);
        assert_eq!(view.center(1_000.0), t(500));
        view.apply(NavCommand::ZoomIn, &[], 1_000.0, &config);
        assert!((view.zoom - 1.2).abs() < 1e-12);
        assert_eq!(view.offset, t(500 - 416));
        assert_eq!(view.center(1_000.0), t(500));
    }

    #[test]
    fn zoom_at_limit_is_a_no_op() {
        let config = FlameConfig::default();
        let mut view = Viewport::new(t(0), config.max_zoom);
        assert!(!view.apply(NavCommand::ZoomIn, &[], 800.0, &config));
        assert_eq!(view, Viewport::new(t(0), config.max_zoom));
    }

    #[test]
    fn jumps_recenter_on_neighbouring_entries() {
        let config = FlameConfig::default();
        let entries = [entry("a", 100, 200, 0), entry("b", 600, 700, 0), entry("c", 900, 950, 1)];
        let mut view = Viewport::new(t(0), 1.0);

        view.apply(NavCommand::JumpNext, &entries, 100.0, &config);
        assert_eq!(view.center(100.0), t(100));
        view.apply(NavCommand::JumpNext, &entries, 100.0, &config);
        assert_eq!(view.center(100.0), t(600));
        view.apply(NavCommand::JumpPrevious, &entries, 100.0, &config);
        assert_eq!(view.center(100.0), t(100));
        assert!(!view.apply(NavCommand::JumpPrevious, &entries, 100.0, &config));
    }

    #[test]
    fn drag_follows_pointer_without_drift() {
        let mut view = Viewport::new(t(1_000), 0.5);
        assert!(!view.drag_to(10.0));
        view.begin_drag(100.0);
        for x in [110.0, 120.0, 130.0, 140.0] {
            view.drag_to(x);
        }
        assert_eq!(view.offset, t(920));
        view.drag_to(100.0);
        assert_eq!(view.offset, t(1_000));
        view.end_drag();
        assert!(!view.is_dragging());
    }

    #[test]
    fn surface_sync_reports_real_changes_only() {
        let mut surface = Surface::default();
        assert!(surface.sync(egui::vec2(300.0, 200.0), 2.0));
        assert_eq!(surface.physical_size(), [600, 400]);
        assert!(!surface.sync(egui::vec2(300.1, 200.0), 2.0));
        assert!(surface.sync(egui::vec2(300.0, 200.0), 1.0));
    }

    #[rstest]
    #[case(Key::A, Some(NavCommand::PanLeft))]
    #[case(Key::W, Some(NavCommand::ZoomIn))]
    #[case(Key::E, Some(NavCommand::JumpNext))]
    #[case(Key::X, None)]
    fn keys_map_to_commands(#[case] key: Key, #[case] expected: Option<NavCommand>) {
        assert_eq!(NavCommand::from_key(key), expected);
    }

    proptest! {
        #[test]
        fn zoom_preserves_center(
            offset in -1_000_000_000i64..1_000_000_000,
            zoom in 0.0001f64..50.0,
            width in 50.0f32..4_000.0,
            zoom_in in any::<bool>(),
        ) {
            let config = FlameConfig::default();
            let mut view = Viewport::new(Timestamp::from(offset), zoom);
            let before = view.center(width);
            let command = if zoom_in { NavCommand::ZoomIn } else { NavCommand::ZoomOut };
            view.apply(command, &[], width, &config);
            let drift = (view.center(width) - before).get().abs();
            prop_assert!(drift <= 1, "center drifted by {drift}");
        }

        #[test]
        fn jump_next_lands_on_smallest_later_start(
            mut starts in proptest::collection::vec(0i64..100_000, 0..40),
            offset in 0i64..100_000,
            forward in any::<bool>(),
        ) {
            starts.sort_unstable();
            let entries: Vec<_> = starts
                .iter()
                .map(|&s| entry("f", i128::from(s), i128::from(s) + 10, 0))
                .collect();
            let config = FlameConfig::default();
            let width = 200.0;
            let mut view = Viewport::new(Timestamp::from(offset), 1.0);
            let center = view.center(width).get();

            let expected = if forward {
                starts.iter().map(|&s| i128::from(s)).find(|&s| s > center)
            } else {
                starts.iter().rev().map(|&s| i128::from(s)).find(|&s| s < center)
            };
            let command = if forward { NavCommand::JumpNext } else { NavCommand::JumpPrevious };
            view.apply(command, &entries, width, &config);

            match expected {
                Some(target) => prop_assert_eq!(view.center(width).get(), target),
                None => prop_assert_eq!(view.center(width).get(), center),
            }
        }
    }
}
