use eframe::egui::{
    self, pos2, vec2, Align2, FontId, Rect, Response, Sense, Stroke, StrokeKind, Ui, Widget,
};

use crate::event::{strip_nul, CoreId, RESTART_LANE};
use crate::themes::colorhash::{color_for, highlight_stroke, text_color_on};
use crate::themes::Palette;
use crate::time::Timestamp;
use crate::timeline::{
    ColorAssignment, ColorKey, CoreLanes, Segment, SegmentKind, PANIC_LABEL, RESTART_LABEL,
};
use crate::widgets::swatch;

pub const WAITING_TEXT: &str = "Waiting for traces...";

/// Per-core lanes over the trailing window, newest time on the right.
pub struct ExecutionGraph<'a> {
    lanes: &'a CoreLanes,
    colors: Option<&'a ColorAssignment>,
    lane_height: f32,
    label_width: f32,
    axis_intervals: u32,
}

impl<'a> ExecutionGraph<'a> {
    pub fn new(lanes: &'a CoreLanes) -> Self {
        Self {
            lanes,
            colors: None,
            lane_height: 28.0,
            label_width: 72.0,
            axis_intervals: 4,
        }
    }

    /// Function colors for the legend below the lanes.
    pub fn colors(mut self, colors: Option<&'a ColorAssignment>) -> Self {
        self.colors = colors;
        self
    }

    pub fn lane_height(mut self, lane_height: f32) -> Self {
        self.lane_height = lane_height;
        self
    }
}

pub fn lane_label(core_id: CoreId) -> String {
    if core_id == RESTART_LANE {
        "Restarts".to_owned()
    } else {
        format!("Core {core_id}")
    }
}

/// Left and right pixel offsets of `segment` inside a track `width` wide.
pub fn segment_extent(segment: &Segment, lanes: &CoreLanes, width: f32) -> (f32, f32) {
    let span = lanes.duration().as_f64().max(1.0);
    let at = |t: Timestamp| ((t - lanes.window_start).as_f64() / span * f64::from(width)) as f32;
    (at(segment.start), at(segment.end))
}

fn segment_tooltip(ui: &mut Ui, segment: &Segment) {
    ui.label(egui::RichText::new(strip_nul(&segment.func_name)).strong());
    let what = match segment.kind {
        SegmentKind::Exit => "call",
        SegmentKind::Panic => "panic",
        SegmentKind::Restart => "restart",
    };
    ui.label(format!("{}  {what}", lane_label(segment.core_id)));
    ui.label(
        egui::RichText::new(format!("{} ms", segment.duration()))
            .monospace()
            .small(),
    );
}

fn legend(ui: &mut Ui, colors: Option<&ColorAssignment>) {
    ui.horizontal_wrapped(|ui| {
        for (name, key) in colors.into_iter().flat_map(ColorAssignment::legend) {
            swatch(ui, color_for(key), strip_nul(name).into_owned());
        }
        swatch(ui, color_for(ColorKey::Panic), PANIC_LABEL);
        swatch(ui, color_for(ColorKey::Restart), RESTART_LABEL);
    });
}

impl Widget for ExecutionGraph<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let ExecutionGraph {
            lanes,
            colors,
            lane_height,
            label_width,
            axis_intervals,
        } = self;

        let palette = Palette::for_mode(ui.visuals().dark_mode);
        let width = ui.available_width().max(label_width + 1.0);
        let small = FontId::monospace(10.0);

        if lanes.is_empty() {
            let (rect, response) =
                ui.allocate_exact_size(vec2(width, lane_height * 2.0), Sense::hover());
            ui.painter().rect_filled(rect, 2.0, palette.canvas());
            ui.painter().text(
                rect.center(),
                Align2::CENTER_CENTER,
                WAITING_TEXT,
                FontId::proportional(14.0),
                palette.weak_text(),
            );
            return response;
        }

        let header_h = 16.0;
        let axis_h = 18.0;
        let rows = lanes.lanes.len() as f32;
        let (rect, response) = ui.allocate_exact_size(
            vec2(width, header_h + rows * lane_height + axis_h),
            Sense::hover(),
        );
        let painter = ui.painter_at(rect);
        let track = Rect::from_min_max(
            pos2(rect.min.x + label_width, rect.min.y + header_h),
            pos2(rect.max.x, rect.max.y - axis_h),
        );

        let window_s = lanes.duration().as_f64() / 1_000.0;
        painter.text(
            pos2(track.min.x, rect.min.y),
            Align2::LEFT_TOP,
            format!("Now - {window_s:.0}s"),
            small.clone(),
            palette.weak_text(),
        );
        painter.text(
            pos2(track.max.x, rect.min.y),
            Align2::RIGHT_TOP,
            "Now",
            small.clone(),
            palette.weak_text(),
        );
        painter.rect_filled(track, 2.0, palette.canvas());

        for tick in lanes.ticks(axis_intervals) {
            let x = track.min.x + tick.fraction as f32 * track.width();
            painter.line_segment(
                [pos2(x, track.min.y), pos2(x, track.max.y)],
                Stroke::new(1.0, palette.grid()),
            );
            let align = if tick.fraction <= 0.0 {
                Align2::LEFT_TOP
            } else if tick.fraction >= 1.0 {
                Align2::RIGHT_TOP
            } else {
                Align2::CENTER_TOP
            };
            painter.text(
                pos2(x, track.max.y + 3.0),
                align,
                &tick.label,
                small.clone(),
                palette.weak_text(),
            );
        }

        let track_painter = painter.with_clip_rect(track);
        let pointer = ui
            .input(|i| i.pointer.hover_pos())
            .filter(|pos| track.contains(*pos));
        let mut hovered: Option<&Segment> = None;

        for (row, (core_id, segments)) in lanes.lanes.iter().enumerate() {
            let y = track.min.y + row as f32 * lane_height;
            painter.text(
                pos2(rect.min.x + 4.0, y + lane_height / 2.0),
                Align2::LEFT_CENTER,
                lane_label(*core_id),
                FontId::monospace(11.0),
                ui.visuals().text_color(),
            );

            for segment in segments {
                let (x0, x1) = segment_extent(segment, lanes, track.width());
                let seg_rect = Rect::from_min_max(
                    pos2(track.min.x + x0, y + 3.0),
                    pos2(track.min.x + x1.max(x0 + 1.0), y + lane_height - 3.0),
                );
                let fill = color_for(segment.color);
                track_painter.rect_filled(seg_rect, 4.0, fill);

                if seg_rect.width() > 32.0 {
                    let text_painter = track_painter.with_clip_rect(seg_rect.shrink(2.0));
                    text_painter.text(
                        pos2(seg_rect.min.x + 5.0, seg_rect.center().y),
                        Align2::LEFT_CENTER,
                        strip_nul(&segment.func_name),
                        small.clone(),
                        text_color_on(fill),
                    );
                }

                if pointer.is_some_and(|pos| seg_rect.contains(pos)) {
                    track_painter.rect_stroke(
                        seg_rect,
                        4.0,
                        highlight_stroke(fill),
                        StrokeKind::Inside,
                    );
                    hovered = Some(segment);
                }
            }
        }

        let response = match hovered {
            Some(segment) => response.on_hover_ui(|ui| segment_tooltip(ui, segment)),
            None => response,
        };
        legend(ui, colors);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes() -> CoreLanes {
        CoreLanes {
            window_start: Timestamp::new(1_000),
            window_end: Timestamp::new(3_000),
            lanes: Default::default(),
        }
    }

    fn segment(start: i128, end: i128) -> Segment {
        Segment {
            core_id: 0,
            func_name: "poll".to_owned(),
            start: Timestamp::new(start),
            end: Timestamp::new(end),
            kind: SegmentKind::Exit,
            color: ColorKey::Function(0),
        }
    }

    #[test]
    fn extent_maps_window_onto_track() {
        assert_eq!(segment_extent(&segment(1_000, 3_000), &lanes(), 400.0), (0.0, 400.0));
        assert_eq!(segment_extent(&segment(2_000, 2_500), &lanes(), 400.0), (200.0, 300.0));
    }

    #[test]
    fn restart_lane_has_its_own_label() {
        assert_eq!(lane_label(RESTART_LANE), "Restarts");
        assert_eq!(lane_label(2), "Core 2");
    }
}
