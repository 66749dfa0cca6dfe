use eframe::egui::{
    self, pos2, vec2, Align2, FontId, Pos2, Rect, Response, Sense, Stroke, StrokeKind, Ui, Vec2,
};

use crate::callstack::{CallStackEntry, EntryDetails};
use crate::config::FlameConfig;
use crate::flame::{bounds, render, Bounds, FlameScene, NavCommand, Surface, Viewport};
use crate::themes::colorhash::{highlight_stroke, text_color_on};
use crate::themes::Palette;

pub const NO_DATA_TEXT: &str = "No trace data available";

/// Stateful flame graph: owns the entries, the camera and the last rendered
/// scene. The scene is only rebuilt after something marks it dirty.
pub struct FlameGraph {
    config: FlameConfig,
    entries: Vec<CallStackEntry>,
    bounds: Option<Bounds>,
    viewport: Option<Viewport>,
    surface: Surface,
    scene: FlameScene,
    hovered: Option<usize>,
    dirty: bool,
    renders: usize,
}

impl FlameGraph {
    pub fn new(config: FlameConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            bounds: None,
            viewport: None,
            surface: Surface::default(),
            scene: FlameScene::default(),
            hovered: None,
            dirty: true,
            renders: 0,
        }
    }

    /// Replaces the data. The viewport is refitted on the next refresh.
    pub fn set_entries(&mut self, entries: Vec<CallStackEntry>) {
        self.bounds = bounds(&entries);
        self.entries = entries;
        self.viewport = None;
        self.hovered = None;
        self.dirty = true;
        log::debug!(
            "flame graph loaded {} entries spanning {:?}",
            self.entries.len(),
            self.bounds.map(|b| b.duration)
        );
    }

    pub fn entries(&self) -> &[CallStackEntry] {
        &self.entries
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn scene(&self) -> &FlameScene {
        &self.scene
    }

    pub fn hovered(&self) -> Option<&CallStackEntry> {
        self.hovered.and_then(|i| self.entries.get(i))
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }

    pub fn resize(&mut self, size: Vec2, pixels_per_point: f32) -> bool {
        let changed = self.surface.sync(size, pixels_per_point);
        self.dirty |= changed;
        changed
    }

    pub fn navigate(&mut self, command: NavCommand) -> bool {
        let Some(viewport) = self.viewport.as_mut() else {
            return false;
        };
        let moved = viewport.apply(command, &self.entries, self.surface.width, &self.config);
        self.dirty |= moved;
        moved
    }

    pub fn begin_drag(&mut self, x: f32) {
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.begin_drag(x);
        }
    }

    pub fn drag_to(&mut self, x: f32) {
        if let Some(viewport) = self.viewport.as_mut() {
            self.dirty |= viewport.drag_to(x);
        }
    }

    pub fn end_drag(&mut self) {
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.end_drag();
        }
    }

    /// Updates the hovered entry from a pointer position relative to the
    /// graph's top-left corner.
    pub fn hover(&mut self, pos: Option<Pos2>) {
        let hovered = pos.and_then(|pos| self.scene.hit_test(pos));
        if hovered != self.hovered {
            self.hovered = hovered;
            self.dirty = true;
        }
    }

    /// Fits the viewport if needed and rebuilds the scene when dirty.
    /// Returns true when a render happened.
    pub fn refresh(&mut self) -> bool {
        if self.viewport.is_none() && self.surface.width > 0.0 {
            if let Some(bounds) = self.bounds {
                self.viewport = Some(Viewport::fit(&bounds, self.surface.width, &self.config));
                self.dirty = true;
            }
        }
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        self.scene = match (self.viewport, self.bounds) {
            (Some(viewport), Some(bounds)) => render(
                &self.entries,
                &viewport,
                &self.surface,
                bounds.start,
                &self.config,
            ),
            _ => FlameScene::default(),
        };
        self.renders += 1;
        true
    }

    fn handle_input(&mut self, ui: &Ui, response: &Response, origin: Pos2) {
        if !ui.ctx().wants_keyboard_input() {
            let commands: Vec<NavCommand> = ui.input(|i| {
                i.events
                    .iter()
                    .filter_map(|event| match event {
                        egui::Event::Key {
                            key, pressed: true, ..
                        } => NavCommand::from_key(*key),
                        _ => None,
                    })
                    .collect()
            });
            for command in commands {
                self.navigate(command);
            }
        }

        let pointer_x = response.interact_pointer_pos().map(|p| p.x - origin.x);
        if response.drag_started() {
            if let Some(x) = pointer_x {
                self.begin_drag(x);
            }
        }
        if response.dragged() {
            if let Some(x) = pointer_x {
                self.drag_to(x);
            }
        }
        if response.drag_stopped() {
            self.end_drag();
        }
    }

    fn paint(&self, ui: &Ui, rect: Rect) {
        let palette = Palette::for_mode(ui.visuals().dark_mode);
        let painter = ui.painter_at(rect);
        let origin = rect.min.to_vec2();
        let label_font = FontId::monospace(10.0);

        painter.rect_filled(rect, 0.0, palette.canvas());

        for drawn in &self.scene.rects {
            let r = drawn.rect.translate(origin);
            painter.rect_filled(r, 2.0, drawn.fill);
            if self.hovered == Some(drawn.index) {
                painter.rect_stroke(r, 2.0, highlight_stroke(drawn.fill), StrokeKind::Inside);
            }
            if let Some(label) = &drawn.label {
                painter.with_clip_rect(r.shrink(1.0)).text(
                    pos2(r.min.x + 5.0, r.center().y),
                    Align2::LEFT_CENTER,
                    label,
                    label_font.clone(),
                    text_color_on(drawn.fill),
                );
            }
        }

        let axis = Rect::from_min_max(pos2(rect.min.x, rect.min.y + self.scene.axis_top), rect.max);
        let ink = Stroke::new(1.0, palette.grid());
        painter.rect_filled(axis, 0.0, palette.background);
        painter.line_segment([axis.left_top(), axis.right_top()], ink);
        for tick in &self.scene.axis {
            let x = rect.min.x + tick.x;
            painter.line_segment([pos2(x, axis.min.y), pos2(x, axis.min.y + 5.0)], ink);
            painter.text(
                pos2(x, axis.min.y + 6.0),
                tick.align,
                &tick.label,
                label_font.clone(),
                palette.weak_text(),
            );
        }
    }

    pub fn show(&mut self, ui: &mut Ui) -> Response {
        let rows = self.entries.iter().map(|e| e.depth + 1).max().unwrap_or(1) as f32;
        let height = (rows * self.config.row_height + self.config.axis_height + 8.0).max(160.0);
        let width = ui.available_width().max(1.0);
        let (rect, response) = ui.allocate_exact_size(vec2(width, height), Sense::click_and_drag());

        if self.entries.is_empty() {
            let palette = Palette::for_mode(ui.visuals().dark_mode);
            ui.painter().rect_filled(rect, 2.0, palette.canvas());
            ui.painter().text(
                rect.center(),
                Align2::CENTER_CENTER,
                NO_DATA_TEXT,
                FontId::proportional(14.0),
                palette.weak_text(),
            );
            return response;
        }

        self.resize(rect.size(), ui.ctx().pixels_per_point());
        self.refresh();
        self.handle_input(ui, &response, rect.min);
        self.refresh();
        self.hover(response.hover_pos().map(|p| (p - rect.min).to_pos2()));
        self.refresh();

        self.paint(ui, rect);

        match self.hovered() {
            Some(entry) => {
                let details = EntryDetails::of(entry, self.config.units_per_second);
                response.on_hover_ui_at_pointer(|ui| entry_tooltip(ui, &details))
            }
            None => response,
        }
    }
}

fn entry_tooltip(ui: &mut Ui, details: &EntryDetails) {
    ui.label(egui::RichText::new(&details.name).strong());
    ui.label(format!("Depth: {}", details.depth));
    ui.label(format!("Duration: {}", details.duration_label()));
    if let Some(args) = &details.args {
        ui.label(egui::RichText::new(format!("Args: {args}")).monospace().small());
    }
    if let Some(ret) = details.return_val {
        ui.label(egui::RichText::new(format!("Return: {ret}")).monospace().small());
    }
}
