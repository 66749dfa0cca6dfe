pub mod execution_graph;
pub mod flame_graph;

pub use execution_graph::ExecutionGraph;
pub use flame_graph::FlameGraph;

use eframe::egui::{self, Color32, Sense, Ui};

/// A small filled rectangle followed by a label, as used in legends.
pub fn swatch(ui: &mut Ui, fill: Color32, label: impl Into<egui::WidgetText>) -> egui::Response {
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(egui::vec2(16.0, 10.0), Sense::hover());
        ui.painter().rect_filled(rect, 2.0, fill);
        ui.label(label);
    })
    .response
}
