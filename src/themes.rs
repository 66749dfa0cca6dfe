use egui::style::{Selection, WidgetVisuals, Widgets};
use egui::{Color32, Stroke, Style, Visuals};

pub mod colorhash;
pub mod ral;
use ral::RAL_COLORS;

// Color utilities: simple sRGB linear interpolation for quick palette derivation
pub fn blend(a: Color32, b: Color32, t: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 * (1.0 - t) + y as f32 * t).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}

pub fn ral(num: u16) -> Color32 {
    RAL_COLORS
        .iter()
        .find(|(code, _, _)| *code == num)
        .map(|(_, _, c)| *c)
        .unwrap_or(Color32::from_rgb(0, 0, 0))
}

/// Foreground, background and accent the viewer builds its visuals from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub foreground: Color32,
    pub background: Color32,
    pub accent: Color32,
}

impl Palette {
    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                foreground: ral(9003),
                background: ral(9004),
                accent: ral(2009),
            }
        } else {
            Self {
                foreground: ral(9011),
                background: ral(7047),
                accent: ral(2009),
            }
        }
    }

    /// Fill behind the lanes and the flame canvas.
    pub fn canvas(&self) -> Color32 {
        blend(self.background, self.foreground, 0.04)
    }

    pub fn grid(&self) -> Color32 {
        blend(self.background, self.foreground, 0.25)
    }

    pub fn weak_text(&self) -> Color32 {
        blend(self.foreground, self.background, 0.45)
    }
}

fn control(fill: Color32, stroke: Stroke, foreground: Color32) -> WidgetVisuals {
    WidgetVisuals {
        bg_fill: fill,
        weak_bg_fill: fill,
        bg_stroke: stroke,
        fg_stroke: Stroke::new(1.0, foreground),
        corner_radius: 2.0.into(),
        expansion: 0.0,
    }
}

/// Flat RAL-based visuals on top of egui's stock light or dark theme.
pub fn viewer_visuals(palette: Palette, mut visuals: Visuals) -> Visuals {
    let Palette {
        foreground,
        background,
        accent,
    } = palette;
    let border = Stroke::new(1.0, blend(foreground, background, 0.4));
    let hover = blend(background, foreground, 0.06);

    visuals.window_fill = background;
    visuals.panel_fill = background;
    visuals.faint_bg_color = palette.canvas();
    visuals.extreme_bg_color = hover;
    visuals.weak_text_color = Some(palette.weak_text());
    visuals.selection = Selection {
        bg_fill: blend(background, foreground, 0.12),
        stroke: Stroke::new(1.5, accent),
    };
    visuals.hyperlink_color = ral(5005);
    visuals.window_stroke = border;
    visuals.window_shadow = egui::epaint::Shadow::NONE;

    visuals.widgets = Widgets {
        noninteractive: control(background, border, foreground),
        inactive: control(background, border, foreground),
        hovered: control(hover, Stroke::new(1.4, border.color), foreground),
        active: control(blend(hover, ral(9011), 0.12), Stroke::new(1.4, accent), foreground),
        open: control(hover, Stroke::new(1.4, accent), foreground),
    };
    visuals
}

pub fn viewer_style(dark_mode: bool) -> Style {
    let base = if dark_mode {
        Visuals::dark()
    } else {
        Visuals::light()
    };
    let mut style = Style::default();
    style.visuals = viewer_visuals(Palette::for_mode(dark_mode), base);
    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.animation_time = 0.12;
    style
}
