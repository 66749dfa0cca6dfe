use egui::Color32;
use egui::Stroke;

use crate::themes;
use crate::timeline::ColorKey;

/// A small, deterministic hash for turning "content" into a stable palette index.
///
/// This is intentionally not cryptographic; it's for UI color bucketing.
#[derive(Clone, Copy, Debug)]
pub struct Fnv1a64(u64);

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 1469598103934665603;
    const PRIME: u64 = 1099511628211;

    pub fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub fn update(&mut self, bytes: &[u8]) {
        let mut hash = self.0;
        for b in bytes {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(Self::PRIME);
        }
        self.0 = hash;
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

/// Colors handed out to functions on the execution graph, in first-seen order.
pub const FUNCTION_PALETTE: &[u16] = &[
    5015, // sky blue
    6018, // yellow green
    1003, // signal yellow
    4008, // signal violet
    6027, // light green
    3014, // antique pink
    5021, // water blue
    1021, // colza yellow
    6033, // mint turquoise
];

pub const PANIC_RAL: u16 = 3020;
pub const RESTART_RAL: u16 = 2004;

/// A small, visually distinct RAL palette meant for categorical coloring.
///
/// Note: Avoids `RAL 2009` (the UI accent) and the panic/restart reds and
/// oranges so flame frames never read as faults.
pub const RAL_CATEGORICAL: &[u16] = &[
    1003, // signal yellow
    3014, // antique pink
    4008, // signal violet
    5005, // signal blue
    5015, // sky blue
    5021, // water blue
    6018, // yellow green
    6027, // light green
    6032, // signal green
    6033, // mint turquoise
];

pub fn color_for(key: ColorKey) -> Color32 {
    match key {
        ColorKey::Function(slot) => {
            themes::ral(FUNCTION_PALETTE[slot % FUNCTION_PALETTE.len()])
        }
        ColorKey::Panic => themes::ral(PANIC_RAL),
        ColorKey::Restart => themes::ral(RESTART_RAL),
    }
}

/// Stable fill for a flame frame; the same function at the same depth always
/// gets the same color.
pub fn flame_color(func_name: &str, depth: u32) -> Color32 {
    let mut h = Fnv1a64::new();
    h.update(func_name.trim_end_matches('\0').as_bytes());
    h.update(&[0]);
    h.update(&depth.to_le_bytes());
    let idx = (h.finish() % RAL_CATEGORICAL.len() as u64) as usize;
    themes::ral(RAL_CATEGORICAL[idx])
}

pub fn luma(color: Color32) -> f32 {
    // Cheap, perceptual-ish luma in sRGB space.
    let r = color.r() as f32 / 255.0;
    let g = color.g() as f32 / 255.0;
    let b = color.b() as f32 / 255.0;
    0.299 * r + 0.587 * g + 0.114 * b
}

pub fn text_color_on(background: Color32) -> Color32 {
    if luma(background) > 0.55 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

/// A thick, high-contrast outline stroke for emphasizing a colored region.
pub fn highlight_stroke(fill: Color32) -> Stroke {
    Stroke::new(2.0, text_color_on(fill))
}
