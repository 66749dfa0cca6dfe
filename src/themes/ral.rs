use egui::Color32;

/// The subset of RAL classic colors the viewer draws with, as sRGB.
pub const RAL_COLORS: &[(u16, &str, Color32)] = &[
    (1003, "Signal yellow", Color32::from_rgb(249, 168, 0)),
    (1021, "Colza yellow", Color32::from_rgb(246, 182, 0)),
    (2004, "Pure orange", Color32::from_rgb(226, 83, 3)),
    (2005, "Luminous orange", Color32::from_rgb(255, 77, 6)),
    (2009, "Traffic orange", Color32::from_rgb(225, 85, 10)),
    (2010, "Signal orange", Color32::from_rgb(208, 93, 40)),
    (3014, "Antique pink", Color32::from_rgb(211, 110, 112)),
    (3020, "Traffic red", Color32::from_rgb(193, 18, 28)),
    (4008, "Signal violet", Color32::from_rgb(132, 76, 130)),
    (5005, "Signal blue", Color32::from_rgb(21, 72, 137)),
    (5015, "Sky blue", Color32::from_rgb(34, 113, 179)),
    (5021, "Water blue", Color32::from_rgb(37, 109, 123)),
    (6018, "Yellow green", Color32::from_rgb(87, 166, 57)),
    (6027, "Light green", Color32::from_rgb(132, 195, 190)),
    (6032, "Signal green", Color32::from_rgb(49, 127, 67)),
    (6033, "Mint turquoise", Color32::from_rgb(73, 126, 118)),
    (7046, "Telegrey 2", Color32::from_rgb(130, 137, 143)),
    (7047, "Telegrey 4", Color32::from_rgb(208, 208, 208)),
    (9003, "Signal white", Color32::from_rgb(236, 236, 231)),
    (9004, "Signal black", Color32::from_rgb(43, 43, 44)),
    (9011, "Graphite black", Color32::from_rgb(28, 28, 33)),
];
