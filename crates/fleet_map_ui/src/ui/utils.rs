use eframe::egui::Color32;

use fleet_map::overlay::PinStyle;

pub fn pin_color(style: PinStyle) -> Color32 {
    match style {
        PinStyle::DriverOnline => Color32::from_rgb(0, 200, 120),
        PinStyle::DriverOffline => Color32::from_gray(110),
        PinStyle::RidePending => Color32::from_rgb(255, 200, 0),
        PinStyle::RideAccepted => Color32::from_rgb(255, 140, 0),
        PinStyle::RideOngoing => Color32::from_rgb(80, 140, 255),
        PinStyle::RideCompleted => Color32::from_rgb(160, 200, 80),
        PinStyle::RideCancelled => Color32::from_rgb(200, 80, 80),
        PinStyle::RideUnknown => Color32::from_rgb(160, 80, 200),
    }
}

pub fn route_color() -> Color32 {
    Color32::from_rgba_unmultiplied(80, 140, 255, 150)
}

pub fn map_background(dark_mode: bool) -> Color32 {
    if dark_mode {
        Color32::from_rgb(24, 26, 30)
    } else {
        Color32::from_rgb(236, 236, 230)
    }
}

pub fn grid_color(dark_mode: bool) -> Color32 {
    if dark_mode {
        Color32::from_gray(45)
    } else {
        Color32::from_gray(205)
    }
}

pub fn text_color(dark_mode: bool) -> Color32 {
    if dark_mode {
        Color32::from_gray(220)
    } else {
        Color32::from_gray(30)
    }
}

pub fn popup_background(dark_mode: bool) -> Color32 {
    if dark_mode {
        Color32::from_rgba_unmultiplied(36, 38, 44, 235)
    } else {
        Color32::from_rgba_unmultiplied(255, 255, 255, 240)
    }
}

pub fn chart_color_created() -> Color32 {
    Color32::from_rgb(0, 200, 120)
}

pub fn chart_color_updated() -> Color32 {
    Color32::from_rgb(255, 140, 0)
}

pub fn chart_color_removed() -> Color32 {
    Color32::from_rgb(200, 80, 80)
}

pub fn chart_color_live() -> Color32 {
    Color32::from_rgb(80, 140, 255)
}

pub fn chart_color_failures() -> Color32 {
    Color32::from_rgb(160, 80, 200)
}

pub fn format_count(label: &str, value: usize) -> String {
    format!("{label}: {value}")
}
