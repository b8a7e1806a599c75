//! Map projection and overlay drawing.

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2};

use fleet_map::geo::GeoPoint;
use fleet_map::overlay::{PinStyle, PopupContent};

use crate::app::painter_surface::PainterSurface;
use crate::ui::utils::{
    grid_color, map_background, pin_color, popup_background, route_color, text_color,
};

/// Meters per degree of latitude (constant).
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Equatorial circumference in kilometers.
const EARTH_CIRCUMFERENCE_KM: f64 = 40_075.0;

/// Web map tiles visible across the panel width at any zoom level.
const TILES_ACROSS: f64 = 2.0;

pub const PIN_RADIUS: f32 = 5.0;
const GRID_LINES: usize = 8;

/// Visible map region: a center and a web-map style zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Viewport {
    /// Width of the visible region in kilometers.
    pub fn span_km(&self) -> f64 {
        EARTH_CIRCUMFERENCE_KM / 2f64.powi(i32::from(self.zoom)) * TILES_ACROSS
    }

    pub fn bounds(&self, rect: Rect) -> MapBounds {
        let half_width_km = self.span_km() * 0.5;
        let aspect = if rect.width() > 0.0 {
            f64::from(rect.height() / rect.width())
        } else {
            1.0
        };
        let half_height_km = half_width_km * aspect;
        let lat_delta = (half_height_km * 1000.0) / METERS_PER_DEG_LAT;
        let lng_delta = (half_width_km * 1000.0)
            / (METERS_PER_DEG_LAT * self.center.lat.to_radians().cos().max(0.1));
        MapBounds {
            lat_min: self.center.lat - lat_delta,
            lat_max: self.center.lat + lat_delta,
            lng_min: self.center.lng - lng_delta,
            lng_max: self.center.lng + lng_delta,
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + 1).min(self.max_zoom);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.saturating_sub(1).max(self.min_zoom);
    }

    /// Shift the center by a screen-space drag. The map follows the pointer.
    pub fn pan(&mut self, drag: Vec2, rect: Rect) {
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        let bounds = self.bounds(rect);
        let dlng = -f64::from(drag.x / rect.width()) * (bounds.lng_max - bounds.lng_min);
        let dlat = f64::from(drag.y / rect.height()) * (bounds.lat_max - bounds.lat_min);
        if let Some(center) = GeoPoint::new(self.center.lat + dlat, self.center.lng + dlng) {
            self.center = center;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl MapBounds {
    /// Project a point into `rect`. Points outside the bounds land outside the rect.
    pub fn project(&self, point: GeoPoint, rect: Rect) -> Pos2 {
        let lng_span = (self.lng_max - self.lng_min).max(f64::EPSILON);
        let lat_span = (self.lat_max - self.lat_min).max(f64::EPSILON);
        let x = ((point.lng - self.lng_min) / lng_span) as f32;
        let y = ((self.lat_max - point.lat) / lat_span) as f32;
        Pos2::new(
            rect.left() + x * rect.width(),
            rect.top() + y * rect.height(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PaintOptions {
    pub dark_mode: bool,
    pub show_grid: bool,
    pub show_labels: bool,
    pub show_routes: bool,
}

pub fn paint_map(
    painter: &egui::Painter,
    rect: Rect,
    bounds: &MapBounds,
    surface: &PainterSurface,
    options: PaintOptions,
) {
    painter.rect_filled(rect, 0.0, map_background(options.dark_mode));
    if options.show_grid {
        draw_grid(painter, rect, options.dark_mode);
    }

    if options.show_routes {
        for line in surface.lines() {
            let from = bounds.project(line.from, rect);
            let to = bounds.project(line.to, rect);
            painter.line_segment([from, to], Stroke::new(2.0, route_color()));
        }
    }

    for (pin, label) in surface.pins_with_labels() {
        let pos = bounds.project(pin.position, rect);
        if !rect.expand(PIN_RADIUS).contains(pos) {
            continue;
        }
        draw_pin(painter, pos, pin.style);
        if options.show_labels {
            if let Some(label) = label {
                painter.text(
                    pos + Vec2::new(PIN_RADIUS + 3.0, 0.0),
                    Align2::LEFT_CENTER,
                    label,
                    FontId::monospace(10.0),
                    text_color(options.dark_mode),
                );
            }
        }
    }

    for (anchor, content) in surface.open_popups() {
        draw_popup(
            painter,
            bounds.project(anchor, rect),
            content,
            options.dark_mode,
        );
    }
}

fn draw_grid(painter: &egui::Painter, rect: Rect, dark_mode: bool) {
    let stroke = Stroke::new(1.0, grid_color(dark_mode));
    for step in 1..GRID_LINES {
        let t = step as f32 / GRID_LINES as f32;
        let x = rect.left() + t * rect.width();
        let y = rect.top() + t * rect.height();
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
    }
}

fn draw_pin(painter: &egui::Painter, pos: Pos2, style: PinStyle) {
    painter.circle_filled(pos, PIN_RADIUS, pin_color(style));
    painter.circle_stroke(pos, PIN_RADIUS, Stroke::new(1.0, Color32::BLACK));
}

fn popup_text(content: &PopupContent) -> String {
    let mut text = content.title.clone();
    for (label, value) in &content.fields {
        text.push('\n');
        text.push_str(label);
        text.push_str(": ");
        text.push_str(value);
    }
    text
}

fn draw_popup(painter: &egui::Painter, anchor: Pos2, content: &PopupContent, dark_mode: bool) {
    let color = text_color(dark_mode);
    let galley = painter.layout_no_wrap(popup_text(content), FontId::monospace(11.0), color);
    let origin = anchor + Vec2::new(PIN_RADIUS + 8.0, -galley.size().y - PIN_RADIUS - 8.0);
    let frame = Rect::from_min_size(origin, galley.size()).expand(6.0);
    painter.rect_filled(frame, 4.0, popup_background(dark_mode));
    painter.rect_stroke(
        frame,
        4.0,
        Stroke::new(1.0, Color32::from_gray(90)),
        egui::StrokeKind::Middle,
    );
    painter.line_segment(
        [anchor, frame.left_bottom()],
        Stroke::new(1.0, Color32::from_gray(90)),
    );
    painter.galley(origin, galley, color);
}

fn legend_item(ui: &mut egui::Ui, color: Color32, label: &str) {
    ui.horizontal(|ui| {
        let (rect, _) = ui.allocate_exact_size(Vec2::new(14.0, 14.0), egui::Sense::hover());
        ui.painter().rect_filled(rect, 2.0, color);
        ui.label(label);
    });
}

/// Render the map legend for every pin style.
pub fn render_map_legend(ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label("Drivers:");
        legend_item(ui, pin_color(PinStyle::DriverOnline), "Online");
        legend_item(ui, pin_color(PinStyle::DriverOffline), "Offline");
    });
    ui.horizontal(|ui| {
        ui.label("Rides:");
        legend_item(ui, pin_color(PinStyle::RidePending), "Pending");
        legend_item(ui, pin_color(PinStyle::RideAccepted), "Accepted");
        legend_item(ui, pin_color(PinStyle::RideOngoing), "Ongoing");
        legend_item(ui, pin_color(PinStyle::RideCompleted), "Completed");
        legend_item(ui, pin_color(PinStyle::RideCancelled), "Cancelled");
        legend_item(ui, pin_color(PinStyle::RideUnknown), "Unknown");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_map::config::DEFAULT_CENTER;

    fn viewport() -> Viewport {
        Viewport {
            center: DEFAULT_CENTER,
            zoom: 12,
            min_zoom: 3,
            max_zoom: 18,
        }
    }

    fn panel() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    #[test]
    fn center_projects_to_panel_center() {
        let bounds = viewport().bounds(panel());
        let pos = bounds.project(DEFAULT_CENTER, panel());
        assert!((pos.x - 400.0).abs() < 0.01);
        assert!((pos.y - 300.0).abs() < 0.01);
    }

    #[test]
    fn north_is_up_and_east_is_right() {
        let bounds = viewport().bounds(panel());
        let north_east =
            GeoPoint::new(DEFAULT_CENTER.lat + 0.01, DEFAULT_CENTER.lng + 0.01).expect("point");
        let pos = bounds.project(north_east, panel());
        assert!(pos.x > 400.0);
        assert!(pos.y < 300.0);
    }

    #[test]
    fn zoom_stays_within_limits() {
        let mut viewport = viewport();
        for _ in 0..20 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom, 18);
        for _ in 0..30 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom, 3);
    }

    #[test]
    fn dragging_right_moves_center_west() {
        let mut viewport = viewport();
        viewport.pan(Vec2::new(100.0, 0.0), panel());
        assert!(viewport.center.lng < DEFAULT_CENTER.lng);
        assert!((viewport.center.lat - DEFAULT_CENTER.lat).abs() < 1e-9);
    }

    #[test]
    fn popup_text_lists_fields_under_title() {
        let content = PopupContent {
            title: "Ride #4".to_string(),
            fields: vec![("Status".to_string(), "Pending".to_string())],
        };
        assert_eq!(popup_text(&content), "Ride #4\nStatus: Pending");
    }
}
