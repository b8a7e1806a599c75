//! Central panel: the live map and the reconcile churn chart.

use eframe::egui::{self, Align2, FontId, Stroke, Vec2};
use egui_plot::{Line, Plot};

use crate::app::FleetMapApp;
use crate::ui::rendering::{paint_map, render_map_legend, PaintOptions};
use crate::ui::utils::{
    chart_color_created, chart_color_failures, chart_color_live, chart_color_removed,
    chart_color_updated, text_color,
};

const CHART_HEIGHT: f32 = 180.0;
const MIN_MAP_HEIGHT: f32 = 240.0;

pub fn render_dashboard(ui: &mut egui::Ui, app: &mut FleetMapApp) {
    render_map_legend(ui);
    render_map_panel(ui, app);
    ui.add_space(6.0);
    render_churn_chart(ui, app);
}

fn render_map_panel(ui: &mut egui::Ui, app: &mut FleetMapApp) {
    let height = (ui.available_height() - CHART_HEIGHT - 24.0).max(MIN_MAP_HEIGHT);
    let desired = Vec2::new(ui.available_width(), height);
    let (rect, response) = ui.allocate_exact_size(desired, egui::Sense::click_and_drag());
    let painter = ui.painter_at(rect);

    let surface = app.session.surface();
    let style = *surface.base_style();
    let Some(viewport) = surface.viewport().copied() else {
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            "Map closed",
            FontId::proportional(16.0),
            text_color(style.dark_mode),
        );
        return;
    };

    let bounds = viewport.bounds(rect);
    paint_map(
        &painter,
        rect,
        &bounds,
        surface,
        PaintOptions {
            dark_mode: style.dark_mode,
            show_grid: style.show_grid,
            show_labels: style.show_labels,
            show_routes: app.show_routes,
        },
    );
    painter.rect_stroke(
        rect,
        0.0,
        Stroke::new(1.0, egui::Color32::from_gray(80)),
        egui::StrokeKind::Middle,
    );

    let clicked = if response.clicked() {
        response
            .interact_pointer_pos()
            .and_then(|pointer| surface.hit_test(&bounds, rect, pointer))
    } else {
        None
    };
    if let Some(key) = clicked {
        app.handle_click(key);
    }

    if response.dragged() {
        let delta = response.drag_delta();
        if let Some(viewport) = app.session.surface_mut().viewport_mut() {
            viewport.pan(delta, rect);
        }
    }
}

fn render_churn_chart(ui: &mut egui::Ui, app: &FleetMapApp) {
    let history = &app.history;
    Plot::new("reconcile_churn_plot")
        .height(CHART_HEIGHT)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new("Live overlays", history.live.clone()).color(chart_color_live()),
            );
            plot_ui.line(
                Line::new("Created", history.created.clone()).color(chart_color_created()),
            );
            plot_ui.line(
                Line::new("Updated", history.updated.clone()).color(chart_color_updated()),
            );
            plot_ui.line(
                Line::new("Removed", history.removed.clone()).color(chart_color_removed()),
            );
            plot_ui.line(
                Line::new("Failures", history.failures.clone()).color(chart_color_failures()),
            );
        });
}
