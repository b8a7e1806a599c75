//! Top control panel: viewport controls, layer toggles and cycle status.

use eframe::egui;

use crate::app::FleetMapApp;
use crate::ui::utils::format_count;

/// Render the top control panel.
pub fn render_control_panel(ui: &mut egui::Ui, app: &mut FleetMapApp) {
    ui.horizontal(|ui| {
        let zoom = app.session.surface().viewport().map(|viewport| viewport.zoom);
        if ui.button("Zoom in").clicked() {
            if let Some(viewport) = app.session.surface_mut().viewport_mut() {
                viewport.zoom_in();
            }
        }
        if ui.button("Zoom out").clicked() {
            if let Some(viewport) = app.session.surface_mut().viewport_mut() {
                viewport.zoom_out();
            }
        }
        if ui.button("Recenter").clicked() {
            let center = app.session.config().center;
            if let Some(viewport) = app.session.surface_mut().viewport_mut() {
                viewport.center = center;
            }
        }
        match zoom {
            Some(zoom) => ui.label(format!("Zoom {zoom}")),
            None => ui.label("Map closed"),
        };

        ui.separator();
        ui.checkbox(&mut app.show_routes, "Routes");
        let style = app.session.surface_mut().base_style_mut();
        ui.checkbox(&mut style.show_labels, "Labels");
        ui.checkbox(&mut style.show_grid, "Grid");
    });

    ui.horizontal(|ui| {
        ui.label(format_count("Cycles", app.session.cycles() as usize));
        ui.label(format_count("Overlays", app.session.registry().len()));
        if let Some(report) = &app.last_report {
            ui.separator();
            ui.label(format_count("Created", report.created));
            ui.label(format_count("Updated", report.updated));
            ui.label(format_count("Unchanged", report.unchanged));
            ui.label(format_count("Removed", report.removed));
            ui.label(format_count("Skipped", report.skipped_invalid));
            if report.duplicates > 0 {
                ui.label(format_count("Duplicates", report.duplicates));
            }
            if !report.failures.is_empty() {
                ui.colored_label(
                    egui::Color32::from_rgb(220, 120, 60),
                    format_count("Failures", report.failures.len()),
                );
            }
        }
        if app.superseded_snapshots > 0 {
            ui.separator();
            ui.label(format_count("Skipped snapshots", app.superseded_snapshots));
        }
        if app.source_exhausted {
            ui.separator();
            ui.label("Source exhausted");
        }
    });

    if let Some(error) = app.last_error.clone() {
        ui.horizontal(|ui| {
            ui.colored_label(egui::Color32::from_rgb(220, 80, 80), error);
            if ui.small_button("Dismiss").clicked() {
                app.last_error = None;
            }
        });
    }
}
