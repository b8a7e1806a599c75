use std::time::Duration;

use eframe::egui;

use fleet_map::config::SurfaceConfig;
use fleet_map::session::MapSession;
use fleet_map::source::SnapshotSource;

use crate::app::painter_surface::PainterSurface;
use crate::app::worker::SnapshotWorker;
use crate::app::FleetMapApp;
use crate::ui::controls::render_control_panel;
use crate::ui::dashboard::render_dashboard;

/// Frame interval while the pointer is interacting with the map.
const INTERACTIVE_REPAINT: Duration = Duration::from_millis(16);

pub struct Launch {
    pub config: SurfaceConfig,
    pub source: Box<dyn SnapshotSource>,
    pub interval: Duration,
}

pub fn run(launch: Launch) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_maximized(true),
        ..Default::default()
    };
    eframe::run_native(
        "Fleet Map",
        options,
        Box::new(move |cc| {
            let dark_mode = launch.config.style.dark_mode;
            cc.egui_ctx.set_visuals(if dark_mode {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            });
            let session = MapSession::open(PainterSurface::new(), launch.config)?;
            let repaint_ctx = cc.egui_ctx.clone();
            let worker = SnapshotWorker::spawn(launch.source, launch.interval, move || {
                repaint_ctx.request_repaint();
            });
            Ok(Box::new(FleetMapApp::new(session, worker)))
        }),
    )
}

impl eframe::App for FleetMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_snapshots();

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            render_control_panel(ui, self);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            render_dashboard(ui, self);
        });

        if ctx.input(|input| input.pointer.any_down()) {
            ctx.request_repaint_after(INTERACTIVE_REPAINT);
        }
    }
}
