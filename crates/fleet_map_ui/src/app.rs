//! Application state for the fleet map viewer.

pub mod painter_surface;
pub mod worker;

use fleet_map::entity::{EntityKey, FleetSnapshot};
use fleet_map::reconciler::ReconcileReport;
use fleet_map::session::{MapSession, PopupChange};
use fleet_map::surface::OverlayEvent;

use painter_surface::PainterSurface;
use worker::SnapshotWorker;

/// Points kept per chart series.
const MAX_HISTORY_POINTS: usize = 600;

/// Per-cycle reconcile counts, indexed by cycle number.
#[derive(Debug, Default, Clone)]
pub struct CycleHistory {
    pub created: Vec<[f64; 2]>,
    pub updated: Vec<[f64; 2]>,
    pub removed: Vec<[f64; 2]>,
    pub failures: Vec<[f64; 2]>,
    pub live: Vec<[f64; 2]>,
}

impl CycleHistory {
    pub fn push(&mut self, cycle: u64, report: &ReconcileReport, live: usize) {
        let x = cycle as f64;
        self.created.push([x, report.created as f64]);
        self.updated.push([x, report.updated as f64]);
        self.removed.push([x, report.removed as f64]);
        self.failures.push([x, report.failures.len() as f64]);
        self.live.push([x, live as f64]);
        if self.live.len() > MAX_HISTORY_POINTS {
            let excess = self.live.len() - MAX_HISTORY_POINTS;
            for series in [
                &mut self.created,
                &mut self.updated,
                &mut self.removed,
                &mut self.failures,
                &mut self.live,
            ] {
                series.drain(..excess);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

/// Main application state for the viewer.
pub struct FleetMapApp {
    pub session: MapSession<PainterSurface>,
    worker: SnapshotWorker,
    pub history: CycleHistory,
    pub last_report: Option<ReconcileReport>,
    pub last_error: Option<String>,
    pub superseded_snapshots: usize,
    pub source_exhausted: bool,
    pub show_routes: bool,
}

impl FleetMapApp {
    pub fn new(session: MapSession<PainterSurface>, worker: SnapshotWorker) -> Self {
        Self {
            session,
            worker,
            history: CycleHistory::default(),
            last_report: None,
            last_error: None,
            superseded_snapshots: 0,
            source_exhausted: false,
            show_routes: true,
        }
    }

    /// Apply the newest queued snapshot, if any. Older queued snapshots are skipped.
    pub fn drain_snapshots(&mut self) {
        let poll = self.worker.poll();
        if poll.superseded > 0 {
            tracing::debug!(skipped = poll.superseded, "snapshot.superseded");
        }
        self.superseded_snapshots += poll.superseded;
        if let Some(error) = poll.errors.into_iter().last() {
            self.last_error = Some(error);
        }
        if poll.exhausted {
            self.source_exhausted = true;
        }
        if let Some(snapshot) = poll.latest {
            self.apply_snapshot(&snapshot);
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: &FleetSnapshot) {
        match self.session.apply(snapshot) {
            Ok(report) => {
                for failure in &report.failures {
                    tracing::warn!(key = %failure.key(), %failure, "overlay.failed");
                }
                self.history
                    .push(self.session.cycles(), &report, self.session.registry().len());
                self.last_report = Some(report);
            }
            Err(error) => {
                tracing::error!(%error, "snapshot.apply_failed");
                self.last_error = Some(error.to_string());
            }
        }
    }

    /// Route a map click on `key` into the session.
    pub fn handle_click(&mut self, key: EntityKey) {
        match self.session.handle_event(key, OverlayEvent::Click) {
            Ok(PopupChange::Ignored) => {
                tracing::debug!(%key, "click.ignored");
            }
            Ok(change) => {
                tracing::debug!(%key, ?change, "click.popup");
            }
            Err(error) => {
                tracing::warn!(%key, %error, "click.failed");
                self.last_error = Some(error.to_string());
            }
        }
    }
}

impl Drop for FleetMapApp {
    fn drop(&mut self) {
        if self.session.is_closed() {
            return;
        }
        if let Err(error) = self.session.close() {
            tracing::warn!(%error, "session.close_failed");
        }
    }
}
