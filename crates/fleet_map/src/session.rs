//! Map session controller: owns one surface and its overlay registry for the lifetime of
//! a map view.
//!
//! The session is single-threaded and not reentrant. Callers serialize
//! [`MapSession::apply_snapshot`] calls; if refreshes overlap upstream, the latest
//! snapshot should win before it reaches the session.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SurfaceConfig;
use crate::entity::{merge_entities, DriverEntity, EntityKey, FleetSnapshot, RideEntity};
use crate::reconciler::{reconcile, teardown_entry, EntityFailure, ReconcileReport};
use crate::registry::OverlayRegistry;
use crate::surface::{MapSurface, OverlayEvent, SurfaceError};

const TARGET: &str = "fleet_map::session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("map surface failed to initialize: {0}")]
    Open(#[source] SurfaceError),
    #[error("map surface failed to shut down: {0}")]
    Close(#[source] SurfaceError),
    #[error("map session is closed")]
    Closed,
}

/// What a routed overlay event did to the popup of its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupChange {
    Opened,
    Closed,
    /// Unknown key (entity already removed) or the surface refused the popup.
    Ignored,
}

pub struct MapSession<S: MapSurface> {
    surface: S,
    registry: OverlayRegistry<S>,
    config: SurfaceConfig,
    cycles: u64,
    closed: bool,
}

impl<S: MapSurface> MapSession<S> {
    pub fn open(mut surface: S, config: SurfaceConfig) -> Result<Self, SessionError> {
        let config = config.normalized();
        surface.initialize(&config).map_err(SessionError::Open)?;
        info!(
            target: TARGET,
            lat = config.center.lat,
            lng = config.center.lng,
            zoom = config.zoom,
            "session.opened"
        );
        Ok(Self {
            surface,
            registry: OverlayRegistry::new(),
            config,
            cycles: 0,
            closed: false,
        })
    }

    /// Reconcile the surface against one driver list and one ride list.
    pub fn apply_snapshot(
        &mut self,
        drivers: &[DriverEntity],
        rides: &[RideEntity],
    ) -> Result<ReconcileReport, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let previous = std::mem::take(&mut self.registry);
        let (next, report) = reconcile(previous, merge_entities(drivers, rides), &mut self.surface);
        self.registry = next;
        self.cycles += 1;
        if !report.failures.is_empty() {
            warn!(
                target: TARGET,
                cycle = self.cycles,
                failures = report.failures.len(),
                "session.cycle_with_failures"
            );
        }
        Ok(report)
    }

    pub fn apply(&mut self, snapshot: &FleetSnapshot) -> Result<ReconcileReport, SessionError> {
        self.apply_snapshot(&snapshot.drivers, &snapshot.rides)
    }

    /// Route an event fired by a listener back to its entity. A click toggles the popup.
    pub fn handle_event(
        &mut self,
        key: EntityKey,
        event: OverlayEvent,
    ) -> Result<PopupChange, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        match event {
            OverlayEvent::Click => {
                let open = match self.registry.get(&key) {
                    Some(entry) => entry.has_open_popup(),
                    None => {
                        debug!(target: TARGET, key = %key, "event for unknown entity ignored");
                        return Ok(PopupChange::Ignored);
                    }
                };
                if open {
                    self.dismiss_popup(key)
                } else {
                    Ok(self.open_popup(key))
                }
            }
        }
    }

    /// Close the popup of `key` if one is open.
    pub fn dismiss_popup(&mut self, key: EntityKey) -> Result<PopupChange, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let Some(popup) = self
            .registry
            .get_mut(&key)
            .and_then(|entry| entry.popup.take())
        else {
            return Ok(PopupChange::Ignored);
        };
        if let Err(error) = self.surface.close_popup(popup) {
            warn!(target: TARGET, key = %key, error = %error, "popup close failed");
        }
        Ok(PopupChange::Closed)
    }

    fn open_popup(&mut self, key: EntityKey) -> PopupChange {
        let Some(entry) = self.registry.get_mut(&key) else {
            return PopupChange::Ignored;
        };
        match self.surface.open_popup(&entry.pin, &entry.drawn.popup) {
            Ok(popup) => {
                entry.popup = Some(popup);
                PopupChange::Opened
            }
            Err(error) => {
                warn!(target: TARGET, key = %key, error = %error, "popup open failed");
                PopupChange::Ignored
            }
        }
    }

    /// Remove every overlay, then release the surface. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let removed = self.registry.len();
        let failures = self.teardown_all();
        self.surface.shutdown().map_err(SessionError::Close)?;
        info!(
            target: TARGET,
            cycles = self.cycles,
            removed,
            teardown_failures = failures.len(),
            "session.closed"
        );
        Ok(())
    }

    fn teardown_all(&mut self) -> Vec<EntityFailure> {
        let entries: Vec<_> = self.registry.drain().collect();
        let mut failures = Vec::new();
        for (key, entry) in entries {
            failures.extend(teardown_entry(key, entry, &mut self.surface));
        }
        failures
    }

    pub fn registry(&self) -> &OverlayRegistry<S> {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Number of completed `apply_snapshot` calls.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<S: MapSurface> Drop for MapSession<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!(
            target: TARGET,
            live = self.registry.len(),
            "session dropped without close, tearing down"
        );
        self.closed = true;
        self.teardown_all();
        if let Err(error) = self.surface.shutdown() {
            warn!(target: TARGET, error = %error, "surface shutdown failed during drop");
        }
    }
}
