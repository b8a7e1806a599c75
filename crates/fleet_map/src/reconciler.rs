//! Keyed reconciliation of the overlay registry against a fresh entity snapshot.
//!
//! One cycle:
//!
//! 1. Describe every entity; entities without drawable coordinates are skipped. When a
//!    key repeats, the copy with the highest fingerprint is kept, whatever its position.
//! 2. Tear down every registry entry whose key is not among the drawable candidates.
//! 3. Place overlays for new keys; for known keys compare fingerprints and apply only
//!    the parts that differ. Unchanged entities cause no surface calls.
//!
//! Surface failures are contained per entity: they are logged with the entity key,
//! recorded in the [`ReconcileReport`], and the cycle carries on with the rest.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::entity::{EntityKey, EntityRef};
use crate::overlay::{describe, Fingerprint, OverlayDescriptor};
use crate::registry::{OverlayRegistry, RegistryEntry};
use crate::surface::{MapSurface, OverlayEvent, SurfaceError};

const TARGET: &str = "fleet_map::reconcile";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityFailure {
    /// The surface rejected a placement or update for this entity.
    #[error("placing overlays for {key} failed: {source}")]
    Placement { key: EntityKey, source: SurfaceError },
    /// A removal call failed; the handle is considered released anyway.
    #[error("removing overlays for {key} failed: {source}")]
    Teardown { key: EntityKey, source: SurfaceError },
}

impl EntityFailure {
    pub fn key(&self) -> EntityKey {
        match self {
            EntityFailure::Placement { key, .. } | EntityFailure::Teardown { key, .. } => *key,
        }
    }
}

/// Outcome counts for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped_invalid: usize,
    pub duplicates: usize,
    pub failures: Vec<EntityFailure>,
}

impl ReconcileReport {
    /// True when the cycle neither changed the surface nor hit a failure.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0 && self.failures.is_empty()
    }
}

pub fn reconcile<'a, S, I>(
    mut registry: OverlayRegistry<S>,
    entities: I,
    surface: &mut S,
) -> (OverlayRegistry<S>, ReconcileReport)
where
    S: MapSurface,
    I: IntoIterator<Item = EntityRef<'a>>,
{
    let mut report = ReconcileReport::default();

    let mut candidates: BTreeMap<EntityKey, (Fingerprint, OverlayDescriptor)> = BTreeMap::new();
    for entity in entities {
        let key = entity.key();
        let descriptor = match describe(entity) {
            Ok(descriptor) => descriptor,
            Err(invalid) => {
                report.skipped_invalid += 1;
                debug!(
                    target: TARGET,
                    key = %invalid.key,
                    field = invalid.field,
                    "entity not drawable"
                );
                continue;
            }
        };
        let fingerprint = descriptor.fingerprint();
        match candidates.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert((fingerprint, descriptor));
            }
            Entry::Occupied(mut slot) => {
                report.duplicates += 1;
                warn!(
                    target: TARGET,
                    key = %key,
                    "duplicate entity in snapshot, keeping the highest fingerprint"
                );
                if fingerprint > slot.get().0 {
                    slot.insert((fingerprint, descriptor));
                }
            }
        }
    }

    let stale: Vec<EntityKey> = registry
        .keys()
        .filter(|key| !candidates.contains_key(*key))
        .copied()
        .collect();
    for key in stale {
        if let Some(entry) = registry.remove(&key) {
            report.removed += 1;
            report.failures.extend(teardown_entry(key, entry, surface));
        }
    }

    for (key, (fingerprint, descriptor)) in candidates {
        if let Some(entry) = registry.get_mut(&key) {
            if entry.fingerprint == fingerprint {
                report.unchanged += 1;
                continue;
            }
            match update_entry(entry, descriptor, surface) {
                Ok(()) => report.updated += 1,
                Err(source) => {
                    warn!(target: TARGET, key = %key, error = %source, "overlay update failed");
                    report.failures.push(EntityFailure::Placement { key, source });
                }
            }
            continue;
        }

        match create_entry(key, descriptor, surface) {
            Ok(entry) => {
                report.created += 1;
                if let Some(displaced) = registry.set(key, entry) {
                    report.failures.extend(teardown_entry(key, displaced, surface));
                }
            }
            Err(source) => {
                warn!(target: TARGET, key = %key, error = %source, "overlay placement failed");
                report.failures.push(EntityFailure::Placement { key, source });
            }
        }
    }

    debug!(
        target: TARGET,
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        removed = report.removed,
        skipped_invalid = report.skipped_invalid,
        failures = report.failures.len(),
        "reconcile.cycle"
    );
    (registry, report)
}

/// Release every handle of an entry. All removals are attempted even if some fail.
pub fn teardown_entry<S: MapSurface>(
    key: EntityKey,
    entry: RegistryEntry<S>,
    surface: &mut S,
) -> Vec<EntityFailure> {
    let RegistryEntry {
        pin,
        line,
        listener,
        popup,
        ..
    } = entry;

    let mut failures = Vec::new();
    let mut note = |result: Result<(), SurfaceError>| {
        if let Err(source) = result {
            warn!(target: TARGET, key = %key, error = %source, "overlay teardown failed");
            failures.push(EntityFailure::Teardown { key, source });
        }
    };
    if let Some(popup) = popup {
        note(surface.close_popup(popup));
    }
    if let Some(listener) = listener {
        note(surface.detach_listener(listener));
    }
    if let Some(line) = line {
        note(surface.remove_line(line));
    }
    note(surface.remove_pin(pin));
    failures
}

/// Place pin, line and click listener. On failure, primitives already placed for this
/// entity are removed again so nothing is left behind.
fn create_entry<S: MapSurface>(
    key: EntityKey,
    descriptor: OverlayDescriptor,
    surface: &mut S,
) -> Result<RegistryEntry<S>, SurfaceError> {
    let pin = surface.place_pin(descriptor.position, descriptor.style)?;

    let line = match descriptor.line {
        Some(line) => match surface.place_line(line.from, line.to, line.style) {
            Ok(handle) => Some(handle),
            Err(error) => {
                rollback(key, surface.remove_pin(pin));
                return Err(error);
            }
        },
        None => None,
    };

    let listener = match surface.attach_listener(&pin, OverlayEvent::Click, key) {
        Ok(listener) => listener,
        Err(error) => {
            if let Some(line) = line {
                rollback(key, surface.remove_line(line));
            }
            rollback(key, surface.remove_pin(pin));
            return Err(error);
        }
    };

    let mut entry = RegistryEntry::new(pin, descriptor);
    entry.line = line;
    entry.listener = Some(listener);
    Ok(entry)
}

fn rollback(key: EntityKey, result: Result<(), SurfaceError>) {
    if let Err(error) = result {
        warn!(target: TARGET, key = %key, error = %error, "rollback of partial placement failed");
    }
}

fn update_entry<S: MapSurface>(
    entry: &mut RegistryEntry<S>,
    target: OverlayDescriptor,
    surface: &mut S,
) -> Result<(), SurfaceError> {
    let result = apply_changes(entry, target, surface);
    // Whatever got applied before a failure is what the surface now shows.
    entry.refresh_fingerprint();
    result
}

fn apply_changes<S: MapSurface>(
    entry: &mut RegistryEntry<S>,
    target: OverlayDescriptor,
    surface: &mut S,
) -> Result<(), SurfaceError> {
    if entry.drawn.position != target.position {
        surface.move_pin(&entry.pin, target.position)?;
        entry.drawn.position = target.position;
    }
    if entry.drawn.style != target.style {
        surface.update_pin_style(&entry.pin, target.style)?;
        entry.drawn.style = target.style;
    }

    match (entry.line.take(), target.line) {
        (Some(handle), Some(line)) => {
            let moved = entry
                .drawn
                .line
                .map_or(true, |drawn| !drawn.same_endpoints(&line));
            let result = if moved {
                surface.update_line(&handle, line.from, line.to)
            } else {
                Ok(())
            };
            entry.line = Some(handle);
            result?;
            entry.drawn.line = Some(line);
        }
        (Some(handle), None) => {
            entry.drawn.line = None;
            surface.remove_line(handle)?;
        }
        (None, Some(line)) => {
            let handle = surface.place_line(line.from, line.to, line.style)?;
            entry.line = Some(handle);
            entry.drawn.line = Some(line);
        }
        (None, None) => {}
    }

    if entry.drawn.popup != target.popup {
        if let Some(popup) = &entry.popup {
            surface.update_popup(popup, &target.popup)?;
        }
        entry.drawn.popup = target.popup;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DriverEntity, RideStatus};
    use crate::test_helpers::{driver, ride, CallKind, RecordingSurface};

    fn run(
        registry: OverlayRegistry<RecordingSurface>,
        drivers: &[DriverEntity],
        surface: &mut RecordingSurface,
    ) -> (OverlayRegistry<RecordingSurface>, ReconcileReport) {
        reconcile(registry, drivers.iter().map(EntityRef::Driver), surface)
    }

    #[test]
    fn new_entities_get_pin_and_listener() {
        let mut surface = RecordingSurface::new();
        let (registry, report) = run(
            OverlayRegistry::new(),
            &[driver(1, 4.0, 9.0, true)],
            &mut surface,
        );
        assert_eq!(report.created, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(surface.count(CallKind::PlacePin), 1);
        assert_eq!(surface.count(CallKind::AttachListener), 1);
        assert_eq!(surface.count(CallKind::PlaceLine), 0);
    }

    #[test]
    fn moved_driver_only_moves_pin() {
        let mut surface = RecordingSurface::new();
        let (registry, _) = run(
            OverlayRegistry::new(),
            &[driver(1, 4.0, 9.0, true)],
            &mut surface,
        );
        surface.clear_calls();
        let (registry, report) = run(registry, &[driver(1, 4.01, 9.0, true)], &mut surface);
        assert_eq!(report.updated, 1);
        assert_eq!(surface.count(CallKind::MovePin), 1);
        assert_eq!(surface.total_calls(), 1);
        let entry = registry.get(&EntityKey::driver(1)).expect("entry");
        assert_eq!(entry.fingerprint, entry.drawn.fingerprint());
    }

    #[test]
    fn failed_line_placement_rolls_back_pin() {
        let mut surface = RecordingSurface::new();
        surface.reject_lines(true);
        let rides = [ride(4, RideStatus::Pending)];
        let (registry, report) = reconcile(
            OverlayRegistry::new(),
            rides.iter().map(EntityRef::Ride),
            &mut surface,
        );
        assert!(registry.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key(), EntityKey::ride(4));
        assert_eq!(surface.count(CallKind::PlacePin), 1);
        assert_eq!(surface.count(CallKind::RemovePin), 1);
        assert_eq!(surface.live_handles(), 0);
    }

    #[test]
    fn failed_update_keeps_fingerprint_of_applied_state() {
        let mut surface = RecordingSurface::new();
        let (registry, _) = run(
            OverlayRegistry::new(),
            &[driver(1, 4.0, 9.0, true)],
            &mut surface,
        );
        let before = registry
            .get(&EntityKey::driver(1))
            .expect("entry")
            .fingerprint;

        surface.reject_style_updates(true);
        let (registry, report) = run(registry, &[driver(1, 4.02, 9.0, false)], &mut surface);
        assert_eq!(report.updated, 0);
        assert_eq!(report.failures.len(), 1);

        let entry = registry.get(&EntityKey::driver(1)).expect("entry survives");
        // The move went through, the style change did not.
        assert_eq!(entry.drawn.position.lat, 4.02);
        assert_ne!(entry.fingerprint, before);
        assert_eq!(entry.fingerprint, entry.drawn.fingerprint());

        surface.reject_style_updates(false);
        surface.clear_calls();
        let (_, report) = run(registry, &[driver(1, 4.02, 9.0, false)], &mut surface);
        assert_eq!(report.updated, 1);
        assert_eq!(surface.count(CallKind::UpdatePinStyle), 1);
        assert_eq!(surface.count(CallKind::MovePin), 0);
    }

    #[test]
    fn duplicate_keys_resolve_the_same_in_any_order() {
        let forward = [driver(3, 4.0, 9.0, true), driver(3, 5.0, 9.0, false)];
        let reversed = [forward[1].clone(), forward[0].clone()];

        let mut surface = RecordingSurface::new();
        let (first, report) = run(OverlayRegistry::new(), &forward, &mut surface);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.created, 1);
        assert_eq!(first.len(), 1);

        let mut surface = RecordingSurface::new();
        let (second, report) = run(OverlayRegistry::new(), &reversed, &mut surface);
        assert_eq!(report.duplicates, 1);

        let key = EntityKey::driver(3);
        let first = first.get(&key).expect("entry");
        let second = second.get(&key).expect("entry");
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.drawn.position, second.drawn.position);
    }

    #[test]
    fn repeated_duplicate_snapshot_is_a_noop() {
        let drivers = [driver(3, 4.0, 9.0, true), driver(3, 5.0, 9.0, false)];
        let mut surface = RecordingSurface::new();
        let (registry, _) = run(OverlayRegistry::new(), &drivers, &mut surface);
        surface.clear_calls();

        let reversed = [drivers[1].clone(), drivers[0].clone()];
        let (_, report) = run(registry, &reversed, &mut surface);
        assert!(report.is_noop());
        assert_eq!(surface.total_calls(), 0);
    }
}
