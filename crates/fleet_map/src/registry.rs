//! Overlay handle registry: `(kind, id)` -> live surface handles for that entity.
//!
//! Pure bookkeeping. Nothing here talks to the surface; whoever takes an entry out
//! of the registry owns its handles and must release them.

use std::collections::HashMap;

use crate::entity::EntityKey;
use crate::overlay::{Fingerprint, OverlayDescriptor};
use crate::surface::MapSurface;

pub struct RegistryEntry<S: MapSurface> {
    pub pin: S::Pin,
    pub line: Option<S::Line>,
    pub listener: Option<S::Listener>,
    pub popup: Option<S::Popup>,
    /// What the surface currently shows for this entity.
    pub drawn: OverlayDescriptor,
    pub fingerprint: Fingerprint,
}

impl<S: MapSurface> RegistryEntry<S> {
    pub fn new(pin: S::Pin, drawn: OverlayDescriptor) -> Self {
        let fingerprint = drawn.fingerprint();
        Self {
            pin,
            line: None,
            listener: None,
            popup: None,
            drawn,
            fingerprint,
        }
    }

    pub fn has_open_popup(&self) -> bool {
        self.popup.is_some()
    }

    pub(crate) fn refresh_fingerprint(&mut self) {
        self.fingerprint = self.drawn.fingerprint();
    }
}

pub struct OverlayRegistry<S: MapSurface> {
    entries: HashMap<EntityKey, RegistryEntry<S>>,
}

impl<S: MapSurface> Default for OverlayRegistry<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S: MapSurface> OverlayRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&RegistryEntry<S>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut RegistryEntry<S>> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Store an entry, handing back any entry it displaced so its handles can be released.
    #[must_use = "a displaced entry still owns live surface handles"]
    pub fn set(&mut self, key: EntityKey, entry: RegistryEntry<S>) -> Option<RegistryEntry<S>> {
        self.entries.insert(key, entry)
    }

    /// Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &EntityKey) -> Option<RegistryEntry<S>> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&EntityKey, &RegistryEntry<S>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empty the registry, yielding every entry for teardown.
    pub fn drain(&mut self) -> impl Iterator<Item = (EntityKey, RegistryEntry<S>)> + '_ {
        self.entries.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DriverEntity, EntityRef};
    use crate::geo::Coordinate;
    use crate::overlay::describe;
    use crate::test_helpers::{PinId, RecordingSurface};

    fn entry(pin: u64) -> RegistryEntry<RecordingSurface> {
        let driver = DriverEntity {
            id: pin,
            name: "Test".to_string(),
            position: Coordinate::new(4.0, 9.0),
            is_online: true,
        };
        let descriptor = describe(EntityRef::Driver(&driver)).expect("drawable");
        RegistryEntry::new(PinId(pin), descriptor)
    }

    #[test]
    fn remove_of_absent_key_is_noop() {
        let mut registry = OverlayRegistry::<RecordingSurface>::new();
        assert!(registry.remove(&EntityKey::driver(1)).is_none());
        assert!(registry.set(EntityKey::driver(1), entry(1)).is_none());
        assert!(registry.remove(&EntityKey::driver(1)).is_some());
        assert!(registry.remove(&EntityKey::driver(1)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn set_returns_displaced_entry() {
        let mut registry = OverlayRegistry::<RecordingSurface>::new();
        assert!(registry.set(EntityKey::ride(3), entry(1)).is_none());
        let displaced = registry
            .set(EntityKey::ride(3), entry(2))
            .expect("first entry should be handed back");
        assert_eq!(displaced.pin, PinId(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(&EntityKey::ride(3)).map(|entry| entry.pin),
            Some(PinId(2))
        );
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry = OverlayRegistry::<RecordingSurface>::new();
        let _ = registry.set(EntityKey::driver(1), entry(1));
        let _ = registry.set(EntityKey::ride(1), entry(2));
        let mut drained: Vec<EntityKey> = registry.drain().map(|(key, _)| key).collect();
        drained.sort();
        assert_eq!(drained, vec![EntityKey::driver(1), EntityKey::ride(1)]);
        assert!(registry.is_empty());
    }
}
