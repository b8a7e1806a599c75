//! Test helpers: an in-memory recording surface and entity fixtures.
//!
//! [`RecordingSurface`] implements [`MapSurface`] without any rendering. It logs every
//! call, tracks which handles are still live, and can be told to reject specific kinds of
//! requests so failure paths can be exercised.

use std::collections::{HashMap, HashSet};

use crate::config::SurfaceConfig;
use crate::entity::{DriverEntity, EntityKey, RideEntity, RideStatus};
use crate::geo::{Coordinate, GeoPoint};
use crate::overlay::{LineStyle, PinStyle, PopupContent};
use crate::surface::{MapSurface, OverlayEvent, SurfaceError};

/// Pickup used by [`ride`] fixtures (central Douala).
pub const TEST_PICKUP: (f64, f64) = (4.05, 9.70);
/// Destination used by [`ride`] fixtures.
pub const TEST_DESTINATION: (f64, f64) = (4.08, 9.75);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Initialize,
    Shutdown,
    PlacePin,
    UpdatePinStyle,
    MovePin,
    RemovePin,
    PlaceLine,
    UpdateLine,
    RemoveLine,
    AttachListener,
    DetachListener,
    OpenPopup,
    UpdatePopup,
    ClosePopup,
}

/// One recorded surface call. Placements are recorded only when they succeed;
/// rejected requests are recorded as [`SurfaceCall::Rejected`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Initialize,
    Shutdown,
    PlacePin(PinId, GeoPoint, PinStyle),
    UpdatePinStyle(PinId, PinStyle),
    MovePin(PinId, GeoPoint),
    RemovePin(PinId),
    PlaceLine(LineId, GeoPoint, GeoPoint),
    UpdateLine(LineId, GeoPoint, GeoPoint),
    RemoveLine(LineId),
    AttachListener(ListenerId, PinId, EntityKey),
    DetachListener(ListenerId),
    OpenPopup(PopupId, PinId),
    UpdatePopup(PopupId),
    ClosePopup(PopupId),
    Rejected(CallKind),
}

impl SurfaceCall {
    pub fn kind(&self) -> Option<CallKind> {
        let kind = match self {
            SurfaceCall::Initialize => CallKind::Initialize,
            SurfaceCall::Shutdown => CallKind::Shutdown,
            SurfaceCall::PlacePin(..) => CallKind::PlacePin,
            SurfaceCall::UpdatePinStyle(..) => CallKind::UpdatePinStyle,
            SurfaceCall::MovePin(..) => CallKind::MovePin,
            SurfaceCall::RemovePin(..) => CallKind::RemovePin,
            SurfaceCall::PlaceLine(..) => CallKind::PlaceLine,
            SurfaceCall::UpdateLine(..) => CallKind::UpdateLine,
            SurfaceCall::RemoveLine(..) => CallKind::RemoveLine,
            SurfaceCall::AttachListener(..) => CallKind::AttachListener,
            SurfaceCall::DetachListener(..) => CallKind::DetachListener,
            SurfaceCall::OpenPopup(..) => CallKind::OpenPopup,
            SurfaceCall::UpdatePopup(..) => CallKind::UpdatePopup,
            SurfaceCall::ClosePopup(..) => CallKind::ClosePopup,
            SurfaceCall::Rejected(_) => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Default)]
struct Faults {
    rejected_points: Vec<GeoPoint>,
    lines: bool,
    style_updates: bool,
    listeners: bool,
    removals: bool,
    initialize: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    next_id: u64,
    calls: Vec<SurfaceCall>,
    pins: HashMap<PinId, (GeoPoint, PinStyle)>,
    lines: HashMap<LineId, (GeoPoint, GeoPoint)>,
    listeners: HashMap<ListenerId, (PinId, EntityKey)>,
    popups: HashMap<PopupId, (PinId, PopupContent)>,
    stray_releases: usize,
    initialized: bool,
    faults: Faults,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls
            .iter()
            .filter(|call| call.kind() == Some(kind))
            .count()
    }

    /// Every recorded call, including rejected ones.
    pub fn total_calls(&self) -> usize {
        self.calls.len()
    }

    pub fn live_pins(&self) -> usize {
        self.pins.len()
    }

    pub fn live_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn live_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn open_popups(&self) -> usize {
        self.popups.len()
    }

    pub fn live_handles(&self) -> usize {
        self.pins.len() + self.lines.len() + self.listeners.len() + self.popups.len()
    }

    /// Releases of handles that were not live (double removal or foreign handle).
    pub fn stray_releases(&self) -> usize {
        self.stray_releases
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn pin_style(&self, pin: PinId) -> Option<PinStyle> {
        self.pins.get(&pin).map(|(_, style)| *style)
    }

    pub fn popup_title(&self, popup: PopupId) -> Option<&str> {
        self.popups
            .get(&popup)
            .map(|(_, content)| content.title.as_str())
    }

    /// Keys routed by the listeners attached to `pin`.
    pub fn listener_targets(&self, pin: PinId) -> Vec<EntityKey> {
        self.listeners
            .values()
            .filter(|(owner, _)| *owner == pin)
            .map(|(_, key)| *key)
            .collect()
    }

    pub fn reject_at(&mut self, point: GeoPoint) {
        self.faults.rejected_points.push(point);
    }

    pub fn reject_lines(&mut self, reject: bool) {
        self.faults.lines = reject;
    }

    pub fn reject_style_updates(&mut self, reject: bool) {
        self.faults.style_updates = reject;
    }

    pub fn reject_listeners(&mut self, reject: bool) {
        self.faults.listeners = reject;
    }

    /// Removal calls report `InvalidHandle` but still drop the handle.
    pub fn fail_removals(&mut self, fail: bool) {
        self.faults.removals = fail;
    }

    pub fn fail_initialize(&mut self, fail: bool) {
        self.faults.initialize = fail;
    }

    pub fn fail_shutdown(&mut self, fail: bool) {
        self.faults.shutdown = fail;
    }

    pub fn clear_faults(&mut self) {
        self.faults = Faults::default();
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn rejects(&self, point: &GeoPoint) -> bool {
        self.faults.rejected_points.contains(point)
    }

    fn reject(&mut self, kind: CallKind, reason: &str) -> SurfaceError {
        self.calls.push(SurfaceCall::Rejected(kind));
        SurfaceError::Rejected(reason.to_string())
    }

    fn release(&mut self, was_live: bool) -> Result<(), SurfaceError> {
        if !was_live {
            self.stray_releases += 1;
            return Err(SurfaceError::InvalidHandle);
        }
        if self.faults.removals {
            return Err(SurfaceError::InvalidHandle);
        }
        Ok(())
    }
}

impl MapSurface for RecordingSurface {
    type Pin = PinId;
    type Line = LineId;
    type Listener = ListenerId;
    type Popup = PopupId;

    fn initialize(&mut self, _config: &SurfaceConfig) -> Result<(), SurfaceError> {
        if self.faults.initialize {
            self.calls.push(SurfaceCall::Rejected(CallKind::Initialize));
            return Err(SurfaceError::Unavailable("map failed to load".to_string()));
        }
        self.calls.push(SurfaceCall::Initialize);
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SurfaceError> {
        self.calls.push(SurfaceCall::Shutdown);
        self.initialized = false;
        if self.faults.shutdown {
            return Err(SurfaceError::Unavailable("map already detached".to_string()));
        }
        Ok(())
    }

    fn place_pin(&mut self, position: GeoPoint, style: PinStyle) -> Result<PinId, SurfaceError> {
        if self.rejects(&position) {
            return Err(self.reject(CallKind::PlacePin, "bad pin position"));
        }
        let pin = PinId(self.next_id());
        self.pins.insert(pin, (position, style));
        self.calls.push(SurfaceCall::PlacePin(pin, position, style));
        Ok(pin)
    }

    fn update_pin_style(&mut self, pin: &PinId, style: PinStyle) -> Result<(), SurfaceError> {
        if self.faults.style_updates {
            return Err(self.reject(CallKind::UpdatePinStyle, "style update refused"));
        }
        let Some(entry) = self.pins.get_mut(pin) else {
            return Err(SurfaceError::InvalidHandle);
        };
        entry.1 = style;
        self.calls.push(SurfaceCall::UpdatePinStyle(*pin, style));
        Ok(())
    }

    fn move_pin(&mut self, pin: &PinId, position: GeoPoint) -> Result<(), SurfaceError> {
        if self.rejects(&position) {
            return Err(self.reject(CallKind::MovePin, "bad pin position"));
        }
        let Some(entry) = self.pins.get_mut(pin) else {
            return Err(SurfaceError::InvalidHandle);
        };
        entry.0 = position;
        self.calls.push(SurfaceCall::MovePin(*pin, position));
        Ok(())
    }

    fn remove_pin(&mut self, pin: PinId) -> Result<(), SurfaceError> {
        self.calls.push(SurfaceCall::RemovePin(pin));
        let was_live = self.pins.remove(&pin).is_some();
        self.release(was_live)
    }

    fn place_line(
        &mut self,
        from: GeoPoint,
        to: GeoPoint,
        _style: LineStyle,
    ) -> Result<LineId, SurfaceError> {
        if self.faults.lines || self.rejects(&from) || self.rejects(&to) {
            return Err(self.reject(CallKind::PlaceLine, "line refused"));
        }
        let line = LineId(self.next_id());
        self.lines.insert(line, (from, to));
        self.calls.push(SurfaceCall::PlaceLine(line, from, to));
        Ok(line)
    }

    fn update_line(
        &mut self,
        line: &LineId,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<(), SurfaceError> {
        if self.faults.lines || self.rejects(&from) || self.rejects(&to) {
            return Err(self.reject(CallKind::UpdateLine, "line refused"));
        }
        let Some(entry) = self.lines.get_mut(line) else {
            return Err(SurfaceError::InvalidHandle);
        };
        *entry = (from, to);
        self.calls.push(SurfaceCall::UpdateLine(*line, from, to));
        Ok(())
    }

    fn remove_line(&mut self, line: LineId) -> Result<(), SurfaceError> {
        self.calls.push(SurfaceCall::RemoveLine(line));
        let was_live = self.lines.remove(&line).is_some();
        self.release(was_live)
    }

    fn attach_listener(
        &mut self,
        pin: &PinId,
        _event: OverlayEvent,
        target: EntityKey,
    ) -> Result<ListenerId, SurfaceError> {
        if self.faults.listeners {
            return Err(self.reject(CallKind::AttachListener, "listener refused"));
        }
        if !self.pins.contains_key(pin) {
            return Err(SurfaceError::InvalidHandle);
        }
        let listener = ListenerId(self.next_id());
        self.listeners.insert(listener, (*pin, target));
        self.calls
            .push(SurfaceCall::AttachListener(listener, *pin, target));
        Ok(listener)
    }

    fn detach_listener(&mut self, listener: ListenerId) -> Result<(), SurfaceError> {
        self.calls.push(SurfaceCall::DetachListener(listener));
        let was_live = self.listeners.remove(&listener).is_some();
        self.release(was_live)
    }

    fn open_popup(&mut self, pin: &PinId, content: &PopupContent) -> Result<PopupId, SurfaceError> {
        if !self.pins.contains_key(pin) {
            return Err(SurfaceError::InvalidHandle);
        }
        let popup = PopupId(self.next_id());
        self.popups.insert(popup, (*pin, content.clone()));
        self.calls.push(SurfaceCall::OpenPopup(popup, *pin));
        Ok(popup)
    }

    fn update_popup(
        &mut self,
        popup: &PopupId,
        content: &PopupContent,
    ) -> Result<(), SurfaceError> {
        let Some(entry) = self.popups.get_mut(popup) else {
            return Err(SurfaceError::InvalidHandle);
        };
        entry.1 = content.clone();
        self.calls.push(SurfaceCall::UpdatePopup(*popup));
        Ok(())
    }

    fn close_popup(&mut self, popup: PopupId) -> Result<(), SurfaceError> {
        self.calls.push(SurfaceCall::ClosePopup(popup));
        let was_live = self.popups.remove(&popup).is_some();
        self.release(was_live)
    }
}

/// Pin ids placed in `calls`, deduplicated.
pub fn distinct_pins(calls: &[SurfaceCall]) -> HashSet<PinId> {
    calls
        .iter()
        .filter_map(|call| match call {
            SurfaceCall::PlacePin(pin, ..) => Some(*pin),
            _ => None,
        })
        .collect()
}

pub fn driver(id: u64, lat: f64, lng: f64, is_online: bool) -> DriverEntity {
    DriverEntity {
        id,
        name: format!("Driver {id}"),
        position: Coordinate::new(lat, lng),
        is_online,
    }
}

pub fn driver_without_position(id: u64) -> DriverEntity {
    DriverEntity {
        id,
        name: format!("Driver {id}"),
        position: Coordinate {
            lat: None,
            lng: Some(TEST_PICKUP.1),
        },
        is_online: true,
    }
}

pub fn ride(id: u64, status: RideStatus) -> RideEntity {
    RideEntity {
        id,
        rider_id: Some(id + 1_000),
        pickup: Coordinate::new(TEST_PICKUP.0, TEST_PICKUP.1),
        destination: Coordinate::new(TEST_DESTINATION.0, TEST_DESTINATION.1),
        status,
    }
}
