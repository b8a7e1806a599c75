//! In-process map surface drawn with the egui painter.
//!
//! Overlays live in id-keyed tables; handles are opaque tokens over those ids. A click on
//! the map is hit-tested against pins that carry a listener, and the listener's target key
//! is handed back to the caller for routing into the session.

use std::collections::{BTreeMap, HashMap};

use eframe::egui::{Pos2, Rect};

use fleet_map::config::{BaseStyle, SurfaceConfig};
use fleet_map::entity::EntityKey;
use fleet_map::geo::GeoPoint;
use fleet_map::overlay::{LineStyle, PinStyle, PopupContent};
use fleet_map::surface::{MapSurface, OverlayEvent, SurfaceError};

use crate::ui::rendering::{MapBounds, Viewport, PIN_RADIUS};

/// Extra pixels around a pin that still count as a hit.
const HIT_SLOP: f32 = 3.0;

#[derive(Debug, PartialEq, Eq)]
pub struct PinHandle(u64);

#[derive(Debug, PartialEq, Eq)]
pub struct LineHandle(u64);

#[derive(Debug, PartialEq, Eq)]
pub struct ListenerHandle(u64);

#[derive(Debug, PartialEq, Eq)]
pub struct PopupHandle(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct PinState {
    pub position: GeoPoint,
    pub style: PinStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineState {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub style: LineStyle,
}

#[derive(Debug, Clone)]
struct ListenerState {
    pin: u64,
    event: OverlayEvent,
    target: EntityKey,
}

#[derive(Debug, Clone)]
struct PopupState {
    pin: u64,
    content: PopupContent,
}

#[derive(Debug, Default)]
pub struct PainterSurface {
    next_id: u64,
    viewport: Option<Viewport>,
    base_style: BaseStyle,
    pins: BTreeMap<u64, PinState>,
    lines: BTreeMap<u64, LineState>,
    listeners: HashMap<u64, ListenerState>,
    popups: BTreeMap<u64, PopupState>,
}

impl PainterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        self.viewport.as_mut()
    }

    pub fn base_style(&self) -> &BaseStyle {
        &self.base_style
    }

    pub fn base_style_mut(&mut self) -> &mut BaseStyle {
        &mut self.base_style
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineState> {
        self.lines.values()
    }

    /// Pins in placement order, each with the key of the entity its listener routes to.
    pub fn pins_with_labels(&self) -> impl Iterator<Item = (&PinState, Option<String>)> {
        self.pins.iter().map(|(id, pin)| {
            let label = self
                .listeners
                .values()
                .find(|listener| listener.pin == *id)
                .map(|listener| listener.target.to_string());
            (pin, label)
        })
    }

    /// Open popups with the current position of their anchor pin.
    pub fn open_popups(&self) -> impl Iterator<Item = (GeoPoint, &PopupContent)> {
        self.popups.values().filter_map(|popup| {
            self.pins
                .get(&popup.pin)
                .map(|pin| (pin.position, &popup.content))
        })
    }

    /// Nearest clickable pin under `pointer`, reported as its listener target.
    pub fn hit_test(&self, bounds: &MapBounds, rect: Rect, pointer: Pos2) -> Option<EntityKey> {
        let reach = PIN_RADIUS + HIT_SLOP;
        self.listeners
            .values()
            .filter(|listener| listener.event == OverlayEvent::Click)
            .filter_map(|listener| {
                let pin = self.pins.get(&listener.pin)?;
                let distance = bounds.project(pin.position, rect).distance(pointer);
                (distance <= reach).then_some((distance, listener.target))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, target)| target)
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_ready(&self) -> Result<(), SurfaceError> {
        if self.viewport.is_some() {
            Ok(())
        } else {
            Err(SurfaceError::Unavailable("surface not initialized".to_string()))
        }
    }
}

fn ensure_finite(point: GeoPoint) -> Result<(), SurfaceError> {
    if point.lat.is_finite() && point.lng.is_finite() {
        Ok(())
    } else {
        Err(SurfaceError::Rejected(format!(
            "non-finite position {}, {}",
            point.lat, point.lng
        )))
    }
}

impl MapSurface for PainterSurface {
    type Pin = PinHandle;
    type Line = LineHandle;
    type Listener = ListenerHandle;
    type Popup = PopupHandle;

    fn initialize(&mut self, config: &SurfaceConfig) -> Result<(), SurfaceError> {
        if self.viewport.is_some() {
            return Err(SurfaceError::Rejected("surface already initialized".to_string()));
        }
        ensure_finite(config.center)?;
        self.viewport = Some(Viewport {
            center: config.center,
            zoom: config.zoom,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        });
        self.base_style = config.style;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SurfaceError> {
        self.ensure_ready()?;
        if !self.pins.is_empty() || !self.lines.is_empty() {
            tracing::warn!(
                pins = self.pins.len(),
                lines = self.lines.len(),
                "surface.shutdown_with_overlays"
            );
        }
        self.pins.clear();
        self.lines.clear();
        self.listeners.clear();
        self.popups.clear();
        self.viewport = None;
        Ok(())
    }

    fn place_pin(
        &mut self,
        position: GeoPoint,
        style: PinStyle,
    ) -> Result<PinHandle, SurfaceError> {
        self.ensure_ready()?;
        ensure_finite(position)?;
        let id = self.next_id();
        self.pins.insert(id, PinState { position, style });
        Ok(PinHandle(id))
    }

    fn update_pin_style(&mut self, pin: &PinHandle, style: PinStyle) -> Result<(), SurfaceError> {
        let state = self.pins.get_mut(&pin.0).ok_or(SurfaceError::InvalidHandle)?;
        state.style = style;
        Ok(())
    }

    fn move_pin(&mut self, pin: &PinHandle, position: GeoPoint) -> Result<(), SurfaceError> {
        ensure_finite(position)?;
        let state = self.pins.get_mut(&pin.0).ok_or(SurfaceError::InvalidHandle)?;
        state.position = position;
        Ok(())
    }

    fn remove_pin(&mut self, pin: PinHandle) -> Result<(), SurfaceError> {
        self.pins
            .remove(&pin.0)
            .map(|_| ())
            .ok_or(SurfaceError::InvalidHandle)
    }

    fn place_line(
        &mut self,
        from: GeoPoint,
        to: GeoPoint,
        style: LineStyle,
    ) -> Result<LineHandle, SurfaceError> {
        self.ensure_ready()?;
        ensure_finite(from)?;
        ensure_finite(to)?;
        let id = self.next_id();
        self.lines.insert(id, LineState { from, to, style });
        Ok(LineHandle(id))
    }

    fn update_line(
        &mut self,
        line: &LineHandle,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<(), SurfaceError> {
        ensure_finite(from)?;
        ensure_finite(to)?;
        let state = self.lines.get_mut(&line.0).ok_or(SurfaceError::InvalidHandle)?;
        state.from = from;
        state.to = to;
        Ok(())
    }

    fn remove_line(&mut self, line: LineHandle) -> Result<(), SurfaceError> {
        self.lines
            .remove(&line.0)
            .map(|_| ())
            .ok_or(SurfaceError::InvalidHandle)
    }

    fn attach_listener(
        &mut self,
        pin: &PinHandle,
        event: OverlayEvent,
        target: EntityKey,
    ) -> Result<ListenerHandle, SurfaceError> {
        if !self.pins.contains_key(&pin.0) {
            return Err(SurfaceError::InvalidHandle);
        }
        let id = self.next_id();
        self.listeners.insert(
            id,
            ListenerState {
                pin: pin.0,
                event,
                target,
            },
        );
        Ok(ListenerHandle(id))
    }

    fn detach_listener(&mut self, listener: ListenerHandle) -> Result<(), SurfaceError> {
        self.listeners
            .remove(&listener.0)
            .map(|_| ())
            .ok_or(SurfaceError::InvalidHandle)
    }

    fn open_popup(
        &mut self,
        pin: &PinHandle,
        content: &PopupContent,
    ) -> Result<PopupHandle, SurfaceError> {
        if !self.pins.contains_key(&pin.0) {
            return Err(SurfaceError::InvalidHandle);
        }
        let id = self.next_id();
        self.popups.insert(
            id,
            PopupState {
                pin: pin.0,
                content: content.clone(),
            },
        );
        Ok(PopupHandle(id))
    }

    fn update_popup(
        &mut self,
        popup: &PopupHandle,
        content: &PopupContent,
    ) -> Result<(), SurfaceError> {
        let state = self.popups.get_mut(&popup.0).ok_or(SurfaceError::InvalidHandle)?;
        state.content = content.clone();
        Ok(())
    }

    fn close_popup(&mut self, popup: PopupHandle) -> Result<(), SurfaceError> {
        self.popups
            .remove(&popup.0)
            .map(|_| ())
            .ok_or(SurfaceError::InvalidHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::Vec2;
    use fleet_map::config::DEFAULT_CENTER;
    use fleet_map::entity::RideStatus;
    use fleet_map::session::{MapSession, PopupChange};
    use fleet_map::test_helpers::{driver, ride};

    fn panel() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    fn open_session() -> MapSession<PainterSurface> {
        MapSession::open(PainterSurface::new(), SurfaceConfig::default()).expect("open")
    }

    #[test]
    fn placement_before_initialize_is_unavailable() {
        let mut surface = PainterSurface::new();
        assert!(matches!(
            surface.place_pin(DEFAULT_CENTER, PinStyle::DriverOnline),
            Err(SurfaceError::Unavailable(_))
        ));
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        let mut surface = PainterSurface::new();
        surface.initialize(&SurfaceConfig::default()).expect("init");
        let bad = GeoPoint {
            lat: f64::NAN,
            lng: 9.7,
        };
        assert!(matches!(
            surface.place_pin(bad, PinStyle::DriverOnline),
            Err(SurfaceError::Rejected(_))
        ));
        let pin = surface
            .place_pin(DEFAULT_CENTER, PinStyle::DriverOnline)
            .expect("pin");
        assert!(surface.move_pin(&pin, bad).is_err());
        assert_eq!(surface.pin_count(), 1);
    }

    #[test]
    fn removed_handles_are_gone() {
        let mut surface = PainterSurface::new();
        surface.initialize(&SurfaceConfig::default()).expect("init");
        let pin = surface
            .place_pin(DEFAULT_CENTER, PinStyle::RidePending)
            .expect("pin");
        let popup = surface
            .open_popup(&pin, &PopupContent::default())
            .expect("popup");
        surface.close_popup(popup).expect("close");
        surface.remove_pin(pin).expect("remove");
        assert_eq!(surface.pin_count(), 0);
        assert_eq!(surface.popup_count(), 0);
    }

    #[test]
    fn click_on_pin_routes_to_entity_key() {
        let mut session = open_session();
        session
            .apply_snapshot(
                &[driver(1, DEFAULT_CENTER.lat, DEFAULT_CENTER.lng, true)],
                &[],
            )
            .expect("cycle");
        let surface = session.surface();
        let bounds = surface.viewport().expect("viewport").bounds(panel());

        assert_eq!(
            surface.hit_test(&bounds, panel(), Pos2::new(401.0, 301.0)),
            Some(EntityKey::driver(1))
        );
        assert_eq!(surface.hit_test(&bounds, panel(), Pos2::new(10.0, 10.0)), None);
    }

    #[test]
    fn session_drives_tables_and_popups() {
        let mut session = open_session();
        session
            .apply_snapshot(&[driver(1, 4.05, 9.7, true)], &[ride(2, RideStatus::Ongoing)])
            .expect("cycle");
        assert_eq!(session.surface().pin_count(), 2);
        assert_eq!(session.surface().line_count(), 1);
        assert_eq!(session.surface().listener_count(), 2);

        let change = session
            .handle_event(EntityKey::ride(2), OverlayEvent::Click)
            .expect("click");
        assert_eq!(change, PopupChange::Opened);
        let popups: Vec<_> = session.surface().open_popups().collect();
        assert_eq!(popups.len(), 1);
        assert_eq!(popups[0].1.title, "Ride #2");

        session.close().expect("close");
        assert_eq!(session.surface().pin_count(), 0);
        assert_eq!(session.surface().popup_count(), 0);
        assert!(session.surface().viewport().is_none());
    }

    #[test]
    fn labels_follow_listener_targets() {
        let mut session = open_session();
        session
            .apply_snapshot(&[driver(5, 4.05, 9.7, true)], &[])
            .expect("cycle");
        let labels: Vec<_> = session
            .surface()
            .pins_with_labels()
            .map(|(_, label)| label)
            .collect();
        assert_eq!(labels, vec![Some("driver:5".to_string())]);
    }
}
