//! Map surface adapter: the capability the core consumes to put primitives on a map.
//!
//! Implementations wrap a concrete map SDK. Handles are associated types so the core can
//! hold and hand them back but never look inside. Removal operations consume the handle:
//! once passed to `remove_*`, `detach_listener` or `close_popup` it is gone, whether or
//! not the SDK call succeeded.

use thiserror::Error;

use crate::config::SurfaceConfig;
use crate::entity::EntityKey;
use crate::geo::GeoPoint;
use crate::overlay::{LineStyle, PinStyle, PopupContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayEvent {
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("surface rejected the request: {0}")]
    Rejected(String),
    #[error("handle is no longer valid")]
    InvalidHandle,
    #[error("surface unavailable: {0}")]
    Unavailable(String),
}

pub trait MapSurface {
    type Pin;
    type Line;
    type Listener;
    type Popup;

    /// One-time setup of viewport and base style.
    fn initialize(&mut self, config: &SurfaceConfig) -> Result<(), SurfaceError>;

    /// Release the surface itself. Called after every overlay has been removed.
    fn shutdown(&mut self) -> Result<(), SurfaceError>;

    fn place_pin(&mut self, position: GeoPoint, style: PinStyle)
        -> Result<Self::Pin, SurfaceError>;
    fn update_pin_style(&mut self, pin: &Self::Pin, style: PinStyle) -> Result<(), SurfaceError>;
    fn move_pin(&mut self, pin: &Self::Pin, position: GeoPoint) -> Result<(), SurfaceError>;
    fn remove_pin(&mut self, pin: Self::Pin) -> Result<(), SurfaceError>;

    fn place_line(
        &mut self,
        from: GeoPoint,
        to: GeoPoint,
        style: LineStyle,
    ) -> Result<Self::Line, SurfaceError>;
    fn update_line(
        &mut self,
        line: &Self::Line,
        from: GeoPoint,
        to: GeoPoint,
    ) -> Result<(), SurfaceError>;
    fn remove_line(&mut self, line: Self::Line) -> Result<(), SurfaceError>;

    /// Attach an interaction listener to a pin. When it fires, the surface reports
    /// `(target, event)` back to its owner, which forwards it to the session.
    fn attach_listener(
        &mut self,
        pin: &Self::Pin,
        event: OverlayEvent,
        target: EntityKey,
    ) -> Result<Self::Listener, SurfaceError>;
    fn detach_listener(&mut self, listener: Self::Listener) -> Result<(), SurfaceError>;

    fn open_popup(
        &mut self,
        pin: &Self::Pin,
        content: &PopupContent,
    ) -> Result<Self::Popup, SurfaceError>;
    fn update_popup(
        &mut self,
        popup: &Self::Popup,
        content: &PopupContent,
    ) -> Result<(), SurfaceError>;
    fn close_popup(&mut self, popup: Self::Popup) -> Result<(), SurfaceError>;
}
