//! Live fleet map core: keeps a map surface in sync with driver and ride snapshots.
//!
//! Data flows one way per refresh: a [`FleetSnapshot`](entity::FleetSnapshot) goes into
//! [`MapSession::apply_snapshot`](session::MapSession::apply_snapshot), the
//! [`reconciler`] diffs it against the [`registry`] of live overlays, and only the
//! differences reach the [`MapSurface`](surface::MapSurface).

pub mod config;
pub mod entity;
pub mod geo;
pub mod overlay;
pub mod reconciler;
pub mod registry;
pub mod session;
pub mod source;
pub mod surface;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
