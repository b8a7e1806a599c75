//! Fleet entities as delivered by the data source for one reconciliation cycle.
//!
//! Entities are read-only snapshots. The map core borrows them through [`EntityRef`]
//! and never mutates or retains them past a cycle.
//!
//! Snapshot lists are decoded record by record: a record that does not match the wire
//! shape is logged and dropped, and the rest of the list still arrives.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Driver,
    Ride,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Ride => "ride",
        }
    }
}

/// Registry key. Driver and ride ids live in separate namespaces, so the kind is part
/// of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: u64,
}

impl EntityKey {
    pub fn driver(id: u64) -> Self {
        Self {
            kind: EntityKind::Driver,
            id,
        }
    }

    pub fn ride(id: u64) -> Self {
        Self {
            kind: EntityKind::Ride,
            id,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverEntity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub position: Coordinate,
    #[serde(default)]
    pub is_online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Accepted,
    Ongoing,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RideStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RideStatus::Pending => "Pending",
            RideStatus::Accepted => "Accepted",
            RideStatus::Ongoing => "Ongoing",
            RideStatus::Completed => "Completed",
            RideStatus::Cancelled => "Cancelled",
            RideStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideEntity {
    pub id: u64,
    #[serde(default)]
    pub rider_id: Option<u64>,
    #[serde(default)]
    pub pickup: Coordinate,
    #[serde(default)]
    pub destination: Coordinate,
    pub status: RideStatus,
}

/// Borrowed view over either entity variant.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Driver(&'a DriverEntity),
    Ride(&'a RideEntity),
}

impl EntityRef<'_> {
    pub fn key(&self) -> EntityKey {
        match self {
            EntityRef::Driver(driver) => EntityKey::driver(driver.id),
            EntityRef::Ride(ride) => EntityKey::ride(ride.id),
        }
    }
}

impl<'a> From<&'a DriverEntity> for EntityRef<'a> {
    fn from(driver: &'a DriverEntity) -> Self {
        EntityRef::Driver(driver)
    }
}

impl<'a> From<&'a RideEntity> for EntityRef<'a> {
    fn from(ride: &'a RideEntity) -> Self {
        EntityRef::Ride(ride)
    }
}

/// Materialized driver and ride lists for one refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireSnapshot")]
pub struct FleetSnapshot {
    #[serde(default)]
    pub drivers: Vec<DriverEntity>,
    #[serde(default)]
    pub rides: Vec<RideEntity>,
}

impl FleetSnapshot {
    pub fn new(drivers: Vec<DriverEntity>, rides: Vec<RideEntity>) -> Self {
        Self { drivers, rides }
    }

    /// Both lists merged into one kind-tagged sequence. Reconciliation does not depend on
    /// the order.
    pub fn entities(&self) -> impl Iterator<Item = EntityRef<'_>> {
        merge_entities(&self.drivers, &self.rides)
    }

    pub fn len(&self) -> usize {
        self.drivers.len() + self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty() && self.rides.is_empty()
    }
}

#[derive(Deserialize)]
struct WireSnapshot {
    #[serde(default)]
    drivers: Vec<Value>,
    #[serde(default)]
    rides: Vec<Value>,
}

impl From<WireSnapshot> for FleetSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        Self {
            drivers: decode_records("drivers", wire.drivers),
            rides: decode_records("rides", wire.rides),
        }
    }
}

/// Decode each record on its own, dropping the ones that do not fit `T`.
pub fn decode_records<T: DeserializeOwned>(list: &'static str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(entity) => Some(entity),
            Err(error) => {
                tracing::warn!(
                    target: "fleet_map::source",
                    list,
                    index,
                    %error,
                    "snapshot.record_skipped"
                );
                None
            }
        })
        .collect()
}

pub(crate) fn merge_entities<'a>(
    drivers: &'a [DriverEntity],
    rides: &'a [RideEntity],
) -> impl Iterator<Item = EntityRef<'a>> {
    drivers
        .iter()
        .map(EntityRef::Driver)
        .chain(rides.iter().map(EntityRef::Ride))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_payload_with_missing_latitude_parses() {
        let driver: DriverEntity =
            serde_json::from_str(r#"{"id": 7, "name": "Ama", "lng": 9.7, "isOnline": true}"#)
                .expect("driver should parse");
        assert_eq!(driver.id, 7);
        assert!(driver.is_online);
        assert!(driver.position.lat.is_none());
        assert!(driver.position.drawable().is_none());
    }

    #[test]
    fn unrecognized_ride_status_maps_to_unknown() {
        let ride: RideEntity = serde_json::from_str(
            r#"{"id": 9, "riderId": 3, "pickup": {"lat": 4.0, "lng": 9.0},
                "destination": {"lat": 4.1, "lng": 9.1}, "status": "driver_arrived"}"#,
        )
        .expect("ride should parse");
        assert_eq!(ride.status, RideStatus::Unknown);
        assert_eq!(ride.rider_id, Some(3));
    }

    #[test]
    fn keys_of_different_kinds_never_collide() {
        assert_ne!(EntityKey::driver(5), EntityKey::ride(5));
        assert_eq!(EntityKey::ride(5).to_string(), "ride:5");
    }

    #[test]
    fn null_rider_id_still_parses() {
        let ride: RideEntity = serde_json::from_str(
            r#"{"id": 9, "riderId": null, "status": "pending"}"#,
        )
        .expect("ride should parse");
        assert_eq!(ride.rider_id, None);
    }

    #[test]
    fn malformed_record_is_dropped_without_losing_the_snapshot() {
        let snapshot: FleetSnapshot = serde_json::from_str(
            r#"{"drivers": [{"id": "7", "lat": 4.0, "lng": 9.7},
                            {"id": 8, "name": "Efua", "lat": 4.0, "lng": 9.7, "isOnline": true}],
                "rides": [{"id": 1, "riderId": 2, "status": "pending"},
                          {"riderId": 3, "status": "ongoing"},
                          {"id": 3, "riderId": 4, "status": "accepted"}]}"#,
        )
        .expect("snapshot should parse");
        let ids: Vec<u64> = snapshot.drivers.iter().map(|driver| driver.id).collect();
        assert_eq!(ids, vec![8]);
        let ids: Vec<u64> = snapshot.rides.iter().map(|ride| ride.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn snapshot_merges_drivers_before_rides() {
        let snapshot: FleetSnapshot = serde_json::from_str(
            r#"{"drivers": [{"id": 1, "name": "A", "lat": 1.0, "lng": 1.0, "isOnline": true}],
                "rides": [{"id": 1, "riderId": 2, "status": "pending"}]}"#,
        )
        .expect("snapshot should parse");
        let keys: Vec<EntityKey> = snapshot.entities().map(|entity| entity.key()).collect();
        assert_eq!(keys, vec![EntityKey::driver(1), EntityKey::ride(1)]);
        assert_eq!(snapshot.len(), 2);
    }
}
