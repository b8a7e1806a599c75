//! Overlay factory: entity -> visual primitive descriptors.
//!
//! [`describe`] is a pure function. It either rejects an entity that has no drawable
//! position, or produces the pin, optional route line and popup payload for it. The
//! [`Fingerprint`] of a descriptor covers every field that affects what is drawn, so two
//! descriptors with equal fingerprints render identically.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::entity::{DriverEntity, EntityKey, EntityRef, RideEntity, RideStatus};
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStyle {
    DriverOnline,
    DriverOffline,
    RidePending,
    RideAccepted,
    RideOngoing,
    RideCompleted,
    RideCancelled,
    RideUnknown,
}

impl PinStyle {
    pub fn for_driver(is_online: bool) -> Self {
        if is_online {
            PinStyle::DriverOnline
        } else {
            PinStyle::DriverOffline
        }
    }

    pub fn for_ride(status: RideStatus) -> Self {
        match status {
            RideStatus::Pending => PinStyle::RidePending,
            RideStatus::Accepted => PinStyle::RideAccepted,
            RideStatus::Ongoing => PinStyle::RideOngoing,
            RideStatus::Completed => PinStyle::RideCompleted,
            RideStatus::Cancelled => PinStyle::RideCancelled,
            RideStatus::Unknown => PinStyle::RideUnknown,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            PinStyle::DriverOnline => 1,
            PinStyle::DriverOffline => 2,
            PinStyle::RidePending => 3,
            PinStyle::RideAccepted => 4,
            PinStyle::RideOngoing => 5,
            PinStyle::RideCompleted => 6,
            PinStyle::RideCancelled => 7,
            PinStyle::RideUnknown => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    /// Pickup to destination.
    Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineDescriptor {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub style: LineStyle,
}

impl LineDescriptor {
    pub fn same_endpoints(&self, other: &LineDescriptor) -> bool {
        self.from == other.from && self.to == other.to
    }
}

/// Plain popup payload: a title plus labelled rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupContent {
    pub title: String,
    pub fields: Vec<(String, String)>,
}

impl PopupContent {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    fn field(mut self, label: &str, value: impl fmt::Display) -> Self {
        self.fields.push((label.to_string(), value.to_string()));
        self
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayDescriptor {
    pub position: GeoPoint,
    pub style: PinStyle,
    pub line: Option<LineDescriptor>,
    pub popup: PopupContent,
}

impl OverlayDescriptor {
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for bits in self.position.to_bits() {
            hasher.update(bits.to_le_bytes());
        }
        hasher.update([self.style.tag()]);
        match &self.line {
            Some(line) => {
                hasher.update([1u8]);
                for bits in line.from.to_bits().into_iter().chain(line.to.to_bits()) {
                    hasher.update(bits.to_le_bytes());
                }
            }
            None => hasher.update([0u8]),
        }
        // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
        update_str(&mut hasher, &self.popup.title);
        hasher.update((self.popup.fields.len() as u64).to_le_bytes());
        for (label, value) in &self.popup.fields {
            update_str(&mut hasher, label);
            update_str(&mut hasher, value);
        }
        Fingerprint(hasher.finalize().into())
    }
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Digest over the drawn appearance of one entity. Ordered bytewise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint(")?;
        for byte in &self.0[..6] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// The entity has no drawable position and must not be placed on the map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key} has no drawable {field}")]
pub struct InvalidCoordinate {
    pub key: EntityKey,
    pub field: &'static str,
}

pub fn describe(entity: EntityRef<'_>) -> Result<OverlayDescriptor, InvalidCoordinate> {
    match entity {
        EntityRef::Driver(driver) => describe_driver(driver),
        EntityRef::Ride(ride) => describe_ride(ride),
    }
}

fn describe_driver(driver: &DriverEntity) -> Result<OverlayDescriptor, InvalidCoordinate> {
    let key = EntityKey::driver(driver.id);
    let position = driver.position.drawable().ok_or(InvalidCoordinate {
        key,
        field: "position",
    })?;
    let title = if driver.name.trim().is_empty() {
        format!("Driver #{}", driver.id)
    } else {
        driver.name.clone()
    };
    let popup = PopupContent::new(title)
        .field("Driver", driver.id)
        .field(
            "Status",
            if driver.is_online { "Online" } else { "Offline" },
        )
        .field("Position", position);
    Ok(OverlayDescriptor {
        position,
        style: PinStyle::for_driver(driver.is_online),
        line: None,
        popup,
    })
}

fn rider_label(rider_id: Option<u64>) -> String {
    rider_id.map_or_else(|| "Unknown".to_string(), |id| id.to_string())
}

fn describe_ride(ride: &RideEntity) -> Result<OverlayDescriptor, InvalidCoordinate> {
    let key = EntityKey::ride(ride.id);
    let pickup = ride.pickup.drawable().ok_or(InvalidCoordinate {
        key,
        field: "pickup",
    })?;
    let destination = ride.destination.drawable().ok_or(InvalidCoordinate {
        key,
        field: "destination",
    })?;
    let popup = PopupContent::new(format!("Ride #{}", ride.id))
        .field("Rider", rider_label(ride.rider_id))
        .field("Status", ride.status.label())
        .field("Pickup", pickup)
        .field("Destination", destination)
        .field(
            "Distance",
            format!("{:.2} km", pickup.distance_km(&destination)),
        );
    Ok(OverlayDescriptor {
        position: pickup,
        style: PinStyle::for_ride(ride.status),
        line: Some(LineDescriptor {
            from: pickup,
            to: destination,
            style: LineStyle::Route,
        }),
        popup,
    })
}
