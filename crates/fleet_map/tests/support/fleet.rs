use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fleet_map::entity::{DriverEntity, EntityKey, FleetSnapshot, RideEntity, RideStatus};
use fleet_map::geo::Coordinate;
use fleet_map::registry::OverlayRegistry;
use fleet_map::test_helpers::RecordingSurface;

const STATUSES: [RideStatus; 5] = [
    RideStatus::Pending,
    RideStatus::Accepted,
    RideStatus::Ongoing,
    RideStatus::Completed,
    RideStatus::Cancelled,
];

/// Seeded generator of evolving fleets around Douala.
///
/// Ids are drawn from small pools so consecutive snapshots share most entities, and a
/// fraction of records carry missing or NaN coordinates.
pub struct FleetGenerator {
    rng: StdRng,
    driver_pool: u64,
    ride_pool: u64,
    invalid_ratio: f64,
    duplicate_ratio: f64,
}

impl FleetGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            driver_pool: 40,
            ride_pool: 25,
            invalid_ratio: 0.1,
            duplicate_ratio: 0.0,
        }
    }

    pub fn with_pools(mut self, drivers: u64, rides: u64) -> Self {
        self.driver_pool = drivers;
        self.ride_pool = rides;
        self
    }

    pub fn with_invalid_ratio(mut self, ratio: f64) -> Self {
        self.invalid_ratio = ratio;
        self
    }

    /// Fraction of records emitted a second time under the same id with fresh fields.
    pub fn with_duplicate_ratio(mut self, ratio: f64) -> Self {
        self.duplicate_ratio = ratio;
        self
    }

    fn coordinate(&mut self) -> Coordinate {
        if self.rng.gen_bool(self.invalid_ratio) {
            return match self.rng.gen_range(0..3) {
                0 => Coordinate::missing(),
                1 => Coordinate::new(f64::NAN, 9.7),
                _ => Coordinate {
                    lat: Some(4.05),
                    lng: None,
                },
            };
        }
        // Coarse grid so positions repeat across snapshots.
        let lat = 4.0 + self.rng.gen_range(0..10) as f64 * 0.01;
        let lng = 9.65 + self.rng.gen_range(0..10) as f64 * 0.01;
        Coordinate::new(lat, lng)
    }

    pub fn snapshot(&mut self) -> FleetSnapshot {
        let mut drivers = Vec::new();
        for id in 0..self.driver_pool {
            if self.rng.gen_bool(0.7) {
                drivers.push(self.driver(id));
                if self.rng.gen_bool(self.duplicate_ratio) {
                    drivers.push(self.driver(id));
                }
            }
        }
        let mut rides = Vec::new();
        for id in 0..self.ride_pool {
            if self.rng.gen_bool(0.5) {
                rides.push(self.ride(id));
                if self.rng.gen_bool(self.duplicate_ratio) {
                    rides.push(self.ride(id));
                }
            }
        }
        FleetSnapshot::new(drivers, rides)
    }

    fn driver(&mut self, id: u64) -> DriverEntity {
        let position = self.coordinate();
        DriverEntity {
            id,
            name: format!("Driver {id}"),
            position,
            is_online: self.rng.gen_bool(0.6),
        }
    }

    fn ride(&mut self, id: u64) -> RideEntity {
        let pickup = self.coordinate();
        let destination = self.coordinate();
        let status = STATUSES[self.rng.gen_range(0..STATUSES.len())];
        RideEntity {
            id,
            rider_id: Some(500 + id),
            pickup,
            destination,
            status,
        }
    }
}

/// Distinct keys with at least one drawable record, i.e. the registry size a snapshot
/// should produce.
pub fn drawable_count(snapshot: &FleetSnapshot) -> usize {
    let drivers = snapshot
        .drivers
        .iter()
        .filter(|driver| driver.position.drawable().is_some())
        .map(|driver| EntityKey::driver(driver.id));
    let rides = snapshot
        .rides
        .iter()
        .filter(|ride| ride.pickup.drawable().is_some() && ride.destination.drawable().is_some())
        .map(|ride| EntityKey::ride(ride.id));
    drivers.chain(rides).collect::<HashSet<_>>().len()
}

/// Live surface handles must mirror the registry one to one.
pub fn assert_surface_mirrors_registry(
    registry: &OverlayRegistry<RecordingSurface>,
    surface: &RecordingSurface,
) {
    let lines = registry
        .entries()
        .filter(|(_, entry)| entry.line.is_some())
        .count();
    let listeners = registry
        .entries()
        .filter(|(_, entry)| entry.listener.is_some())
        .count();
    let popups = registry
        .entries()
        .filter(|(_, entry)| entry.popup.is_some())
        .count();
    assert_eq!(surface.live_pins(), registry.len(), "pins vs entries");
    assert_eq!(surface.live_lines(), lines, "lines vs entries");
    assert_eq!(surface.live_listeners(), listeners, "listeners vs entries");
    assert_eq!(surface.open_popups(), popups, "popups vs entries");
    assert_eq!(surface.stray_releases(), 0, "no handle released twice");
}
