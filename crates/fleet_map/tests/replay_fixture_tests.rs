use fleet_map::config::SurfaceConfig;
use fleet_map::entity::{EntityKey, RideStatus};
use fleet_map::overlay::PinStyle;
use fleet_map::reconciler::ReconcileReport;
use fleet_map::session::MapSession;
use fleet_map::source::{ReplaySource, SnapshotSource, SourceError};
use fleet_map::test_helpers::RecordingSurface;

const DOUALA: &str = include_str!("../fixtures/douala_snapshots.json");

fn counts(report: &ReconcileReport) -> (usize, usize, usize, usize, usize) {
    (
        report.created,
        report.updated,
        report.unchanged,
        report.removed,
        report.skipped_invalid,
    )
}

#[test]
fn fixture_parses_with_unknown_status_and_missing_latitude() {
    let mut source = ReplaySource::from_json_str(DOUALA).expect("fixture parses");
    assert_eq!(source.len(), 4);

    let first = source.fetch().expect("first");
    assert!(first.drivers[3].position.drawable().is_none());
    let second = source.fetch().expect("second");
    assert_eq!(second.rides[3].status, RideStatus::Unknown);
}

#[test]
fn replaying_fixture_produces_expected_churn() {
    let mut source = ReplaySource::from_json_str(DOUALA).expect("fixture parses");
    let mut session =
        MapSession::open(RecordingSurface::new(), SurfaceConfig::default()).expect("open");
    let mut reports = Vec::new();
    loop {
        match source.fetch() {
            Ok(snapshot) => reports.push(session.apply(&snapshot).expect("cycle")),
            Err(SourceError::Exhausted) => break,
            Err(error) => panic!("unexpected source error: {error}"),
        }
    }

    // (created, updated, unchanged, removed, skipped_invalid)
    let churn: Vec<_> = reports.iter().map(counts).collect();
    assert_eq!(
        churn,
        vec![(5, 0, 0, 0, 1), (2, 3, 2, 0, 1), (0, 3, 3, 1, 0), (0, 1, 2, 3, 0)]
    );
    assert!(reports.iter().all(|report| report.failures.is_empty()));

    let registry = session.registry();
    assert_eq!(registry.len(), 3);
    let ride = registry.get(&EntityKey::ride(10)).expect("ride 10");
    assert_eq!(ride.drawn.style, PinStyle::RideCompleted);
    let driver = registry.get(&EntityKey::driver(3)).expect("driver 3");
    assert_eq!(driver.drawn.style, PinStyle::DriverOnline);

    session.close().expect("close");
    assert_eq!(session.surface().live_handles(), 0);
}
