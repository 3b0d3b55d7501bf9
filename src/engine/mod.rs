//! Attendance decision engine.
//!
//! Converts an uploaded photo into a face-roster search, decides whether the
//! scan is a check-in or a check-out for the matched employee's current local
//! day, optionally resolves the scan's coordinates to a nearby site, and
//! appends exactly one attendance event. Persistence, face encoding, and the
//! clock are injected collaborators so every decision path is testable
//! without a database or camera.

pub mod geo;
pub mod matching;
pub mod state;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::info;

use geo::{GeofenceAnchor, GeofenceHit};
use matching::FaceMatch;
use state::{Action, EventKind};

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Tunable policy values, with the deployment defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum embedding distance still considered a match.
    pub tolerance: f64,
    /// Geofence radius in kilometers.
    pub radius_km: f64,
    /// Zone whose midnight bounds an attendance day.
    pub tz: Tz,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: matching::DEFAULT_TOLERANCE,
            radius_km: geo::DEFAULT_RADIUS_KM,
            tz: chrono_tz::Asia::Kolkata,
        }
    }
}

/// Unexpected collaborator failures. Expected outcomes (no face, no match,
/// already complete) are [`ScanOutcome`] variants, never errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("face encoder failure: {0}")]
    Encoder(#[source] anyhow::Error),
    #[error("attendance store failure: {0}")]
    Store(#[source] anyhow::Error),
}

/// Extracts a face embedding from raw image bytes.
#[async_trait]
pub trait FaceEncoder: Send + Sync {
    /// `Ok(None)` when the image contains no detectable face; errors are
    /// reserved for the encoder itself failing.
    async fn encode(&self, image: &[u8]) -> anyhow::Result<Option<Vec<f64>>>;
}

/// A registered employee's face template, as loaded for matching.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub employee_id: u64,
    pub name: String,
    pub embedding: Vec<f64>,
}

/// The single attendance event a successful scan appends.
#[derive(Debug, Clone)]
pub struct NewAttendanceEvent {
    pub employee_id: u64,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// The event's calendar day in the engine's zone. Stored alongside the
    /// timestamp so the duplicate guard and day queries share one boundary.
    pub day: NaiveDate,
    pub geofence: Option<GeofenceHit>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A new employee registration.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub embedding: Vec<f64>,
    pub photo: Option<Vec<u8>>,
    pub location_id: Option<u64>,
    pub base_salary: f64,
    pub deduction_per_day: f64,
}

/// Result of appending an event under the one-per-employee/day/kind
/// uniqueness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    Recorded,
    /// A concurrent scan won the race; treated as already-complete.
    Duplicate,
}

/// Persistence operations the engine needs. Soft-deleted locations and sites
/// must already be filtered out of roster and anchor queries.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn roster(&self) -> anyhow::Result<Vec<RosterEntry>>;
    async fn events_between(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<EventKind>>;
    async fn geofence_anchors(&self, employee_id: u64) -> anyhow::Result<Vec<GeofenceAnchor>>;
    async fn append_event(&self, event: &NewAttendanceEvent) -> anyhow::Result<AppendResult>;
    async fn insert_employee(&self, employee: &NewEmployee) -> anyhow::Result<u64>;
}

/// Time source, injected so day-boundary behavior is deterministic in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of processing one scan.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// One event was written.
    Recorded {
        employee_id: u64,
        employee: String,
        kind: EventKind,
        confidence: f64,
        timestamp: DateTime<Utc>,
        geofence: Option<GeofenceHit>,
    },
    /// Check-in and check-out both exist for today; nothing was written.
    AlreadyComplete {
        employee_id: u64,
        employee: String,
        confidence: f64,
    },
    NoFaceDetected,
    /// No employees registered in scope.
    NoneRegistered,
    /// Best candidate was at or over the tolerance.
    NotRecognized,
}

/// Outcome of registering an employee.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Registered { employee_id: u64, name: String },
    NoFaceDetected,
    MissingName,
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub face_image: Vec<u8>,
    pub photo: Option<Vec<u8>>,
    pub location_id: Option<u64>,
    pub base_salary: f64,
    pub deduction_per_day: f64,
}

pub struct AttendanceEngine<E, S, C> {
    encoder: E,
    store: S,
    clock: C,
    config: EngineConfig,
}

impl<E, S, C> AttendanceEngine<E, S, C>
where
    E: FaceEncoder,
    S: ScanStore,
    C: Clock,
{
    pub fn new(encoder: E, store: S, clock: C, config: EngineConfig) -> Self {
        Self {
            encoder,
            store,
            clock,
            config,
        }
    }

    /// Process one attendance scan. Writes exactly one event on the recorded
    /// path and none otherwise.
    pub async fn process_scan(
        &self,
        image: &[u8],
        coords: Option<(f64, f64)>,
    ) -> Result<ScanOutcome, EngineError> {
        let Some(query) = self
            .encoder
            .encode(image)
            .await
            .map_err(EngineError::Encoder)?
        else {
            info!("no face detected in uploaded image");
            return Ok(ScanOutcome::NoFaceDetected);
        };

        let roster = self.store.roster().await.map_err(EngineError::Store)?;
        if roster.is_empty() {
            info!("no employees registered");
            return Ok(ScanOutcome::NoneRegistered);
        }

        let Some(FaceMatch {
            employee_id,
            confidence,
            ..
        }) = matching::best_match(
            &query,
            roster.iter().map(|r| (r.employee_id, r.embedding.as_slice())),
            self.config.tolerance,
        )
        else {
            info!("face not recognized");
            return Ok(ScanOutcome::NotRecognized);
        };

        // The roster produced the id, so the entry is always present.
        let employee = roster
            .iter()
            .find(|r| r.employee_id == employee_id)
            .map(|r| r.name.clone())
            .unwrap_or_default();

        let now = self.clock.now_utc();
        let day = state::local_day(now, self.config.tz);
        let (from, to) = state::day_bounds_utc(day, self.config.tz);

        let events = self
            .store
            .events_between(employee_id, from, to)
            .await
            .map_err(EngineError::Store)?;

        let kind = match state::decide(&events) {
            Action::RecordCheckIn => EventKind::CheckIn,
            Action::RecordCheckOut => EventKind::CheckOut,
            Action::AlreadyComplete => {
                info!(employee_id, %employee, "attendance already complete for today");
                return Ok(ScanOutcome::AlreadyComplete {
                    employee_id,
                    employee,
                    confidence,
                });
            }
        };

        // Geofencing is informational: a miss or unusable coordinates never
        // block the attendance event.
        let geofence = match coords {
            Some((lat, lon)) => {
                let anchors = self
                    .store
                    .geofence_anchors(employee_id)
                    .await
                    .map_err(EngineError::Store)?;
                geo::resolve(lat, lon, &anchors, self.config.radius_km)
            }
            None => None,
        };

        let event = NewAttendanceEvent {
            employee_id,
            kind,
            timestamp: now,
            day,
            geofence: geofence.clone(),
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
        };

        match self
            .store
            .append_event(&event)
            .await
            .map_err(EngineError::Store)?
        {
            AppendResult::Recorded => {
                info!(employee_id, %employee, %kind, "attendance marked");
                Ok(ScanOutcome::Recorded {
                    employee_id,
                    employee,
                    kind,
                    confidence,
                    timestamp: now,
                    geofence,
                })
            }
            // A concurrent scan for the same employee slipped in between the
            // read and this write; report it the same as a re-scan.
            AppendResult::Duplicate => {
                info!(employee_id, %employee, "duplicate scan lost the write race");
                Ok(ScanOutcome::AlreadyComplete {
                    employee_id,
                    employee,
                    confidence,
                })
            }
        }
    }

    /// Register an employee from a face photo. The template must decode from
    /// the image; a blank name or faceless image is an expected outcome, not
    /// an error.
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterOutcome, EngineError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Ok(RegisterOutcome::MissingName);
        }

        let Some(embedding) = self
            .encoder
            .encode(&req.face_image)
            .await
            .map_err(EngineError::Encoder)?
        else {
            info!("no face detected during registration");
            return Ok(RegisterOutcome::NoFaceDetected);
        };

        let employee_id = self
            .store
            .insert_employee(&NewEmployee {
                name: name.to_string(),
                embedding,
                photo: req.photo,
                location_id: req.location_id,
                base_salary: req.base_salary,
                deduction_per_day: req.deduction_per_day,
            })
            .await
            .map_err(EngineError::Store)?;

        info!(employee_id, name, "employee registered");
        Ok(RegisterOutcome::Registered {
            employee_id,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    struct FakeEncoder {
        embedding: Option<Vec<f64>>,
    }

    #[async_trait]
    impl FaceEncoder for FakeEncoder {
        async fn encode(&self, _image: &[u8]) -> anyhow::Result<Option<Vec<f64>>> {
            Ok(self.embedding.clone())
        }
    }

    #[derive(Clone, Default)]
    struct FakeStore {
        roster: Arc<Mutex<Vec<RosterEntry>>>,
        events: Arc<Mutex<Vec<NewAttendanceEvent>>>,
        anchors: Arc<Mutex<Vec<GeofenceAnchor>>>,
        force_duplicate: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl ScanStore for FakeStore {
        async fn roster(&self) -> anyhow::Result<Vec<RosterEntry>> {
            Ok(self.roster.lock().unwrap().clone())
        }

        async fn events_between(
            &self,
            employee_id: u64,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> anyhow::Result<Vec<EventKind>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| {
                    e.employee_id == employee_id && e.timestamp >= from && e.timestamp < to
                })
                .map(|e| e.kind)
                .collect())
        }

        async fn geofence_anchors(&self, _employee_id: u64) -> anyhow::Result<Vec<GeofenceAnchor>> {
            Ok(self.anchors.lock().unwrap().clone())
        }

        async fn append_event(&self, event: &NewAttendanceEvent) -> anyhow::Result<AppendResult> {
            if *self.force_duplicate.lock().unwrap() {
                return Ok(AppendResult::Duplicate);
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(AppendResult::Recorded)
        }

        async fn insert_employee(&self, employee: &NewEmployee) -> anyhow::Result<u64> {
            let mut roster = self.roster.lock().unwrap();
            let id = roster.len() as u64 + 1;
            roster.push(RosterEntry {
                employee_id: id,
                name: employee.name.clone(),
                embedding: employee.embedding.clone(),
            });
            Ok(id)
        }
    }

    #[derive(Clone)]
    struct TestClock(Arc<Mutex<DateTime<Utc>>>);

    impl TestClock {
        fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Self {
            Self(Arc::new(Mutex::new(
                Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap(),
            )))
        }

        fn set(&self, y: i32, mo: u32, d: u32, h: u32, mi: u32) {
            *self.0.lock().unwrap() = Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap();
        }
    }

    impl Clock for TestClock {
        fn now_utc(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn registered(store: &FakeStore, embedding: Vec<f64>) {
        store.roster.lock().unwrap().push(RosterEntry {
            employee_id: 1,
            name: "Asha Rao".to_string(),
            embedding,
        });
    }

    fn engine(
        embedding: Option<Vec<f64>>,
        store: &FakeStore,
        clock: &TestClock,
    ) -> AttendanceEngine<FakeEncoder, FakeStore, TestClock> {
        AttendanceEngine::new(
            FakeEncoder { embedding },
            store.clone(),
            clock.clone(),
            EngineConfig::default(),
        )
    }

    #[actix_web::test]
    async fn scan_walks_check_in_check_out_then_rejects() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0); // 09:30 IST
        registered(&store, vec![0.1, 0.2, 0.3]);
        let engine = engine(Some(vec![0.1, 0.2, 0.3]), &store, &clock);

        match engine.process_scan(b"img", None).await.unwrap() {
            ScanOutcome::Recorded {
                kind, confidence, ..
            } => {
                assert_eq!(kind, EventKind::CheckIn);
                assert_eq!(confidence, 1.0);
            }
            other => panic!("expected check-in, got {other:?}"),
        }

        clock.set(2025, 6, 2, 12, 30); // 18:00 IST, same day
        match engine.process_scan(b"img", None).await.unwrap() {
            ScanOutcome::Recorded { kind, .. } => assert_eq!(kind, EventKind::CheckOut),
            other => panic!("expected check-out, got {other:?}"),
        }

        match engine.process_scan(b"img", None).await.unwrap() {
            ScanOutcome::AlreadyComplete { employee, .. } => assert_eq!(employee, "Asha Rao"),
            other => panic!("expected already-complete, got {other:?}"),
        }

        assert_eq!(store.events.lock().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn faceless_image_writes_nothing() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        registered(&store, vec![0.1, 0.2, 0.3]);
        let engine = engine(None, &store, &clock);

        assert!(matches!(
            engine.process_scan(b"img", None).await.unwrap(),
            ScanOutcome::NoFaceDetected
        ));
        assert!(store.events.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn empty_roster_reports_none_registered() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        let engine = engine(Some(vec![0.1, 0.2, 0.3]), &store, &clock);

        assert!(matches!(
            engine.process_scan(b"img", None).await.unwrap(),
            ScanOutcome::NoneRegistered
        ));
    }

    #[actix_web::test]
    async fn stranger_is_not_recognized_and_writes_nothing() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        registered(&store, vec![0.0, 0.0, 0.0]);
        let engine = engine(Some(vec![5.0, 5.0, 5.0]), &store, &clock);

        assert!(matches!(
            engine.process_scan(b"img", None).await.unwrap(),
            ScanOutcome::NotRecognized
        ));
        assert!(store.events.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn late_event_does_not_block_next_local_day() {
        let store = FakeStore::default();
        // 18:29 UTC on June 1 = 23:59 IST June 1.
        let clock = TestClock::at(2025, 6, 1, 18, 29);
        registered(&store, vec![0.1, 0.2, 0.3]);
        let engine = engine(Some(vec![0.1, 0.2, 0.3]), &store, &clock);

        engine.process_scan(b"img", None).await.unwrap();

        // Two minutes later it is 00:01 IST June 2: a fresh day, so the scan
        // is a new check-in rather than a check-out of yesterday.
        clock.set(2025, 6, 1, 18, 31);
        match engine.process_scan(b"img", None).await.unwrap() {
            ScanOutcome::Recorded { kind, .. } => assert_eq!(kind, EventKind::CheckIn),
            other => panic!("expected fresh check-in, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn lost_write_race_reports_already_complete() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        registered(&store, vec![0.1, 0.2, 0.3]);
        *store.force_duplicate.lock().unwrap() = true;
        let engine = engine(Some(vec![0.1, 0.2, 0.3]), &store, &clock);

        assert!(matches!(
            engine.process_scan(b"img", None).await.unwrap(),
            ScanOutcome::AlreadyComplete { .. }
        ));
        assert!(store.events.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn nearby_scan_attaches_a_geofence_hit() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        registered(&store, vec![0.1, 0.2, 0.3]);
        store.anchors.lock().unwrap().push(GeofenceAnchor {
            location_id: Some(1),
            site_id: Some(4),
            name: "Head Office".to_string(),
            latitude: Some(40.7128),
            longitude: Some(-74.0060),
        });
        let engine = engine(Some(vec![0.1, 0.2, 0.3]), &store, &clock);

        match engine
            .process_scan(b"img", Some((40.712810, -74.006000)))
            .await
            .unwrap()
        {
            ScanOutcome::Recorded { geofence, .. } => {
                let hit = geofence.expect("scan was ~1 m from the anchor");
                assert_eq!(hit.site_id, Some(4));
                assert_eq!(hit.name, "Head Office");
            }
            other => panic!("expected recorded scan, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn geofence_miss_never_blocks_attendance() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        registered(&store, vec![0.1, 0.2, 0.3]);
        store.anchors.lock().unwrap().push(GeofenceAnchor {
            location_id: Some(1),
            site_id: Some(4),
            name: "Head Office".to_string(),
            latitude: Some(40.7128),
            longitude: Some(-74.0060),
        });
        let engine = engine(Some(vec![0.1, 0.2, 0.3]), &store, &clock);

        // A different city: far outside the fence, but the event records.
        match engine
            .process_scan(b"img", Some((34.0522, -118.2437)))
            .await
            .unwrap()
        {
            ScanOutcome::Recorded { geofence, .. } => assert!(geofence.is_none()),
            other => panic!("expected recorded scan, got {other:?}"),
        }
        assert_eq!(store.events.lock().unwrap().len(), 1);

        let event = &store.events.lock().unwrap()[0];
        assert_eq!(event.latitude, Some(34.0522));
        assert_eq!(event.longitude, Some(-118.2437));
    }

    #[actix_web::test]
    async fn register_round_trips_through_the_scanner() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        let engine = engine(Some(vec![0.4, 0.5, 0.6]), &store, &clock);

        let outcome = engine
            .register(RegisterRequest {
                name: "  Priya Nair  ".to_string(),
                face_image: b"img".to_vec(),
                photo: None,
                location_id: None,
                base_salary: 30000.0,
                deduction_per_day: 1000.0,
            })
            .await
            .unwrap();

        match outcome {
            RegisterOutcome::Registered { employee_id, name } => {
                assert_eq!(employee_id, 1);
                assert_eq!(name, "Priya Nair");
            }
            other => panic!("expected registration, got {other:?}"),
        }

        // The freshly registered face is immediately matchable.
        match engine.process_scan(b"img", None).await.unwrap() {
            ScanOutcome::Recorded { employee, .. } => assert_eq!(employee, "Priya Nair"),
            other => panic!("expected check-in, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn register_rejects_blank_name_before_encoding() {
        let store = FakeStore::default();
        let clock = TestClock::at(2025, 6, 2, 4, 0);
        let engine = engine(Some(vec![0.4, 0.5, 0.6]), &store, &clock);

        assert!(matches!(
            engine
                .register(RegisterRequest {
                    name: "   ".to_string(),
                    face_image: b"img".to_vec(),
                    photo: None,
                    location_id: None,
                    base_salary: 0.0,
                    deduction_per_day: 0.0,
                })
                .await
                .unwrap(),
            RegisterOutcome::MissingName
        ));
        assert!(store.roster.lock().unwrap().is_empty());
    }
}
