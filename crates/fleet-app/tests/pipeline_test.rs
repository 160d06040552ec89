//! End-to-end pipeline tests over in-memory and file stores

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use fleet_app::app::{RecordOutcome, ScoringService};
use fleet_app::config::Config;
use fleet_app::repository::Repositories;
use fleet_domain::repository::{DriverScoreRepository, InsertOutcome, ViolationRepository};
use fleet_infra::persistence::{MemoryDriverScoreRepository, MemoryViolationRepository};
use fleet_types::{
    DriverScore, Error, FailureStage, Metric, ScoreCategory, Severity, StoreError,
    TelemetryReading, TirePosition, TirePressure, Violation, ViolationEvent, ViolationKind,
};

fn fast_config() -> Config {
    Config {
        workers: 4,
        channel_capacity: 8,
        max_attempts: 4,
        retry_backoff_ms: 1,
        persistence_timeout_ms: 2000,
        ..Config::default()
    }
}

fn reading(driver: &str, timestamp: DateTime<Utc>) -> TelemetryReading {
    TelemetryReading {
        truck_id: "TRK-100".to_string(),
        driver_id: driver.to_string(),
        speed: 65.0,
        fuel_level: 70.0,
        engine_temp: 92.0,
        location: None,
        tire_pressure: TirePressure::uniform(34.0),
        timestamp,
    }
}

fn event(
    driver: &str,
    kind: ViolationKind,
    severity: Severity,
    subject: Metric,
    timestamp: DateTime<Utc>,
) -> ViolationEvent {
    ViolationEvent {
        violation_id: Uuid::new_v4(),
        truck_id: "TRK-100".to_string(),
        driver_id: driver.to_string(),
        violation_type: kind,
        severity,
        subject: Some(subject),
        message: format!("{} {}", severity, kind),
        original_data: reading(driver, timestamp),
        detected_at: timestamp,
    }
}

/// Violation store that fails the first `failures` inserts
struct FlakyViolations {
    inner: MemoryViolationRepository,
    failures: AtomicU32,
}

impl ViolationRepository for FlakyViolations {
    fn insert(&self, violation: &Violation) -> Result<InsertOutcome, Error> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection reset".to_string()).into());
        }
        self.inner.insert(violation)
    }

    fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Violation>, Error> {
        self.inner.find_by_fingerprint(fingerprint)
    }

    fn find_by_driver_since(
        &self,
        driver_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Violation>, Error> {
        self.inner.find_by_driver_since(driver_id, since)
    }

    fn find_all(&self) -> Result<Vec<Violation>, Error> {
        self.inner.find_all()
    }
}

/// Score store whose writes can be switched off
struct BreakableScores {
    inner: MemoryDriverScoreRepository,
    broken: AtomicBool,
}

impl DriverScoreRepository for BreakableScores {
    fn find_by_driver(&self, driver_id: &str) -> Result<Option<DriverScore>, Error> {
        self.inner.find_by_driver(driver_id)
    }

    fn replace(&self, score: &DriverScore, expected_version: Option<u64>) -> Result<(), Error> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("score table offline".to_string()).into());
        }
        self.inner.replace(score, expected_version)
    }

    fn find_all(&self) -> Result<Vec<DriverScore>, Error> {
        self.inner.find_all()
    }
}

#[tokio::test]
async fn test_reading_round_trip() {
    let service = ScoringService::with_repositories(Repositories::in_memory(), fast_config());
    let pipeline = service.start_pipeline();

    let mut r = reading("DRV-1", Utc::now());
    r.speed = 95.0;
    r.fuel_level = 4.0;
    r.tire_pressure.rear_left = 25.0;
    pipeline.submit(r).await.unwrap();

    let stats = pipeline.shutdown().await.unwrap();
    assert_eq!(stats.readings_processed, 1);
    assert_eq!(stats.events_detected, 3);
    assert_eq!(stats.violations_recorded, 3);

    let mut stored = service.repositories().violations.find_all().unwrap();
    stored.sort_by_key(|v| v.violation_type);
    let summary: Vec<(ViolationKind, Severity, u32)> = stored
        .iter()
        .map(|v| (v.violation_type, v.severity, v.points_deducted))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ViolationKind::Speeding, Severity::Medium, 2),
            (ViolationKind::LowFuel, Severity::Critical, 3),
            (ViolationKind::LowTirePressure, Severity::Critical, 2),
        ]
    );

    let score = service
        .repositories()
        .scores
        .find_by_driver("DRV-1")
        .unwrap()
        .unwrap();
    assert_eq!(score.current_score, 93);
    assert_eq!(score.score_category, ScoreCategory::Excellent);
    assert_eq!(score.total_violations, 3);
}

#[tokio::test]
async fn test_mixed_events_score_good() {
    let service = ScoringService::with_repositories(Repositories::in_memory(), fast_config());
    let pipeline = service.start_pipeline();
    let at = Utc::now();

    for e in [
        event("DRV-2", ViolationKind::Speeding, Severity::Medium, Metric::Speed, at),
        event("DRV-2", ViolationKind::LowFuel, Severity::Critical, Metric::FuelLevel, at),
        event("DRV-2", ViolationKind::HighTemp, Severity::Critical, Metric::EngineTemp, at),
        event(
            "DRV-2",
            ViolationKind::LowTirePressure,
            Severity::High,
            Metric::Tire(TirePosition::FrontLeft),
            at,
        ),
    ] {
        pipeline.submit_event(e).await.unwrap();
    }
    pipeline.shutdown().await.unwrap();

    let report = service.reports().driver_report("DRV-2", Utc::now()).unwrap().unwrap();
    assert_eq!(report.score.current_score, 88);
    assert_eq!(report.score.score_category, ScoreCategory::Good);
    assert_eq!(report.breakdown.speeding, 1);
    assert_eq!(report.breakdown.low_fuel, 1);
    assert_eq!(report.breakdown.high_temp, 1);
    assert_eq!(report.breakdown.low_tire_pressure, 1);
}

#[tokio::test]
async fn test_duplicate_delivery_records_once() {
    let service = ScoringService::with_repositories(Repositories::in_memory(), fast_config());
    let pipeline = service.start_pipeline();
    let e = event("DRV-3", ViolationKind::Speeding, Severity::High, Metric::Speed, Utc::now());

    pipeline.submit_event(e.clone()).await.unwrap();
    let mut redelivered = e;
    redelivered.violation_id = Uuid::new_v4();
    pipeline.submit_event(redelivered).await.unwrap();

    let stats = pipeline.shutdown().await.unwrap();
    assert_eq!(stats.violations_recorded, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.scores_updated, 2);

    let score = service.repositories().scores.find_by_driver("DRV-3").unwrap().unwrap();
    assert_eq!(score.current_score, 95);
    assert_eq!(score.total_violations, 1);
}

#[tokio::test]
async fn test_transient_insert_failure_is_retried() {
    let repos = Repositories {
        violations: Arc::new(FlakyViolations {
            inner: MemoryViolationRepository::new(),
            failures: AtomicU32::new(2),
        }),
        ..Repositories::in_memory()
    };
    let service = ScoringService::with_repositories(repos, fast_config());

    let outcome = service
        .recorder()
        .record(event("DRV-4", ViolationKind::LowFuel, Severity::High, Metric::FuelLevel, Utc::now()))
        .await;
    match outcome {
        RecordOutcome::Recorded { score, .. } => assert_eq!(score.current_score, 99),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(service.dead_letters().unwrap().is_empty());
}

#[tokio::test]
async fn test_permanent_failure_dead_lettered_and_prior_score_kept() {
    let scores = Arc::new(BreakableScores {
        inner: MemoryDriverScoreRepository::new(),
        broken: AtomicBool::new(false),
    });
    let repos = Repositories {
        scores: scores.clone(),
        ..Repositories::in_memory()
    };
    let service = ScoringService::with_repositories(repos, fast_config());
    let now = Utc::now();

    let first = service
        .recorder()
        .record(event("DRV-5", ViolationKind::Speeding, Severity::Medium, Metric::Speed, now))
        .await;
    assert!(matches!(first, RecordOutcome::Recorded { .. }));

    scores.broken.store(true, Ordering::SeqCst);
    let second = service
        .recorder()
        .record(event(
            "DRV-5",
            ViolationKind::HighTemp,
            Severity::High,
            Metric::EngineTemp,
            now + Duration::seconds(1),
        ))
        .await;
    assert!(matches!(
        second,
        RecordOutcome::DeadLettered {
            stage: FailureStage::RecomputeScore,
            violation: Some(_),
        }
    ));

    let kept = scores.find_by_driver("DRV-5").unwrap().unwrap();
    assert_eq!(kept.current_score, 98);
    assert_eq!(kept.version, 1);

    let letters = service.dead_letters().unwrap();
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].stage, FailureStage::RecomputeScore);
    assert_eq!(letters[0].driver_id, "DRV-5");
    assert_eq!(letters[0].attempts, 4);
    assert!(letters[0].event.is_some());

    // once the store is back, a recompute picks up the stranded violation
    scores.broken.store(false, Ordering::SeqCst);
    let healed = service.aggregator().recompute("DRV-5").await.unwrap();
    assert_eq!(healed.current_score, 95);
    assert_eq!(healed.version, 2);
}

#[tokio::test]
async fn test_redelivery_heals_score_after_failed_rescore() {
    let scores = Arc::new(BreakableScores {
        inner: MemoryDriverScoreRepository::new(),
        broken: AtomicBool::new(false),
    });
    let repos = Repositories {
        scores: scores.clone(),
        ..Repositories::in_memory()
    };
    let service = ScoringService::with_repositories(repos, fast_config());
    let now = Utc::now();

    let first = service
        .recorder()
        .record(event("DRV-10", ViolationKind::HighTemp, Severity::Critical, Metric::EngineTemp, now))
        .await;
    assert!(matches!(first, RecordOutcome::Recorded { .. }));

    let overheat = event(
        "DRV-10",
        ViolationKind::HighTemp,
        Severity::High,
        Metric::EngineTemp,
        now + Duration::seconds(1),
    );
    scores.broken.store(true, Ordering::SeqCst);
    let stranded = service.recorder().record(overheat.clone()).await;
    assert!(matches!(
        stranded,
        RecordOutcome::DeadLettered {
            stage: FailureStage::RecomputeScore,
            violation: Some(_),
        }
    ));
    assert_eq!(scores.find_by_driver("DRV-10").unwrap().unwrap().current_score, 95);

    // the broker redelivers after the store recovers
    scores.broken.store(false, Ordering::SeqCst);
    match service.recorder().record(overheat).await {
        RecordOutcome::Duplicate { score, .. } => {
            assert_eq!(score.current_score, 92);
            assert_eq!(score.total_violations, 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(service.repositories().violations.find_all().unwrap().len(), 2);
}

#[tokio::test]
async fn test_sharded_events_for_one_driver_lose_no_deduction() {
    let service = ScoringService::with_repositories(Repositories::in_memory(), fast_config());
    let pipeline = service.start_pipeline();
    let base = Utc::now();

    for i in 0..20 {
        pipeline
            .submit_event(event(
                "DRV-6",
                ViolationKind::Speeding,
                Severity::Medium,
                Metric::Speed,
                base - Duration::seconds(i),
            ))
            .await
            .unwrap();
    }
    let stats = pipeline.shutdown().await.unwrap();
    assert_eq!(stats.violations_recorded, 20);

    let score = service.repositories().scores.find_by_driver("DRV-6").unwrap().unwrap();
    assert_eq!(score.current_score, 60);
    assert_eq!(score.score_category, ScoreCategory::Poor);
    assert_eq!(score.total_violations, 20);
    assert_eq!(score.version, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_lose_no_deduction() {
    let config = Config {
        max_attempts: 50,
        ..fast_config()
    };
    let service = Arc::new(ScoringService::with_repositories(Repositories::in_memory(), config));
    let base = Utc::now();

    let mut handles = Vec::new();
    for i in 0..10 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .recorder()
                .record(event(
                    "DRV-7",
                    ViolationKind::HighTemp,
                    Severity::Critical,
                    Metric::EngineTemp,
                    base - Duration::seconds(i),
                ))
                .await
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, RecordOutcome::Recorded { .. }));
    }

    let score = service.repositories().scores.find_by_driver("DRV-7").unwrap().unwrap();
    assert_eq!(score.current_score, 50);
    assert_eq!(score.total_violations, 10);
}

#[tokio::test]
async fn test_clean_reading_leaves_driver_excellent() {
    let service = ScoringService::with_repositories(Repositories::in_memory(), fast_config());
    let pipeline = service.start_pipeline();
    pipeline.submit(reading("DRV-8", Utc::now())).await.unwrap();

    let stats = pipeline.shutdown().await.unwrap();
    assert_eq!(stats.readings_processed, 1);
    assert_eq!(stats.events_detected, 0);
    assert!(service.repositories().violations.find_all().unwrap().is_empty());

    let score = service.aggregator().recompute("DRV-8").await.unwrap();
    assert_eq!(score.current_score, 100);
    assert_eq!(score.score_category, ScoreCategory::Excellent);
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let service = ScoringService::with_repositories(Repositories::in_memory(), fast_config());
    let now = Utc::now();
    service
        .recorder()
        .record_at(
            event("DRV-9", ViolationKind::LowFuel, Severity::Critical, Metric::FuelLevel, now),
            now,
        )
        .await;

    let first = service.aggregator().recompute_at("DRV-9", now).await.unwrap();
    let second = service.aggregator().recompute_at("DRV-9", now).await.unwrap();
    assert_eq!(first.current_score, second.current_score);
    assert_eq!(first.score_category, second.score_category);
    assert_eq!(first.total_violations, second.total_violations);
    assert_eq!(second.version, first.version + 1);
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        store_dir: Some(dir.path().to_path_buf()),
        ..fast_config()
    };

    {
        let service = ScoringService::open(config.clone()).unwrap();
        let pipeline = service.start_pipeline();
        let mut r = reading("DRV-10", Utc::now());
        r.engine_temp = 118.0;
        pipeline.submit(r).await.unwrap();
        pipeline.shutdown().await.unwrap();
    }

    let service = ScoringService::open(config).unwrap();
    let report = service.reports().driver_report("DRV-10", Utc::now()).unwrap().unwrap();
    assert_eq!(report.score.current_score, 97);
    assert_eq!(report.breakdown.high_temp, 1);

    let history = service.reports().violation_history("DRV-10", 7, Utc::now()).unwrap();
    assert_eq!(history.total, 1);
    assert_eq!(history.violations[0].severity, Severity::High);
}
