//! End-to-end forecast generation against the in-memory repository.

mod support;

use chrono::Duration;

use mill_jit::db::{
    self, EventRepository, ForecastRepository, LimitsRepository, LocalRepository,
    TimeSeriesRepository,
};
use mill_jit::models::{
    EventSeverity, OperationalLimit, PatternSource, RootCause, YARD_STOCK_VARIABLE,
};
use mill_jit::services::{FixedClock, ForecastError, ForecastWarning, PersistenceStage};

use support::{anchor, engine_at, seed_current, seed_monday_patterns, snapshot};

#[tokio::test]
async fn test_balanced_yard_stays_within_limits() {
    let repo = LocalRepository::new();
    db::ensure_default_limits(&repo).await.unwrap();
    seed_monday_patterns(&repo, 80.0, 90.0).await;
    seed_current(&repo, 1000.0, 80.0, 90.0).await;

    let clock = FixedClock::new(anchor());
    let outcome = engine_at(&repo, &clock).run_forecast(9).await.unwrap();

    let run = &outcome.run;
    assert_eq!(run.model_version, "V2_TREND_HISTORY");
    let horizons: Vec<u32> = run.points.iter().map(|p| p.horizon).collect();
    assert_eq!(horizons, (1..=9).collect::<Vec<_>>());

    let p1 = run.point(1).unwrap();
    assert!((p1.balance() + 9.65).abs() < 1e-9);
    assert!((p1.projected_stock.value() - 990.35).abs() < 1e-9);
    assert!(run.points.iter().all(|p| p.within_limits && p.root_cause.is_none()));
    assert!(run.validate_against(&outcome.limit).is_ok());

    let stored = repo.latest_forecast_run().await.unwrap().unwrap();
    assert_eq!(&stored, run);
}

#[tokio::test]
async fn test_confidence_and_band_widen_with_horizon() {
    let repo = LocalRepository::new();
    seed_current(&repo, 1000.0, 80.0, 90.0).await;
    let clock = FixedClock::new(anchor());
    let projection = engine_at(&repo, &clock).project(12).await.unwrap();

    let mut previous_width = 0.0;
    for pair in projection.points.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    for p in &projection.points {
        let width = p.upper_bound.value() - p.projected_stock.value();
        assert!(width >= previous_width);
        assert!(p.lower_bound.value() >= 0.0);
        previous_width = width;
    }
    assert_eq!(projection.points[11].confidence, 0.40);
}

#[tokio::test]
async fn test_overfull_yard_attributes_and_records_events() {
    let repo = LocalRepository::new();
    db::ensure_default_limits(&repo).await.unwrap();
    seed_monday_patterns(&repo, 120.0, 70.0).await;
    seed_current(&repo, 1550.0, 120.0, 70.0).await;

    let clock = FixedClock::new(anchor());
    let outcome = engine_at(&repo, &clock).run_forecast(9).await.unwrap();
    assert!(outcome.is_persisted());

    let live = outcome.live_assessment.unwrap();
    assert!(matches!(
        live.root_cause,
        RootCause::ExcessiveArrivals
            | RootCause::HighHarvest
            | RootCause::LowMilling
            | RootCause::GradualAccumulation
    ));

    // arrivals stay the first matching rule until the blended inflow decays
    // below the high-inflow threshold, then slow milling takes over
    for point in &outcome.run.points {
        assert!(!point.within_limits);
        if point.projected_inflow > 60.0 {
            assert_eq!(point.root_cause, Some(RootCause::ExcessiveArrivals));
            assert_eq!(point.root_cause_magnitude, Some(point.projected_inflow));
        } else {
            assert_eq!(point.root_cause, Some(RootCause::LowMilling));
            assert_eq!(point.root_cause_magnitude, Some(point.projected_outflow));
        }
    }

    let events = repo.recent_events(50).await.unwrap();
    assert_eq!(events.len(), 9);
    let first = events.iter().find(|e| e.horizon == 1).unwrap();
    assert_eq!(first.variable, YARD_STOCK_VARIABLE);
    assert_eq!(first.limit_breached, 1500.0);
    assert_eq!(first.generated_at, anchor());
    // stock climbs past the critical ceiling of 1800 t within the run
    assert!(events.iter().any(|e| e.severity == EventSeverity::Critical));
}

#[tokio::test]
async fn test_draining_yard_is_attributed_to_milling() {
    let repo = LocalRepository::new();
    repo.upsert_limit(&OperationalLimit::default_yard_stock())
        .await
        .unwrap();
    seed_monday_patterns(&repo, 70.0, 150.0).await;
    seed_current(&repo, 790.0, 70.0, 150.0).await;

    let clock = FixedClock::new(anchor());
    let outcome = engine_at(&repo, &clock).run_forecast(3).await.unwrap();
    let p1 = outcome.run.point(1).unwrap();
    assert_eq!(p1.root_cause, Some(RootCause::HighMilling));
    assert!(p1.root_cause_magnitude.unwrap() > 100.0);
}

#[tokio::test]
async fn test_no_data_writes_nothing() {
    let repo = LocalRepository::new();
    let clock = FixedClock::new(anchor());
    let engine = engine_at(&repo, &clock);

    assert!(matches!(engine.current_state().await, Err(ForecastError::NoData)));
    assert!(matches!(engine.run_forecast(9).await, Err(ForecastError::NoData)));
    assert!(engine.latest_forecast().await.unwrap().is_none());
    assert_eq!(repo.forecast_run_count(), 0);
}

#[tokio::test]
async fn test_unreachable_store_is_a_store_error() {
    let repo = LocalRepository::new();
    seed_current(&repo, 1000.0, 80.0, 90.0).await;
    repo.set_healthy(false);

    let clock = FixedClock::new(anchor());
    let err = engine_at(&repo, &clock).run_forecast(9).await.unwrap_err();
    assert!(matches!(err, ForecastError::Store(_)));
}

#[tokio::test]
async fn test_cold_start_and_rolling_fallback() {
    let repo = LocalRepository::new();
    // Sunday 09:20, the previous day, same hour as horizon 1
    repo.append_snapshot(&snapshot(
        anchor() - Duration::hours(23) + Duration::minutes(20),
        1000.0,
        140.0,
        95.0,
    ))
    .await
    .unwrap();
    seed_current(&repo, 1000.0, 80.0, 90.0).await;

    let clock = FixedClock::new(anchor());
    let engine = engine_at(&repo, &clock);

    let nine = engine.historical_pattern(9, 0).await;
    assert_eq!(nine.source, PatternSource::RollingAggregate);
    assert!((nine.inflow_mean - 140.0).abs() < 1e-9);
    assert_eq!(nine.outflow_mean, 95.0);

    let three = engine.historical_pattern(3, 0).await;
    assert_eq!(three.source, PatternSource::StaticDefault);

    let projection = engine.project(2).await.unwrap();
    let tiers: Vec<PatternSource> = projection
        .warnings
        .iter()
        .filter_map(|w| match w {
            ForecastWarning::PatternFallback { tier, .. } => Some(*tier),
            _ => None,
        })
        .collect();
    assert_eq!(
        tiers,
        vec![PatternSource::RollingAggregate, PatternSource::StaticDefault]
    );
}

#[tokio::test]
async fn test_failed_write_keeps_committed_run() {
    let repo = LocalRepository::new();
    seed_current(&repo, 1550.0, 120.0, 70.0).await;
    let clock = FixedClock::new(anchor());
    let engine = engine_at(&repo, &clock);

    let committed = engine.run_forecast(9).await.unwrap();
    assert!(committed.is_persisted());
    let events_before = repo.event_count();

    repo.set_read_only(true);
    let outcome = engine.run_forecast(4).await.unwrap();
    assert_eq!(outcome.run.horizon(), 4);

    let err = outcome.persistence.unwrap_err();
    assert_eq!(err.stage, PersistenceStage::ForecastRun);
    assert_eq!(repo.event_count(), events_before);

    let latest = engine.latest_forecast().await.unwrap().unwrap();
    assert_eq!(latest, committed.run);
}

#[tokio::test]
async fn test_latest_is_chosen_by_generation_time() {
    let repo = LocalRepository::new();
    seed_current(&repo, 1000.0, 80.0, 90.0).await;
    let clock = FixedClock::new(anchor());
    let engine = engine_at(&repo, &clock);

    clock.advance(Duration::minutes(10));
    let newer = engine.run_forecast(9).await.unwrap();
    clock.set(anchor());
    engine.run_forecast(5).await.unwrap();

    let latest = engine.latest_forecast().await.unwrap().unwrap();
    assert_eq!(latest.generated_at, newer.run.generated_at);
    assert_eq!(latest.horizon(), 9);
    assert_eq!(
        repo.list_forecast_generations(10).await.unwrap(),
        vec![newer.run.generated_at, anchor()]
    );
}

#[tokio::test]
async fn test_same_instant_run_does_not_replace_committed_run() {
    let repo = LocalRepository::new();
    seed_current(&repo, 1550.0, 120.0, 70.0).await;
    let clock = FixedClock::new(anchor());
    let engine = engine_at(&repo, &clock);

    let first = engine.run_forecast(9).await.unwrap();
    assert!(first.is_persisted());
    let events_after_first = repo.event_count();
    assert_eq!(events_after_first, first.events.len());

    let second = engine.run_forecast(3).await.unwrap();
    assert!(!second.events.is_empty());
    let err = second.persistence.unwrap_err();
    assert_eq!(err.stage, PersistenceStage::ForecastRun);
    assert!(err.source.is_conflict());
    assert!(!err.is_retryable());

    assert_eq!(repo.forecast_run_count(), 1);
    let latest = engine.latest_forecast().await.unwrap().unwrap();
    assert_eq!(latest.horizon(), 9);
    assert_eq!(repo.event_count(), events_after_first);
}
