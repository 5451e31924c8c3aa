#[cfg(test)]
mod tests {
    use crate::algorithms::confidence::ConfidenceSchedule;
    use crate::algorithms::projection::{classify, project_horizons, ProjectionInput, ProjectionState};
    use crate::algorithms::root_cause::RootCauseThresholds;
    use crate::algorithms::trend::Trend;
    use crate::models::{
        ForecastRun, HourlyPattern, OperationalLimit, PatternSource, ResolvedPattern, RootCause,
    };
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn pattern(inflow: f64, outflow: f64) -> ResolvedPattern {
        let p = HourlyPattern {
            truck_arrivals_mean: inflow / 70.0,
            mill_rate_mean: outflow,
            ..HourlyPattern::static_default(8, 0, 70.0)
        };
        ResolvedPattern::new(p, PatternSource::Exact, 70.0)
    }

    fn run(
        stock: f64,
        inflow: f64,
        outflow: f64,
        trend: Trend,
        patterns: &[ResolvedPattern],
    ) -> Vec<crate::models::ForecastPoint> {
        let limit = OperationalLimit::default_yard_stock();
        let schedule = ConfidenceSchedule::default();
        let thresholds = RootCauseThresholds::default();
        project_horizons(&ProjectionInput {
            anchor: Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap(),
            start: ProjectionState {
                stock,
                inflow,
                outflow,
            },
            trend,
            patterns,
            limit: &limit,
            schedule: &schedule,
            thresholds: &thresholds,
        })
    }

    #[test]
    fn test_balanced_scenario_first_horizon() {
        let patterns = vec![pattern(80.0, 90.0); 9];
        let points = run(1000.0, 80.0, 90.0, Trend::flat(0), &patterns);
        let p1 = &points[0];
        assert!((p1.projected_inflow - 77.2).abs() < 1e-9);
        assert!((p1.projected_outflow - 86.85).abs() < 1e-9);
        assert!((p1.balance() + 9.65).abs() < 1e-9);
        assert!((p1.projected_stock.value() - 990.35).abs() < 1e-9);
        assert!(p1.within_limits);
        assert_eq!(p1.root_cause, None);
        assert_eq!(p1.confidence, 0.95);
    }

    #[test]
    fn test_uses_previous_projected_state() {
        let patterns = vec![pattern(80.0, 90.0); 2];
        let points = run(1000.0, 80.0, 90.0, Trend::flat(0), &patterns);
        // horizon 2 blends against horizon 1's projected rates
        let w_hist = 0.7 * 0.92;
        let expected_in = 80.0 * w_hist + 77.2 * 0.3;
        let expected_out = 90.0 * w_hist + 86.85 * 0.3;
        assert!((points[1].projected_inflow - expected_in).abs() < 1e-9);
        assert!((points[1].projected_outflow - expected_out).abs() < 1e-9);
        let expected_stock = 990.35 + expected_in - expected_out;
        assert!((points[1].projected_stock.value() - expected_stock).abs() < 1e-9);
    }

    #[test]
    fn test_trend_extends_previous_rates() {
        let trend = Trend {
            inflow_per_hour: 10.0,
            outflow_per_hour: -5.0,
            stock_per_hour: 0.0,
            samples: 5,
            reliable: true,
        };
        let patterns = vec![pattern(80.0, 90.0)];
        let points = run(1000.0, 80.0, 90.0, trend, &patterns);
        assert!((points[0].projected_inflow - (80.0 * 0.665 + 90.0 * 0.3)).abs() < 1e-9);
        assert!((points[0].projected_outflow - (90.0 * 0.665 + 85.0 * 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_accumulating_yard_breaches_upper_limit() {
        let patterns = vec![pattern(170.0, 70.0); 9];
        let points = run(1450.0, 170.0, 70.0, Trend::flat(0), &patterns);
        let first_breach = points.iter().find(|p| !p.within_limits).unwrap();
        assert!(first_breach.projected_stock.value() > 1500.0);
        assert_eq!(first_breach.root_cause, Some(RootCause::ExcessiveArrivals));
        assert_eq!(
            first_breach.root_cause_magnitude,
            Some(first_breach.projected_inflow)
        );
    }

    #[test]
    fn test_live_state_above_upper_classified() {
        let limit = OperationalLimit::default_yard_stock();
        let cause = classify(1550.0, 120.0, 70.0, 60.0, &limit, &RootCauseThresholds::default())
            .map(|a| a.root_cause);
        assert!(matches!(
            cause,
            Some(RootCause::ExcessiveArrivals)
                | Some(RootCause::HighHarvest)
                | Some(RootCause::LowMilling)
                | Some(RootCause::GradualAccumulation)
        ));
        assert_eq!(cause, Some(RootCause::ExcessiveArrivals));
    }

    #[test]
    fn test_steep_downward_trend_floors_rates_at_zero() {
        let trend = Trend {
            inflow_per_hour: -100.0,
            outflow_per_hour: 0.0,
            stock_per_hour: 0.0,
            samples: 5,
            reliable: true,
        };
        let patterns = vec![pattern(0.0, 90.0); 2];
        let points = run(1000.0, 10.0, 90.0, trend, &patterns);

        // trend inflow of -90 t/h would blend to -27 t/h
        assert_eq!(points[0].projected_inflow, 0.0);
        assert!((points[0].projected_outflow - 86.85).abs() < 1e-9);
        assert!((points[0].projected_stock.value() - 913.15).abs() < 1e-9);
        assert_eq!(points[1].projected_inflow, 0.0);
        let expected = 913.15 - points[1].projected_outflow;
        assert!((points[1].projected_stock.value() - expected).abs() < 1e-9);

        let draining = Trend {
            inflow_per_hour: 0.0,
            outflow_per_hour: -100.0,
            ..trend
        };
        let points = run(1000.0, 80.0, 10.0, draining, &[pattern(80.0, 0.0)]);
        assert_eq!(points[0].projected_outflow, 0.0);
        assert!((points[0].projected_stock.value() - (1000.0 + points[0].projected_inflow)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_pattern_list_projects_nothing() {
        assert!(run(1000.0, 80.0, 90.0, Trend::flat(0), &[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_runs_satisfy_invariants(
            stock in 0.0f64..2500.0,
            inflow in 0.0f64..200.0,
            outflow in 0.0f64..200.0,
            pin in 0.0f64..200.0,
            pout in 0.0f64..200.0,
            d_in in -20.0f64..20.0,
            d_out in -20.0f64..20.0,
            horizon in 1usize..24,
        ) {
            let trend = Trend {
                inflow_per_hour: d_in,
                outflow_per_hour: d_out,
                stock_per_hour: 0.0,
                samples: 3,
                reliable: true,
            };
            let patterns = vec![pattern(pin, pout); horizon];
            let points = run(stock, inflow, outflow, trend, &patterns);
            prop_assert_eq!(points.len(), horizon);

            let limit = OperationalLimit::default_yard_stock();
            let forecast = ForecastRun::new(Utc::now(), points.clone());
            prop_assert!(forecast.validate_against(&limit).is_ok());

            for p in &points {
                prop_assert!(p.lower_bound.value() >= 0.0);
                prop_assert_eq!(p.root_cause.is_some(), !limit.contains(p.projected_stock.value()));
            }
        }

        #[test]
        fn prop_projection_is_deterministic(stock in 0.0f64..2500.0, inflow in 0.0f64..200.0) {
            let patterns = vec![pattern(80.0, 90.0); 9];
            let a = run(stock, inflow, 90.0, Trend::flat(0), &patterns);
            let b = run(stock, inflow, 90.0, Trend::flat(0), &patterns);
            prop_assert_eq!(a, b);
        }
    }
}
