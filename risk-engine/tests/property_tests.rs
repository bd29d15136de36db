//! Property-based tests for the heuristic estimator

use payguard_core::UpiHandle;
use proptest::prelude::*;
use risk_engine::estimator::heuristic::amount_deviation;
use risk_engine::{HeuristicConfig, HeuristicEstimator, ReportChannel, RiskEstimator, SignalBook};
use rust_decimal::Decimal;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn heuristic_estimate_is_bounded(
        local in "[a-z0-9._-]{1,40}",
        bank in "[a-z]{2,12}",
        reports in 0usize..20,
        mismatches in 0u32..10,
        history in prop::collection::vec(1u64..100_000, 0..5),
        amount in 0u64..1_000_000,
        seed in any::<u64>(),
    ) {
        let payee = UpiHandle::parse(format!("{local}@{bank}")).unwrap();
        let signals = SignalBook::default();
        for _ in 0..reports {
            signals.file_report(payee.clone(), ReportChannel::Other, None, "report");
        }
        for _ in 0..mismatches {
            signals.record_device_mismatch(&payee);
        }
        for paid in &history {
            signals.record_payment(&payee, Decimal::from(*paid));
        }

        let config = HeuristicConfig { seed: Some(seed), ..HeuristicConfig::default() };
        let estimator = HeuristicEstimator::new(config, signals).unwrap();
        let estimate = runtime()
            .block_on(estimator.estimate(&payee, Decimal::from(amount)))
            .unwrap();

        prop_assert!((0.0..=1.0).contains(&estimate.confidence));
        prop_assert_eq!(estimate.report_count as usize, reports);
        prop_assert!(estimate.feature_scores.values().all(|s| *s <= 100));
    }

    #[test]
    fn more_reports_never_lower_the_score(extra in 1usize..10) {
        let payee = UpiHandle::parse("merchant@upi").unwrap();
        let config = HeuristicConfig { jitter: 0.0, ..HeuristicConfig::default() };

        let signals = SignalBook::default();
        let estimator = HeuristicEstimator::new(config, signals.clone()).unwrap();
        let rt = runtime();
        let before = rt.block_on(estimator.estimate(&payee, Decimal::from(500))).unwrap();

        for _ in 0..extra {
            signals.file_report(payee.clone(), ReportChannel::Voice, None, "report");
        }
        let after = rt.block_on(estimator.estimate(&payee, Decimal::from(500))).unwrap();

        prop_assert!(after.confidence >= before.confidence);
    }

    #[test]
    fn deviation_is_a_fraction(amount in 0u64..10_000_000, average in 0u64..10_000_000) {
        let deviation = amount_deviation(Decimal::from(amount), Some(Decimal::from(average)));
        prop_assert!((0.0..=1.0).contains(&deviation));
    }
}
