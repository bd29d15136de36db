//! Property-based tests for the extractor and decision gate
//!
//! - Deep links round-trip `pa` / `pn` / `am` through percent-encoding
//! - Bare handles come back unchanged
//! - Text without a handle is rejected
//! - The gate never gets safer as the percentage grows

use payguard_core::{
    decide, extract_payment, DecisionGate, EstimateSource, Error, GateThresholds, RiskEstimate,
    RiskPercentage,
};
use proptest::prelude::*;
use url::form_urlencoded;

/// Strategy for payee handles: one `@`, any other text around it (spaces,
/// `=`, `&` and the like included), no `:` so no scheme, no `{` so no JSON
fn handle_strategy() -> impl Strategy<Value = String> {
    ("[^@:{]{1,20}", "[^@:{]{1,12}").prop_map(|(local, bank)| format!("{local}@{bank}"))
}

/// Strategy for payee names, surrounding whitespace included
fn name_strategy() -> impl Strategy<Value = String> {
    " {0,2}[A-Za-z0-9 &'.,()+%#/=@-]{1,28} {0,2}"
}

/// Strategy for decimal amounts as written in a QR code
fn amount_strategy() -> impl Strategy<Value = String> {
    let amount = prop_oneof![
        (0u64..10_000_000).prop_map(|rupees| rupees.to_string()),
        (0u64..10_000_000, 0u32..100).prop_map(|(rupees, paise)| format!("{rupees}.{paise:02}")),
    ];
    (" {0,1}", amount).prop_map(|(pad, amount)| format!("{pad}{amount}"))
}

proptest! {
    #[test]
    fn upi_link_round_trips(
        handle in handle_strategy(),
        name in name_strategy(),
        amount in amount_strategy(),
    ) {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("pa", &handle)
            .append_pair("pn", &name)
            .append_pair("am", &amount)
            .finish();
        let raw = format!("upi://pay?{query}");

        let descriptor = extract_payment(&raw).unwrap();
        prop_assert_eq!(descriptor.identifier().as_str(), handle.as_str());
        prop_assert_eq!(descriptor.display_name(), Some(name.as_str()));
        prop_assert_eq!(descriptor.amount(), Some(amount.as_str()));
        prop_assert_eq!(descriptor.raw(), raw.as_str());
    }

    #[test]
    fn bare_handle_unchanged(handle in handle_strategy()) {
        let descriptor = extract_payment(&handle).unwrap();
        prop_assert_eq!(descriptor.identifier().as_str(), handle.as_str());
        prop_assert_eq!(descriptor.display_name(), None);
        prop_assert_eq!(descriptor.raw(), handle.as_str());
    }

    #[test]
    fn text_without_handle_rejected(text in "[^@:]{0,40}") {
        prop_assert!(matches!(extract_payment(&text), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn gate_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let gate = DecisionGate::default();

        prop_assert!(decide(high) >= decide(low));
        prop_assert!(gate.level(high) >= gate.level(low));
    }

    #[test]
    fn custom_gate_is_monotonic(
        verify_at in 0.0f64..=100.0,
        span in 0.0f64..=100.0,
        a in 0.0f64..=100.0,
        b in 0.0f64..=100.0,
    ) {
        let block_at = (verify_at + span).min(100.0);
        let gate = DecisionGate::new(GateThresholds::new(verify_at, block_at).unwrap()).unwrap();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        prop_assert!(gate.decide(high) >= gate.decide(low));
    }

    #[test]
    fn percentage_always_clamped(confidence in proptest::num::f64::ANY) {
        prop_assert!(RiskPercentage::from_confidence(confidence).value() <= 100);

        let assessment = DecisionGate::default().assess(
            &RiskEstimate::new(confidence, 0).with_feature("any", confidence * 100.0),
            EstimateSource::Heuristic,
            true,
        );
        prop_assert!(assessment.percentage.value() <= 100);
        prop_assert!(assessment.feature_scores["any"] <= 100);
    }
}

#[test]
fn test_gate_boundaries() {
    use payguard_core::Recommendation::*;

    assert_eq!(decide(29.999), Allow);
    assert_eq!(decide(30.0), Verify);
    assert_eq!(decide(69.999), Verify);
    assert_eq!(decide(70.0), Block);
}
