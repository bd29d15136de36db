//! Risk pipeline (primary estimator, heuristic fallback, decision gate)

use crate::estimator::{HeuristicEstimator, RemoteEstimator, RiskEstimator};
use crate::{metrics::*, Config, Error, Result, SignalBook, DEFAULT_ASSESSMENT_AMOUNT};
use payguard_core::{
    DecisionGate, EstimateSource, PaymentDescriptor, Recommendation, RiskAssessment,
    RiskEstimate, UpiHandle,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Scores payees and maps the score through the decision gate.
///
/// The primary estimator (normally remote) gets `timeout` to answer. Any
/// failure, including the timeout, falls back to the local estimator and
/// marks the assessment `degraded`. Without a primary every assessment is
/// a degraded fallback assessment.
pub struct RiskPipeline {
    primary: Option<Arc<dyn RiskEstimator>>,
    fallback: Arc<dyn RiskEstimator>,
    gate: DecisionGate,
    timeout: Duration,
}

impl RiskPipeline {
    /// Pipeline that only uses `fallback`
    pub fn new(fallback: Arc<dyn RiskEstimator>, gate: DecisionGate) -> Self {
        Self {
            primary: None,
            fallback,
            gate,
            timeout: Duration::from_millis(crate::DEFAULT_REMOTE_TIMEOUT_MS),
        }
    }

    /// Put a primary estimator in front of the fallback
    pub fn with_primary(mut self, primary: Arc<dyn RiskEstimator>, timeout: Duration) -> Self {
        self.primary = Some(primary);
        self.timeout = timeout;
        self
    }

    /// Build from configuration; the remote estimator is only used when an
    /// endpoint is configured
    pub fn from_config(config: &Config, signals: SignalBook) -> Result<Self> {
        config.validate()?;
        let gate = DecisionGate::new(config.gate)?;
        let fallback = Arc::new(HeuristicEstimator::new(config.heuristic.clone(), signals)?);
        let pipeline = Self::new(fallback, gate);

        if config.remote.endpoint.is_some() {
            let remote = Arc::new(RemoteEstimator::new(config.remote.clone())?);
            info!(url = %remote.url(), "Remote scoring enabled");
            Ok(pipeline.with_primary(remote, config.remote.timeout()))
        } else {
            info!("No scoring endpoint configured, using heuristic estimates");
            Ok(pipeline)
        }
    }

    /// Decision gate in use
    pub fn gate(&self) -> &DecisionGate {
        &self.gate
    }

    /// Gate a raw percentage
    pub fn decide(&self, percentage: f64) -> Recommendation {
        self.gate.decide(percentage)
    }

    /// Assess paying `amount` to `identifier`
    pub async fn estimate_risk(
        &self,
        identifier: &UpiHandle,
        amount: Decimal,
    ) -> Result<RiskAssessment> {
        self.estimate_risk_cancellable(identifier, amount, &CancellationToken::new())
            .await
    }

    /// Assess, abandoning the work with [`Error::Cancelled`] as soon as
    /// `cancel` fires
    pub async fn estimate_risk_cancellable(
        &self,
        identifier: &UpiHandle,
        amount: Decimal,
        cancel: &CancellationToken,
    ) -> Result<RiskAssessment> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(identifier = %identifier, "Assessment cancelled");
                ASSESSMENTS_CANCELLED.inc();
                Err(Error::Cancelled)
            }
            result = self.run(identifier, amount) => result,
        }
    }

    /// Assess a scanned payment, using its amount or the default when the
    /// payload carries none
    pub async fn assess_payment(&self, descriptor: &PaymentDescriptor) -> Result<RiskAssessment> {
        self.assess_payment_cancellable(descriptor, &CancellationToken::new())
            .await
    }

    /// [`RiskPipeline::assess_payment`] with cancellation
    pub async fn assess_payment_cancellable(
        &self,
        descriptor: &PaymentDescriptor,
        cancel: &CancellationToken,
    ) -> Result<RiskAssessment> {
        let amount = descriptor
            .amount_value()
            .unwrap_or_else(|| Decimal::from(DEFAULT_ASSESSMENT_AMOUNT));
        self.estimate_risk_cancellable(descriptor.identifier(), amount, cancel)
            .await
    }

    async fn run(&self, identifier: &UpiHandle, amount: Decimal) -> Result<RiskAssessment> {
        let (estimate, source, degraded) = match &self.primary {
            Some(primary) => match self.try_primary(primary.as_ref(), identifier, amount).await {
                Ok(estimate) => (estimate, primary.source(), false),
                Err(e) => {
                    warn!(
                        identifier = %identifier,
                        estimator = primary.name(),
                        error = %e,
                        "Primary estimator failed, using {}",
                        self.fallback.name()
                    );
                    ESTIMATOR_FALLBACKS_TOTAL
                        .with_label_values(&[e.fallback_reason()])
                        .inc();
                    let estimate = self.fallback.estimate(identifier, amount).await?;
                    (estimate, self.fallback.source(), true)
                }
            },
            None => {
                let estimate = self.fallback.estimate(identifier, amount).await?;
                (estimate, self.fallback.source(), true)
            }
        };

        Ok(self.finish(identifier, &estimate, source, degraded))
    }

    async fn try_primary(
        &self,
        primary: &dyn RiskEstimator,
        identifier: &UpiHandle,
        amount: Decimal,
    ) -> Result<RiskEstimate> {
        tokio::time::timeout(self.timeout, primary.estimate(identifier, amount))
            .await
            .map_err(|_| Error::EstimationTimeout {
                millis: self.timeout.as_millis() as u64,
            })?
    }

    fn finish(
        &self,
        identifier: &UpiHandle,
        estimate: &RiskEstimate,
        source: EstimateSource,
        degraded: bool,
    ) -> RiskAssessment {
        let assessment = self.gate.assess(estimate, source, degraded);

        ASSESSMENTS_TOTAL
            .with_label_values(&[source.as_str(), assessment.recommendation.as_str()])
            .inc();
        info!(
            identifier = %identifier,
            percentage = assessment.percentage.value(),
            recommendation = %assessment.recommendation,
            source = source.as_str(),
            degraded,
            "Risk assessed"
        );

        assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use payguard_core::{GateThresholds, RiskLevel};

    struct Fixed(f64, u32);

    #[async_trait]
    impl RiskEstimator for Fixed {
        fn source(&self) -> EstimateSource {
            EstimateSource::Remote
        }

        fn name(&self) -> &str {
            "fixed"
        }

        async fn estimate(&self, _: &UpiHandle, _: Decimal) -> Result<RiskEstimate> {
            Ok(RiskEstimate::new(self.0, self.1))
        }
    }

    struct Failing;

    #[async_trait]
    impl RiskEstimator for Failing {
        fn source(&self) -> EstimateSource {
            EstimateSource::Remote
        }

        fn name(&self) -> &str {
            "failing"
        }

        async fn estimate(&self, _: &UpiHandle, _: Decimal) -> Result<RiskEstimate> {
            Err(Error::MalformedResponse("nope".to_string()))
        }
    }

    struct Stalled;

    #[async_trait]
    impl RiskEstimator for Stalled {
        fn source(&self) -> EstimateSource {
            EstimateSource::Remote
        }

        fn name(&self) -> &str {
            "stalled"
        }

        async fn estimate(&self, _: &UpiHandle, _: Decimal) -> Result<RiskEstimate> {
            futures::future::pending().await
        }
    }

    fn heuristic() -> Arc<dyn RiskEstimator> {
        let config = crate::HeuristicConfig {
            jitter: 0.0,
            ..Default::default()
        };
        Arc::new(HeuristicEstimator::new(config, SignalBook::default()).unwrap())
    }

    fn handle(s: &str) -> UpiHandle {
        UpiHandle::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_primary_result_is_gated() {
        let pipeline = RiskPipeline::new(heuristic(), DecisionGate::default())
            .with_primary(Arc::new(Fixed(0.91, 12)), Duration::from_secs(1));

        let assessment = pipeline
            .estimate_risk(&handle("known-scammer@upi"), Decimal::from(500))
            .await
            .unwrap();

        assert_eq!(assessment.percentage.value(), 91);
        assert_eq!(assessment.level, RiskLevel::High);
        assert_eq!(assessment.recommendation, Recommendation::Block);
        assert_eq!(assessment.report_count, 12);
        assert_eq!(assessment.source, EstimateSource::Remote);
        assert!(!assessment.degraded);
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let pipeline = RiskPipeline::new(heuristic(), DecisionGate::default())
            .with_primary(Arc::new(Failing), Duration::from_secs(1));

        let assessment = pipeline
            .estimate_risk(&handle("merchant@upi"), Decimal::from(100))
            .await
            .unwrap();

        assert!(assessment.degraded);
        assert_eq!(assessment.source, EstimateSource::Heuristic);
        assert_eq!(assessment.recommendation, Recommendation::Allow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let pipeline = RiskPipeline::new(heuristic(), DecisionGate::default())
            .with_primary(Arc::new(Stalled), Duration::from_millis(4_000));

        let assessment = pipeline
            .estimate_risk(&handle("slow@bank"), Decimal::from(500))
            .await
            .unwrap();

        assert!(assessment.degraded);
        assert_eq!(assessment.source, EstimateSource::Heuristic);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let pipeline = RiskPipeline::new(heuristic(), DecisionGate::default())
            .with_primary(Arc::new(Stalled), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline
            .estimate_risk_cancellable(&handle("slow@bank"), Decimal::from(500), &cancel)
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_heuristic_only_is_degraded() {
        let pipeline = RiskPipeline::new(heuristic(), DecisionGate::default());
        let assessment = pipeline
            .estimate_risk(&handle("merchant@upi"), Decimal::from(100))
            .await
            .unwrap();
        assert!(assessment.degraded);
        assert_eq!(assessment.percentage.value(), 0);
    }

    #[tokio::test]
    async fn test_custom_thresholds() {
        let gate = DecisionGate::new(GateThresholds::new(50.0, 95.0).unwrap()).unwrap();
        let pipeline = RiskPipeline::new(heuristic(), gate)
            .with_primary(Arc::new(Fixed(0.91, 0)), Duration::from_secs(1));

        let assessment = pipeline
            .estimate_risk(&handle("merchant@upi"), Decimal::from(100))
            .await
            .unwrap();
        assert_eq!(assessment.recommendation, Recommendation::Verify);
        assert_eq!(assessment.level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_assess_payment_default_amount() {
        let pipeline = RiskPipeline::new(heuristic(), DecisionGate::default());
        let descriptor = payguard_core::extract_payment("merchant@upi").unwrap();
        let assessment = pipeline.assess_payment(&descriptor).await.unwrap();
        assert_eq!(assessment.recommendation, Recommendation::Allow);
    }
}
