//! Three-way safety gate

use crate::{
    EstimateSource, Error, Recommendation, Result, RiskAssessment, RiskEstimate, RiskLevel,
    RiskPercentage,
};
use serde::{Deserialize, Serialize};

/// Gate thresholds (percent).
///
/// Bands are inclusive on their lower bound: `[0, verify_at)` allows,
/// `[verify_at, block_at)` asks for verification, `[block_at, 100]` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    /// Lowest percentage that requires verification
    pub verify_at: f64,

    /// Lowest percentage that blocks the payment
    pub block_at: f64,
}

impl GateThresholds {
    /// Default verification threshold
    pub const DEFAULT_VERIFY_AT: f64 = 30.0;

    /// Default blocking threshold
    pub const DEFAULT_BLOCK_AT: f64 = 70.0;

    /// Create and validate thresholds
    pub fn new(verify_at: f64, block_at: f64) -> Result<Self> {
        let thresholds = Self { verify_at, block_at };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Require `0 <= verify_at <= block_at <= 100`
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.verify_at) || !in_range(self.block_at) {
            return Err(Error::InvalidConfig(format!(
                "gate thresholds must lie in 0..=100 (verify_at={}, block_at={})",
                self.verify_at, self.block_at
            )));
        }
        if self.verify_at > self.block_at {
            return Err(Error::InvalidConfig(format!(
                "verify_at {} exceeds block_at {}",
                self.verify_at, self.block_at
            )));
        }
        Ok(())
    }
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            verify_at: Self::DEFAULT_VERIFY_AT,
            block_at: Self::DEFAULT_BLOCK_AT,
        }
    }
}

/// Maps risk percentages to recommendations and levels
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionGate {
    thresholds: GateThresholds,
}

impl DecisionGate {
    /// Create gate with validated thresholds
    pub fn new(thresholds: GateThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// Active thresholds
    pub fn thresholds(&self) -> GateThresholds {
        self.thresholds
    }

    /// Classify a percentage. NaN is treated as the strictest band.
    pub fn decide(&self, percentage: f64) -> Recommendation {
        if percentage < self.thresholds.verify_at {
            Recommendation::Allow
        } else if percentage < self.thresholds.block_at {
            Recommendation::Verify
        } else {
            Recommendation::Block
        }
    }

    /// Level paired with [`DecisionGate::decide`]
    pub fn level(&self, percentage: f64) -> RiskLevel {
        match self.decide(percentage) {
            Recommendation::Allow => RiskLevel::Low,
            Recommendation::Verify => RiskLevel::Medium,
            Recommendation::Block => RiskLevel::High,
        }
    }

    /// Turn an estimator output into a full assessment
    pub fn assess(
        &self,
        estimate: &RiskEstimate,
        source: EstimateSource,
        degraded: bool,
    ) -> RiskAssessment {
        let percentage = RiskPercentage::from_confidence(estimate.confidence);
        let value = f64::from(percentage.value());

        RiskAssessment {
            percentage,
            level: self.level(value),
            report_count: estimate.report_count,
            recommendation: self.decide(value),
            feature_scores: estimate.feature_scores.clone(),
            degraded,
            source,
        }
    }
}

/// Classify with the default 30 / 70 thresholds
pub fn decide(percentage: f64) -> Recommendation {
    DecisionGate::default().decide(percentage)
}
