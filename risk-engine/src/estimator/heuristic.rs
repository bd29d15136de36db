//! Local heuristic estimator.
//!
//! A simulated scorer for demo mode and for the remote fallback. It weighs
//! what the local signal book knows about the payee plus the shape of the
//! handle itself, then adds a small bounded jitter so repeated scans do not
//! look canned. It is not a fraud model.

use super::{
    RiskEstimator, FEATURE_AMOUNT_DEVIATION, FEATURE_DEVICE_MISMATCH, FEATURE_HANDLE_PATTERN,
    FEATURE_REPORT_FREQUENCY,
};
use crate::{Error, Result, SignalBook};
use async_trait::async_trait;
use parking_lot::Mutex;
use payguard_core::{EstimateSource, RiskEstimate, UpiHandle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "lottery", "prize", "winner", "lucky", "reward", "cashback", "refund", "kyc", "gift",
    "helpdesk", "support", "customercare", "bonus", "claim",
];

const KNOWN_PSP_HANDLES: &[&str] = &[
    "upi", "ybl", "ibl", "axl", "apl", "okhdfc", "okhdfcbank", "okaxis", "oksbi", "okicici",
    "paytm", "sbi", "icici", "hdfcbank", "axisbank", "kotak", "yesbank", "pnb", "barodampay",
    "freecharge", "airtel", "jupiteraxis",
];

const LONG_LOCAL_PART: usize = 20;

/// Feature weights; normalised by their sum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    /// Scam reports against the payee
    pub reports: f64,
    /// Amount above the running average
    pub amount: f64,
    /// Device or platform mismatches
    pub device: f64,
    /// Handle shape
    pub handle: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            reports: 0.45,
            amount: 0.20,
            device: 0.20,
            handle: 0.15,
        }
    }
}

impl HeuristicWeights {
    fn total(&self) -> f64 {
        self.reports + self.amount + self.device + self.handle
    }
}

/// Heuristic estimator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Feature weights
    pub weights: HeuristicWeights,

    /// Report count that saturates the report feature
    pub reports_for_max: u32,

    /// How much a report inside the signal book's window counts for,
    /// relative to an older one
    pub recent_report_weight: f64,

    /// Mismatch count that saturates the device feature
    pub mismatches_for_max: u32,

    /// Maximum absolute jitter added to the confidence (0 disables)
    pub jitter: f64,

    /// RNG seed for reproducible jitter
    pub seed: Option<u64>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            weights: HeuristicWeights::default(),
            reports_for_max: 5,
            recent_report_weight: 2.0,
            mismatches_for_max: 3,
            jitter: 0.05,
            seed: None,
        }
    }
}

impl HeuristicConfig {
    /// Check weights and jitter
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        let weights = [w.reports, w.amount, w.device, w.handle];
        if weights.iter().any(|v| !v.is_finite() || *v < 0.0) || w.total() <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "heuristic weights must be non-negative with a positive sum: {:?}",
                w
            )));
        }
        if !self.jitter.is_finite() || !(0.0..=0.5).contains(&self.jitter) {
            return Err(Error::InvalidConfig(format!(
                "heuristic jitter must lie in 0..=0.5, got {}",
                self.jitter
            )));
        }
        if !self.recent_report_weight.is_finite() || self.recent_report_weight < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "recent report weight must be at least 1, got {}",
                self.recent_report_weight
            )));
        }
        if self.reports_for_max == 0 || self.mismatches_for_max == 0 {
            return Err(Error::InvalidConfig(
                "saturation counts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Simulated local estimator
pub struct HeuristicEstimator {
    config: HeuristicConfig,
    signals: SignalBook,
    rng: Mutex<StdRng>,
}

impl HeuristicEstimator {
    /// Create new heuristic estimator over a signal book
    pub fn new(config: HeuristicConfig, signals: SignalBook) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            signals,
            rng: Mutex::new(rng),
        })
    }

    /// Signal book this estimator reads
    pub fn signals(&self) -> &SignalBook {
        &self.signals
    }

    /// Older reports count once, reports inside the window count
    /// `recent_report_weight` times
    fn report_feature(&self, total: u32, recent: u32) -> f64 {
        let recent = recent.min(total);
        let older = (total - recent) as f64;
        let weighted = older + recent as f64 * self.config.recent_report_weight;
        (weighted / self.config.reports_for_max as f64).min(1.0)
    }

    fn device_feature(&self, mismatches: u32) -> f64 {
        (mismatches as f64 / self.config.mismatches_for_max as f64).min(1.0)
    }

    fn jitter(&self) -> f64 {
        if self.config.jitter == 0.0 {
            return 0.0;
        }
        let bound = self.config.jitter;
        self.rng.lock().gen_range(-bound..=bound)
    }
}

/// Relative amount above the average, saturating at double the average.
/// Payments at or below the average score 0.
pub fn amount_deviation(amount: Decimal, average: Option<Decimal>) -> f64 {
    match average {
        None => 0.0,
        Some(avg) if amount <= avg => 0.0,
        Some(avg) if avg <= Decimal::ZERO => 1.0,
        Some(avg) => ((amount - avg) / avg).to_f64().unwrap_or(1.0).min(1.0),
    }
}

/// Score the handle itself: scam-bait keywords, an unknown provider suffix
/// and an unusually long local part each add to it.
pub fn handle_pattern_score(identifier: &UpiHandle) -> f64 {
    let local = identifier.local_part().to_ascii_lowercase();
    let bank = identifier.bank().to_ascii_lowercase();

    let mut score = 0.0;
    if SUSPICIOUS_KEYWORDS.iter().any(|k| local.contains(k)) {
        score += 0.6;
    }
    if !KNOWN_PSP_HANDLES.contains(&bank.as_str()) {
        score += 0.2;
    }
    if local.len() > LONG_LOCAL_PART {
        score += 0.2;
    }
    f64::min(score, 1.0)
}

#[async_trait]
impl RiskEstimator for HeuristicEstimator {
    fn source(&self) -> EstimateSource {
        EstimateSource::Heuristic
    }

    fn name(&self) -> &str {
        "heuristic"
    }

    async fn estimate(&self, identifier: &UpiHandle, amount: Decimal) -> Result<RiskEstimate> {
        let report_count = self.signals.report_count(identifier);
        let recent_reports = self.signals.recent_report_count(identifier);
        let reports = self.report_feature(report_count, recent_reports);
        let deviation = amount_deviation(amount, self.signals.average_amount(identifier));
        let device = self.device_feature(self.signals.device_mismatches(identifier));
        let handle = handle_pattern_score(identifier);

        let w = &self.config.weights;
        let weighted =
            reports * w.reports + deviation * w.amount + device * w.device + handle * w.handle;
        let confidence = (weighted / w.total() + self.jitter()).clamp(0.0, 1.0);

        debug!(
            identifier = %identifier,
            report_count,
            recent_reports,
            confidence,
            "Heuristic estimate"
        );

        Ok(RiskEstimate::new(confidence, report_count)
            .with_feature(FEATURE_REPORT_FREQUENCY, reports * 100.0)
            .with_feature(FEATURE_AMOUNT_DEVIATION, deviation * 100.0)
            .with_feature(FEATURE_DEVICE_MISMATCH, device * 100.0)
            .with_feature(FEATURE_HANDLE_PATTERN, handle * 100.0))
    }
}
