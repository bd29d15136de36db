//! Risk estimators

pub mod heuristic;
pub mod remote;

pub use heuristic::{HeuristicConfig, HeuristicEstimator, HeuristicWeights};
pub use remote::{RemoteConfig, RemoteEstimator, RequestMethod};

use crate::Result;
use async_trait::async_trait;
use payguard_core::{EstimateSource, RiskEstimate, UpiHandle};
use rust_decimal::Decimal;

/// Feature: scam reports against the payee
pub const FEATURE_REPORT_FREQUENCY: &str = "report_frequency";
/// Feature: amount above the payee's running average
pub const FEATURE_AMOUNT_DEVIATION: &str = "amount_deviation";
/// Feature: device or platform mismatches
pub const FEATURE_DEVICE_MISMATCH: &str = "device_mismatch";
/// Feature: suspicious handle shape
pub const FEATURE_HANDLE_PATTERN: &str = "handle_pattern";

/// Anything that can put a number on a payee
#[async_trait]
pub trait RiskEstimator: Send + Sync {
    /// Which kind of estimator this is
    fn source(&self) -> EstimateSource;

    /// Name for logs
    fn name(&self) -> &str;

    /// Estimate fraud risk for paying `amount` to `identifier`
    async fn estimate(&self, identifier: &UpiHandle, amount: Decimal) -> Result<RiskEstimate>;
}
