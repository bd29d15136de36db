//! Core types: payee handles, payment descriptors and risk assessments

use crate::{Error, Result, DEFAULT_CURRENCY};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref HANDLE_RE: Regex = Regex::new(r"^[^@]+@[^@]+$").unwrap();
}

/// UPI payee handle (`localpart@bank`).
///
/// Exactly one `@` with something on both sides. The text is otherwise kept
/// byte for byte, whitespace included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UpiHandle(pub(crate) String);

impl UpiHandle {
    /// Validate and wrap a handle
    pub fn parse(handle: impl Into<String>) -> Result<Self> {
        let handle = handle.into();
        if HANDLE_RE.is_match(&handle) {
            Ok(Self(handle))
        } else {
            Err(Error::InvalidHandle(handle))
        }
    }

    /// Handle as written
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the `@`
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }

    /// Payment service provider part after the `@`
    pub fn bank(&self) -> &str {
        self.0.rsplit('@').next().unwrap_or_default()
    }
}

impl fmt::Display for UpiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UpiHandle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UpiHandle {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<UpiHandle> for String {
    fn from(handle: UpiHandle) -> Self {
        handle.0
    }
}

/// Parsed payment request.
///
/// Built only through [`PaymentDescriptor::new`] (or deserialization, which
/// runs the same checks), so downstream code can trust every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DescriptorRecord", into = "DescriptorRecord")]
pub struct PaymentDescriptor {
    identifier: UpiHandle,
    display_name: Option<String>,
    amount: Option<String>,
    currency: String,
    raw: String,
}

/// Session storage schema of [`PaymentDescriptor`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorRecord {
    identifier: String,
    #[serde(default, serialize_with = "empty_if_none")]
    display_name: Option<String>,
    #[serde(default, serialize_with = "empty_if_none")]
    amount: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    raw: String,
}

/// Absent name and amount are stored as `""`
fn empty_if_none<S: serde::Serializer>(
    value: &Option<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}

impl TryFrom<DescriptorRecord> for PaymentDescriptor {
    type Error = Error;

    fn try_from(record: DescriptorRecord) -> Result<Self> {
        PaymentDescriptor::new(
            UpiHandle::parse(record.identifier)?,
            record.display_name,
            record.amount,
            record.currency,
            record.raw,
        )
    }
}

impl From<PaymentDescriptor> for DescriptorRecord {
    fn from(descriptor: PaymentDescriptor) -> Self {
        Self {
            identifier: descriptor.identifier.into(),
            display_name: descriptor.display_name,
            amount: descriptor.amount,
            currency: Some(descriptor.currency),
            raw: descriptor.raw,
        }
    }
}

impl PaymentDescriptor {
    /// Build a descriptor.
    ///
    /// Empty name/amount/currency strings count as absent. Name and amount
    /// are otherwise kept exactly as written; the amount must parse as a
    /// non-negative decimal.
    pub fn new(
        identifier: UpiHandle,
        display_name: Option<String>,
        amount: Option<String>,
        currency: Option<String>,
        raw: impl Into<String>,
    ) -> Result<Self> {
        let display_name = non_empty(display_name);
        let amount = non_empty(amount);

        if let Some(amount) = &amount {
            parse_amount(amount)?;
        }

        let currency = non_empty(currency)
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        Ok(Self {
            identifier,
            display_name,
            amount,
            currency,
            raw: raw.into(),
        })
    }

    /// Payee handle
    pub fn identifier(&self) -> &UpiHandle {
        &self.identifier
    }

    /// Payee name carried by the payload, if any
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Amount exactly as it appeared in the payload
    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    /// Amount as a decimal
    pub fn amount_value(&self) -> Option<Decimal> {
        self.amount.as_deref().and_then(|a| parse_amount(a).ok())
    }

    /// ISO currency code
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Original scanned text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Name to show for the payee: the payload's name, or one derived from
    /// the handle (`shopKeeper_42@upi` → `Shop Keeper 42`).
    pub fn payee_label(&self) -> String {
        match &self.display_name {
            Some(name) => name.clone(),
            None => label_from_local_part(self.identifier.local_part()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse a non-negative decimal amount
pub fn parse_amount(amount: &str) -> Result<Decimal> {
    let value = Decimal::from_str(amount.trim())
        .map_err(|_| Error::InvalidAmount(amount.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(Error::InvalidAmount(amount.to_string()));
    }
    Ok(value)
}

fn label_from_local_part(local: &str) -> String {
    let mut label = String::with_capacity(local.len() + 4);
    for c in local.chars() {
        match c {
            '_' => label.push(' '),
            c if c.is_uppercase() => {
                label.push(' ');
                label.push(c);
            }
            c => label.push(c),
        }
    }

    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Risk percentage (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct RiskPercentage(u8);

impl From<u8> for RiskPercentage {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<RiskPercentage> for u8 {
    fn from(percentage: RiskPercentage) -> Self {
        percentage.0
    }
}

impl RiskPercentage {
    /// Create new percentage, clamped to 100
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// `round(100 × confidence)` with confidence clamped to [0, 1].
    /// A NaN confidence maps to 0.
    pub fn from_confidence(confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self((confidence * 100.0).round() as u8)
    }

    /// Raw value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Safety score shown at confirmation (`100 - percentage`)
    pub fn safety_score(&self) -> u8 {
        100 - self.0
    }
}

impl fmt::Display for RiskPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Coarse risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
}

/// What the caller should do with the payment.
///
/// Ordered from safest to strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    /// Proceed to payment
    Allow,
    /// Show the caution dialog first
    Verify,
    /// Show the block dialog
    Block,
}

impl Recommendation {
    /// Stable lowercase name (metrics labels, CLI output)
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Allow => "allow",
            Recommendation::Verify => "verify",
            Recommendation::Block => "block",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which estimator produced an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EstimateSource {
    /// External scoring service
    Remote,
    /// Local simulated heuristic
    Heuristic,
}

impl EstimateSource {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateSource::Remote => "remote",
            EstimateSource::Heuristic => "heuristic",
        }
    }
}

/// Raw estimator output, before thresholds are applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEstimate {
    /// Fraud confidence, expected in [0, 1]
    pub confidence: f64,
    /// Scam reports known for the payee
    pub report_count: u32,
    /// Named feature scores (0-100)
    pub feature_scores: BTreeMap<String, u8>,
}

impl RiskEstimate {
    /// Estimate with no feature breakdown
    pub fn new(confidence: f64, report_count: u32) -> Self {
        Self {
            confidence,
            report_count,
            feature_scores: BTreeMap::new(),
        }
    }

    /// Add a feature score, clamped to 0-100
    pub fn with_feature(mut self, name: impl Into<String>, score: f64) -> Self {
        self.feature_scores.insert(name.into(), clamp_score(score));
        self
    }
}

/// Clamp an arbitrary score into 0-100. NaN maps to 0.
pub fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, 100.0).round() as u8
}

/// Risk assessment result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Risk percentage
    pub percentage: RiskPercentage,

    /// Risk level
    pub level: RiskLevel,

    /// Scam reports known for the payee
    pub report_count: u32,

    /// Gate outcome
    pub recommendation: Recommendation,

    /// Named feature scores (0-100)
    pub feature_scores: BTreeMap<String, u8>,

    /// Produced by a fallback rather than the primary service
    pub degraded: bool,

    /// Estimator that produced the numbers
    pub source: EstimateSource,
}

impl RiskAssessment {
    /// Safety score shown at confirmation
    pub fn safety_score(&self) -> u8 {
        self.percentage.safety_score()
    }
}
