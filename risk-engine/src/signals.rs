//! Per-payee fraud signals: scam reports, device mismatches and payment history

use crate::{metrics, Error, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use payguard_core::UpiHandle;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Signal book configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Window for "recent" scam reports (default: 24 hours)
    pub report_window_hours: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            report_window_hours: 24,
        }
    }
}

/// Where the user met the scam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportChannel {
    /// Phone call
    Voice,
    /// SMS
    Message,
    /// WhatsApp
    Whatsapp,
    /// Anything else
    Other,
}

impl ReportChannel {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportChannel::Voice => "voice",
            ReportChannel::Message => "message",
            ReportChannel::Whatsapp => "whatsapp",
            ReportChannel::Other => "other",
        }
    }
}

impl fmt::Display for ReportChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "voice" | "call" => Ok(ReportChannel::Voice),
            "message" | "sms" => Ok(ReportChannel::Message),
            "whatsapp" => Ok(ReportChannel::Whatsapp),
            "other" => Ok(ReportChannel::Other),
            other => Err(Error::InvalidConfig(format!("unknown report channel: {}", other))),
        }
    }
}

/// A filed scam report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamReport {
    /// Report id
    pub report_id: Uuid,
    /// Reported payee
    pub identifier: UpiHandle,
    /// Contact channel
    pub channel: ReportChannel,
    /// Platform or app the scammer used, if known
    pub platform: Option<String>,
    /// Free-text description
    pub details: String,
    /// Filing time
    pub reported_at: DateTime<Utc>,
}

impl ScamReport {
    /// New report filed now
    pub fn new(
        identifier: UpiHandle,
        channel: ReportChannel,
        platform: Option<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            identifier,
            channel,
            platform: platform.filter(|p| !p.trim().is_empty()),
            details: details.into(),
            reported_at: Utc::now(),
        }
    }
}

#[derive(Default)]
struct PayeeSignals {
    reports: Vec<ScamReport>,
    device_mismatches: u32,
    payment_count: u64,
    average_amount: Decimal,
}

impl PayeeSignals {
    fn recent_reports(&self, window_start: DateTime<Utc>) -> usize {
        self.reports
            .iter()
            .filter(|r| r.reported_at >= window_start)
            .count()
    }

    fn add_payment(&mut self, amount: Decimal) {
        self.payment_count += 1;
        let delta = amount - self.average_amount;
        self.average_amount += delta / Decimal::from(self.payment_count);
    }
}

/// Signal snapshot for one payee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayeeSignalStats {
    /// Payee
    pub identifier: UpiHandle,
    /// All reports ever filed
    pub report_count: u32,
    /// Reports inside the window
    pub recent_report_count: u32,
    /// Device or platform mismatches seen
    pub device_mismatches: u32,
    /// Recorded payments
    pub payment_count: u64,
    /// Running average payment, if any payment was recorded
    pub average_amount: Option<Decimal>,
    /// Start of the report window
    pub window_start: DateTime<Utc>,
    /// End of the report window
    pub window_end: DateTime<Utc>,
}

/// Concurrent signal book shared by the heuristic estimator and the callers
/// that feed it.
///
/// Only explicit `file_report` / `record_*` calls change it; assessments
/// read it.
#[derive(Clone, Default)]
pub struct SignalBook {
    config: SignalConfig,
    payees: Arc<DashMap<UpiHandle, PayeeSignals>>,
}

impl SignalBook {
    /// Create new signal book
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            payees: Arc::new(DashMap::new()),
        }
    }

    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(self.config.report_window_hours)
    }

    /// File a new scam report against a payee
    pub fn file_report(
        &self,
        identifier: UpiHandle,
        channel: ReportChannel,
        platform: Option<String>,
        details: impl Into<String>,
    ) -> ScamReport {
        let report = ScamReport::new(identifier, channel, platform, details);
        self.record_report(report.clone());
        report
    }

    /// Record an existing report (imports, replays)
    pub fn record_report(&self, report: ScamReport) {
        info!(
            identifier = %report.identifier,
            channel = %report.channel,
            report_id = %report.report_id,
            "Scam report recorded"
        );
        metrics::SCAM_REPORTS_TOTAL
            .with_label_values(&[report.channel.as_str()])
            .inc();
        self.payees
            .entry(report.identifier.clone())
            .or_default()
            .reports
            .push(report);
    }

    /// All reports ever filed against a payee
    pub fn report_count(&self, identifier: &UpiHandle) -> u32 {
        self.payees
            .get(identifier)
            .map(|p| p.reports.len() as u32)
            .unwrap_or(0)
    }

    /// Reports filed inside the configured window
    pub fn recent_report_count(&self, identifier: &UpiHandle) -> u32 {
        let window_start = self.window_start(Utc::now());
        self.payees
            .get(identifier)
            .map(|p| p.recent_reports(window_start) as u32)
            .unwrap_or(0)
    }

    /// Reports filed against a payee, oldest first
    pub fn reports(&self, identifier: &UpiHandle) -> Vec<ScamReport> {
        self.payees
            .get(identifier)
            .map(|p| p.reports.clone())
            .unwrap_or_default()
    }

    /// Note that the payee was reached from an unexpected device or platform
    pub fn record_device_mismatch(&self, identifier: &UpiHandle) {
        let mut entry = self.payees.entry(identifier.clone()).or_default();
        entry.device_mismatches = entry.device_mismatches.saturating_add(1);
    }

    /// Device or platform mismatches seen for a payee
    pub fn device_mismatches(&self, identifier: &UpiHandle) -> u32 {
        self.payees
            .get(identifier)
            .map(|p| p.device_mismatches)
            .unwrap_or(0)
    }

    /// Add a completed payment to the payee's running average
    pub fn record_payment(&self, identifier: &UpiHandle, amount: Decimal) {
        self.payees
            .entry(identifier.clone())
            .or_default()
            .add_payment(amount);
    }

    /// Running average payment, `None` until a payment is recorded
    pub fn average_amount(&self, identifier: &UpiHandle) -> Option<Decimal> {
        self.payees
            .get(identifier)
            .filter(|p| p.payment_count > 0)
            .map(|p| p.average_amount)
    }

    /// Snapshot of everything known about a payee
    pub fn snapshot(&self, identifier: &UpiHandle) -> Option<PayeeSignalStats> {
        let now = Utc::now();
        let window_start = self.window_start(now);

        self.payees.get(identifier).map(|p| PayeeSignalStats {
            identifier: identifier.clone(),
            report_count: p.reports.len() as u32,
            recent_report_count: p.recent_reports(window_start) as u32,
            device_mismatches: p.device_mismatches,
            payment_count: p.payment_count,
            average_amount: (p.payment_count > 0).then_some(p.average_amount),
            window_start,
            window_end: now,
        })
    }

    /// Forget a payee
    pub fn reset_payee(&self, identifier: &UpiHandle) {
        self.payees.remove(identifier);
    }

    /// Number of payees with any signal
    pub fn tracked_payees(&self) -> usize {
        self.payees.len()
    }
}
