//! Remote scoring service client

use super::RiskEstimator;
use crate::{metrics, Error, Result};
use async_trait::async_trait;
use payguard_core::{EstimateSource, RiskEstimate, UpiHandle};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How the scoring request is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    /// `GET {endpoint}/risk?identifier=..&amount=..`
    #[default]
    Get,
    /// `POST {endpoint}/risk` with a JSON body
    Post,
}

/// Remote scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the scoring service; `None` runs heuristic-only
    pub endpoint: Option<String>,

    /// Request method
    pub method: RequestMethod,

    /// Budget for one estimate, including connect (milliseconds)
    pub timeout_ms: u64,

    /// Bearer token
    pub api_key: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            method: RequestMethod::Get,
            timeout_ms: crate::DEFAULT_REMOTE_TIMEOUT_MS,
            api_key: None,
        }
    }
}

impl RemoteConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoringResponse {
    confidence: f64,
    report_count: u32,
    #[serde(default)]
    features: BTreeMap<String, f64>,
}

/// Estimator backed by the external scoring service
pub struct RemoteEstimator {
    url: String,
    config: RemoteConfig,
    client: Client,
}

impl RemoteEstimator {
    /// Create new remote estimator; fails without an endpoint
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::InvalidConfig("remote endpoint is not set".to_string()))?;
        let url = format!("{}/risk", endpoint.trim_end_matches('/'));

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            url,
            config,
            client,
        })
    }

    /// Full scoring URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, identifier: &UpiHandle, amount: Decimal) -> Result<ScoringResponse> {
        let amount = amount.normalize().to_string();
        let request = match self.config.method {
            RequestMethod::Get => self
                .client
                .get(&self.url)
                .query(&[("identifier", identifier.as_str()), ("amount", amount.as_str())]),
            RequestMethod::Post => self.client.post(&self.url).json(&json!({
                "identifier": identifier.as_str(),
                "amount": amount,
            })),
        };
        let request = match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::RemoteStatus {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl RiskEstimator for RemoteEstimator {
    fn source(&self) -> EstimateSource {
        EstimateSource::Remote
    }

    fn name(&self) -> &str {
        &self.url
    }

    async fn estimate(&self, identifier: &UpiHandle, amount: Decimal) -> Result<RiskEstimate> {
        let started = Instant::now();
        let result = self.request(identifier, amount).await;
        metrics::REMOTE_ESTIMATE_DURATION.observe(started.elapsed().as_secs_f64());

        let response = result.map_err(|e| {
            warn!(identifier = %identifier, error = %e, "Remote scoring failed");
            e
        })?;

        if !response.confidence.is_finite() {
            return Err(Error::MalformedResponse(format!(
                "confidence is not a finite number: {}",
                response.confidence
            )));
        }

        debug!(
            identifier = %identifier,
            confidence = response.confidence,
            report_count = response.report_count,
            "Remote estimate"
        );

        let estimate = response.features.into_iter().fold(
            RiskEstimate::new(response.confidence, response.report_count),
            |estimate, (name, score)| estimate.with_feature(name, score),
        );
        Ok(estimate)
    }
}
