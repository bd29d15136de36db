//! Video call analysis channel.
//!
//! Frames go to a remote analysis server over a WebSocket when one is
//! reachable. When it is not (no URL, connect timeout, or a failure while
//! streaming) the session switches to [`SimulatedChannel`] and keeps
//! producing verdicts.

pub mod remote;
pub mod simulated;

pub use remote::RemoteChannel;
pub use simulated::SimulatedChannel;

use crate::metrics::CHANNEL_FALLBACKS_TOTAL;
use crate::Result;
use async_trait::async_trait;
use payguard_core::{DecisionGate, Recommendation, RiskPercentage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// One captured video frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number within the session
    pub index: u64,
    /// JPEG bytes
    pub jpeg: Vec<u8>,
}

impl Frame {
    /// New frame
    pub fn new(index: u64, jpeg: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            jpeg: jpeg.into(),
        }
    }
}

/// Visual features behind a verdict
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFeatures {
    /// Faces in frame
    pub face_count: u32,
    /// Face area relative to the frame
    pub face_ratio: f64,
    /// Eye contact (0-1)
    pub eye_contact: f64,
    /// Edge density (0-1)
    pub edge_density: f64,
}

/// Analysis result for the stream so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoVerdict {
    /// Whether the call looks like a scam
    pub is_scam: bool,
    /// Scam confidence (0-1)
    pub confidence: f64,
    /// Visual model confidence
    #[serde(default)]
    pub visual_confidence: Option<f64>,
    /// Audio model confidence
    #[serde(default)]
    pub audio_confidence: Option<f64>,
    /// Transcript model confidence
    #[serde(default)]
    pub text_confidence: Option<f64>,
    /// Human-readable explanation
    #[serde(default)]
    pub reason: Option<String>,
    /// Feature breakdown
    #[serde(default)]
    pub features: VideoFeatures,
}

impl VideoVerdict {
    /// Confidence as a clamped percentage
    pub fn risk_percentage(&self) -> RiskPercentage {
        RiskPercentage::from_confidence(self.confidence)
    }

    /// Run the verdict through the payment gate
    pub fn recommendation(&self, gate: &DecisionGate) -> Recommendation {
        gate.decide(f64::from(self.risk_percentage().value()))
    }
}

/// Which implementation is producing verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMode {
    /// Remote analysis server
    Remote,
    /// Local simulation
    Simulated,
}

/// A stream of frames in, verdicts out
#[async_trait]
pub trait AnalysisChannel: Send {
    /// Current mode
    fn mode(&self) -> ChannelMode;

    /// Submit a frame and wait for the verdict it produces
    async fn analyze(&mut self, frame: &Frame) -> Result<VideoVerdict>;

    /// End the stream
    async fn close(&mut self) -> Result<()>;
}

/// Analysis channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// WebSocket URL of the analysis server; `None` simulates
    pub url: Option<String>,

    /// Connect budget before simulating (milliseconds)
    pub connect_timeout_ms: u64,

    /// Wait for each verdict (milliseconds)
    pub response_timeout_ms: u64,

    /// Frames per simulated risk stage
    pub frames_per_stage: u64,

    /// Maximum absolute jitter on simulated confidence
    pub jitter: f64,

    /// RNG seed for the simulation
    pub seed: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_ms: 3_000,
            response_timeout_ms: 5_000,
            frames_per_stage: 30, // 3 s at 10 fps
            jitter: 0.05,
            seed: None,
        }
    }
}

impl ChannelConfig {
    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Response timeout as a duration
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Connect to the analysis server, or simulate when that is not possible
pub async fn connect_channel(config: &ChannelConfig) -> Box<dyn AnalysisChannel> {
    let Some(url) = config.url.as_deref() else {
        info!("No analysis server configured, simulating");
        return Box::new(SimulatedChannel::new(config));
    };

    match tokio::time::timeout(
        config.connect_timeout(),
        RemoteChannel::connect(url, config.response_timeout()),
    )
    .await
    {
        Ok(Ok(channel)) => {
            info!(url, "Connected to analysis server");
            return Box::new(channel);
        }
        Ok(Err(e)) => {
            warn!(url, error = %e, "Analysis server unavailable, simulating");
            CHANNEL_FALLBACKS_TOTAL.with_label_values(&["connect_error"]).inc();
        }
        Err(_) => {
            warn!(
                url,
                timeout_ms = config.connect_timeout_ms,
                "Analysis server connect timed out, simulating"
            );
            CHANNEL_FALLBACKS_TOTAL.with_label_values(&["connect_timeout"]).inc();
        }
    }

    Box::new(SimulatedChannel::new(config))
}

/// Analysis session that survives a failing server
pub struct AnalysisSession {
    channel: Box<dyn AnalysisChannel>,
    config: ChannelConfig,
}

impl AnalysisSession {
    /// Open a session
    pub async fn connect(config: ChannelConfig) -> Self {
        let channel = connect_channel(&config).await;
        Self { channel, config }
    }

    /// Current mode
    pub fn mode(&self) -> ChannelMode {
        self.channel.mode()
    }

    /// Analyze a frame; a remote failure switches the session to simulation
    /// and the frame is answered by the simulation
    pub async fn analyze(&mut self, frame: &Frame) -> Result<VideoVerdict> {
        match self.channel.analyze(frame).await {
            Ok(verdict) => Ok(verdict),
            Err(e) if self.channel.mode() == ChannelMode::Remote => {
                warn!(frame = frame.index, error = %e, "Analysis stream failed, simulating");
                CHANNEL_FALLBACKS_TOTAL.with_label_values(&["stream_error"]).inc();
                if let Err(e) = self.channel.close().await {
                    warn!(error = %e, "Failed to close analysis stream");
                }
                self.channel = Box::new(SimulatedChannel::new(&self.config));
                self.channel.analyze(frame).await
            }
            Err(e) => Err(e),
        }
    }

    /// End the session
    pub async fn close(mut self) -> Result<()> {
        self.channel.close().await
    }
}
