//! Risk Engine for PayGuard
//!
//! Scores payees before a UPI payment and gates the payment on the score.
//! A remote scoring service is used when configured, with a local heuristic
//! estimator behind it for timeouts, failures and demo mode. Also hosts the
//! payee signal book and the video call analysis channel.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod channel;
pub mod config;
pub mod error;
pub mod estimator;
#[allow(missing_docs)]
pub mod metrics;
pub mod pipeline;
pub mod signals;

pub use channel::{
    connect_channel, AnalysisChannel, AnalysisSession, ChannelConfig, ChannelMode, Frame,
    VideoFeatures, VideoVerdict,
};
pub use config::Config;
pub use error::{Error, Result};
pub use estimator::{
    HeuristicConfig, HeuristicEstimator, RemoteConfig, RemoteEstimator, RequestMethod,
    RiskEstimator,
};
pub use pipeline::RiskPipeline;
pub use signals::{PayeeSignalStats, ReportChannel, ScamReport, SignalBook, SignalConfig};

/// Amount assessed when the scanned payload carries none
pub const DEFAULT_ASSESSMENT_AMOUNT: u32 = 500;

/// Default remote scoring budget (milliseconds)
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 4_000;
