//! PayGuard core
//!
//! Scan-before-you-pay building blocks: turns a scanned QR payload into a
//! validated payment descriptor and maps a risk estimate onto the three-way
//! safety gate (allow / verify / block).
//!
//! # Pipeline
//!
//! ```text
//!  raw scan ──► extractor ──► PaymentDescriptor ──► (risk-engine) ──► RiskEstimate
//!                                                                        │
//!                                       RiskAssessment ◄── DecisionGate ◄┘
//! ```
//!
//! # Invariants
//!
//! - Risk percentage is always clamped to 0..=100
//! - Level and recommendation never get safer as the percentage grows

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod auth;
pub mod error;
pub mod extractor;
pub mod fraud_map;
pub mod gate;
pub mod session;
pub mod types;

pub use auth::{AuthSession, AuthState};
pub use error::{Error, Result};
pub use extractor::extract_payment;
pub use gate::{decide, DecisionGate, GateThresholds};
pub use session::{FileSessionStore, MemorySessionStore, ScanSession, SessionStore};
pub use types::*;

/// Currency assumed when a payload does not carry one
pub const DEFAULT_CURRENCY: &str = "INR";
