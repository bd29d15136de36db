//! Risk engine metrics

use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};

lazy_static::lazy_static! {
    pub static ref ASSESSMENTS_TOTAL: CounterVec = register_counter_vec!(
        "payguard_assessments_total",
        "Completed risk assessments",
        &["source", "recommendation"]
    )
    .unwrap();

    pub static ref ESTIMATOR_FALLBACKS_TOTAL: CounterVec = register_counter_vec!(
        "payguard_estimator_fallbacks_total",
        "Assessments served by the heuristic after a remote failure",
        &["reason"]
    )
    .unwrap();

    pub static ref REMOTE_ESTIMATE_DURATION: Histogram = register_histogram!(
        "payguard_remote_estimate_duration_seconds",
        "Remote scoring latency"
    )
    .unwrap();

    pub static ref ASSESSMENTS_CANCELLED: IntCounter = register_int_counter!(
        "payguard_assessments_cancelled_total",
        "Assessments abandoned by the caller"
    )
    .unwrap();

    pub static ref CHANNEL_FALLBACKS_TOTAL: CounterVec = register_counter_vec!(
        "payguard_channel_fallbacks_total",
        "Analysis sessions switched to the simulated channel",
        &["reason"]
    )
    .unwrap();

    pub static ref SCAM_REPORTS_TOTAL: CounterVec = register_counter_vec!(
        "payguard_scam_reports_total",
        "Scam reports filed",
        &["channel"]
    )
    .unwrap();
}
