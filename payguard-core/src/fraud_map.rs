//! Fraud map aggregation for the dashboard

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Known scam categories and their map colours
pub const SCAM_TYPES: &[(&str, &str)] = &[
    ("Phishing", "#FF5252"),
    ("Identity Theft", "#FF7043"),
    ("UPI Fraud", "#FFCA28"),
    ("Investment Scam", "#66BB6A"),
    ("Romance Scam", "#42A5F5"),
    ("Job Scam", "#AB47BC"),
    ("Banking Fraud", "#EC407A"),
    ("Tech Support Scam", "#26A69A"),
    ("Online Shopping", "#5C6BC0"),
    ("Government Impersonation", "#8D6E63"),
];

/// Colour for unknown categories
pub const UNKNOWN_SCAM_COLOR: &str = "#999999";

/// Locations listed in [`GlobalStats::high_risk_locations`]
pub const HIGH_RISK_LOCATION_LIMIT: usize = 5;

/// Map colour for a scam category
pub fn scam_type_color(scam_type: &str) -> &'static str {
    SCAM_TYPES
        .iter()
        .find(|(name, _)| *name == scam_type)
        .map(|(_, color)| *color)
        .unwrap_or(UNKNOWN_SCAM_COLOR)
}

/// Reports of one category at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamTypeCount {
    /// Category name
    #[serde(rename = "type")]
    pub scam_type: String,
    /// Reports
    pub count: u64,
    /// Map colour; filled from [`SCAM_TYPES`] when absent
    #[serde(default)]
    pub color: Option<String>,
}

/// One point on the fraud map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamLocation {
    /// City
    pub city: String,
    /// Country
    pub country: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Total reports at this location
    pub scam_count: u64,
    /// Per-category breakdown
    pub scam_types: Vec<ScamTypeCount>,
    /// Risk (0-1)
    pub risk: f64,
}

impl ScamLocation {
    /// Fill missing category colours
    pub fn with_colors(mut self) -> Self {
        for scam_type in &mut self.scam_types {
            if scam_type.color.is_none() {
                scam_type.color = Some(scam_type_color(&scam_type.scam_type).to_string());
            }
        }
        self
    }
}

/// Share of one category across all locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamTypeShare {
    /// Category name
    #[serde(rename = "type")]
    pub scam_type: String,
    /// Reports
    pub count: u64,
    /// Percent of all reports
    pub percentage: f64,
}

/// Dashboard totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    /// Reports across all locations
    pub total_scams: u64,
    /// Mean location risk
    pub avg_risk: f64,
    /// Categories, most reported first
    pub scam_type_breakdown: Vec<ScamTypeShare>,
    /// Riskiest locations, riskiest first
    pub high_risk_locations: Vec<ScamLocation>,
}

/// Aggregate the fraud map
pub fn global_stats(locations: &[ScamLocation]) -> GlobalStats {
    let total_scams: u64 = locations.iter().map(|l| l.scam_count).sum();
    let avg_risk = if locations.is_empty() {
        0.0
    } else {
        locations.iter().map(|l| l.risk).sum::<f64>() / locations.len() as f64
    };

    let mut type_counts: BTreeMap<&str, u64> = BTreeMap::new();
    for location in locations {
        for scam_type in &location.scam_types {
            *type_counts.entry(scam_type.scam_type.as_str()).or_default() += scam_type.count;
        }
    }

    let mut scam_type_breakdown: Vec<ScamTypeShare> = type_counts
        .into_iter()
        .map(|(scam_type, count)| ScamTypeShare {
            scam_type: scam_type.to_string(),
            count,
            percentage: if total_scams == 0 {
                0.0
            } else {
                count as f64 / total_scams as f64 * 100.0
            },
        })
        .collect();
    // Stable sort keeps ties in name order
    scam_type_breakdown.sort_by(|a, b| b.count.cmp(&a.count));

    let mut high_risk_locations = locations.to_vec();
    high_risk_locations.sort_by(|a, b| b.risk.total_cmp(&a.risk));
    high_risk_locations.truncate(HIGH_RISK_LOCATION_LIMIT);

    GlobalStats {
        total_scams,
        avg_risk,
        scam_type_breakdown,
        high_risk_locations,
    }
}
