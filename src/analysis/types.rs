// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Analysis result types

use serde::{Deserialize, Serialize};

/// Highest star rating
pub const MAX_RATING: u8 = 5;

/// Lightroom basic-panel offsets suggested by the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ToneAdjustments {
    /// Stops, -5.0..=5.0
    pub exposure: f64,
    pub contrast: f64,
    pub highlights: f64,
    pub shadows: f64,
    pub whites: f64,
    pub blacks: f64,
}

/// What the model said about one photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0-5 stars; 0 here is a real verdict, not a failure
    pub rating: u8,
    pub adjustments: ToneAdjustments,
    /// White balance offset, -100..=100
    pub temperature: f64,
    pub reason: String,
    pub caption: String,
    pub keywords: Vec<String>,
}

/// Either a rating or a reason the model could not produce one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Rated(AnalysisResult),
    Failed { reason: String, attempts: u32 },
}

impl AnalysisOutcome {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisOutcome::Rated(result) => Some(result),
            AnalysisOutcome::Failed { .. } => None,
        }
    }

    pub fn is_rated(&self) -> bool {
        matches!(self, AnalysisOutcome::Rated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rating_is_distinct_from_failure() {
        let zero = AnalysisOutcome::Rated(AnalysisResult { rating: 0, ..Default::default() });
        let failed = AnalysisOutcome::Failed { reason: "rate limited".to_string(), attempts: 4 };

        assert!(zero.is_rated());
        assert_eq!(zero.result().map(|r| r.rating), Some(0));
        assert!(!failed.is_rated());
        assert!(failed.result().is_none());
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let failed = AnalysisOutcome::Failed { reason: "boom".to_string(), attempts: 2 };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["attempts"], 2);

        let rated = AnalysisOutcome::Rated(AnalysisResult { rating: 4, ..Default::default() });
        let json = serde_json::to_value(&rated).unwrap();
        assert_eq!(json["outcome"], "rated");
        assert_eq!(json["rating"], 4);

        let back: AnalysisOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, rated);
    }
}
