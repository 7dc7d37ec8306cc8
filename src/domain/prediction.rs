//! Prediction result types.
//!
//! Represents the output of adherence scoring, before and after the
//! medicine impact adjustment.

use serde::{Deserialize, Serialize};

/// Scores at or above this are low risk.
pub const LOW_RISK_THRESHOLD: f64 = 80.0;

/// Scores at or above this (and below `LOW_RISK_THRESHOLD`) are medium risk.
pub const MEDIUM_RISK_THRESHOLD: f64 = 60.0;

/// Bounds applied to the confidence of an adjusted prediction.
pub const ADJUSTED_CONFIDENCE_MIN: f64 = 50.0;
pub const ADJUSTED_CONFIDENCE_MAX: f64 = 98.0;

/// Risk of non-adherence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Likely to follow the regimen
    Low,
    /// Monitoring recommended
    Medium,
    /// Intervention recommended
    High,
}

impl RiskLevel {
    /// UI color hint paired with this level.
    #[must_use]
    pub fn color(&self) -> RiskColor {
        match self {
            Self::Low => RiskColor::Success,
            Self::Medium => RiskColor::Warning,
            Self::High => RiskColor::Danger,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Color hint for rendering a risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskColor {
    Success,
    Warning,
    Danger,
}

impl std::fmt::Display for RiskColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Danger => write!(f, "danger"),
        }
    }
}

/// Map a score to its risk tier and color.
#[must_use]
pub fn classify(score: f64) -> (RiskLevel, RiskColor) {
    let level = if score >= LOW_RISK_THRESHOLD {
        RiskLevel::Low
    } else if score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };
    (level, level.color())
}

/// Recommendation urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
        }
    }
}

/// A single actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

impl Recommendation {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
        }
    }
}

/// Which estimator produced the base score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    RuleBased,
    Ensemble,
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuleBased => write!(f, "rule-based"),
            Self::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// Complete prediction for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Adherence score in [0, 100]
    pub adherence_score: f64,

    pub risk_level: RiskLevel,

    pub risk_color: RiskColor,

    /// Confidence in percent
    pub confidence: f64,

    /// Ordered by the synthesizer's rule sequence, adjustment items last
    pub recommendations: Vec<Recommendation>,

    /// Human-readable reasons behind the medicine adjustment
    pub factors: Vec<String>,

    pub estimator: EstimatorKind,

    /// Whether a medicine adjustment was applied
    pub adjusted: bool,
}

impl PredictionResult {
    /// Build an unadjusted result; risk is derived from `score`.
    #[must_use]
    pub fn new(
        score: f64,
        confidence: f64,
        recommendations: Vec<Recommendation>,
        estimator: EstimatorKind,
    ) -> Self {
        let (risk_level, risk_color) = classify(score);
        Self {
            adherence_score: score,
            risk_level,
            risk_color,
            confidence,
            recommendations,
            factors: Vec::new(),
            estimator,
            adjusted: false,
        }
    }

    /// Apply a score/confidence delta and return the reclassified result.
    ///
    /// The adjusted score is clamped to [0, 100] and the adjusted
    /// confidence to [50, 98]. Recommendations and factors are appended
    /// after the base ones.
    #[must_use]
    pub fn with_adjustment(
        self,
        score_delta: f64,
        confidence_delta: f64,
        recommendations: Vec<Recommendation>,
        factors: Vec<String>,
    ) -> Self {
        let score = (self.adherence_score + score_delta).clamp(0.0, 100.0);
        let confidence = (self.confidence + confidence_delta)
            .clamp(ADJUSTED_CONFIDENCE_MIN, ADJUSTED_CONFIDENCE_MAX);
        let (risk_level, risk_color) = classify(score);

        let mut all_recommendations = self.recommendations;
        all_recommendations.extend(recommendations);
        let mut all_factors = self.factors;
        all_factors.extend(factors);

        Self {
            adherence_score: score,
            risk_level,
            risk_color,
            confidence,
            recommendations: all_recommendations,
            factors: all_factors,
            estimator: self.estimator,
            adjusted: true,
        }
    }
}
