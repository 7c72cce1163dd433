use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    condition::DurationBucket,
    error::ScoringError,
    validator::ValidatedInput,
    vitals::ValidatedVitals,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    /// Capitalized form used in outcome labels.
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }

    /// Standard follow-up advice for the tier.
    pub fn standard_recommendations(&self) -> &'static [&'static str] {
        match self {
            RiskTier::Low => &[
                "Continue regular check-ups",
                "Maintain healthy lifestyle",
                "Monitor symptoms",
            ],
            RiskTier::Medium => &[
                "Schedule follow-up appointment",
                "Consider lifestyle modifications",
                "Monitor closely",
            ],
            RiskTier::High => &[
                "Immediate medical consultation required",
                "Start preventive treatment",
                "Regular monitoring essential",
            ],
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        })
    }
}

/// What a scorer is asked to assess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub effective_condition: String,
    pub vitals: ValidatedVitals,
    pub symptoms: String,
    pub duration: Option<DurationBucket>,
}

impl From<ValidatedInput> for ScoreRequest {
    fn from(input: ValidatedInput) -> Self {
        Self {
            effective_condition: input.effective_condition,
            vitals: input.vitals,
            symptoms: input.symptoms,
            duration: input.duration,
        }
    }
}

/// Raw answer from a scorer, before it becomes a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub risk_tier: RiskTier,
    pub confidence_percent: u8,
    pub recommendations: Vec<String>,
}

impl ScoreReport {
    /// A report carrying the tier's standard recommendations.
    pub fn standard(risk_tier: RiskTier, confidence_percent: u8) -> Self {
        Self {
            risk_tier,
            confidence_percent,
            recommendations: risk_tier
                .standard_recommendations()
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }
}

/// The inference backend. The engine only orchestrates; this does the thinking.
#[async_trait]
pub trait RiskScorer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn score(&self, request: ScoreRequest) -> Result<ScoreReport, ScoringError>;
}

/// Development scorer: picks one of three canned outcomes at random and
/// ignores the vitals entirely. Stands in until a real model is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedScorer;

impl SimulatedScorer {
    pub const OUTCOMES: [(RiskTier, u8); 3] =
        [(RiskTier::Low, 92), (RiskTier::Medium, 67), (RiskTier::High, 82)];
}

#[async_trait]
impl RiskScorer for SimulatedScorer {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn score(&self, _request: ScoreRequest) -> Result<ScoreReport, ScoringError> {
        let (tier, confidence) = Self::OUTCOMES[rand::random_range(0..Self::OUTCOMES.len())];
        Ok(ScoreReport::standard(tier, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ScoreRequest {
        ScoreRequest {
            effective_condition: "Asthma".to_string(),
            vitals: ValidatedVitals::default(),
            symptoms: String::new(),
            duration: None,
        }
    }

    #[tokio::test]
    async fn simulated_scorer_returns_a_canned_outcome() {
        let scorer = SimulatedScorer;
        for _ in 0..20 {
            let report = scorer.score(request()).await.unwrap();
            assert!(
                SimulatedScorer::OUTCOMES.contains(&(report.risk_tier, report.confidence_percent))
            );
            assert_eq!(report.recommendations.len(), 3);
            assert_eq!(
                report.recommendations[0],
                report.risk_tier.standard_recommendations()[0]
            );
        }
    }

    #[test]
    fn tiers_serialize_lowercase_and_label_capitalized() {
        assert_eq!(serde_json::to_string(&RiskTier::Medium).unwrap(), "\"medium\"");
        assert_eq!(RiskTier::High.label(), "High");
        assert_eq!(RiskTier::Low.to_string(), "low");
    }

    #[test]
    fn every_tier_has_recommendations() {
        for tier in RiskTier::ALL {
            assert!(!tier.standard_recommendations().is_empty());
        }
    }
}
