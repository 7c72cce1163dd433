use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::AssessmentError;

/// Conditions offered by the intake form, plus the free-text escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Diabetes,
    Hypertension,
    #[serde(rename = "Heart Disease")]
    HeartDisease,
    Asthma,
    Arthritis,
    Depression,
    Anxiety,
    Migraine,
    Obesity,
    #[serde(rename = "Sleep Apnea")]
    SleepApnea,
    #[serde(rename = "Chronic Kidney Disease")]
    ChronicKidneyDisease,
    #[serde(rename = "COPD")]
    Copd,
    #[serde(rename = "Other (Custom)")]
    Other,
}

impl Condition {
    /// Display order of the condition picker.
    pub const ALL: [Condition; 13] = [
        Condition::Diabetes,
        Condition::Hypertension,
        Condition::HeartDisease,
        Condition::Asthma,
        Condition::Arthritis,
        Condition::Depression,
        Condition::Anxiety,
        Condition::Migraine,
        Condition::Obesity,
        Condition::SleepApnea,
        Condition::ChronicKidneyDisease,
        Condition::Copd,
        Condition::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Diabetes => "Diabetes",
            Condition::Hypertension => "Hypertension",
            Condition::HeartDisease => "Heart Disease",
            Condition::Asthma => "Asthma",
            Condition::Arthritis => "Arthritis",
            Condition::Depression => "Depression",
            Condition::Anxiety => "Anxiety",
            Condition::Migraine => "Migraine",
            Condition::Obesity => "Obesity",
            Condition::SleepApnea => "Sleep Apnea",
            Condition::ChronicKidneyDisease => "Chronic Kidney Disease",
            Condition::Copd => "COPD",
            Condition::Other => "Other (Custom)",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Condition::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| AssessmentError::UnknownOption {
                field: "selectedCondition",
                value: s.to_string(),
            })
    }
}

/// How long the patient has had the symptoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationBucket {
    #[serde(rename = "1-7 days")]
    Days,
    #[serde(rename = "1-4 weeks")]
    Weeks,
    #[serde(rename = "1-6 months")]
    Months,
    #[serde(rename = "6+ months")]
    LongTerm,
    #[serde(rename = "chronic")]
    Chronic,
}

impl DurationBucket {
    pub const ALL: [DurationBucket; 5] = [
        DurationBucket::Days,
        DurationBucket::Weeks,
        DurationBucket::Months,
        DurationBucket::LongTerm,
        DurationBucket::Chronic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DurationBucket::Days => "1-7 days",
            DurationBucket::Weeks => "1-4 weeks",
            DurationBucket::Months => "1-6 months",
            DurationBucket::LongTerm => "6+ months",
            DurationBucket::Chronic => "chronic",
        }
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DurationBucket {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        DurationBucket::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| AssessmentError::UnknownOption {
                field: "durationBucket",
                value: s.to_string(),
            })
    }
}

/// What the clinician believes is going on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseContext {
    pub selected_condition: Option<Condition>,
    /// Only consulted when `selected_condition` is [`Condition::Other`].
    pub custom_condition: Option<String>,
    pub symptoms: String,
    pub duration_bucket: Option<DurationBucket>,
}

impl DiseaseContext {
    /// The condition name used in results, or `None` if there is nothing to name.
    pub fn effective_condition(&self) -> Option<String> {
        match self.selected_condition? {
            Condition::Other => self
                .custom_condition
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            selected => Some(selected.label().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_labels_round_trip_through_from_str() {
        for condition in Condition::ALL {
            assert_eq!(condition.label().parse::<Condition>().unwrap(), condition);
        }
        assert_eq!("copd".parse::<Condition>().unwrap(), Condition::Copd);
        assert!(matches!(
            "Gout".parse::<Condition>(),
            Err(AssessmentError::UnknownOption { field: "selectedCondition", .. })
        ));
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&Condition::HeartDisease).unwrap();
        assert_eq!(json, "\"Heart Disease\"");
        let bucket: DurationBucket = serde_json::from_str("\"1-4 weeks\"").unwrap();
        assert_eq!(bucket, DurationBucket::Weeks);
    }

    #[test]
    fn effective_condition_prefers_custom_text_for_other() {
        let mut ctx = DiseaseContext {
            selected_condition: Some(Condition::Other),
            custom_condition: Some("  Lupus ".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.effective_condition().as_deref(), Some("Lupus"));

        ctx.custom_condition = Some("   ".to_string());
        assert_eq!(ctx.effective_condition(), None);

        // custom text is ignored for catalog entries
        ctx.selected_condition = Some(Condition::Asthma);
        ctx.custom_condition = Some("Lupus".to_string());
        assert_eq!(ctx.effective_condition().as_deref(), Some("Asthma"));

        ctx.selected_condition = None;
        assert_eq!(ctx.effective_condition(), None);
    }
}
