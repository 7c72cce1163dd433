//! Submission-time checks for the intake form.
//!
//! The form is edited freely; these functions only run when the clinician asks
//! for an assessment. They never mutate their input.

use serde::{Deserialize, Serialize};

use crate::{
    condition::{DiseaseContext, DurationBucket},
    error::ValidationError,
    vitals::{BloodPressure, PatientVitals, ValidatedVitals, VitalField},
};

const MAX_AGE_YEARS: f64 = 150.0;
const MAX_GLUCOSE_MG_DL: f64 = 2000.0;
const MAX_BMI: f64 = 200.0;

/// Everything the scoring engine needs, already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedInput {
    pub effective_condition: String,
    pub vitals: ValidatedVitals,
    pub symptoms: String,
    pub duration: Option<DurationBucket>,
}

/// Checks the form and reports every problem at once, in field order.
///
/// Vitals are individually optional: only fields that are present *and*
/// malformed are reported. A missing condition always blocks submission.
pub fn validate(
    vitals: &PatientVitals,
    disease: &DiseaseContext,
) -> Result<ValidatedInput, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let age = collect(parse_measure(vitals, VitalField::Age, MAX_AGE_YEARS), &mut errors);
    let blood_pressure = collect(parse_blood_pressure(vitals), &mut errors);
    let glucose_level = collect(
        parse_measure(vitals, VitalField::GlucoseLevel, MAX_GLUCOSE_MG_DL),
        &mut errors,
    );
    let bmi = collect(parse_measure(vitals, VitalField::Bmi, MAX_BMI), &mut errors);

    let effective_condition = disease.effective_condition();
    if effective_condition.is_none() {
        errors.push(ValidationError::MissingCondition);
    }

    match effective_condition {
        Some(effective_condition) if errors.is_empty() => Ok(ValidatedInput {
            effective_condition,
            vitals: ValidatedVitals {
                age,
                blood_pressure,
                glucose_level,
                bmi,
            },
            symptoms: disease.symptoms.trim().to_string(),
            duration: disease.duration_bucket,
        }),
        _ => Err(errors),
    }
}

fn collect<T>(
    parsed: Result<Option<T>, ValidationError>,
    errors: &mut Vec<ValidationError>,
) -> Option<T> {
    parsed.unwrap_or_else(|e| {
        errors.push(e);
        None
    })
}

fn parse_measure(
    vitals: &PatientVitals,
    field: VitalField,
    max: f64,
) -> Result<Option<f64>, ValidationError> {
    let Some(raw) = vitals.get(field) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && (0.0..=max).contains(&value) => Ok(Some(value)),
        _ => Err(ValidationError::InvalidField(field)),
    }
}

fn parse_blood_pressure(vitals: &PatientVitals) -> Result<Option<BloodPressure>, ValidationError> {
    let Some(raw) = vitals.get(VitalField::BloodPressure) else {
        return Ok(None);
    };
    let invalid = || ValidationError::InvalidField(VitalField::BloodPressure);

    let (systolic, diastolic) = raw.trim().split_once('/').ok_or_else(invalid)?;
    Ok(Some(BloodPressure {
        systolic: parse_pressure(systolic).ok_or_else(invalid)?,
        diastolic: parse_pressure(diastolic).ok_or_else(invalid)?,
    }))
}

fn parse_pressure(part: &str) -> Option<u16> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}
