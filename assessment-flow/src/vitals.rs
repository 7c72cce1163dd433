use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw vitals as typed into the intake form.
///
/// Every field holds the unparsed text. Blank text counts as absent; nothing
/// here is checked until the form is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientVitals {
    pub age: Option<String>,
    /// Expected as `SYS/DIA`, e.g. `120/80`.
    pub blood_pressure: Option<String>,
    /// mg/dL
    pub glucose_level: Option<String>,
    pub bmi: Option<String>,
}

impl PatientVitals {
    pub fn get(&self, field: VitalField) -> Option<&str> {
        let value = match field {
            VitalField::Age => &self.age,
            VitalField::BloodPressure => &self.blood_pressure,
            VitalField::GlucoseLevel => &self.glucose_level,
            VitalField::Bmi => &self.bmi,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Returns a copy with one field replaced.
    pub fn with(&self, field: VitalField, value: Option<String>) -> Self {
        let mut next = self.clone();
        let slot = match field {
            VitalField::Age => &mut next.age,
            VitalField::BloodPressure => &mut next.blood_pressure,
            VitalField::GlucoseLevel => &mut next.glucose_level,
            VitalField::Bmi => &mut next.bmi,
        };
        *slot = value;
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VitalField {
    Age,
    BloodPressure,
    GlucoseLevel,
    Bmi,
}

impl VitalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            VitalField::Age => "age",
            VitalField::BloodPressure => "bloodPressure",
            VitalField::GlucoseLevel => "glucoseLevel",
            VitalField::Bmi => "bmi",
        }
    }
}

impl fmt::Display for VitalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    /// Systolic pressure (the higher number)
    pub systolic: u16,
    /// Diastolic pressure (the lower number)
    pub diastolic: u16,
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

/// Vitals after submission-time validation. Absent fields stay absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedVitals {
    pub age: Option<f64>,
    pub blood_pressure: Option<BloodPressure>,
    pub glucose_level: Option<f64>,
    pub bmi: Option<f64>,
}
