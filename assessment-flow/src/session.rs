use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    catalog::{DocumentCatalog, FileDescriptor, UploadedDocument},
    condition::{Condition, DiseaseContext, DurationBucket},
    config::EngineConfig,
    engine::{AnalysisHandle, AnalysisState, Prediction, RiskEngine},
    error::{AssessmentError, Result, ScoringError},
    scoring::RiskScorer,
    validator::validate,
    vitals::{PatientVitals, VitalField},
};

/// Any single input on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Age,
    BloodPressure,
    GlucoseLevel,
    Bmi,
    SelectedCondition,
    CustomCondition,
    Symptoms,
    DurationBucket,
}

/// Everything the display layer renders, taken at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub vitals: PatientVitals,
    pub disease: DiseaseContext,
    pub analysis_state: AnalysisState,
    pub prediction: Option<Prediction>,
    pub last_failure: Option<ScoringError>,
    pub documents: Vec<UploadedDocument>,
}

/// State owner for one clinician's assessment form.
///
/// Setters never validate; validation happens in [`submit`](Self::submit).
/// Edits made while an analysis is running take effect immediately but do
/// not reach that analysis, which scores the snapshot taken at submission.
pub struct AssessmentSession {
    id: Uuid,
    vitals: PatientVitals,
    disease: DiseaseContext,
    catalog: DocumentCatalog,
    engine: RiskEngine,
}

impl AssessmentSession {
    pub fn new(scorer: Arc<dyn RiskScorer>, config: EngineConfig) -> Self {
        Self::with_id(Uuid::new_v4(), scorer, config)
    }

    pub fn with_id(id: Uuid, scorer: Arc<dyn RiskScorer>, config: EngineConfig) -> Self {
        Self {
            id,
            vitals: PatientVitals::default(),
            disease: DiseaseContext::default(),
            catalog: DocumentCatalog::new(),
            engine: RiskEngine::new(scorer, config),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn set_vital(&mut self, field: VitalField, value: Option<String>) {
        debug!(session_id = %self.id, field = %field, "Vital updated");
        self.vitals = self.vitals.with(field, value);
    }

    pub fn set_age(&mut self, value: Option<String>) {
        self.set_vital(VitalField::Age, value);
    }

    pub fn set_blood_pressure(&mut self, value: Option<String>) {
        self.set_vital(VitalField::BloodPressure, value);
    }

    pub fn set_glucose_level(&mut self, value: Option<String>) {
        self.set_vital(VitalField::GlucoseLevel, value);
    }

    pub fn set_bmi(&mut self, value: Option<String>) {
        self.set_vital(VitalField::Bmi, value);
    }

    pub fn set_condition(&mut self, condition: Option<Condition>) {
        debug!(session_id = %self.id, condition = ?condition, "Condition selected");
        self.disease.selected_condition = condition;
    }

    pub fn set_custom_condition(&mut self, value: Option<String>) {
        self.disease.custom_condition = value;
    }

    pub fn set_symptoms(&mut self, symptoms: impl Into<String>) {
        self.disease.symptoms = symptoms.into();
    }

    pub fn set_duration(&mut self, duration: Option<DurationBucket>) {
        self.disease.duration_bucket = duration;
    }

    /// Sets one form field from its text value. Select fields accept only
    /// their listed options; `None` or blank text clears them.
    pub fn set_field(&mut self, field: FormField, value: Option<String>) -> Result<()> {
        match field {
            FormField::Age => self.set_age(value),
            FormField::BloodPressure => self.set_blood_pressure(value),
            FormField::GlucoseLevel => self.set_glucose_level(value),
            FormField::Bmi => self.set_bmi(value),
            FormField::SelectedCondition => {
                let condition = selected(&value).map(str::parse::<Condition>).transpose()?;
                self.set_condition(condition);
            }
            FormField::CustomCondition => self.set_custom_condition(value),
            FormField::Symptoms => self.set_symptoms(value.unwrap_or_default()),
            FormField::DurationBucket => {
                let duration = selected(&value).map(str::parse::<DurationBucket>).transpose()?;
                self.set_duration(duration);
            }
        }
        Ok(())
    }

    /// Validates the form and, if it passes, starts an analysis.
    ///
    /// A running analysis is reported before any validation so repeated
    /// submissions get the same answer. Validation failures leave the
    /// analysis state untouched.
    pub fn submit(&self) -> Result<AnalysisHandle> {
        if self.engine.is_running() {
            return Err(AssessmentError::AnalysisInProgress);
        }

        let input = validate(&self.vitals, &self.disease).map_err(|errors| {
            info!(session_id = %self.id, errors = errors.len(), "Submission rejected by validation");
            AssessmentError::Validation(errors)
        })?;
        self.engine.start_analysis(input)
    }

    /// Accepts the finished analysis so the form reads as idle again.
    pub fn acknowledge(&self) -> AnalysisState {
        self.engine.acknowledge()
    }

    pub fn add_files<I>(&mut self, files: I) -> Vec<UploadedDocument>
    where
        I: IntoIterator<Item = FileDescriptor>,
    {
        self.catalog.add_batch(files)
    }

    pub fn remove_file(&mut self, id: &Uuid) {
        self.catalog.remove(id);
    }

    pub fn documents(&self) -> &[UploadedDocument] {
        self.catalog.list()
    }

    pub fn catalog(&self) -> &DocumentCatalog {
        &self.catalog
    }

    pub fn vitals(&self) -> &PatientVitals {
        &self.vitals
    }

    pub fn disease(&self) -> &DiseaseContext {
        &self.disease
    }

    pub fn analysis_state(&self) -> AnalysisState {
        self.engine.state()
    }

    pub fn prediction(&self) -> Option<Arc<Prediction>> {
        self.engine.prediction()
    }

    pub fn last_failure(&self) -> Option<ScoringError> {
        self.engine.last_failure()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let analysis = self.engine.view();
        SessionSnapshot {
            id: self.id,
            vitals: self.vitals.clone(),
            disease: self.disease.clone(),
            analysis_state: analysis.state,
            prediction: analysis.prediction.map(|p| (*p).clone()),
            last_failure: analysis.last_failure,
            documents: self.catalog.list().to_vec(),
        }
    }

    /// Cancels any running analysis and returns to `Idle`. Call before
    /// discarding the session; dropping it does the same.
    pub fn teardown(&self) {
        if self.engine.cancel() {
            info!(session_id = %self.id, "Session torn down with analysis in flight");
        }
    }
}

fn selected(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
