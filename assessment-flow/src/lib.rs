pub mod catalog;
pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod validator;
pub mod vitals;

// Re-export commonly used types
pub use catalog::{DocumentCatalog, DocumentKind, FileDescriptor, UploadedDocument, format_size};
pub use condition::{Condition, DiseaseContext, DurationBucket};
pub use config::EngineConfig;
pub use engine::{AnalysisHandle, AnalysisState, AnalysisView, Prediction, RiskEngine};
pub use error::{AssessmentError, Result, ScoringError, ValidationError};
pub use scoring::{RiskScorer, RiskTier, ScoreReport, ScoreRequest, SimulatedScorer};
pub use session::{AssessmentSession, FormField, SessionSnapshot};
pub use storage::InMemorySessionStore;
pub use validator::{ValidatedInput, validate};
pub use vitals::{BloodPressure, PatientVitals, ValidatedVitals, VitalField};
