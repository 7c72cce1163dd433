//! Single-flight orchestration of a risk analysis.
//!
//! ```text
//! Idle ──start──▶ Running ──ok──▶ Complete ──acknowledge/start──▶ …
//!                    │  └──err──▶ Failed   ──acknowledge/start──▶ …
//!                    └──cancel──▶ Idle
//! ```
//!
//! The engine never scores anything itself. It flips the state to `Running`
//! synchronously, runs the [`RiskScorer`] on a tokio task, and writes the
//! outcome back under a generation check so that a cancelled run can never
//! overwrite newer state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    error::{AssessmentError, Result, ScoringError},
    scoring::{RiskScorer, RiskTier, ScoreReport, ScoreRequest},
    validator::ValidatedInput,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    Idle,
    Running,
    Complete,
    Failed,
}

impl AnalysisState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisState::Complete | AnalysisState::Failed)
    }
}

/// Outcome of one successful analysis. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub outcome_label: String,
    pub confidence_percent: u8,
    pub risk_tier: RiskTier,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Prediction {
    /// Shapes a scorer report into a prediction, rejecting reports that break
    /// the prediction invariants.
    pub fn from_report(
        effective_condition: &str,
        report: ScoreReport,
    ) -> std::result::Result<Self, ScoringError> {
        if report.confidence_percent > 100 {
            return Err(ScoringError::Permanent(format!(
                "confidence {}% is outside 0-100",
                report.confidence_percent
            )));
        }
        if report.recommendations.is_empty() {
            return Err(ScoringError::Permanent(
                "scorer returned no recommendations".to_string(),
            ));
        }

        Ok(Self {
            outcome_label: format!("{} Risk of {}", report.risk_tier.label(), effective_condition),
            confidence_percent: report.confidence_percent,
            risk_tier: report.risk_tier,
            recommendations: report.recommendations,
            generated_at: Utc::now(),
        })
    }
}

/// Consistent read of the engine's display state.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub state: AnalysisState,
    pub prediction: Option<Arc<Prediction>>,
    pub last_failure: Option<ScoringError>,
}

struct Slot {
    state: AnalysisState,
    prediction: Option<Arc<Prediction>>,
    last_failure: Option<ScoringError>,
    /// Bumped on every start and cancel; a run may only write back if it
    /// still owns the current generation.
    generation: u64,
    in_flight: Option<AbortHandle>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Awaitable result of a started analysis.
///
/// Dropping the handle does not cancel the run; the outcome is still written
/// to the engine.
#[derive(Debug)]
pub struct AnalysisHandle {
    generation: u64,
    task: JoinHandle<Result<Arc<Prediction>>>,
}

impl AnalysisHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn outcome(self) -> Result<Arc<Prediction>> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(AssessmentError::AnalysisCancelled),
            Err(e) => Err(ScoringError::Permanent(format!("analysis task failed: {e}")).into()),
        }
    }
}

pub struct RiskEngine {
    scorer: Arc<dyn RiskScorer>,
    config: EngineConfig,
    slot: Arc<Mutex<Slot>>,
}

impl RiskEngine {
    pub fn new(scorer: Arc<dyn RiskScorer>, config: EngineConfig) -> Self {
        Self {
            scorer,
            config,
            slot: Arc::new(Mutex::new(Slot {
                state: AnalysisState::Idle,
                prediction: None,
                last_failure: None,
                generation: 0,
                in_flight: None,
            })),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> AnalysisState {
        lock(&self.slot).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnalysisState::Running
    }

    /// The most recent successful prediction, if any.
    pub fn prediction(&self) -> Option<Arc<Prediction>> {
        lock(&self.slot).prediction.clone()
    }

    /// Why the last run failed. Cleared when the next run starts.
    pub fn last_failure(&self) -> Option<ScoringError> {
        lock(&self.slot).last_failure.clone()
    }

    /// State, prediction and last failure read together, so a run settling
    /// concurrently is seen either entirely or not at all.
    pub fn view(&self) -> AnalysisView {
        let slot = lock(&self.slot);
        AnalysisView {
            state: slot.state,
            prediction: slot.prediction.clone(),
            last_failure: slot.last_failure.clone(),
        }
    }

    /// Starts scoring `input`, which is captured as-is for the whole run.
    ///
    /// The run is spawned on the current tokio runtime; without one the call
    /// fails with [`AssessmentError::NoRuntime`] and changes nothing. The state
    /// is `Running` by the time this returns. While a run is outstanding every
    /// further call is rejected with [`AssessmentError::AnalysisInProgress`]
    /// and changes nothing.
    pub fn start_analysis(&self, input: ValidatedInput) -> Result<AnalysisHandle> {
        let mut slot = lock(&self.slot);
        if slot.state == AnalysisState::Running {
            warn!(generation = slot.generation, "Analysis already running, rejecting start");
            return Err(AssessmentError::AnalysisInProgress);
        }
        let runtime = Handle::try_current().map_err(|e| {
            warn!(error = %e, "No async runtime to run the analysis on");
            AssessmentError::NoRuntime
        })?;

        if slot.state.is_terminal() {
            debug!(from = ?slot.state, "Returning to idle before new analysis");
        }
        slot.generation += 1;
        slot.state = AnalysisState::Running;
        slot.last_failure = None;
        let generation = slot.generation;

        info!(
            generation,
            condition = %input.effective_condition,
            scorer = self.scorer.name(),
            "Analysis started"
        );

        let task = runtime.spawn(run_analysis(
            self.scorer.clone(),
            self.config.clone(),
            self.slot.clone(),
            generation,
            input,
        ));
        slot.in_flight = Some(task.abort_handle());

        Ok(AnalysisHandle { generation, task })
    }

    /// Aborts the outstanding run, if any, and forces the state to `Idle`.
    /// The current prediction is kept. Returns whether a run was aborted.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        let aborted = match slot.in_flight.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        };
        slot.generation += 1;
        slot.state = AnalysisState::Idle;
        if aborted {
            info!(generation = slot.generation, "Analysis cancelled");
        }
        aborted
    }

    /// Accepts a terminal state and returns to `Idle`. Has no effect while
    /// idle or running.
    pub fn acknowledge(&self) -> AnalysisState {
        let mut slot = lock(&self.slot);
        if slot.state.is_terminal() {
            debug!(from = ?slot.state, "Analysis result acknowledged");
            slot.state = AnalysisState::Idle;
        }
        slot.state
    }
}

impl Drop for RiskEngine {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.slot).in_flight.take() {
            handle.abort();
        }
    }
}

async fn run_analysis(
    scorer: Arc<dyn RiskScorer>,
    config: EngineConfig,
    slot: Arc<Mutex<Slot>>,
    generation: u64,
    input: ValidatedInput,
) -> Result<Arc<Prediction>> {
    let latency = config.sample_latency();
    if !latency.is_zero() {
        debug!(generation, ?latency, "Simulating processing latency");
        tokio::time::sleep(latency).await;
    }

    let condition = input.effective_condition.clone();
    let outcome = score(scorer, &config, ScoreRequest::from(input))
        .await
        .and_then(|report| Prediction::from_report(&condition, report));

    settle(&slot, generation, outcome)
}

/// Runs the scorer on its own task so a panicking scorer fails the analysis
/// instead of wedging it in `Running`. The `JoinSet` aborts the scorer if this
/// future is dropped.
async fn score(
    scorer: Arc<dyn RiskScorer>,
    config: &EngineConfig,
    request: ScoreRequest,
) -> std::result::Result<ScoreReport, ScoringError> {
    let mut tasks = JoinSet::new();
    tasks.spawn(async move { scorer.score(request).await });

    let joined = match config.scoring_timeout {
        Some(limit) => tokio::time::timeout(limit, tasks.join_next())
            .await
            .map_err(|_| ScoringError::Transient(format!("scorer timed out after {limit:?}")))?,
        None => tasks.join_next().await,
    };

    match joined {
        Some(Ok(result)) => result,
        Some(Err(e)) => Err(ScoringError::Permanent(format!("scorer task failed: {e}"))),
        None => Err(ScoringError::Permanent("scorer task vanished".to_string())),
    }
}

fn settle(
    slot: &Mutex<Slot>,
    generation: u64,
    outcome: std::result::Result<Prediction, ScoringError>,
) -> Result<Arc<Prediction>> {
    let mut slot = lock(slot);
    if slot.generation != generation {
        debug!(generation, current = slot.generation, "Discarding stale analysis outcome");
        return Err(AssessmentError::AnalysisCancelled);
    }
    slot.in_flight = None;

    match outcome {
        Ok(prediction) => {
            let prediction = Arc::new(prediction);
            info!(
                generation,
                outcome = %prediction.outcome_label,
                confidence = prediction.confidence_percent,
                "Analysis complete"
            );
            slot.prediction = Some(prediction.clone());
            slot.state = AnalysisState::Complete;
            Ok(prediction)
        }
        Err(e) => {
            warn!(generation, error = %e, "Analysis failed, keeping previous prediction");
            slot.state = AnalysisState::Failed;
            slot.last_failure = Some(e.clone());
            Err(e.into())
        }
    }
}
