use std::time::Duration;

use crate::error::{AssessmentError, Result};

pub const LATENCY_MIN_ENV: &str = "ASSESSMENT_LATENCY_MIN_MS";
pub const LATENCY_MAX_ENV: &str = "ASSESSMENT_LATENCY_MAX_MS";
pub const SCORING_TIMEOUT_ENV: &str = "ASSESSMENT_SCORING_TIMEOUT_MS";

const DEFAULT_LATENCY: Duration = Duration::from_millis(2000);

/// Tuning for the scoring engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Simulated processing time is drawn uniformly from `min_latency..=max_latency`.
    pub min_latency: Duration,
    pub max_latency: Duration,
    /// Scorer calls running longer than this fail as transient.
    pub scoring_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_latency: DEFAULT_LATENCY,
            max_latency: DEFAULT_LATENCY,
            scoring_timeout: None,
        }
    }
}

impl EngineConfig {
    /// No simulated delay and no timeout.
    pub fn immediate() -> Self {
        Self {
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            scoring_timeout: None,
        }
    }

    pub fn with_latency(mut self, min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(AssessmentError::Config(format!(
                "minimum latency {min:?} exceeds maximum {max:?}"
            )));
        }
        if u64::try_from(max.as_millis()).is_err() {
            return Err(AssessmentError::Config(format!(
                "maximum latency {max:?} is too large"
            )));
        }
        self.min_latency = min;
        self.max_latency = max;
        Ok(self)
    }

    pub fn with_scoring_timeout(mut self, timeout: Duration) -> Self {
        self.scoring_timeout = Some(timeout);
        self
    }

    /// Reads overrides from the environment; unset variables keep defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str| -> Result<Option<Duration>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|e| AssessmentError::Config(format!("{key}={raw:?}: {e}")))
                })
                .transpose()
        };

        let min = millis(LATENCY_MIN_ENV)?;
        let max = millis(LATENCY_MAX_ENV)?;
        // a lone minimum or maximum pins both ends
        let (min, max) = match (min, max) {
            (Some(min), Some(max)) => (min, max),
            (Some(only), None) | (None, Some(only)) => (only, only),
            (None, None) => (defaults.min_latency, defaults.max_latency),
        };

        let config = defaults.with_latency(min, max)?;
        Ok(match millis(SCORING_TIMEOUT_ENV)? {
            Some(timeout) => config.with_scoring_timeout(timeout),
            None => config,
        })
    }

    /// Picks this run's simulated processing time.
    pub(crate) fn sample_latency(&self) -> Duration {
        if self.max_latency <= self.min_latency {
            return self.min_latency;
        }
        let min = u64::try_from(self.min_latency.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_latency.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::random_range(min..=max))
    }
}
