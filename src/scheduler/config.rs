//! Estimator configuration

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::utils::{ConfigError, Result};

/// Default sliding window length in milliseconds
pub const DEFAULT_WINDOW_MS: u64 = 1000;
/// Default number of steps per window
pub const DEFAULT_STEPS_PER_WINDOW: usize = 20;
/// Tasks longer than this are treated as corrupted (e.g. system sleep)
pub const DEFAULT_INVALID_TASK_THRESHOLD_MS: u64 = 30_000;

/// Estimator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorConfig {
    /// Length of the sliding window
    pub window_duration: Duration,
    /// Number of steps the window is split into
    pub steps_per_window: usize,
    /// Tasks longer than this are discarded
    pub invalid_task_threshold: Duration,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window_duration: Duration::from_millis(DEFAULT_WINDOW_MS),
            steps_per_window: DEFAULT_STEPS_PER_WINDOW,
            invalid_task_threshold: Duration::from_millis(DEFAULT_INVALID_TASK_THRESHOLD_MS),
        }
    }
}

/// On-disk form, every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    window_ms: Option<u64>,
    steps_per_window: Option<usize>,
    invalid_task_threshold_ms: Option<u64>,
}

impl EstimatorConfig {
    /// Create a validated config with the default invalid task threshold
    pub fn new(window_duration: Duration, steps_per_window: usize) -> Result<Self> {
        let config = Self {
            window_duration,
            steps_per_window,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the invalid task threshold
    pub fn with_invalid_task_threshold(mut self, threshold: Duration) -> Self {
        self.invalid_task_threshold = threshold;
        self
    }

    /// Width of one step
    pub fn step_width(&self) -> Duration {
        self.window_duration / u32::try_from(self.steps_per_window.max(1)).unwrap_or(u32::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.steps_per_window == 0 {
            return Err(ConfigError::ZeroSteps.into());
        }
        if u32::try_from(self.steps_per_window).is_err() {
            return Err(ConfigError::TooManySteps(self.steps_per_window).into());
        }
        if self.window_duration.is_zero() {
            return Err(ConfigError::ZeroWindow.into());
        }
        if self.step_width().is_zero() {
            return Err(ConfigError::StepTooNarrow {
                window: self.window_duration,
                steps: self.steps_per_window,
            }
            .into());
        }
        if self.invalid_task_threshold.is_zero() {
            return Err(ConfigError::ZeroThreshold.into());
        }
        Ok(())
    }

    /// Parse a JSON config. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        let defaults = Self::default();
        let config = Self {
            window_duration: file
                .window_ms
                .map_or(defaults.window_duration, Duration::from_millis),
            steps_per_window: file.steps_per_window.unwrap_or(defaults.steps_per_window),
            invalid_task_threshold: file
                .invalid_task_threshold_ms
                .map_or(defaults.invalid_task_threshold, Duration::from_millis),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::EstimatorError;

    #[test]
    fn test_default_config() {
        let config = EstimatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step_width(), Duration::from_millis(50));
        assert_eq!(config.invalid_task_threshold, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_zero_steps() {
        let err = EstimatorConfig::new(Duration::from_secs(1), 0).unwrap_err();
        assert!(matches!(err, EstimatorError::Config(ConfigError::ZeroSteps)));
    }

    #[test]
    fn test_rejects_zero_window() {
        let err = EstimatorConfig::new(Duration::ZERO, 5).unwrap_err();
        assert!(matches!(err, EstimatorError::Config(ConfigError::ZeroWindow)));
    }

    #[test]
    fn test_rejects_narrow_steps() {
        let err = EstimatorConfig::new(Duration::from_nanos(3), 5).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Config(ConfigError::StepTooNarrow { steps: 5, .. })
        ));
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let config = EstimatorConfig::default().with_invalid_task_threshold(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = EstimatorConfig::from_json_str(r#"{"window_ms": 5000, "steps_per_window": 5}"#)
            .unwrap();
        assert_eq!(config.window_duration, Duration::from_secs(5));
        assert_eq!(config.step_width(), Duration::from_secs(1));
        assert_eq!(config.invalid_task_threshold, Duration::from_secs(30));
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = EstimatorConfig::from_json_str(r#"{"window": 5}"#).unwrap_err();
        assert!(matches!(err, EstimatorError::Json(_)));
    }

    #[test]
    fn test_from_json_validates() {
        let err = EstimatorConfig::from_json_str(r#"{"steps_per_window": 0}"#).unwrap_err();
        assert!(matches!(err, EstimatorError::Config(ConfigError::ZeroSteps)));
    }
}
