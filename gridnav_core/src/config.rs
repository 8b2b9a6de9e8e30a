// Planner and navigator configuration.
//
// Every tunable lives here in `GridnavConfig`, loaded from JSON or taken
// from `Default`. The engines never hard-code their parameters: AD* reads
// its epsilon schedule from `AdStarConfig`, RTD* splits its expansion budget
// according to `RtdStarConfig`, and the navigator bounds episodes with
// `NavigatorConfig`.
//
// Environment parameters (door schedule, change interval) are not here; they
// belong to `gridnav_env`, which owns the dynamic side of an episode.
//
// See also: `adstar.rs`, `rtdstar.rs`, `navigator.rs` for the consumers.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Epsilon schedule for the anytime planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdStarConfig {
    /// Heuristic inflation at the start of an episode.
    pub initial_epsilon: f64,
    /// Decrease applied after each quiet replan, down to 1.
    pub step_down: f64,
    /// Increase applied when a replan sees a significant change.
    pub step_up: f64,
    /// `changed / door_count` above which a change counts as significant.
    pub significant_change_ratio: f64,
    /// Upper bound on epsilon after step-ups.
    pub max_epsilon: f64,
}

impl Default for AdStarConfig {
    fn default() -> Self {
        Self {
            initial_epsilon: 2.5,
            step_down: 0.25,
            step_up: 1.0,
            significant_change_ratio: 0.001,
            max_epsilon: 5.0,
        }
    }
}

/// Expansion budget for the real-time planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RtdStarConfig {
    /// Total vertex expansions allowed per agent step.
    pub expansion_limit: u64,
    /// Share of `expansion_limit` reserved for the local search.
    pub local_ratio: f64,
}

impl RtdStarConfig {
    /// Local lookahead: `floor(local_ratio * expansion_limit)`, at least 1.
    /// With no local expansions a starved global search can leave the agent
    /// oscillating between two nodes.
    pub fn local_limit(&self) -> u64 {
        ((self.local_ratio * self.expansion_limit as f64).floor() as u64).max(1)
    }

    /// Whatever the local search does not take.
    pub fn global_limit(&self) -> u64 {
        self.expansion_limit.saturating_sub(self.local_limit())
    }
}

impl Default for RtdStarConfig {
    fn default() -> Self {
        Self {
            expansion_limit: 100,
            local_ratio: 0.5,
        }
    }
}

/// Bounds on a single navigation episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigatorConfig {
    /// Hard cap on ticks before the run ends as `StepLimit`.
    pub max_steps: u64,
    /// Consecutive no-path ticks tolerated before the run ends as `NoPath`.
    pub max_wait_ticks: u64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            max_wait_ticks: 1_000,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridnavConfig {
    pub adstar: AdStarConfig,
    pub rtdstar: RtdStarConfig,
    pub navigator: NavigatorConfig,
}

impl GridnavConfig {
    /// Parse and validate a JSON config. Missing sections take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GridnavConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ad = &self.adstar;
        if ad.initial_epsilon.is_nan() || ad.initial_epsilon < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "adstar.initial_epsilon must be >= 1, got {}",
                ad.initial_epsilon
            )));
        }
        if ad.max_epsilon.is_nan() || ad.max_epsilon < ad.initial_epsilon {
            return Err(ConfigError::Invalid(format!(
                "adstar.max_epsilon ({}) is below initial_epsilon ({})",
                ad.max_epsilon, ad.initial_epsilon
            )));
        }
        if ad.step_down.is_nan() || ad.step_down <= 0.0 || ad.step_up < 0.0 {
            return Err(ConfigError::Invalid(
                "adstar.step_down must be positive and step_up non-negative".to_string(),
            ));
        }
        let rt = &self.rtdstar;
        if !(0.0..=1.0).contains(&rt.local_ratio) {
            return Err(ConfigError::Invalid(format!(
                "rtdstar.local_ratio must be in [0, 1], got {}",
                rt.local_ratio
            )));
        }
        if rt.expansion_limit == 0 {
            return Err(ConfigError::Invalid(
                "rtdstar.expansion_limit must be positive".to_string(),
            ));
        }
        if self.navigator.max_steps == 0 {
            return Err(ConfigError::Invalid(
                "navigator.max_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
