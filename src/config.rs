use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::report::{ResultType, TestEnvironment};

/// Ruleset selection for a single run.
///
/// Accepts either a single ruleset name or a list of names, matching
/// the wire forms consumers send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunOnly {
    Single(String),
    Many(Vec<String>),
}

impl RunOnly {
    /// Ruleset names in the order they were given.
    pub fn names(&self) -> Vec<&str> {
        match self {
            RunOnly::Single(name) => vec![name.as_str()],
            RunOnly::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Per-run configuration.
///
/// All knobs have documented defaults and are validated once at the
/// start of a run; an invalid combination rejects the run with
/// [`EngineError::Validation`] before any rule is scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    /// Rulesets to union into the set of rules to run.
    /// Absent means every registered rule runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_only: Option<RunOnly>,

    /// Buckets to include in the final report. Absent means all four.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_types: Option<Vec<ResultType>>,

    /// Upper bound on elements a single rule will check.
    #[serde(default = "default_max_elements_per_rule")]
    pub max_elements_per_rule: usize,

    /// Wall-time budget for the whole run, in milliseconds.
    #[serde(default = "default_global_timeout_ms")]
    pub global_timeout_ms: u64,

    /// Wall-time budget for a single rule, in milliseconds.
    #[serde(default = "default_per_rule_timeout_ms")]
    pub per_rule_timeout_ms: u64,

    /// Suppress the non-fatal error log in the report. The log is still
    /// collected internally.
    #[serde(default)]
    pub silent: bool,
}

fn default_max_elements_per_rule() -> usize {
    1000
}

fn default_global_timeout_ms() -> u64 {
    30_000
}

fn default_per_rule_timeout_ms() -> u64 {
    5_000
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_only: None,
            result_types: None,
            max_elements_per_rule: default_max_elements_per_rule(),
            global_timeout_ms: default_global_timeout_ms(),
            per_rule_timeout_ms: default_per_rule_timeout_ms(),
            silent: false,
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_elements_per_rule == 0 {
            return Err(EngineError::Validation(
                "maxElementsPerRule must be greater than zero".to_string(),
            ));
        }
        if self.global_timeout_ms == 0 {
            return Err(EngineError::Validation(
                "globalTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.per_rule_timeout_ms == 0 {
            return Err(EngineError::Validation(
                "perRuleTimeoutMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the given bucket should appear in the report.
    pub fn includes_result_type(&self, result_type: ResultType) -> bool {
        match &self.result_types {
            None => true,
            Some(types) => types.contains(&result_type),
        }
    }
}

/// Engine-level configuration: report metadata the host supplies once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Environment metadata echoed into every report.
    pub environment: TestEnvironment,

    /// Name reported as `testRunner.name`.
    pub runner_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: TestEnvironment::default(),
            runner_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}
