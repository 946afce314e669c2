use serde::{Deserialize, Serialize};

use crate::config::RunOptions;
use crate::error::ErrorRecord;
use crate::rules::{Impact, Outcome, Rule};

/// The four buckets a rule can land in after one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Violations,
    Passes,
    Incomplete,
    Inapplicable,
}

/// Per-element outcome record contributed to a rule's report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    /// Length-bounded outer markup of the element.
    pub html_snippet: String,

    /// Stable identifying path of the element within the document.
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl NodeResult {
    pub fn new(html_snippet: String, path: String, outcome: Outcome) -> Self {
        Self {
            html_snippet,
            path,
            passed: outcome.passed,
            incomplete: outcome.incomplete,
            message: outcome.message,
            data: outcome.data,
        }
    }
}

/// One rule's contribution to a report: its metadata plus the node
/// results it produced, in element location order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    pub id: String,
    pub description: String,
    pub help: String,
    pub help_url: String,
    pub impact: Impact,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub nodes: Vec<NodeResult>,
}

impl RuleReport {
    pub fn for_rule(rule: &dyn Rule, nodes: Vec<NodeResult>) -> Self {
        Self {
            id: rule.id().to_string(),
            description: rule.description().to_string(),
            help: rule.help().to_string(),
            help_url: rule.help_url().to_string(),
            impact: rule.impact(),
            tags: rule.tags().iter().map(|t| t.to_string()).collect(),
            explanation: rule.explanation().map(str::to_string),
            nodes,
        }
    }
}

/// Classify a rule's node results into a bucket.
///
/// Any incomplete node files the whole rule under `incomplete`; a rule
/// where every node passed goes to `passes`; anything else is a
/// violation. Callers must not feed an empty slice here — zero located
/// elements is `inapplicable`, decided before classification.
pub fn classify(nodes: &[NodeResult]) -> ResultType {
    if nodes.iter().any(|n| n.incomplete == Some(true)) {
        ResultType::Incomplete
    } else if nodes.iter().all(|n| n.passed == Some(true)) {
        ResultType::Passes
    } else {
        ResultType::Violations
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEngine {
    pub name: String,
    pub version: String,
}

impl Default for TestEngine {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEnvironment {
    pub user_agent: String,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
                .to_string(),
            window_width: None,
            window_height: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunner {
    pub name: String,
}

/// The final value of one run. Bucket fields are present only when
/// selected by `resultTypes`; `errors` is present only when non-empty
/// and the run was not silent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<RuleReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes: Option<Vec<RuleReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<Vec<RuleReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inapplicable: Option<Vec<RuleReport>>,

    /// ISO-8601 timestamp of report assembly.
    pub timestamp: String,
    pub url: String,
    pub test_engine: TestEngine,
    pub test_environment: TestEnvironment,
    pub test_runner: TestRunner,
    pub tool_options: RunOptions,

    /// Elapsed wall time of the run, in milliseconds.
    pub time: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorRecord>>,
}
