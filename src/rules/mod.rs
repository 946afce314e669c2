pub mod registry;

use std::fmt::Debug;

use async_trait::async_trait;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::config::RunOptions;

/// Severity classification of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Critical,
    Serious,
    Moderate,
    Minor,
}

/// Per-element verdict returned by a rule's predicate.
///
/// `passed` and `incomplete` drive bucket classification; `message` and
/// `data` are carried into the report verbatim. A predicate returning
/// `Ok(None)` excludes the element from reporting entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Outcome {
    pub fn passed() -> Self {
        Self {
            passed: Some(true),
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            passed: Some(false),
            ..Self::default()
        }
    }

    /// The predicate could not decide; the rule will be filed under
    /// `incomplete`.
    pub fn incomplete() -> Self {
        Self {
            incomplete: Some(true),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A single check the engine can run.
///
/// Rules are pure: they inspect one element at a time and return an
/// [`Outcome`]. They do not mutate engine state. Predicate failures are
/// signalled through `Err` and isolated per element by the evaluator.
///
/// Evaluation is single-threaded cooperative, so the trait is declared
/// `?Send`; predicates may await their own I/O-bound work.
#[async_trait(?Send)]
pub trait Rule: Send + Sync + Debug {
    /// Unique key. Registering a second rule under the same id replaces
    /// the first.
    fn id(&self) -> &'static str;

    /// Selector scoping the rule to elements within the run's context
    /// subtree. Empty means the context root itself is the sole target.
    fn selector(&self) -> &'static str {
        ""
    }

    fn impact(&self) -> Impact;

    /// Tags for grouping and filtering (e.g. conformance levels).
    fn tags(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    fn help(&self) -> &'static str {
        ""
    }

    fn help_url(&self) -> &'static str {
        ""
    }

    /// Optional longer rationale surfaced alongside the help text.
    fn explanation(&self) -> Option<&'static str> {
        None
    }

    /// Evaluate the rule against one element.
    ///
    /// Returns `Ok(Some(outcome))` to contribute a node result,
    /// `Ok(None)` to exclude the element, or `Err` to record an
    /// element-level failure without aborting the rule.
    async fn evaluate(
        &self,
        element: ElementRef<'_>,
        options: &RunOptions,
    ) -> anyhow::Result<Option<Outcome>>;
}
