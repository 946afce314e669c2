//! Accessibility audit engine: register rules and rulesets, point the
//! engine at an HTML document or subtree, and get back a structured
//! report of violations, passes, incomplete checks, and inapplicable
//! rules.
//!
//! Rules are async trait objects evaluated concurrently under a global
//! and a per-rule time budget. A single misbehaving rule or element
//! never fails the run; failures degrade into the report's error log.
//!
//! ```no_run
//! use std::sync::Arc;
//! use a11y_audit::{Engine, RunOptions, RunTarget};
//! use scraper::Html;
//!
//! # async fn demo(rule: Arc<dyn a11y_audit::Rule>) -> anyhow::Result<()> {
//! let engine = Engine::with_default_config();
//! engine.register_rule(rule)?;
//!
//! let target = RunTarget::Document(Html::parse_document("<body><img src=\"x\"></body>"));
//! let report = engine.run(&target, RunOptions::default()).await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
mod locate;
mod path;
pub mod report;
pub mod rules;
pub mod session;

pub use config::{EngineConfig, RunOnly, RunOptions};
pub use engine::Engine;
pub use error::{EngineError, ErrorKind, ErrorRecord};
pub use path::{bounded_outer_html, build_path};
pub use report::{
    classify, NodeResult, Report, ResultType, RuleReport, TestEngine, TestEnvironment, TestRunner,
};
pub use rules::registry::{resolve_rule_ids, RuleRegistry, RulesetRegistry};
pub use rules::{Impact, Outcome, Rule};
pub use session::RunTarget;
