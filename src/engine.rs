use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use log::{debug, info};

use crate::config::{EngineConfig, RunOptions};
use crate::error::EngineError;
use crate::report::Report;
use crate::rules::registry::{resolve_rule_ids, RuleRegistry, RulesetRegistry};
use crate::rules::Rule;
use crate::session::{RunState, RunTarget};

/// The audit engine: shared, cheaply clonable registries plus the run
/// entry point.
///
/// Configuration and registries sit behind [`ArcSwap`] so callers can
/// register rules or swap config while audits are in flight; each run
/// pins the snapshot it started with.
pub struct Engine {
    config: ArcSwap<EngineConfig>,
    rules: ArcSwap<RuleRegistry>,
    rulesets: ArcSwap<RulesetRegistry>,
}

impl Engine {
    pub fn new(config: EngineConfig, rules: RuleRegistry, rulesets: RulesetRegistry) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            rules: ArcSwap::from_pointee(rules),
            rulesets: ArcSwap::from_pointee(rulesets),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(
            EngineConfig::default(),
            RuleRegistry::new(),
            RulesetRegistry::new(),
        )
    }

    pub fn config(&self) -> Arc<EngineConfig> {
        self.config.load_full()
    }

    pub fn set_config(&self, config: EngineConfig) {
        self.config.store(Arc::new(config));
    }

    /// Register a rule. Re-registering an id replaces the previous
    /// rule.
    pub fn register_rule(&self, rule: Arc<dyn Rule>) -> Result<(), EngineError> {
        if rule.id().trim().is_empty() {
            return Err(EngineError::Validation(
                "rule id must be non-empty".to_string(),
            ));
        }
        debug!("registering rule '{}'", rule.id());
        self.rules.rcu(|current| {
            let mut next = RuleRegistry::clone(current);
            // Validated above, insertion cannot fail.
            let _ = next.register(Arc::clone(&rule));
            next
        });
        Ok(())
    }

    /// Register a named ruleset. Membership is stored verbatim; ids
    /// are checked against the rule registry at run time.
    pub fn register_ruleset(&self, name: impl Into<String>, rule_ids: Vec<String>) {
        let name = name.into();
        debug!("registering ruleset '{}' with {} entries", name, rule_ids.len());
        self.rulesets.rcu(|current| {
            let mut next = RulesetRegistry::clone(current);
            next.register(name.clone(), rule_ids.clone());
            next
        });
    }

    pub fn rule_ids(&self) -> Vec<String> {
        self.rules.load().ids()
    }

    /// Audit `target` with `options` and return the assembled report.
    ///
    /// Only option validation and target resolution can fail; rule and
    /// element failures degrade into the report's error log.
    pub async fn run(&self, target: &RunTarget, options: RunOptions) -> Result<Report, EngineError> {
        options.validate()?;

        let config = self.config.load_full();
        let rules = self.rules.load_full();
        let rulesets = self.rulesets.load_full();

        let (context, document, url) = target.resolve()?;

        let selected: Vec<Arc<dyn Rule>> = resolve_rule_ids(&rules, &rulesets, &options)
            .into_iter()
            .filter_map(|id| rules.get(&id))
            .collect();
        info!(
            "running {} rules against '{}'",
            selected.len(),
            if url.is_empty() { "<document>" } else { url.as_str() }
        );

        let started = Instant::now();
        let state = RunState::new(document, context, &options);
        state.run_rules(selected).await;

        Ok(state.into_report(&config, url, started.elapsed()))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_default_config()
    }
}
