use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;

use crate::config::RunOptions;
use crate::error::EngineError;
use crate::rules::Rule;

/// Id-keyed store of rule definitions.
///
/// Registration under an existing id replaces the previous definition;
/// the registry never grows from re-registration.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Insert or overwrite a rule by id. Fails when the id is empty.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), EngineError> {
        if rule.id().trim().is_empty() {
            return Err(EngineError::Validation(
                "rule id must not be empty".to_string(),
            ));
        }
        self.rules.insert(rule.id().to_string(), rule);
        Ok(())
    }

    /// Get a rule by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Rule>> {
        self.rules.get(id).cloned()
    }

    /// Check if a rule exists.
    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// All registered rule ids, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }

    /// All registered rules, in no particular order.
    pub fn all(&self) -> Vec<Arc<dyn Rule>> {
        self.rules.values().cloned().collect()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Named, ordered groupings of rule ids (conformance profiles).
///
/// Id lists are stored verbatim: referenced rules need not exist at
/// registration time, and unresolved references are dropped silently at
/// run time.
#[derive(Debug, Default, Clone)]
pub struct RulesetRegistry {
    rulesets: HashMap<String, Vec<String>>,
}

impl RulesetRegistry {
    pub fn new() -> Self {
        Self {
            rulesets: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, rule_ids: Vec<String>) {
        self.rulesets.insert(name.into(), rule_ids);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.rulesets.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rulesets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rulesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rulesets.is_empty()
    }
}

/// Resolve the rule ids a run should evaluate.
///
/// With `runOnly` set, returns the union of ids reachable from the
/// named rulesets, deduplicated in first-seen order; rulesets that do
/// not exist are ignored. Without `runOnly`, every registered rule id
/// is returned.
pub fn resolve_rule_ids(
    rules: &RuleRegistry,
    rulesets: &RulesetRegistry,
    options: &RunOptions,
) -> Vec<String> {
    let Some(run_only) = &options.run_only else {
        return rules.ids();
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut resolved = Vec::new();
    for name in run_only.names() {
        let Some(ids) = rulesets.get(name) else {
            debug!("runOnly names unknown ruleset '{name}', ignoring");
            continue;
        };
        for id in ids {
            if seen.insert(id.as_str()) {
                resolved.push(id.clone());
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOnly;
    use crate::rules::{Impact, Outcome};
    use async_trait::async_trait;
    use scraper::ElementRef;

    // ==================== Mock Rule for Testing ====================

    #[derive(Debug)]
    struct TestRule {
        id: &'static str,
        description: &'static str,
    }

    impl TestRule {
        fn new(id: &'static str, description: &'static str) -> Arc<dyn Rule> {
            Arc::new(Self { id, description })
        }
    }

    #[async_trait(?Send)]
    impl Rule for TestRule {
        fn id(&self) -> &'static str {
            self.id
        }

        fn impact(&self) -> Impact {
            Impact::Moderate
        }

        fn description(&self) -> &'static str {
            self.description
        }

        async fn evaluate(
            &self,
            _element: ElementRef<'_>,
            _options: &RunOptions,
        ) -> anyhow::Result<Option<Outcome>> {
            Ok(None)
        }
    }

    fn options_with_run_only(run_only: RunOnly) -> RunOptions {
        RunOptions {
            run_only: Some(run_only),
            ..RunOptions::default()
        }
    }

    // ==================== RuleRegistry Tests ====================

    #[test]
    fn test_new_creates_empty_registry() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_adds_rule() {
        let mut registry = RuleRegistry::new();
        registry
            .register(TestRule::new("img-alt", "Images must have alternate text"))
            .expect("register");

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("img-alt"));
    }

    #[test]
    fn test_register_rejects_empty_id() {
        let mut registry = RuleRegistry::new();
        let err = registry.register(TestRule::new("", "nameless")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistration_is_idempotent_and_last_wins() {
        let mut registry = RuleRegistry::new();
        registry
            .register(TestRule::new("img-alt", "first definition"))
            .expect("register");
        registry
            .register(TestRule::new("img-alt", "second definition"))
            .expect("register");

        assert_eq!(registry.len(), 1);
        let rule = registry.get("img-alt").expect("rule present");
        assert_eq!(rule.description(), "second definition");
    }

    #[test]
    fn test_get_returns_none_for_unknown_id() {
        let registry = RuleRegistry::new();
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_ids_and_all_cover_every_rule() {
        let mut registry = RuleRegistry::new();
        registry
            .register(TestRule::new("rule-a", "A"))
            .expect("register");
        registry
            .register(TestRule::new("rule-b", "B"))
            .expect("register");

        let mut ids = registry.ids();
        ids.sort();
        assert_eq!(ids, vec!["rule-a", "rule-b"]);
        assert_eq!(registry.all().len(), 2);
    }

    // ==================== RulesetRegistry Tests ====================

    #[test]
    fn test_ruleset_stores_ids_verbatim() {
        let mut rulesets = RulesetRegistry::new();
        rulesets.register(
            "wcag2a",
            vec!["img-alt".to_string(), "not-registered-yet".to_string()],
        );

        let ids = rulesets.get("wcag2a").expect("ruleset present");
        assert_eq!(ids, ["img-alt", "not-registered-yet"]);
    }

    #[test]
    fn test_ruleset_reregistration_replaces() {
        let mut rulesets = RulesetRegistry::new();
        rulesets.register("wcag2a", vec!["a".to_string()]);
        rulesets.register("wcag2a", vec!["b".to_string()]);

        assert_eq!(rulesets.len(), 1);
        assert_eq!(rulesets.get("wcag2a").expect("present"), ["b"]);
    }

    // ==================== resolve_rule_ids Tests ====================

    #[test]
    fn test_absent_run_only_resolves_every_registered_rule() {
        let mut rules = RuleRegistry::new();
        rules.register(TestRule::new("a", "A")).expect("register");
        rules.register(TestRule::new("b", "B")).expect("register");
        let rulesets = RulesetRegistry::new();

        let mut resolved = resolve_rule_ids(&rules, &rulesets, &RunOptions::default());
        resolved.sort();
        assert_eq!(resolved, vec!["a", "b"]);
    }

    #[test]
    fn test_run_only_unions_and_deduplicates() {
        let rules = RuleRegistry::new();
        let mut rulesets = RulesetRegistry::new();
        rulesets.register("one", vec!["x".to_string(), "shared".to_string()]);
        rulesets.register("two", vec!["shared".to_string(), "y".to_string()]);

        let options = options_with_run_only(RunOnly::Many(vec![
            "one".to_string(),
            "two".to_string(),
        ]));
        let resolved = resolve_rule_ids(&rules, &rulesets, &options);
        assert_eq!(resolved, vec!["x", "shared", "y"]);
    }

    #[test]
    fn test_run_only_ignores_unknown_rulesets() {
        let rules = RuleRegistry::new();
        let mut rulesets = RulesetRegistry::new();
        rulesets.register("known", vec!["x".to_string()]);

        let options = options_with_run_only(RunOnly::Many(vec![
            "missing".to_string(),
            "known".to_string(),
        ]));
        let resolved = resolve_rule_ids(&rules, &rulesets, &options);
        assert_eq!(resolved, vec!["x"]);
    }

    #[test]
    fn test_run_only_single_name_resolves_one_ruleset() {
        let rules = RuleRegistry::new();
        let mut rulesets = RulesetRegistry::new();
        rulesets.register("wcag2a", vec!["img-alt".to_string()]);

        let options = options_with_run_only(RunOnly::Single("wcag2a".to_string()));
        let resolved = resolve_rule_ids(&rules, &rulesets, &options);
        assert_eq!(resolved, vec!["img-alt"]);
    }

    #[test]
    fn test_run_only_with_only_unknown_rulesets_resolves_nothing() {
        let mut rules = RuleRegistry::new();
        rules.register(TestRule::new("a", "A")).expect("register");
        let rulesets = RulesetRegistry::new();

        let options = options_with_run_only(RunOnly::Single("ghost".to_string()));
        assert!(resolve_rule_ids(&rules, &rulesets, &options).is_empty());
    }
}
