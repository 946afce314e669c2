use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future;
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};

use crate::config::{EngineConfig, RunOptions};
use crate::error::{EngineError, ErrorLog, ErrorRecord};
use crate::locate::locate;
use crate::path::{bounded_outer_html, build_path};
use crate::report::{
    classify, NodeResult, Report, ResultType, RuleReport, TestEngine, TestRunner,
};
use crate::rules::Rule;

/// Wall-clock deadline threaded through location and evaluation.
///
/// The race-against-timeout pattern alone only stops *waiting* for a
/// rule; this token lets the locator and evaluator actually halt
/// between element iterations once the budget is spent.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn earliest(self, other: Self) -> Self {
        if self.at <= other.at {
            self
        } else {
            other
        }
    }
}

/// Marker returned when a deadline check halted work.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineExceeded;

/// What to audit: a whole document, a subtree within one, or a
/// page-like wrapper that also knows its URL.
///
/// Resolution failure is the only run-fatal error.
#[derive(Debug)]
pub enum RunTarget {
    /// Audit the document from its root element.
    Document(Html),

    /// Audit the subtree rooted at the first element matching
    /// `selector`. No match, or an unparseable selector, rejects the
    /// run.
    Element { document: Html, selector: String },

    /// Audit a fetched page; `url` is echoed into the report.
    Page { document: Html, url: String },
}

impl RunTarget {
    pub(crate) fn resolve(&self) -> Result<(ElementRef<'_>, &Html, String), EngineError> {
        match self {
            RunTarget::Document(document) => {
                Ok((document.root_element(), document, String::new()))
            }
            RunTarget::Element { document, selector } => {
                let parsed = Selector::parse(selector).map_err(|err| {
                    EngineError::ContextResolution(format!(
                        "context selector '{selector}' failed to parse: {err}"
                    ))
                })?;
                let context = document.select(&parsed).next().ok_or_else(|| {
                    EngineError::ContextResolution(format!(
                        "no element matches context selector '{selector}'"
                    ))
                })?;
                Ok((context, document, String::new()))
            }
            RunTarget::Page { document, url } => {
                Ok((document.root_element(), document, url.clone()))
            }
        }
    }
}

#[derive(Debug, Default)]
struct Buckets {
    violations: Vec<RuleReport>,
    passes: Vec<RuleReport>,
    incomplete: Vec<RuleReport>,
    inapplicable: Vec<RuleReport>,
}

impl Buckets {
    fn push(&mut self, bucket: ResultType, report: RuleReport) {
        match bucket {
            ResultType::Violations => self.violations.push(report),
            ResultType::Passes => self.passes.push(report),
            ResultType::Incomplete => self.incomplete.push(report),
            ResultType::Inapplicable => self.inapplicable.push(report),
        }
    }
}

/// State for a single run: the buckets and error log, reset fresh per
/// invocation, committed to by rule tasks as they complete.
///
/// Scheduling is single-threaded cooperative — rule futures interleave
/// at await points only — but commits go through a mutex anyway so the
/// collection shape survives a move to a real worker pool.
pub(crate) struct RunState<'a> {
    document: &'a Html,
    context: ElementRef<'a>,
    options: &'a RunOptions,
    buckets: Mutex<Buckets>,
    errors: ErrorLog,
    global_deadline: Deadline,
}

impl<'a> RunState<'a> {
    pub(crate) fn new(
        document: &'a Html,
        context: ElementRef<'a>,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            document,
            context,
            options,
            buckets: Mutex::new(Buckets::default()),
            errors: ErrorLog::new(),
            global_deadline: Deadline::after(Duration::from_millis(options.global_timeout_ms)),
        }
    }

    /// Launch one evaluation task per rule, all raced against the
    /// global deadline. On expiry the committed buckets stand and
    /// in-flight tasks are dropped.
    pub(crate) async fn run_rules(&self, rules: Vec<Arc<dyn Rule>>) {
        let global = Duration::from_millis(self.options.global_timeout_ms);
        let tasks = rules.into_iter().map(|rule| self.run_rule(rule));
        let joined = future::join_all(tasks);

        if tokio::time::timeout(global, joined).await.is_err() {
            warn!("global timeout after {}ms, returning partial report", global.as_millis());
            self.errors.push(ErrorRecord::timeout(
                None,
                format!("run exceeded global timeout of {}ms", global.as_millis()),
            ));
        }
    }

    async fn run_rule(&self, rule: Arc<dyn Rule>) {
        let per_rule = Duration::from_millis(self.options.per_rule_timeout_ms);
        let deadline = Deadline::after(per_rule).earliest(self.global_deadline);

        let timed_out = match tokio::time::timeout(per_rule, self.evaluate_rule(rule.as_ref(), deadline))
            .await
        {
            Ok(Ok(())) => false,
            Ok(Err(DeadlineExceeded)) => true,
            Err(_elapsed) => true,
        };

        if timed_out {
            // The token deadline is the tighter of the per-rule and global
            // budgets, so the message must not name either one.
            warn!("rule '{}' did not finish within its time budget", rule.id());
            self.errors.push(ErrorRecord::timeout(
                Some(rule.id()),
                format!("rule '{}' did not finish within its time budget", rule.id()),
            ));
            self.commit(
                ResultType::Incomplete,
                RuleReport::for_rule(rule.as_ref(), Vec::new()),
            );
        }
    }

    /// Evaluate one rule: locate, cap, check each element with
    /// per-element failure isolation, classify, commit.
    async fn evaluate_rule(
        &self,
        rule: &dyn Rule,
        deadline: Deadline,
    ) -> Result<(), DeadlineExceeded> {
        let elements = locate(
            rule.selector(),
            self.context,
            self.document,
            rule.id(),
            &self.errors,
            deadline,
        )?;

        if elements.is_empty() {
            self.commit(
                ResultType::Inapplicable,
                RuleReport::for_rule(rule, Vec::new()),
            );
            return Ok(());
        }

        let cap = self.options.max_elements_per_rule;
        if elements.len() > cap {
            self.errors
                .push(ErrorRecord::element_limit(rule.id(), elements.len(), cap));
        }

        let mut nodes = Vec::new();
        for element in elements.into_iter().take(cap) {
            if deadline.expired() {
                return Err(DeadlineExceeded);
            }
            match rule.evaluate(element, self.options).await {
                Ok(Some(outcome)) => nodes.push(NodeResult::new(
                    bounded_outer_html(element),
                    build_path(element, self.document),
                    outcome,
                )),
                Ok(None) => {}
                Err(err) => {
                    self.errors.push(ErrorRecord::element_error(rule.id(), &err));
                }
            }
        }

        if nodes.is_empty() {
            // Elements matched but every outcome was excluded or errored:
            // the rule contributes to no bucket. Preserved behavior from
            // the original engine; consumers depend on the shape.
            debug!("rule '{}' produced no node results, dropping it", rule.id());
            return Ok(());
        }

        let bucket = classify(&nodes);
        self.commit(bucket, RuleReport::for_rule(rule, nodes));
        Ok(())
    }

    fn commit(&self, bucket: ResultType, report: RuleReport) {
        self.buckets
            .lock()
            .expect("bucket state poisoned")
            .push(bucket, report);
    }

    /// Assemble the final report: project buckets through
    /// `resultTypes`, attach metadata, attach the error log unless the
    /// run was silent.
    pub(crate) fn into_report(self, config: &EngineConfig, url: String, elapsed: Duration) -> Report {
        let buckets = self.buckets.into_inner().expect("bucket state poisoned");
        let errors = self.errors.into_inner();
        let options = self.options;

        let select = |bucket: ResultType, reports: Vec<RuleReport>| {
            options.includes_result_type(bucket).then_some(reports)
        };

        Report {
            violations: select(ResultType::Violations, buckets.violations),
            passes: select(ResultType::Passes, buckets.passes),
            incomplete: select(ResultType::Incomplete, buckets.incomplete),
            inapplicable: select(ResultType::Inapplicable, buckets.inapplicable),
            timestamp: Utc::now().to_rfc3339(),
            url,
            test_engine: TestEngine::default(),
            test_environment: config.environment.clone(),
            test_runner: TestRunner {
                name: config.runner_name.clone(),
            },
            tool_options: options.clone(),
            time: elapsed.as_millis() as u64,
            errors: (!options.silent && !errors.is_empty()).then_some(errors),
        }
    }
}
