use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type exposed by the engine.
///
/// Only rule registration and run-target resolution fail loudly; every
/// other failure during a run is absorbed into the [`ErrorRecord`] log
/// and degrades the affected rule or element to a safe default.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("context resolution error: {0}")]
    ContextResolution(String),

    /// "Catch-all" for unexpected internal failures.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Classification of a non-fatal failure recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RuleError,
    ElementError,
    ElementLimit,
    SelectorError,
}

/// One non-fatal failure observed during a run.
///
/// Records are appended as failures occur and never removed; the log is
/// reset at the start of each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, rule_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            rule_id: rule_id.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn timeout(rule_id: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, rule_id, message)
    }

    pub fn rule_error(rule_id: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuleError, Some(rule_id), message)
    }

    pub fn element_error(rule_id: &str, source: &anyhow::Error) -> Self {
        Self::new(
            ErrorKind::ElementError,
            Some(rule_id),
            format!("predicate failed: {source}"),
        )
    }

    pub fn element_limit(rule_id: &str, matched: usize, cap: usize) -> Self {
        Self::new(
            ErrorKind::ElementLimit,
            Some(rule_id),
            format!("rule matched {matched} elements, checking the first {cap}"),
        )
    }

    pub fn selector_error(rule_id: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SelectorError, Some(rule_id), message)
    }
}

/// Append-only log of non-fatal failures for a single run.
///
/// Writers only append; the log is drained once during report assembly.
#[derive(Debug, Default)]
pub struct ErrorLog(Mutex<Vec<ErrorRecord>>);

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: ErrorRecord) {
        self.0.lock().expect("error log poisoned").push(record);
    }

    pub fn len(&self) -> usize {
        self.0.lock().expect("error log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_inner(self) -> Vec<ErrorRecord> {
        self.0.into_inner().expect("error log poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== EngineError Tests ====================

    #[test]
    fn test_validation_error_display() {
        let err = EngineError::Validation("rule id must not be empty".to_string());
        assert_eq!(err.to_string(), "validation error: rule id must not be empty");
    }

    #[test]
    fn test_context_resolution_error_display() {
        let err = EngineError::ContextResolution("no element matches 'main'".to_string());
        assert!(err.to_string().contains("context resolution error"));
    }

    #[test]
    fn test_engine_error_from_anyhow() {
        let err: EngineError = anyhow::anyhow!("unexpected failure").into();
        assert!(err.to_string().contains("internal error"));
        assert!(err.to_string().contains("unexpected failure"));
    }

    // ==================== ErrorRecord Tests ====================

    #[test]
    fn test_timeout_record_without_rule_id() {
        let rec = ErrorRecord::timeout(None, "global timeout after 100ms");
        assert_eq!(rec.kind, ErrorKind::Timeout);
        assert!(rec.rule_id.is_none());
    }

    #[test]
    fn test_element_limit_record_message_names_both_counts() {
        let rec = ErrorRecord::element_limit("img-alt", 12, 5);
        assert_eq!(rec.kind, ErrorKind::ElementLimit);
        assert_eq!(rec.rule_id.as_deref(), Some("img-alt"));
        assert!(rec.message.contains("12"));
        assert!(rec.message.contains("5"));
    }

    #[test]
    fn test_element_error_record_carries_source_message() {
        let source = anyhow::anyhow!("boom");
        let rec = ErrorRecord::element_error("img-alt", &source);
        assert_eq!(rec.kind, ErrorKind::ElementError);
        assert!(rec.message.contains("boom"));
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::SelectorError).expect("serialize");
        assert_eq!(json, "\"selector_error\"");
        let json = serde_json::to_string(&ErrorKind::ElementLimit).expect("serialize");
        assert_eq!(json, "\"element_limit\"");
    }

    #[test]
    fn test_record_serialization_skips_absent_rule_id() {
        let rec = ErrorRecord::timeout(None, "deadline passed");
        let value = serde_json::to_value(&rec).expect("serialize");
        assert!(value.get("ruleId").is_none());
        assert_eq!(value["kind"], "timeout");
    }

    // ==================== ErrorLog Tests ====================

    #[test]
    fn test_log_appends_and_drains() {
        let log = ErrorLog::new();
        assert!(log.is_empty());

        log.push(ErrorRecord::selector_error("r1", "bad selector"));
        log.push(ErrorRecord::timeout(Some("r2"), "rule timed out"));
        assert_eq!(log.len(), 2);

        let records = log.into_inner();
        assert_eq!(records[0].kind, ErrorKind::SelectorError);
        assert_eq!(records[1].kind, ErrorKind::Timeout);
    }
}
