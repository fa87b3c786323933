//! Tolerant reduction of per-id remote calls.
//!
//! Every bulk action filters its ids down to numeric-looking values, runs the
//! operation once per id in order, and records which ids succeeded. Callers
//! see success when at least one id succeeded.

use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;

use crate::error::{Result, SyncError};

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").expect("valid numeric pattern")
});

pub fn is_numeric_id(id: &str) -> bool {
    NUMERIC.is_match(id)
}

/// Numeric-looking ids, trimmed, in input order. Everything else is dropped.
pub fn numeric_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .filter(|id| is_numeric_id(id.as_ref()))
        .map(|id| id.as_ref().trim().to_string())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl BulkResult {
    pub fn any_succeeded(&self) -> bool {
        !self.succeeded.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn record(&mut self, id: String, ok: bool) {
        if ok {
            self.succeeded.push(id);
        } else {
            self.failed.push(id);
        }
    }

    pub fn log_summary(&self, action: &str) {
        if self.failed.is_empty() {
            log::info!("{}: {} succeeded", action, self.succeeded.len());
        } else {
            log::warn!(
                "{}: {} succeeded, {} failed ({})",
                action,
                self.succeeded.len(),
                self.failed.len(),
                self.failed.join(", ")
            );
        }
    }
}

/// Boolean view of a bulk action that may have been rejected up front.
pub fn any_succeeded(result: &Result<BulkResult>) -> bool {
    result.as_ref().map(BulkResult::any_succeeded).unwrap_or(false)
}

/// Run `operation` for each numeric id, strictly one after another.
pub async fn apply_to_each<I, S, F, Fut>(ids: I, mut operation: F) -> BulkResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = bool>,
{
    let mut result = BulkResult::default();
    for id in numeric_ids(ids) {
        let ok = operation(id.clone()).await;
        log::debug!("bulk item {} -> {}", id, if ok { "ok" } else { "failed" });
        result.record(id, ok);
    }
    result
}

/// Reject an action whose ids contain nothing numeric, before any call.
pub fn require_ids<S: AsRef<str>>(ids: &[S], what: &str) -> Result<Vec<String>> {
    let filtered = numeric_ids(ids);
    if filtered.is_empty() {
        return Err(SyncError::Validation(format!("no numeric {} ids given", what)));
    }
    Ok(filtered)
}

#[cfg(test)]
#[path = "bulk_tests.rs"]
mod tests;
