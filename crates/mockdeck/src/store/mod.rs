//! Repository contract and the request-time configuration snapshot.

mod inmemory;
mod snapshot;

use crate::error::{EngineError, Result};
use crate::model::{ApiLog, CallbackLog, MockCallback, MockRule, Notification, Workspace};
use mockdeck_lint::limits::{MAX_CALLBACKS_PER_API, MAX_CONDITIONS_PER_RULE, MAX_RULES_PER_API};
use std::collections::{HashMap, HashSet};

pub use inmemory::InMemoryRepository;
pub use snapshot::{ConfigCache, RouteMatch, Snapshot};

/// Storage for configuration and append-only records.
///
/// Synchronous so it can be called from anywhere without async bridging;
/// implementations must be cheap enough to call on the request path.
pub trait MockRepository: Send + Sync {
    fn workspace(&self) -> Result<Workspace>;

    /// Replace all configuration at once.
    fn replace_workspace(&self, workspace: Workspace) -> Result<()>;

    /// Enabled rules for an API, ascending by priority, ties in stored order.
    fn enabled_rules(&self, api_id: &str) -> Result<Vec<MockRule>>;

    /// Enabled callbacks for an API, ascending by `order`.
    fn enabled_callbacks(&self, api_id: &str) -> Result<Vec<MockCallback>>;

    /// Insert or replace a rule by id.
    fn upsert_rule(&self, rule: MockRule) -> Result<MockRule>;

    /// Insert or replace a callback by id.
    fn upsert_callback(&self, callback: MockCallback) -> Result<MockCallback>;

    /// Assign priorities `0..n` in the given order, in one write. `ids` must
    /// name every rule of the API exactly once.
    fn reorder_rules(&self, api_id: &str, ids: &[String]) -> Result<Vec<MockRule>>;

    /// Same as [`MockRepository::reorder_rules`] for callback `order`.
    fn reorder_callbacks(&self, api_id: &str, ids: &[String]) -> Result<Vec<MockCallback>>;

    fn append_api_log(&self, log: ApiLog) -> Result<()>;
    fn append_callback_log(&self, log: CallbackLog) -> Result<()>;
    fn append_notification(&self, notification: Notification) -> Result<()>;

    /// Newest first.
    fn recent_api_logs(&self, project_id: &str, limit: usize) -> Result<Vec<ApiLog>>;
    fn recent_callback_logs(&self, api_id: &str, limit: usize) -> Result<Vec<CallbackLog>>;
    fn recent_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>>;
}

pub fn check_rule_conditions(rule: &MockRule) -> Result<()> {
    let count = rule.conditions.conditions.len();
    if count > MAX_CONDITIONS_PER_RULE {
        return Err(EngineError::LimitExceeded(format!(
            "rule {} has {} conditions (max {})",
            rule.id, count, MAX_CONDITIONS_PER_RULE
        )));
    }
    Ok(())
}

/// Enforce per-API caps across a whole workspace.
pub fn check_workspace_limits(workspace: &Workspace) -> Result<()> {
    let mut rules_per_api: HashMap<&str, usize> = HashMap::new();
    for rule in &workspace.rules {
        check_rule_conditions(rule)?;
        *rules_per_api.entry(rule.api_id.as_str()).or_default() += 1;
    }
    if let Some((api_id, count)) = rules_per_api
        .iter()
        .find(|(_, count)| **count > MAX_RULES_PER_API)
    {
        return Err(EngineError::LimitExceeded(format!(
            "mock API {api_id} has {count} rules (max {MAX_RULES_PER_API})"
        )));
    }

    let mut callbacks_per_api: HashMap<&str, usize> = HashMap::new();
    for callback in &workspace.callbacks {
        *callbacks_per_api
            .entry(callback.api_id.as_str())
            .or_default() += 1;
    }
    if let Some((api_id, count)) = callbacks_per_api
        .iter()
        .find(|(_, count)| **count > MAX_CALLBACKS_PER_API)
    {
        return Err(EngineError::LimitExceeded(format!(
            "mock API {api_id} has {count} callbacks (max {MAX_CALLBACKS_PER_API})"
        )));
    }
    Ok(())
}

/// Check that `ids` is a permutation of `existing`.
pub(crate) fn check_reorder(existing: &[&str], ids: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(EngineError::Reorder(format!("duplicate id {id}")));
        }
        if !existing.contains(&id.as_str()) {
            return Err(EngineError::Reorder(format!("unknown id {id}")));
        }
    }
    if seen.len() != existing.len() {
        return Err(EngineError::Reorder(format!(
            "expected {} ids, got {}",
            existing.len(),
            seen.len()
        )));
    }
    Ok(())
}
