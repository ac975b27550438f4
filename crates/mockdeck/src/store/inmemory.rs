use super::{check_reorder, check_rule_conditions, check_workspace_limits, MockRepository};
use crate::error::{EngineError, Result};
use crate::model::{ApiLog, CallbackLog, MockCallback, MockRule, Notification, Workspace};
use mockdeck_lint::limits::{MAX_CALLBACKS_PER_API, MAX_RULES_PER_API};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;

/// In-memory implementation of [`MockRepository`].
///
/// Configuration lives in a single [`Workspace`]. Each record kind keeps at
/// most `capacity` rows; the oldest row is evicted first.
pub struct InMemoryRepository {
    workspace: RwLock<Workspace>,
    api_logs: Mutex<VecDeque<ApiLog>>,
    callback_logs: Mutex<VecDeque<CallbackLog>>,
    notifications: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl InMemoryRepository {
    pub fn new(capacity: usize) -> Self {
        Self::with_workspace(Workspace::default(), capacity)
    }

    pub fn with_workspace(workspace: Workspace, capacity: usize) -> Self {
        Self {
            workspace: RwLock::new(workspace),
            api_logs: Mutex::new(VecDeque::new()),
            callback_logs: Mutex::new(VecDeque::new()),
            notifications: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn push_bounded<T>(&self, rows: &Mutex<VecDeque<T>>, row: T) {
        let mut rows = rows.lock();
        while rows.len() >= self.capacity {
            rows.pop_front();
        }
        rows.push_back(row);
    }
}

fn newest<T: Clone>(
    rows: &Mutex<VecDeque<T>>,
    limit: usize,
    keep: impl Fn(&T) -> bool,
) -> Vec<T> {
    rows.lock()
        .iter()
        .rev()
        .filter(|row| keep(row))
        .take(limit)
        .cloned()
        .collect()
}

impl MockRepository for InMemoryRepository {
    fn workspace(&self) -> Result<Workspace> {
        Ok(self.workspace.read().clone())
    }

    fn replace_workspace(&self, workspace: Workspace) -> Result<()> {
        check_workspace_limits(&workspace)?;
        *self.workspace.write() = workspace;
        Ok(())
    }

    fn enabled_rules(&self, api_id: &str) -> Result<Vec<MockRule>> {
        let workspace = self.workspace.read();
        let mut rules: Vec<MockRule> = workspace
            .rules
            .iter()
            .filter(|r| r.api_id == api_id && r.enabled)
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    fn enabled_callbacks(&self, api_id: &str) -> Result<Vec<MockCallback>> {
        let workspace = self.workspace.read();
        let mut callbacks: Vec<MockCallback> = workspace
            .callbacks
            .iter()
            .filter(|c| c.api_id == api_id && c.enabled)
            .cloned()
            .collect();
        callbacks.sort_by_key(|c| c.order);
        Ok(callbacks)
    }

    fn upsert_rule(&self, rule: MockRule) -> Result<MockRule> {
        check_rule_conditions(&rule)?;
        let mut workspace = self.workspace.write();
        if workspace.api(&rule.api_id).is_none() {
            return Err(EngineError::not_found("mock API", rule.api_id.as_str()));
        }

        if let Some(existing) = workspace.rules.iter_mut().find(|r| r.id == rule.id) {
            if existing.api_id != rule.api_id {
                return Err(EngineError::InvalidConfig(format!(
                    "rule {} belongs to mock API {}",
                    rule.id, existing.api_id
                )));
            }
            *existing = rule.clone();
            return Ok(rule);
        }

        let count = workspace
            .rules
            .iter()
            .filter(|r| r.api_id == rule.api_id)
            .count();
        if count >= MAX_RULES_PER_API {
            return Err(EngineError::LimitExceeded(format!(
                "mock API {} already has {} rules (max {})",
                rule.api_id, count, MAX_RULES_PER_API
            )));
        }
        workspace.rules.push(rule.clone());
        Ok(rule)
    }

    fn upsert_callback(&self, callback: MockCallback) -> Result<MockCallback> {
        let mut workspace = self.workspace.write();
        if workspace.api(&callback.api_id).is_none() {
            return Err(EngineError::not_found(
                "mock API",
                callback.api_id.as_str(),
            ));
        }

        if let Some(existing) = workspace.callbacks.iter_mut().find(|c| c.id == callback.id) {
            if existing.api_id != callback.api_id {
                return Err(EngineError::InvalidConfig(format!(
                    "callback {} belongs to mock API {}",
                    callback.id, existing.api_id
                )));
            }
            *existing = callback.clone();
            return Ok(callback);
        }

        let count = workspace
            .callbacks
            .iter()
            .filter(|c| c.api_id == callback.api_id)
            .count();
        if count >= MAX_CALLBACKS_PER_API {
            return Err(EngineError::LimitExceeded(format!(
                "mock API {} already has {} callbacks (max {})",
                callback.api_id, count, MAX_CALLBACKS_PER_API
            )));
        }
        workspace.callbacks.push(callback.clone());
        Ok(callback)
    }

    fn reorder_rules(&self, api_id: &str, ids: &[String]) -> Result<Vec<MockRule>> {
        let mut workspace = self.workspace.write();
        let existing: Vec<&str> = workspace
            .rules
            .iter()
            .filter(|r| r.api_id == api_id)
            .map(|r| r.id.as_str())
            .collect();
        if existing.is_empty() && workspace.api(api_id).is_none() {
            return Err(EngineError::not_found("mock API", api_id));
        }
        check_reorder(&existing, ids)?;

        for rule in workspace.rules.iter_mut().filter(|r| r.api_id == api_id) {
            if let Some(position) = ids.iter().position(|id| *id == rule.id) {
                rule.priority = position as i64;
            }
        }

        let mut rules: Vec<MockRule> = workspace
            .rules
            .iter()
            .filter(|r| r.api_id == api_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    fn reorder_callbacks(&self, api_id: &str, ids: &[String]) -> Result<Vec<MockCallback>> {
        let mut workspace = self.workspace.write();
        let existing: Vec<&str> = workspace
            .callbacks
            .iter()
            .filter(|c| c.api_id == api_id)
            .map(|c| c.id.as_str())
            .collect();
        if existing.is_empty() && workspace.api(api_id).is_none() {
            return Err(EngineError::not_found("mock API", api_id));
        }
        check_reorder(&existing, ids)?;

        for callback in workspace.callbacks.iter_mut().filter(|c| c.api_id == api_id) {
            if let Some(position) = ids.iter().position(|id| *id == callback.id) {
                callback.order = position as i64;
            }
        }

        let mut callbacks: Vec<MockCallback> = workspace
            .callbacks
            .iter()
            .filter(|c| c.api_id == api_id)
            .cloned()
            .collect();
        callbacks.sort_by_key(|c| c.order);
        Ok(callbacks)
    }

    fn append_api_log(&self, log: ApiLog) -> Result<()> {
        self.push_bounded(&self.api_logs, log);
        Ok(())
    }

    fn append_callback_log(&self, log: CallbackLog) -> Result<()> {
        self.push_bounded(&self.callback_logs, log);
        Ok(())
    }

    fn append_notification(&self, notification: Notification) -> Result<()> {
        self.push_bounded(&self.notifications, notification);
        Ok(())
    }

    fn recent_api_logs(&self, project_id: &str, limit: usize) -> Result<Vec<ApiLog>> {
        Ok(newest(&self.api_logs, limit, |l| l.project_id == project_id))
    }

    fn recent_callback_logs(&self, api_id: &str, limit: usize) -> Result<Vec<CallbackLog>> {
        Ok(newest(&self.callback_logs, limit, |l| l.api_id == api_id))
    }

    fn recent_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>> {
        Ok(newest(&self.notifications, limit, |n| n.user_id == user_id))
    }
}
