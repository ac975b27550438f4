//! The complete stored configuration: projects, APIs, rules and callbacks.

use crate::error::{EngineError, Result};
use crate::model::{MockApi, MockCallback, MockRule, Project};
use mockdeck_lint::{lint_value, LintOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub apis: Vec<MockApi>,
    #[serde(default)]
    pub rules: Vec<MockRule>,
    #[serde(default)]
    pub callbacks: Vec<MockCallback>,
}

impl Workspace {
    /// Lint and deserialize a workspace document. Lint errors reject the
    /// whole document; warnings are logged.
    pub fn from_value(value: Value, source: &str) -> Result<Self> {
        let result = lint_value(&value, source, &LintOptions::default());
        if result.has_errors() {
            let messages: Vec<String> = result.errors().map(|i| i.summary()).collect();
            return Err(EngineError::InvalidConfig(messages.join("; ")));
        }
        for issue in &result.issues {
            tracing::warn!("{}: {}", source, issue.summary());
        }

        serde_json::from_value(value).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }

    /// Load a JSON or YAML workspace file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let value = mockdeck_lint::load_document(path).map_err(|e| {
            EngineError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        Self::from_value(value, &path.display().to_string())
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn api(&self, api_id: &str) -> Option<&MockApi> {
        self.apis.iter().find(|a| a.id == api_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_accepts_valid_document() {
        let ws = Workspace::from_value(
            json!({
                "projects": [{"id": "p1", "shortId": "shop", "ownerId": "u1"}],
                "apis": [{"id": "a1", "projectId": "p1", "path": "/orders"}],
                "rules": [{"id": "r1", "apiId": "a1", "priority": 0}]
            }),
            "inline",
        )
        .unwrap();

        assert_eq!(ws.projects.len(), 1);
        assert_eq!(ws.api("a1").unwrap().path, "/orders");
        assert!(ws.callbacks.is_empty());
    }

    #[test]
    fn test_from_value_rejects_over_limit() {
        let rules: Vec<Value> = (0..6)
            .map(|i| json!({"id": format!("r{i}"), "apiId": "a1", "priority": i}))
            .collect();
        let err = Workspace::from_value(
            json!({
                "projects": [{"id": "p1", "shortId": "shop", "ownerId": "u1"}],
                "apis": [{"id": "a1", "projectId": "p1", "path": "/orders"}],
                "rules": rules
            }),
            "inline",
        )
        .unwrap_err();

        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert!(err.to_string().contains("E011"));
    }
}
