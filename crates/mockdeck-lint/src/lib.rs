//! Workspace linting library for Mockdeck.
//!
//! A workspace is a JSON or YAML document holding the `projects`, `apis`,
//! `rules` and `callbacks` the server routes on. This crate validates those
//! documents (references, per-API limits, condition shapes) and is used both
//! by the `mockdeck-lint` CLI and by the server before it accepts a workspace.
//!
//! # Example
//!
//! ```no_run
//! use mockdeck_lint::{lint_file, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(Path::new("workspace.yaml"), &LintOptions::default());
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

pub mod limits;
mod types;
mod validator;

use serde_json::Value;
use std::path::Path;
use thiserror::Error;

pub use types::{LintIssue, LintOptions, LintResult, Severity};

pub use validator::{
    validate_apis, validate_callbacks, validate_condition, validate_condition_group,
    validate_projects, validate_rules, validate_workspace,
};

/// Failure to turn a file into a JSON value.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DocumentError {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::Read(_) => "E001",
            DocumentError::Json(_) | DocumentError::Yaml(_) => "E002",
        }
    }
}

/// Whether a path looks like a workspace document (`.json`, `.yaml`, `.yml`).
pub fn is_workspace_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "json" | "yaml" | "yml"))
}

/// Parse a document from text, choosing YAML or JSON by file extension.
pub fn parse_document(content: &str, path: &Path) -> Result<Value, DocumentError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yaml" || ext == "yml");

    if is_yaml {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}

/// Read and parse a workspace document from disk.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content, path)
}

/// Lint a single workspace file.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    match load_document(path) {
        Ok(value) => validate_workspace(path, &value, &mut result, options),
        Err(e) => {
            result.add_issue(LintIssue::error(e.code(), e.to_string(), path.to_path_buf()));
        }
    }

    result
}

/// Lint all workspace files in a directory (non-recursive).
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let entries = match std::fs::read_dir(path) {
        Ok(e) => e,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_workspace_file(p))
        .collect();
    files.sort();

    for file in files {
        result.merge(lint_file(&file, options));
    }

    result
}

/// Lint an already-parsed workspace value.
pub fn lint_value(value: &Value, source_name: &str, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    validate_workspace(Path::new(source_name), value, &mut result, options);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lint_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
projects:
  - id: p1
    shortId: shop
    ownerId: u1
apis:
  - id: a1
    projectId: p1
    path: /orders
    proxyMode: PROXY
"#
        )
        .unwrap();

        let result = lint_file(file.path(), &LintOptions::default());
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.errors, 1);
        assert_eq!(result.issues[0].code, "E008");
    }

    #[test]
    fn test_lint_invalid_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = lint_file(file.path(), &LintOptions::default());
        assert_eq!(result.issues[0].code, "E002");
    }

    #[test]
    fn test_lint_directory_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"projects": []}"#).unwrap();
        std::fs::write(dir.path().join("b.yml"), "apis: []\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint_directory(dir.path(), &LintOptions::default());
        assert_eq!(result.files_checked, 2);
        assert!(result.is_valid());
    }

    #[test]
    fn test_lint_value() {
        let value = serde_json::json!({"apis": [{"id": "a1"}]});
        let result = lint_value(&value, "inline", &LintOptions::default());
        assert_eq!(result.errors, 2);
    }
}
