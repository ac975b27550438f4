//! Issues and aggregated lint results.

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The server refuses the workspace.
    Error,
    /// The workspace loads but part of it can never be reached or used.
    Warning,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// One finding. `code` is stable (`E0xx` for errors, `W0xx` for warnings),
/// `location` is a JSON-ish pointer such as `rules[2].conditions`.
#[derive(Debug, Clone, Serialize)]
pub struct LintIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(serialize_with = "path_as_str")]
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

fn path_as_str<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&path.display())
}

impl LintIssue {
    fn new(severity: Severity, code: String, message: String, file: PathBuf) -> Self {
        Self {
            severity,
            code,
            message,
            file,
            location: None,
            suggestion: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Error, code.into(), message.into(), file)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Warning, code.into(), message.into(), file)
    }

    pub fn with_location(self, location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..self
        }
    }

    pub fn with_suggestion(self, suggestion: impl Into<String>) -> Self {
        Self {
            suggestion: Some(suggestion.into()),
            ..self
        }
    }

    /// `[E011] apis[0]: message`, without the file name.
    pub fn summary(&self) -> String {
        match &self.location {
            Some(location) => format!("[{}] {location}: {}", self.code, self.message),
            None => format!("[{}] {}", self.code, self.message),
        }
    }
}

/// Compiler-style: `ws.json: error[E011] apis[0]: message`.
impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}]",
            self.file.display(),
            self.severity.label(),
            self.code
        )?;
        if let Some(location) = &self.location {
            write!(f, " {location}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct LintResult {
    pub issues: Vec<LintIssue>,
    pub files_checked: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl LintResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: LintIssue) {
        *self.counter(issue.severity) += 1;
        self.issues.push(issue);
    }

    fn counter(&mut self, severity: Severity) -> &mut usize {
        match severity {
            Severity::Error => &mut self.errors,
            Severity::Warning => &mut self.warnings,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn errors(&self) -> impl Iterator<Item = &LintIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn merge(&mut self, other: LintResult) {
        self.files_checked += other.files_checked;
        for issue in other.issues {
            self.add_issue(issue);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// Also report informational findings (CLI `--verbose`).
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_counts_by_severity() {
        let mut result = LintResult::new();
        result.add_issue(LintIssue::error("E001", "bad", PathBuf::from("a.json")));
        result.add_issue(LintIssue::warning("W001", "meh", PathBuf::from("a.json")));

        let mut other = LintResult::new();
        other.files_checked = 1;
        other.add_issue(LintIssue::warning("W002", "meh", PathBuf::from("b.json")));
        result.merge(other);

        assert_eq!(result.errors, 1);
        assert_eq!(result.warnings, 2);
        assert_eq!(result.files_checked, 1);
        assert!(!result.is_valid());
        assert_eq!(result.errors().count(), 1);
    }

    #[test]
    fn test_summary_and_display() {
        let issue = LintIssue::error("E011", "too many rules", PathBuf::from("ws.json"))
            .with_location("apis[0]");
        assert_eq!(issue.summary(), "[E011] apis[0]: too many rules");
        assert_eq!(issue.to_string(), "ws.json: error[E011] apis[0]: too many rules");
    }
}
