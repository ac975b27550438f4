//! Core validation logic for workspace configurations.
//!
//! The validator works on raw JSON so it can report every problem in a file
//! at once instead of stopping at the first deserialization error.

use crate::limits::{
    MAX_CALLBACKS_PER_API, MAX_CALLBACK_DELAY_MS, MAX_CONDITIONS_PER_RULE, MAX_RULES_PER_API,
};
use crate::types::{LintIssue, LintOptions, LintResult};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

const API_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "ANY",
];
const CALLBACK_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];
const PROXY_MODES: &[&str] = &["MOCK", "PROXY", "AUTO"];
const GROUP_TYPES: &[&str] = &["AND", "OR"];
const OPERATORS: &[&str] = &["equals", "contains", "gt", "lt", "between", "in"];
const FIELD_BUCKETS: &[&str] = &["query", "body", "header", "headers", "param", "params"];

static SHORT_ID_REGEX: OnceLock<Regex> = OnceLock::new();
static PATH_PARAM_REGEX: OnceLock<Regex> = OnceLock::new();

fn short_id_regex() -> &'static Regex {
    SHORT_ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap())
}

fn path_param_regex() -> &'static Regex {
    PATH_PARAM_REGEX.get_or_init(|| Regex::new(r"^:[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

/// Validate a complete workspace (`projects`, `apis`, `rules`, `callbacks`).
pub fn validate_workspace(
    file: &Path,
    workspace: &Value,
    result: &mut LintResult,
    options: &LintOptions,
) {
    if !workspace.is_object() {
        result.add_issue(
            LintIssue::error("E003", "Workspace must be a JSON object", file.to_path_buf())
                .with_suggestion("Use {\"projects\": [], \"apis\": [], \"rules\": [], \"callbacks\": []}"),
        );
        return;
    }

    let projects = collection(file, workspace, "projects", result);
    let apis = collection(file, workspace, "apis", result);
    let rules = collection(file, workspace, "rules", result);
    let callbacks = collection(file, workspace, "callbacks", result);

    let project_ids = validate_projects(file, projects, result);
    let api_ids = validate_apis(file, apis, &project_ids, result);
    validate_rules(file, rules, &api_ids, result, options);
    validate_callbacks(file, callbacks, &api_ids, result);
}

fn collection<'a>(
    file: &Path,
    workspace: &'a Value,
    key: &str,
    result: &mut LintResult,
) -> &'a [Value] {
    match workspace.get(key) {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            result.add_issue(
                LintIssue::error("E003", format!("'{key}' must be an array"), file.to_path_buf())
                    .with_location(key),
            );
            &[]
        }
    }
}

fn required_str<'a>(
    file: &Path,
    item: &'a Value,
    key: &str,
    location: &str,
    result: &mut LintResult,
) -> Option<&'a str> {
    match item.get(key).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Some(value),
        _ => {
            result.add_issue(
                LintIssue::error(
                    "E003",
                    format!("Missing required field: {key}"),
                    file.to_path_buf(),
                )
                .with_location(location),
            );
            None
        }
    }
}

fn check_duplicate_id(
    file: &Path,
    id: &str,
    seen: &mut HashSet<String>,
    location: &str,
    result: &mut LintResult,
) {
    if !seen.insert(id.to_string()) {
        result.add_issue(
            LintIssue::error("E004", format!("Duplicate id '{id}'"), file.to_path_buf())
                .with_location(location),
        );
    }
}

fn check_status(file: &Path, item: &Value, key: &str, location: &str, result: &mut LintResult) {
    if let Some(value) = item.get(key) {
        if value.is_null() {
            return;
        }
        let valid = value
            .as_u64()
            .is_some_and(|status| (100..=599).contains(&status));
        if !valid {
            result.add_issue(
                LintIssue::error(
                    "E010",
                    format!("{key} must be an HTTP status code between 100 and 599"),
                    file.to_path_buf(),
                )
                .with_location(location),
            );
        }
    }
}

fn check_delay(file: &Path, item: &Value, key: &str, location: &str, result: &mut LintResult) {
    if let Some(value) = item.get(key) {
        if !value.is_null() && value.as_u64().is_none() {
            result.add_issue(
                LintIssue::error(
                    "E020",
                    format!("{key} must be a non-negative integer (milliseconds)"),
                    file.to_path_buf(),
                )
                .with_location(location),
            );
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validate projects and return the set of known project ids.
pub fn validate_projects(file: &Path, projects: &[Value], result: &mut LintResult) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut short_ids = HashSet::new();

    for (idx, project) in projects.iter().enumerate() {
        let location = format!("projects[{idx}]");
        if let Some(id) = required_str(file, project, "id", &location, result) {
            check_duplicate_id(file, id, &mut ids, &location, result);
        }
        required_str(file, project, "ownerId", &location, result);

        if let Some(short_id) = required_str(file, project, "shortId", &location, result) {
            if !short_id_regex().is_match(short_id) {
                result.add_issue(
                    LintIssue::error(
                        "E019",
                        format!("shortId '{short_id}' may only contain letters, digits, '-' and '_'"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
            if !short_ids.insert(short_id.to_string()) {
                result.add_issue(
                    LintIssue::error(
                        "E006",
                        format!("shortId '{short_id}' is used by more than one project"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
        }
    }

    ids
}

/// Validate mock APIs and return the set of known API ids.
pub fn validate_apis(
    file: &Path,
    apis: &[Value],
    project_ids: &HashSet<String>,
    result: &mut LintResult,
) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut routes: HashMap<(String, String, String), usize> = HashMap::new();

    for (idx, api) in apis.iter().enumerate() {
        let location = format!("apis[{idx}]");
        if let Some(id) = required_str(file, api, "id", &location, result) {
            check_duplicate_id(file, id, &mut ids, &location, result);
        }

        let project_id = required_str(file, api, "projectId", &location, result);
        if let Some(project_id) = project_id {
            if !project_ids.contains(project_id) {
                result.add_issue(
                    LintIssue::error(
                        "E005",
                        format!("projectId '{project_id}' does not reference a known project"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
        }

        let path = required_str(file, api, "path", &location, result);
        if let Some(path) = path {
            validate_path_pattern(file, path, &location, result);
        }

        let method = api
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        if !API_METHODS.contains(&method.as_str()) {
            result.add_issue(
                LintIssue::error(
                    "E016",
                    format!("Unsupported HTTP method '{method}'"),
                    file.to_path_buf(),
                )
                .with_location(&location)
                .with_suggestion(format!("Use one of: {}", API_METHODS.join(", "))),
            );
        }

        if let (Some(project_id), Some(path)) = (project_id, path) {
            let key = (project_id.to_string(), method.clone(), path.to_string());
            if let Some(first) = routes.insert(key, idx) {
                result.add_issue(
                    LintIssue::warning(
                        "W007",
                        format!("Route {method} {path} is already defined by apis[{first}]"),
                        file.to_path_buf(),
                    )
                    .with_location(&location)
                    .with_suggestion("Only the first definition will receive traffic"),
                );
            }
        }

        let mode = api
            .get("proxyMode")
            .and_then(Value::as_str)
            .unwrap_or("MOCK")
            .to_uppercase();
        if !PROXY_MODES.contains(&mode.as_str()) {
            result.add_issue(
                LintIssue::error(
                    "E007",
                    format!("Invalid proxyMode '{mode}'"),
                    file.to_path_buf(),
                )
                .with_location(&location)
                .with_suggestion("Use MOCK, PROXY or AUTO"),
            );
        }

        let base_url = api.get("baseUrl").and_then(Value::as_str);
        match base_url {
            Some(url) if !is_http_url(url) => {
                result.add_issue(
                    LintIssue::error(
                        "E009",
                        format!("baseUrl '{url}' must start with http:// or https://"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
            None if mode == "PROXY" => {
                result.add_issue(
                    LintIssue::error(
                        "E008",
                        "proxyMode PROXY requires a baseUrl",
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
            None if mode == "AUTO" => {
                result.add_issue(
                    LintIssue::warning(
                        "W004",
                        "proxyMode AUTO without baseUrl always answers from the mock",
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
            _ => {}
        }

        check_status(file, api, "responseStatus", &location, result);
        check_delay(file, api, "responseDelay", &location, result);
    }

    ids
}

fn validate_path_pattern(file: &Path, path: &str, location: &str, result: &mut LintResult) {
    if !path.starts_with('/') {
        result.add_issue(
            LintIssue::error(
                "E017",
                format!("path '{path}' must start with '/'"),
                file.to_path_buf(),
            )
            .with_location(location),
        );
        return;
    }

    for segment in path.split('/').filter(|s| s.starts_with(':')) {
        if !path_param_regex().is_match(segment) {
            result.add_issue(
                LintIssue::error(
                    "E017",
                    format!("Invalid path parameter '{segment}' in '{path}'"),
                    file.to_path_buf(),
                )
                .with_location(location),
            );
        }
    }
}

/// Validate rules, including per-API limits and condition payloads.
pub fn validate_rules(
    file: &Path,
    rules: &[Value],
    api_ids: &HashSet<String>,
    result: &mut LintResult,
    options: &LintOptions,
) {
    let mut ids = HashSet::new();
    let mut per_api: HashMap<String, Vec<usize>> = HashMap::new();
    let mut priorities: HashMap<(String, i64), usize> = HashMap::new();

    for (idx, rule) in rules.iter().enumerate() {
        let location = format!("rules[{idx}]");
        if let Some(id) = required_str(file, rule, "id", &location, result) {
            check_duplicate_id(file, id, &mut ids, &location, result);
        }

        if let Some(api_id) = required_str(file, rule, "apiId", &location, result) {
            if !api_ids.contains(api_id) {
                result.add_issue(
                    LintIssue::error(
                        "E005",
                        format!("apiId '{api_id}' does not reference a known mock API"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
            per_api.entry(api_id.to_string()).or_default().push(idx);

            let priority = rule.get("priority").and_then(Value::as_i64).unwrap_or(0);
            if let Some(first) = priorities.insert((api_id.to_string(), priority), idx) {
                result.add_issue(
                    LintIssue::warning(
                        "W003",
                        format!("priority {priority} is shared with rules[{first}]"),
                        file.to_path_buf(),
                    )
                    .with_location(&location)
                    .with_suggestion("Reorder the rules so every priority is unique"),
                );
            }
        }

        check_status(file, rule, "statusCode", &location, result);
        check_delay(file, rule, "delay", &location, result);

        if let Some(group) = rule.get("conditions") {
            validate_condition_group(file, group, &location, result, options);
        }
    }

    let mut over_limit: Vec<_> = per_api
        .into_iter()
        .filter(|(_, indexes)| indexes.len() > MAX_RULES_PER_API)
        .collect();
    over_limit.sort();
    for (api_id, indexes) in over_limit {
        result.add_issue(
            LintIssue::error(
                "E011",
                format!(
                    "Mock API '{api_id}' has {} rules (maximum {MAX_RULES_PER_API})",
                    indexes.len()
                ),
                file.to_path_buf(),
            )
            .with_location(format!("rules[{}]", indexes[MAX_RULES_PER_API])),
        );
    }
}

/// Validate one rule's condition group.
pub fn validate_condition_group(
    file: &Path,
    group: &Value,
    rule_location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    let location = format!("{rule_location}.conditions");
    let Some(group_obj) = group.as_object() else {
        result.add_issue(
            LintIssue::error(
                "E018",
                "conditions must be an object with 'type' and 'conditions'",
                file.to_path_buf(),
            )
            .with_location(&location),
        );
        return;
    };

    if let Some(group_type) = group_obj.get("type").and_then(Value::as_str) {
        if !GROUP_TYPES.contains(&group_type.to_uppercase().as_str()) {
            result.add_issue(
                LintIssue::error(
                    "E018",
                    format!("Invalid condition group type '{group_type}'"),
                    file.to_path_buf(),
                )
                .with_location(&location)
                .with_suggestion("Use AND or OR"),
            );
        }
    }

    let conditions = group_obj
        .get("conditions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    if conditions.len() > MAX_CONDITIONS_PER_RULE {
        result.add_issue(
            LintIssue::error(
                "E012",
                format!(
                    "Rule has {} conditions (maximum {MAX_CONDITIONS_PER_RULE})",
                    conditions.len()
                ),
                file.to_path_buf(),
            )
            .with_location(&location),
        );
    }

    for (idx, condition) in conditions.iter().enumerate() {
        validate_condition(
            file,
            condition,
            &format!("{location}.conditions[{idx}]"),
            result,
            options,
        );
    }
}

/// Validate a single rule condition. Problems here are warnings: the server
/// loads the rule but the condition never matches.
pub fn validate_condition(
    file: &Path,
    condition: &Value,
    location: &str,
    result: &mut LintResult,
    _options: &LintOptions,
) {
    if let Some(field) = required_str(file, condition, "field", location, result) {
        let bucket = field.split('.').next().unwrap_or_default();
        if !FIELD_BUCKETS.contains(&bucket) {
            result.add_issue(
                LintIssue::warning(
                    "W005",
                    format!("Field '{field}' does not start with a known bucket"),
                    file.to_path_buf(),
                )
                .with_location(location)
                .with_suggestion("Use query.*, body.*, header.* or param.*"),
            );
        }
    }

    let operator = condition
        .get("operator")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    if !OPERATORS.contains(&operator.as_str()) {
        result.add_issue(
            LintIssue::warning(
                "W001",
                format!("Unknown operator '{operator}'; the condition never matches"),
                file.to_path_buf(),
            )
            .with_location(location)
            .with_suggestion(format!("Use one of: {}", OPERATORS.join(", "))),
        );
        return;
    }

    let value = condition.get("value").unwrap_or(&Value::Null);
    let problem = match operator.as_str() {
        "contains" if is_compound(value) => Some("expects a scalar value"),
        "gt" | "lt" if numeric(value).is_none() => Some("expects a numeric value"),
        "between" => match value.as_array() {
            Some(range) if range.len() == 2 && range.iter().all(|v| numeric(v).is_some()) => {
                None
            }
            _ => Some("expects a [low, high] pair of numbers"),
        },
        "in" if !value.is_array() => Some("expects an array of values"),
        _ => None,
    };

    if let Some(problem) = problem {
        result.add_issue(
            LintIssue::warning(
                "W002",
                format!("Operator '{operator}' {problem}; the condition never matches"),
                file.to_path_buf(),
            )
            .with_location(location),
        );
    }
}

fn is_compound(value: &Value) -> bool {
    value.is_array() || value.is_object()
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validate callbacks, including per-API limits and delay bounds.
pub fn validate_callbacks(
    file: &Path,
    callbacks: &[Value],
    api_ids: &HashSet<String>,
    result: &mut LintResult,
) {
    let mut ids = HashSet::new();
    let mut per_api: HashMap<String, Vec<usize>> = HashMap::new();
    let mut orders: HashMap<(String, i64), usize> = HashMap::new();

    for (idx, callback) in callbacks.iter().enumerate() {
        let location = format!("callbacks[{idx}]");
        if let Some(id) = required_str(file, callback, "id", &location, result) {
            check_duplicate_id(file, id, &mut ids, &location, result);
        }

        if let Some(api_id) = required_str(file, callback, "apiId", &location, result) {
            if !api_ids.contains(api_id) {
                result.add_issue(
                    LintIssue::error(
                        "E005",
                        format!("apiId '{api_id}' does not reference a known mock API"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
            per_api.entry(api_id.to_string()).or_default().push(idx);

            let order = callback.get("order").and_then(Value::as_i64).unwrap_or(0);
            if let Some(first) = orders.insert((api_id.to_string(), order), idx) {
                result.add_issue(
                    LintIssue::warning(
                        "W006",
                        format!("order {order} is shared with callbacks[{first}]"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
        }

        if let Some(url) = required_str(file, callback, "url", &location, result) {
            if !is_http_url(url) && !url.starts_with("{{") {
                result.add_issue(
                    LintIssue::error(
                        "E015",
                        format!("Callback url '{url}' must start with http:// or https://"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
        }

        let method = callback
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("POST")
            .to_uppercase();
        if !CALLBACK_METHODS.contains(&method.as_str()) {
            result.add_issue(
                LintIssue::error(
                    "E016",
                    format!("Unsupported callback method '{method}'"),
                    file.to_path_buf(),
                )
                .with_location(&location)
                .with_suggestion(format!("Use one of: {}", CALLBACK_METHODS.join(", "))),
            );
        }

        if let Some(delay) = callback.get("delay").filter(|v| !v.is_null()) {
            let valid = delay
                .as_u64()
                .is_some_and(|ms| ms <= MAX_CALLBACK_DELAY_MS);
            if !valid {
                result.add_issue(
                    LintIssue::error(
                        "E014",
                        format!("Callback delay must be between 0 and {MAX_CALLBACK_DELAY_MS} ms"),
                        file.to_path_buf(),
                    )
                    .with_location(&location),
                );
            }
        }
    }

    let mut over_limit: Vec<_> = per_api
        .into_iter()
        .filter(|(_, indexes)| indexes.len() > MAX_CALLBACKS_PER_API)
        .collect();
    over_limit.sort();
    for (api_id, indexes) in over_limit {
        result.add_issue(
            LintIssue::error(
                "E013",
                format!(
                    "Mock API '{api_id}' has {} callbacks (maximum {MAX_CALLBACKS_PER_API})",
                    indexes.len()
                ),
                file.to_path_buf(),
            )
            .with_location(format!("callbacks[{}]", indexes[MAX_CALLBACKS_PER_API])),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn lint(workspace: Value) -> LintResult {
        let mut result = LintResult::new();
        validate_workspace(
            &PathBuf::from("workspace.json"),
            &workspace,
            &mut result,
            &LintOptions::default(),
        );
        result
    }

    fn codes(result: &LintResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.code.as_str()).collect()
    }

    fn base() -> Value {
        json!({
            "projects": [{"id": "p1", "shortId": "shop", "ownerId": "u1"}],
            "apis": [{"id": "a1", "projectId": "p1", "path": "/api/users", "method": "GET"}],
            "rules": [],
            "callbacks": []
        })
    }

    #[test]
    fn test_valid_workspace_has_no_issues() {
        let result = lint(base());
        assert!(result.issues.is_empty(), "{:?}", result.issues);
    }

    #[test]
    fn test_rule_limit_is_enforced() {
        let mut ws = base();
        let rules: Vec<Value> = (0..6)
            .map(|i| json!({"id": format!("r{i}"), "apiId": "a1", "priority": i}))
            .collect();
        ws["rules"] = Value::Array(rules);

        let result = lint(ws);
        assert_eq!(codes(&result), vec!["E011"]);
    }

    #[test]
    fn test_condition_limit_is_enforced() {
        let mut ws = base();
        let conditions: Vec<Value> = (0..6)
            .map(|i| json!({"field": format!("query.k{i}"), "operator": "equals", "value": "x"}))
            .collect();
        ws["rules"] = json!([{
            "id": "r1", "apiId": "a1", "priority": 0,
            "conditions": {"type": "AND", "conditions": conditions}
        }]);

        let result = lint(ws);
        assert_eq!(codes(&result), vec!["E012"]);
    }

    #[test]
    fn test_callback_limit_and_delay() {
        let mut ws = base();
        let mut callbacks: Vec<Value> = (0..11)
            .map(|i| json!({"id": format!("c{i}"), "apiId": "a1", "order": i, "url": "https://x/cb"}))
            .collect();
        callbacks[0]["delay"] = json!(60_001);
        ws["callbacks"] = Value::Array(callbacks);

        let result = lint(ws);
        let found = codes(&result);
        assert!(found.contains(&"E013"));
        assert!(found.contains(&"E014"));
    }

    #[test]
    fn test_proxy_mode_requires_base_url() {
        let mut ws = base();
        ws["apis"][0]["proxyMode"] = json!("PROXY");
        assert_eq!(codes(&lint(ws.clone())), vec!["E008"]);

        ws["apis"][0]["proxyMode"] = json!("AUTO");
        assert_eq!(codes(&lint(ws.clone())), vec!["W004"]);

        ws["apis"][0]["baseUrl"] = json!("ftp://upstream");
        assert_eq!(codes(&lint(ws)), vec!["E009"]);
    }

    #[test]
    fn test_malformed_conditions_are_warnings() {
        let mut ws = base();
        ws["rules"] = json!([{
            "id": "r1", "apiId": "a1", "priority": 0,
            "conditions": {"type": "OR", "conditions": [
                {"field": "body.amount", "operator": "between", "value": [1]},
                {"field": "query.tier", "operator": "in", "value": "gold"},
                {"field": "query.x", "operator": "regex", "value": ".*"}
            ]}
        }]);

        let result = lint(ws);
        assert!(result.is_valid());
        assert_eq!(codes(&result), vec!["W002", "W002", "W001"]);
    }

    #[test]
    fn test_dangling_references_and_duplicates() {
        let mut ws = base();
        ws["projects"][0]["shortId"] = json!("bad id");
        ws["rules"] = json!([
            {"id": "r1", "apiId": "missing", "priority": 0},
            {"id": "r1", "apiId": "a1", "priority": 0}
        ]);

        let found = codes(&lint(ws)).join(",");
        assert!(found.contains("E019"));
        assert!(found.contains("E005"));
        assert!(found.contains("E004"));
    }

    #[test]
    fn test_priority_ties_warn() {
        let mut ws = base();
        ws["rules"] = json!([
            {"id": "r1", "apiId": "a1", "priority": 1},
            {"id": "r2", "apiId": "a1", "priority": 1}
        ]);
        assert_eq!(codes(&lint(ws)), vec!["W003"]);
    }
}
