use super::MockRepository;
use crate::error::Result;
use crate::model::{MockApi, MockCallback, MockRule, Project, ProxyMode, Workspace};
use crate::predicate::extract_path_params;
use mockdeck_lint::limits::{MAX_CALLBACKS_PER_API, MAX_CONDITIONS_PER_RULE, MAX_RULES_PER_API};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable view of the configuration used to serve requests.
///
/// Rules and callbacks are enabled-only, ordered, and capped; callback
/// delays are clamped.
#[derive(Debug, Default)]
pub struct Snapshot {
    projects: HashMap<String, Project>,
    short_ids: HashMap<String, String>,
    apis: HashMap<String, Vec<MockApi>>,
    rules: HashMap<String, Vec<MockRule>>,
    callbacks: HashMap<String, Vec<MockCallback>>,
}

/// A mock API resolved from an inbound path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub project: &'a Project,
    pub api: &'a MockApi,
    /// Path below the project prefix.
    pub mock_path: String,
    pub path_params: HashMap<String, String>,
    /// Path beyond the API's pattern; empty on an exact match.
    pub remainder: String,
}

impl Snapshot {
    pub fn from_repository(repo: &dyn MockRepository, max_callback_delay_ms: u64) -> Result<Self> {
        let workspace = repo.workspace()?;
        let mut snapshot = Self::index(&workspace);

        for api in workspace.apis.iter().filter(|a| a.enabled) {
            let mut rules = repo.enabled_rules(&api.id)?;
            if rules.len() > MAX_RULES_PER_API {
                warn!(
                    "Mock API {} has {} enabled rules; only the first {} are used",
                    api.id,
                    rules.len(),
                    MAX_RULES_PER_API
                );
                rules.truncate(MAX_RULES_PER_API);
            }
            for rule in &mut rules {
                if rule.conditions.conditions.len() > MAX_CONDITIONS_PER_RULE {
                    warn!(
                        "Rule {} has {} conditions; only the first {} are evaluated",
                        rule.id,
                        rule.conditions.conditions.len(),
                        MAX_CONDITIONS_PER_RULE
                    );
                    rule.conditions.conditions.truncate(MAX_CONDITIONS_PER_RULE);
                }
            }

            let mut callbacks = repo.enabled_callbacks(&api.id)?;
            if callbacks.len() > MAX_CALLBACKS_PER_API {
                warn!(
                    "Mock API {} has {} enabled callbacks; only the first {} fire",
                    api.id,
                    callbacks.len(),
                    MAX_CALLBACKS_PER_API
                );
                callbacks.truncate(MAX_CALLBACKS_PER_API);
            }
            for callback in &mut callbacks {
                callback.delay = callback.delay.min(max_callback_delay_ms);
            }

            snapshot.rules.insert(api.id.clone(), rules);
            snapshot.callbacks.insert(api.id.clone(), callbacks);
        }

        debug!(
            "Configuration snapshot built: {} projects, {} APIs",
            snapshot.projects.len(),
            snapshot.apis.values().map(Vec::len).sum::<usize>()
        );
        Ok(snapshot)
    }

    fn index(workspace: &Workspace) -> Self {
        let mut snapshot = Self::default();
        for project in &workspace.projects {
            snapshot
                .short_ids
                .insert(project.short_id.clone(), project.id.clone());
            snapshot.projects.insert(project.id.clone(), project.clone());
        }
        for api in workspace.apis.iter().filter(|a| a.enabled) {
            snapshot
                .apis
                .entry(api.project_id.clone())
                .or_default()
                .push(api.clone());
        }
        snapshot
    }

    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.projects.get(project_id)
    }

    pub fn api(&self, api_id: &str) -> Option<&MockApi> {
        self.apis.values().flatten().find(|a| a.id == api_id)
    }

    pub fn rules(&self, api_id: &str) -> &[MockRule] {
        self.rules.get(api_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn callbacks(&self, api_id: &str) -> &[MockCallback] {
        self.callbacks
            .get(api_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve `/{shortId}/{mockPath}` to a mock API.
    ///
    /// Exact pattern matches win, preferring fewer path parameters and then
    /// a concrete method over `ANY`. Failing that, a PROXY or AUTO API whose
    /// pattern is a prefix of the path matches, longest pattern first.
    pub fn lookup(&self, method: &str, path: &str) -> Option<RouteMatch<'_>> {
        let trimmed = path.trim_start_matches('/');
        let (short_id, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        let project = self.projects.get(self.short_ids.get(short_id)?)?;
        let mock_path = format!("/{rest}");
        let candidates = self.apis.get(&project.id)?;

        let exact = candidates
            .iter()
            .filter(|api| api.accepts_method(method))
            .filter_map(|api| extract_path_params(&api.path, &mock_path).map(|p| (api, p)))
            .min_by_key(|(api, params)| (params.len(), is_any_method(api)));
        if let Some((api, path_params)) = exact {
            return Some(RouteMatch {
                project,
                api,
                mock_path,
                path_params,
                remainder: String::new(),
            });
        }

        candidates
            .iter()
            .filter(|api| api.proxy_mode != ProxyMode::Mock && api.accepts_method(method))
            .filter_map(|api| match_prefix(&api.path, &mock_path).map(|m| (api, m)))
            .max_by_key(|(api, _)| pattern_len(&api.path))
            .map(|(api, (path_params, remainder))| RouteMatch {
                project,
                api,
                mock_path,
                path_params,
                remainder,
            })
    }
}

fn is_any_method(api: &MockApi) -> bool {
    api.method.eq_ignore_ascii_case("ANY") || api.method == "*"
}

fn pattern_len(pattern: &str) -> usize {
    pattern.split('/').filter(|s| !s.is_empty()).count()
}

fn match_prefix(pattern: &str, path: &str) -> Option<(HashMap<String, String>, String)> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if pattern_parts.len() > path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(name) = pattern_part.strip_prefix(':') {
            let decoded = urlencoding::decode(path_part).unwrap_or_default().to_string();
            params.insert(name.to_string(), decoded);
        } else if pattern_part != path_part {
            return None;
        }
    }

    let rest = &path_parts[pattern_parts.len()..];
    let remainder = if rest.is_empty() {
        String::new()
    } else {
        format!("/{}", rest.join("/"))
    };
    Some((params, remainder))
}

/// Holds the current [`Snapshot`]; swapped whole after configuration writes.
pub struct ConfigCache {
    current: RwLock<Arc<Snapshot>>,
    max_callback_delay_ms: u64,
}

impl ConfigCache {
    pub fn load(repo: &dyn MockRepository, max_callback_delay_ms: u64) -> Result<Self> {
        let snapshot = Snapshot::from_repository(repo, max_callback_delay_ms)?;
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
            max_callback_delay_ms,
        })
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Rebuild from the repository. On error the previous snapshot stays.
    pub fn refresh(&self, repo: &dyn MockRepository) -> Result<()> {
        let snapshot = Snapshot::from_repository(repo, self.max_callback_delay_ms)?;
        *self.current.write() = Arc::new(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRepository;
    use serde_json::json;

    fn workspace() -> Workspace {
        serde_json::from_value(json!({
            "projects": [{"id": "p1", "shortId": "shop", "ownerId": "u1"}],
            "apis": [
                {"id": "a-users", "projectId": "p1", "path": "/users"},
                {"id": "a-user", "projectId": "p1", "path": "/users/:id"},
                {"id": "a-me", "projectId": "p1", "path": "/users/me", "method": "ANY"},
                {"id": "a-post", "projectId": "p1", "path": "/users", "method": "POST"},
                {"id": "a-off", "projectId": "p1", "path": "/off", "enabled": false},
                {"id": "a-proxy", "projectId": "p1", "path": "/legacy", "method": "ANY",
                 "proxyMode": "PROXY", "baseUrl": "http://upstream"},
                {"id": "a-mock-prefix", "projectId": "p1", "path": "/static"}
            ],
            "rules": [
                {"id": "r-b", "apiId": "a-users", "priority": 2},
                {"id": "r-a", "apiId": "a-users", "priority": 1},
                {"id": "r-off", "apiId": "a-users", "priority": 0, "enabled": false}
            ],
            "callbacks": [
                {"id": "c1", "apiId": "a-users", "url": "http://hook", "delay": 120000}
            ]
        }))
        .unwrap()
    }

    fn snapshot() -> Snapshot {
        let repo = InMemoryRepository::with_workspace(workspace(), 10);
        Snapshot::from_repository(&repo, 60_000).unwrap()
    }

    #[test]
    fn test_exact_lookup_prefers_literal_segments() {
        let snap = snapshot();

        let m = snap.lookup("GET", "/shop/users/me").unwrap();
        assert_eq!(m.api.id, "a-me");
        assert!(m.path_params.is_empty());

        let m = snap.lookup("GET", "/shop/users/42").unwrap();
        assert_eq!(m.api.id, "a-user");
        assert_eq!(m.path_params.get("id").map(String::as_str), Some("42"));
        assert_eq!(m.mock_path, "/users/42");

        assert_eq!(snap.lookup("POST", "/shop/users").unwrap().api.id, "a-post");
        assert_eq!(snap.lookup("get", "/shop/users/").unwrap().api.id, "a-users");
    }

    #[test]
    fn test_lookup_misses() {
        let snap = snapshot();
        assert!(snap.lookup("GET", "/nope/users").is_none());
        assert!(snap.lookup("GET", "/shop/off").is_none());
        assert!(snap.lookup("DELETE", "/shop/users").is_none());
        assert!(snap.lookup("GET", "/shop/static/app.js").is_none());
    }

    #[test]
    fn test_prefix_lookup_for_proxied_api() {
        let snap = snapshot();
        let m = snap.lookup("PATCH", "/shop/legacy/v1/items").unwrap();
        assert_eq!(m.api.id, "a-proxy");
        assert_eq!(m.remainder, "/v1/items");

        let m = snap.lookup("GET", "/shop/legacy").unwrap();
        assert_eq!(m.remainder, "");
    }

    #[test]
    fn test_rules_enabled_and_ordered() {
        let snap = snapshot();
        let ids: Vec<&str> = snap.rules("a-users").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r-a", "r-b"]);
        assert!(snap.rules("a-user").is_empty());
    }

    #[test]
    fn test_callback_delay_clamped() {
        let snap = snapshot();
        assert_eq!(snap.callbacks("a-users")[0].delay, 60_000);
    }

    #[test]
    fn test_cache_refresh_swaps_snapshot() {
        let repo = InMemoryRepository::new(10);
        let cache = ConfigCache::load(&repo, 60_000).unwrap();
        let before = cache.current();
        assert!(before.lookup("GET", "/shop/users").is_none());

        repo.replace_workspace(workspace()).unwrap();
        cache.refresh(&repo).unwrap();

        assert!(cache.current().lookup("GET", "/shop/users").is_some());
        // Readers holding the old snapshot are unaffected.
        assert!(before.lookup("GET", "/shop/users").is_none());
    }
}
