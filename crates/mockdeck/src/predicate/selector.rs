//! First-match rule selection.

use super::condition::group_matches;
use super::request::RequestContext;
use crate::model::MockRule;

/// Pick the first enabled rule, in ascending priority, whose conditions match.
///
/// Disabled rules are never returned. Equal priorities keep their stored
/// order. `None` means the API's defaults apply.
pub fn select_rule<'a>(rules: &'a [MockRule], ctx: &RequestContext) -> Option<&'a MockRule> {
    let mut candidates: Vec<&MockRule> = rules.iter().filter(|r| r.enabled).collect();
    candidates.sort_by_key(|r| r.priority);
    candidates
        .into_iter()
        .find(|rule| group_matches(&rule.conditions, ctx))
}
