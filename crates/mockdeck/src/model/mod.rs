//! Configuration entities and log records.

mod api;
mod callback;
mod log;
mod rule;
mod workspace;

pub use api::{is_empty_body, MockApi, Project, ProxyMode};
pub use callback::MockCallback;
pub use log::{
    new_id, snippet, ApiLog, CallbackLog, CapturedRequest, CapturedResponse, Notification,
    NotificationKind,
};
pub use rule::{ConditionGroup, ConditionOp, GroupType, MockRule, RuleCondition};
pub use workspace::Workspace;
