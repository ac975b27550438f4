//! Business limits shared by the linter and the server.

/// Maximum number of rules attached to one mock API.
pub const MAX_RULES_PER_API: usize = 5;

/// Maximum number of conditions inside one rule's condition group.
pub const MAX_CONDITIONS_PER_RULE: usize = 5;

/// Maximum number of callbacks attached to one mock API.
pub const MAX_CALLBACKS_PER_API: usize = 10;

/// Upper bound for a callback's delay, in milliseconds.
pub const MAX_CALLBACK_DELAY_MS: u64 = 60_000;
