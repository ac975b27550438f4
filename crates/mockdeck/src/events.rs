//! Persisting records and pushing them to live subscribers.

use crate::broadcast::{Broadcaster, StreamEvent, Topic};
use crate::model::{ApiLog, CallbackLog, Notification};
use crate::store::MockRepository;
use std::sync::Arc;
use tracing::warn;

/// Write-then-publish for every append-only record.
///
/// Repository failures are logged and swallowed; they never reach the
/// request that produced the record.
#[derive(Clone)]
pub struct EventSink {
    repository: Arc<dyn MockRepository>,
    broadcaster: Arc<Broadcaster>,
}

impl EventSink {
    pub fn new(repository: Arc<dyn MockRepository>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            repository,
            broadcaster,
        }
    }

    pub fn api_log(&self, log: ApiLog) {
        let topic = Topic::Project(log.project_id.clone());
        if let Err(e) = self.repository.append_api_log(log.clone()) {
            warn!("Failed to store API log {}: {}", log.id, e);
        }
        self.broadcaster
            .publish(&topic, &StreamEvent::ApiLog { data: log });
    }

    pub fn callback_log(&self, log: CallbackLog) {
        let id = log.id.clone();
        if let Err(e) = self.repository.append_callback_log(log) {
            warn!("Failed to store callback log {}: {}", id, e);
        }
    }

    pub fn notify(&self, notification: Notification) {
        let topic = Topic::User(notification.user_id.clone());
        if let Err(e) = self.repository.append_notification(notification.clone()) {
            warn!("Failed to store notification {}: {}", notification.id, e);
        }
        self.broadcaster.publish(
            &topic,
            &StreamEvent::Notification {
                data: notification,
            },
        );
    }
}
