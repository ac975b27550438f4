//! Live event fan-out to dashboard subscribers.
//!
//! Every subscriber owns a bounded queue of pre-encoded SSE frames.
//! Publishing never waits: a subscriber whose queue is full or closed is
//! dropped on the spot. A supervisor task sends heartbeats, which also
//! prunes subscribers that went away quietly.

mod stream;

use crate::metrics;
use crate::model::{ApiLog, Notification};
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use stream::EventStreamBody;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// API logs of one project.
    Project(String),
    /// Notifications addressed to one user.
    User(String),
}

impl Topic {
    fn kind(&self) -> &'static str {
        match self {
            Topic::Project(_) => "project",
            Topic::User(_) => "user",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    Connected,
    Heartbeat,
    ApiLog { data: ApiLog },
    Notification { data: Notification },
}

impl StreamEvent {
    /// One SSE message: `data: <json>\n\n`.
    pub fn to_frame(&self) -> Bytes {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Bytes::from(format!("data: {json}\n\n"))
    }
}

/// A registered subscriber's receiving end.
pub struct Subscription {
    pub id: u64,
    pub topic: Topic,
    pub receiver: mpsc::Receiver<Bytes>,
}

type Registry = HashMap<Topic, HashMap<u64, mpsc::Sender<Bytes>>>;

pub struct Broadcaster {
    subscribers: RwLock<Registry>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Broadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Register a subscriber; its queue starts with a `connected` event.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let _ = tx.try_send(StreamEvent::Connected.to_frame());

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut registry = self.subscribers.write();
            registry.entry(topic.clone()).or_default().insert(id, tx);
            update_gauge(&registry, topic.kind());
        }
        debug!("Subscriber {} connected to {:?}", id, topic);

        Subscription {
            id,
            topic,
            receiver: rx,
        }
    }

    /// Subscribe and wrap the queue as an SSE response body that
    /// unregisters itself when dropped.
    pub fn stream(self: &Arc<Self>, topic: Topic) -> EventStreamBody {
        EventStreamBody::new(self.subscribe(topic), Arc::downgrade(self))
    }

    pub fn unsubscribe(&self, topic: &Topic, id: u64) {
        let mut registry = self.subscribers.write();
        let removed = match registry.get_mut(topic) {
            Some(subscribers) => {
                let removed = subscribers.remove(&id).is_some();
                if subscribers.is_empty() {
                    registry.remove(topic);
                }
                removed
            }
            None => false,
        };
        if removed {
            update_gauge(&registry, topic.kind());
            debug!("Subscriber {} disconnected from {:?}", id, topic);
        }
    }

    /// Queue `event` for every subscriber of `topic`. Returns the number of
    /// subscribers that accepted it.
    pub fn publish(&self, topic: &Topic, event: &StreamEvent) -> usize {
        let frame = event.to_frame();
        let mut delivered = 0;
        let mut dropped = Vec::new();
        {
            let registry = self.subscribers.read();
            let Some(subscribers) = registry.get(topic) else {
                return 0;
            };
            for (id, tx) in subscribers {
                match tx.try_send(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => dropped.push((*id, "full")),
                    Err(TrySendError::Closed(_)) => dropped.push((*id, "closed")),
                }
            }
        }
        if !dropped.is_empty() {
            self.prune(topic, &dropped);
        }
        delivered
    }

    /// Send a heartbeat to everyone.
    pub fn heartbeat(&self) {
        let topics: Vec<Topic> = self.subscribers.read().keys().cloned().collect();
        for topic in topics {
            self.publish(&topic, &StreamEvent::Heartbeat);
        }
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers.read().get(topic).map_or(0, HashMap::len)
    }

    /// Emit heartbeats every `interval` until the broadcaster is dropped.
    pub fn spawn_supervisor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(broadcaster) => broadcaster.heartbeat(),
                    None => break,
                }
            }
        })
    }

    fn prune(&self, topic: &Topic, dropped: &[(u64, &'static str)]) {
        let mut registry = self.subscribers.write();
        if let Some(subscribers) = registry.get_mut(topic) {
            for (id, reason) in dropped {
                if subscribers.remove(id).is_some() {
                    metrics::record_stream_drop(reason);
                    if *reason == "full" {
                        warn!("Dropping slow subscriber {} on {:?}", id, topic);
                    }
                }
            }
            if subscribers.is_empty() {
                registry.remove(topic);
            }
        }
        update_gauge(&registry, topic.kind());
    }
}

fn update_gauge(registry: &Registry, kind: &str) {
    let count = registry
        .iter()
        .filter(|(topic, _)| topic.kind() == kind)
        .map(|(_, subscribers)| subscribers.len())
        .sum();
    metrics::set_subscribers(kind, count);
}
