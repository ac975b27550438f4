//! Shared state behind both listeners.
//!
//! `MockEngine` owns the repository, the configuration snapshot cache, and
//! the outbound clients. Configuration writes go through the engine so the
//! snapshot is rebuilt after every change.

use crate::broadcast::Broadcaster;
use crate::callback::CallbackDispatcher;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::events::EventSink;
use crate::model::{MockCallback, MockRule, Notification, Workspace};
use crate::proxy::Forwarder;
use crate::store::{ConfigCache, InMemoryRepository, MockRepository, Snapshot};
use std::sync::Arc;
use tracing::info;

pub struct MockEngine {
    config: ServerConfig,
    repository: Arc<dyn MockRepository>,
    cache: ConfigCache,
    broadcaster: Arc<Broadcaster>,
    events: EventSink,
    forwarder: Forwarder,
    callbacks: CallbackDispatcher,
}

impl MockEngine {
    pub fn new(config: ServerConfig, repository: Arc<dyn MockRepository>) -> Result<Self> {
        let cache = ConfigCache::load(repository.as_ref(), config.callbacks.max_delay_ms)?;
        let broadcaster = Arc::new(Broadcaster::new(config.streams.buffer));
        let events = EventSink::new(Arc::clone(&repository), Arc::clone(&broadcaster));
        let forwarder = Forwarder::new(&config.proxy)?;
        let callbacks =
            CallbackDispatcher::new(&config.callbacks, config.logs.body_limit, events.clone())?;

        Ok(Self {
            config,
            repository,
            cache,
            broadcaster,
            events,
            forwarder,
            callbacks,
        })
    }

    /// In-memory engine seeded from `config.workspace`, if set.
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let workspace = match &config.workspace {
            Some(path) => {
                let workspace = Workspace::from_file(path)?;
                info!(
                    "Loaded workspace {}: {} projects, {} APIs, {} rules, {} callbacks",
                    path.display(),
                    workspace.projects.len(),
                    workspace.apis.len(),
                    workspace.rules.len(),
                    workspace.callbacks.len()
                );
                workspace
            }
            None => Workspace::default(),
        };
        let repository = InMemoryRepository::with_workspace(workspace, config.logs.capacity);
        Self::new(config, Arc::new(repository))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn MockRepository> {
        &self.repository
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    pub fn callbacks(&self) -> &CallbackDispatcher {
        &self.callbacks
    }

    /// Configuration as of the last write.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.cache.current()
    }

    pub fn refresh(&self) -> Result<()> {
        self.cache.refresh(self.repository.as_ref())
    }

    pub fn replace_workspace(&self, workspace: Workspace) -> Result<()> {
        self.repository.replace_workspace(workspace)?;
        self.refresh()
    }

    pub fn upsert_rule(&self, rule: MockRule) -> Result<MockRule> {
        let rule = self.repository.upsert_rule(rule)?;
        self.refresh()?;
        Ok(rule)
    }

    pub fn upsert_callback(&self, callback: MockCallback) -> Result<MockCallback> {
        let callback = self.repository.upsert_callback(callback)?;
        self.refresh()?;
        Ok(callback)
    }

    pub fn reorder_rules(&self, api_id: &str, ids: &[String]) -> Result<Vec<MockRule>> {
        let rules = self.repository.reorder_rules(api_id, ids)?;
        self.refresh()?;
        Ok(rules)
    }

    pub fn reorder_callbacks(&self, api_id: &str, ids: &[String]) -> Result<Vec<MockCallback>> {
        let callbacks = self.repository.reorder_callbacks(api_id, ids)?;
        self.refresh()?;
        Ok(callbacks)
    }

    /// Persist and push a notification.
    pub fn notify(&self, notification: Notification) {
        self.events.notify(notification);
    }
}
