//! Per-user conversational memory store
//!
//! Holds a bounded queue of recent exchanges for every user, expires idle
//! histories lazily on next access and snapshots the whole map through a
//! [`MemoryPersistence`] backend.
//!
//! Expiry is evaluated only inside [`MemoryStore::update_memory`]. A record
//! that is never touched again stays resident until the process restarts
//! or an optional `max_users` ceiling evicts it.

use super::persist::{MemoryPersistence, NullPersistence};
use super::types::{Exchange, MemorySnapshot, UserMemory};
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::prompt::{render_history, SpeakerLabels};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tunables for a memory store
#[derive(Debug, Clone)]
pub struct MemorySettings {
    /// Maximum exchanges kept per user (N)
    pub max_exchanges: usize,
    /// Idle seconds before a history is discarded
    pub timeout_secs: f64,
    /// Maximum resident users (0 = unlimited)
    pub max_users: usize,
    /// Labels used when rendering history
    pub labels: SpeakerLabels,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::from(&MemoryConfig::default())
    }
}

impl From<&MemoryConfig> for MemorySettings {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            max_exchanges: config.max_exchanges.max(1),
            timeout_secs: config.timeout_secs as f64,
            max_users: config.max_users,
            labels: SpeakerLabels::new(config.user_label.clone(), config.bot_label.clone()),
        }
    }
}

/// In-memory store of user histories
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, UserMemory>>>,
    settings: MemorySettings,
    persistence: Arc<dyn MemoryPersistence>,
}

impl MemoryStore {
    /// Create an empty store that never persists
    pub fn new(settings: MemorySettings) -> Self {
        Self::with_persistence(settings, Arc::new(NullPersistence))
    }

    /// Create an empty store backed by `persistence` without loading it
    pub fn with_persistence(
        settings: MemorySettings,
        persistence: Arc<dyn MemoryPersistence>,
    ) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            settings,
            persistence,
        }
    }

    /// Create a store and load its last snapshot.
    ///
    /// A missing or unreadable snapshot yields an empty store.
    pub async fn open(settings: MemorySettings, persistence: Arc<dyn MemoryPersistence>) -> Self {
        let store = Self::with_persistence(settings, persistence);
        store.load().await;
        store
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    /// Register a new question and render the history prompt for it.
    ///
    /// Discards the user's record first when it has been idle longer than
    /// the timeout, then stamps `last_activity = now`. The question itself
    /// is not stored; call [`MemoryStore::append_exchange`] once the answer
    /// is known.
    pub async fn update_memory(&self, user_id: &str, question: &str, now: f64) -> String {
        let mut users = self.users.write().await;

        let expired = users
            .get(user_id)
            .map(|record| record.is_expired(now, self.settings.timeout_secs))
            .unwrap_or(false);
        if expired {
            users.remove(user_id);
            tracing::debug!("Memory for user {} expired", user_id);
        }

        let record = Self::entry(&mut users, user_id, now, self.settings.max_users);
        record.last_activity = now;

        render_history(&record.exchanges, question, &self.settings.labels)
    }

    /// Append a completed exchange at the current time.
    ///
    /// See [`MemoryStore::append_exchange_at`].
    pub async fn append_exchange(&self, user_id: &str, question: &str, answer: &str) {
        self.append_exchange_at(user_id, question, answer, super::unix_now())
            .await;
    }

    /// Append a completed exchange, evicting the oldest one at capacity.
    ///
    /// Creates the record when absent. `last_activity` moves forward to
    /// `now` and never backwards, so a freshly appended exchange is never
    /// older than its record's timestamp.
    pub async fn append_exchange_at(
        &self,
        user_id: &str,
        question: &str,
        answer: &str,
        now: f64,
    ) {
        let mut users = self.users.write().await;
        let record = Self::entry(&mut users, user_id, now, self.settings.max_users);
        record.last_activity = record.last_activity.max(now);

        let evicted = record.push(Exchange::new(question, answer), self.settings.max_exchanges);
        if !evicted.is_empty() {
            tracing::debug!(
                "Dropped {} oldest exchange(s) for user {}",
                evicted.len(),
                user_id
            );
        }
    }

    /// Forget a user's history. Returns whether a record existed.
    pub async fn reset(&self, user_id: &str) -> bool {
        self.users.write().await.remove(user_id).is_some()
    }

    /// Copy of a user's record
    pub async fn snapshot(&self, user_id: &str) -> Option<UserMemory> {
        self.users.read().await.get(user_id).cloned()
    }

    /// Copy of the whole store
    pub async fn snapshot_all(&self) -> MemorySnapshot {
        self.users
            .read()
            .await
            .iter()
            .map(|(id, memory)| (id.clone(), memory.clone()))
            .collect()
    }

    /// Identities with a resident record, sorted
    pub async fn users(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.users.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Write the full store through the persistence backend
    pub async fn save(&self) -> Result<()> {
        let snapshot = self.snapshot_all().await;
        self.persistence.save(&snapshot).await?;
        tracing::debug!(
            "Saved memory for {} user(s) to {}",
            snapshot.len(),
            self.persistence.describe()
        );
        Ok(())
    }

    /// Replace the store contents with the persisted snapshot.
    ///
    /// Returns the number of users loaded. Read or parse failures are
    /// logged and leave the store empty.
    pub async fn load(&self) -> usize {
        let snapshot = match self.persistence.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    "Failed to load memory from {}, starting empty: {}",
                    self.persistence.describe(),
                    e
                );
                MemorySnapshot::new()
            }
        };

        let mut loaded = HashMap::with_capacity(snapshot.len());
        for (user_id, mut memory) in snapshot {
            memory.truncate_to(self.settings.max_exchanges);
            loaded.insert(user_id, memory);
        }

        let count = loaded.len();
        *self.users.write().await = loaded;
        tracing::info!(
            "Loaded memory for {} user(s) from {}",
            count,
            self.persistence.describe()
        );
        count
    }

    /// Get or create the record for `user_id`, evicting the least recently
    /// active user when a new record would exceed `max_users`.
    fn entry<'a>(
        users: &'a mut HashMap<String, UserMemory>,
        user_id: &str,
        now: f64,
        max_users: usize,
    ) -> &'a mut UserMemory {
        if !users.contains_key(user_id) && max_users > 0 && users.len() >= max_users {
            let idle = users
                .iter()
                .min_by(|a, b| a.1.last_activity.total_cmp(&b.1.last_activity))
                .map(|(id, _)| id.clone());
            if let Some(idle) = idle {
                users.remove(&idle);
                tracing::debug!("Evicted memory for least recently active user {}", idle);
            }
        }

        users
            .entry(user_id.to_string())
            .or_insert_with(|| UserMemory::new(now))
    }
}
