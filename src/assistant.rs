//! Assistant facade
//!
//! Ties the context store, the memory store and a text backend together
//! into the operations platform adapters call. Whole turns for the same
//! user are serialized so a second message cannot compose its prompt from
//! history that is missing the first message's pending answer.
//!
//! ```text
//! handle_turn(scope, user, question)
//!   ├─ lock turn for user
//!   ├─ compose_prompt ─┬─ ContextStore::get_context_prompt(scope)
//!   │                  └─ MemoryStore::update_memory(user, question, now)
//!   ├─ TextGenerator::generate(prompt)        (may fail: nothing recorded)
//!   └─ record_answer(user, question, answer)
//! ```

use crate::backend::TextGenerator;
use crate::config::{ChattyConfig, SavePolicy};
use crate::context::ContextStore;
use crate::error::Result;
use crate::memory::{self, JsonFilePersistence, MemorySettings, MemoryStore};
use crate::prompt;
use std::collections::HashMap;
use std::sync::{Arc, MutexGuard};
use tokio::sync::Mutex;

type TurnLocks = std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Conversational core shared by every adapter
pub struct Assistant {
    memory: Arc<MemoryStore>,
    contexts: Arc<ContextStore>,
    backend: Arc<dyn TextGenerator>,
    save_policy: SavePolicy,
    /// Per-user turn locks, keyed by memory key
    turn_locks: TurnLocks,
}

impl Assistant {
    pub fn new(
        memory: Arc<MemoryStore>,
        contexts: Arc<ContextStore>,
        backend: Arc<dyn TextGenerator>,
        save_policy: SavePolicy,
    ) -> Self {
        Self {
            memory,
            contexts,
            backend,
            save_policy,
            turn_locks: TurnLocks::default(),
        }
    }

    /// Open both stores at the configured locations
    pub async fn open(config: &ChattyConfig, backend: Arc<dyn TextGenerator>) -> Result<Self> {
        let persistence = Arc::new(JsonFilePersistence::new(&config.storage.memory_file));
        let memory = MemoryStore::open(MemorySettings::from(&config.memory), persistence).await;
        let contexts = ContextStore::open(
            config.storage.context_file.clone(),
            config.storage.prompts_dir.clone(),
        )
        .await?;

        tracing::info!(
            "Assistant ready (backend: {}, save policy: {:?})",
            backend.name(),
            config.memory.save_policy
        );

        Ok(Self::new(
            Arc::new(memory),
            Arc::new(contexts),
            backend,
            config.memory.save_policy,
        ))
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn contexts(&self) -> &Arc<ContextStore> {
        &self.contexts
    }

    /// Build the full prompt for a new question.
    ///
    /// Registers the question with the memory store (lazy expiry and
    /// timestamp refresh happen here) and prepends the scope's context.
    pub async fn compose_prompt(
        &self,
        scope_name: &str,
        user_id: &str,
        question: &str,
        now: f64,
    ) -> String {
        let context = self.contexts.get_context_prompt(scope_name).await;
        let history = self.memory.update_memory(user_id, question, now).await;
        prompt::compose(&context, &history)
    }

    /// Store a completed exchange and flush per the save policy
    pub async fn record_answer(&self, user_id: &str, question: &str, answer: &str) {
        self.memory.append_exchange(user_id, question, answer).await;
        if self.save_policy == SavePolicy::EveryTurn {
            self.flush().await;
        }
    }

    /// Forget a user's history. Returns whether there was one.
    pub async fn reset_user(&self, user_id: &str) -> bool {
        let existed = self.memory.reset(user_id).await;
        tracing::info!("Memory reset for user {}", user_id);
        if existed && self.save_policy == SavePolicy::EveryTurn {
            self.flush().await;
        }
        existed
    }

    /// Map a scope to a context file under the prompts directory
    pub async fn admin_set_context(&self, scope_name: &str, filename: &str) -> bool {
        self.contexts.set_context_file(scope_name, filename).await
    }

    /// Remove a scope's context mapping. Returns whether one was removed.
    pub async fn admin_reset_context(&self, scope_name: &str) -> bool {
        self.contexts.reset_context(scope_name).await
    }

    /// Run one full turn: compose, generate, record.
    ///
    /// A backend failure is returned as-is and leaves the user's history
    /// exactly as it was before the call (apart from the refreshed
    /// activity timestamp). Dropping the returned future mid-turn is safe:
    /// nothing is recorded and the user's lock entry is released.
    pub async fn handle_turn(&self, scope_name: &str, user_id: &str, question: &str) -> Result<String> {
        let slot = self.turn_slot(user_id);
        let _turn = slot.lock.lock().await;

        let prompt = self
            .compose_prompt(scope_name, user_id, question, memory::unix_now())
            .await;
        tracing::debug!(
            "Processing prompt for user {} in scope '{}' (len={})",
            user_id,
            scope_name,
            prompt.len()
        );

        match self.backend.generate(&prompt).await {
            Ok(answer) => {
                self.record_answer(user_id, question, &answer).await;
                Ok(answer)
            }
            Err(e) => {
                tracing::warn!(
                    "Backend {} failed for user {}: {}",
                    self.backend.name(),
                    user_id,
                    e
                );
                Err(e)
            }
        }
    }

    /// Write the memory store; failures are logged and swallowed
    pub async fn flush(&self) {
        if let Err(e) = self.memory.save().await {
            tracing::error!("Failed to save memory: {}", e);
        }
    }

    /// Final flush at shutdown
    pub async fn close(&self) {
        self.flush().await;
        tracing::info!("Assistant closed ({} user(s) in memory)", self.memory.len().await);
    }

    fn turn_slot(&self, user_id: &str) -> TurnSlot<'_> {
        let lock = lock_map(&self.turn_locks)
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        TurnSlot {
            locks: &self.turn_locks,
            user_id: user_id.to_string(),
            lock,
        }
    }
}

fn lock_map(locks: &TurnLocks) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    // Poisoning cannot leave a half-updated entry
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A user's claim on their turn lock.
///
/// Dropping it, on completion or cancellation, removes the map entry once
/// no other turn holds or awaits the lock.
struct TurnSlot<'a> {
    locks: &'a TurnLocks,
    user_id: String,
    lock: Arc<Mutex<()>>,
}

impl Drop for TurnSlot<'_> {
    fn drop(&mut self) {
        let mut locks = lock_map(self.locks);
        // One reference in the map, one held here
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.user_id);
        }
    }
}
