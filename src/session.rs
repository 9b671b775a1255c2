//! Session store: user id to pairing-session topic
//!
//! A process-local keyed map. Each user maps to at most one topic at a
//! time: setting overwrites, deleting is idempotent. No transactional
//! semantics beyond single-key atomicity; a same-user race resolves
//! last-write-wins.

use std::collections::HashMap;
use tokio::sync::RwLock;

/// UserId → SessionTopic mapping
#[derive(Default)]
pub struct SessionStore {
    topics: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the topic for a user, overwriting any previous entry
    pub async fn set_topic(&self, user: &str, topic: &str) {
        let mut topics = self.topics.write().await;
        topics.insert(user.to_string(), topic.to_string());
    }

    /// Current topic for a user, if any
    pub async fn get_topic(&self, user: &str) -> Option<String> {
        let topics = self.topics.read().await;
        topics.get(user).cloned()
    }

    /// Remove a user's entry; no-op when absent
    pub async fn delete_topic(&self, user: &str) {
        let mut topics = self.topics.write().await;
        topics.remove(user);
    }

    /// Number of tracked mappings
    pub async fn len(&self) -> usize {
        let topics = self.topics.read().await;
        topics.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
