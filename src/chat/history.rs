use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::chat::llm::PromptMessage;

/// Recent turns of one conversation, kept in memory to avoid re-reading the database.
#[derive(Debug, Clone)]
struct CachedConversation {
    messages: VecDeque<PromptMessage>,
    last_activity: Instant,
}

/// In-memory conversation context keyed by (user id, conversation id).
///
/// Entries hold at most `limit` messages and are dropped by [`sweep`](Self::sweep)
/// once idle for longer than `ttl`. There is no other eviction.
pub struct ConversationCache {
    entries: HashMap<(String, String), CachedConversation>,
    limit: usize,
    ttl: Duration,
}

impl ConversationCache {
    pub fn new(limit: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            limit: limit.max(1),
            ttl,
        }
    }

    /// Cached turns for a conversation, oldest first.
    pub fn get(&self, user_id: &str, conversation_id: &str) -> Option<Vec<PromptMessage>> {
        self.entries
            .get(&key(user_id, conversation_id))
            .map(|c| c.messages.iter().cloned().collect())
    }

    /// Append turns, creating the entry if needed, and trim to the newest `limit`.
    pub fn append(
        &mut self,
        user_id: &str,
        conversation_id: &str,
        messages: impl IntoIterator<Item = PromptMessage>,
        now: Instant,
    ) {
        let entry = self
            .entries
            .entry(key(user_id, conversation_id))
            .or_insert_with(|| CachedConversation {
                messages: VecDeque::new(),
                last_activity: now,
            });

        entry.messages.extend(messages);
        while entry.messages.len() > self.limit {
            entry.messages.pop_front();
        }
        entry.last_activity = now;
    }

    pub fn remove(&mut self, user_id: &str, conversation_id: &str) -> bool {
        self.entries
            .remove(&key(user_id, conversation_id))
            .is_some()
    }

    /// Drop conversations idle for longer than the TTL. Returns how many were removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, c| now.saturating_duration_since(c.last_activity) <= ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Current instant as seen by the tokio clock, so paused test time applies.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

fn key(user_id: &str, conversation_id: &str) -> (String, String) {
    (user_id.to_string(), conversation_id.to_string())
}

/// Periodically sweep idle conversations out of the cache.
pub fn spawn_sweeper(cache: Arc<Mutex<ConversationCache>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let (removed, remaining) = {
                let mut cache = cache.lock().await;
                let removed = cache.sweep(now());
                (removed, cache.len())
            };
            if removed > 0 {
                tracing::info!(
                    "Swept {} idle conversations from cache ({} remaining)",
                    removed,
                    remaining
                );
            }
        }
    })
}
