use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use parley_core::{Message, Role};

/// Retention cap per conversation. Keeps prompt replay within the provider's
/// token budget.
pub const MAX_TRANSCRIPT_LEN: usize = 20;

/// One conversation is owned by exactly one (account, session) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub openid: String,
    pub session_id: i64,
}

impl ConversationKey {
    pub fn new(openid: impl Into<String>, session_id: i64) -> Self {
        Self { openid: openid.into(), session_id }
    }
}

/// Ordered transcript with bounded retention.
///
/// When an append would exceed the cap, the oldest messages are evicted
/// first, except that a leading system message is pinned: evicting the
/// behavior instruction would silently change the assistant's profile
/// mid-conversation.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        while self.messages.len() > MAX_TRANSCRIPT_LEN {
            let evict_at = if self.messages[0].role == Role::System { 1 } else { 0 };
            self.messages.remove(evict_at);
        }
    }
}

/// Process-lifetime conversation store.
///
/// Each key maps to an `Arc<tokio::sync::Mutex<Transcript>>`; a request
/// holds its conversation's lock across the whole load -> generate -> append
/// sequence, so concurrent requests on one conversation serialize while
/// distinct conversations never block each other. The outer map lock is held
/// only long enough to clone the entry.
///
/// The number of distinct keys is unbounded for the process lifetime; idle
/// conversations are only reclaimed by a restart.
pub struct ConversationStore {
    conversations: Mutex<HashMap<ConversationKey, Arc<tokio::sync::Mutex<Transcript>>>>,
    next_session_id: AtomicI64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            // Seeded from the epoch second so minted ids look like the ones
            // callers already store, but strictly increasing from there so
            // two requests in the same second cannot collide.
            next_session_id: AtomicI64::new(Utc::now().timestamp()),
        }
    }

    /// Mint a fresh session id for first contact.
    pub fn mint_id(&self) -> i64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Fetch (or create) the transcript handle for a key.
    pub fn entry(&self, key: &ConversationKey) -> Arc<tokio::sync::Mutex<Transcript>> {
        let mut conversations = self.conversations.lock().expect("conversation map poisoned");
        Arc::clone(conversations.entry(key.clone()).or_default())
    }

    /// Drop a key whose transcript never received a message, so failed
    /// first-contact requests do not accumulate map entries. The entry is
    /// kept whenever another request still holds its handle: the strong
    /// count tells us, since no new clone can be taken while the map is
    /// locked.
    pub fn discard_if_empty(&self, key: &ConversationKey) {
        let mut conversations = self.conversations.lock().expect("conversation map poisoned");
        let Some(entry) = conversations.get(key) else { return };
        if Arc::strong_count(entry) > 2 {
            return;
        }
        let empty = match entry.try_lock() {
            Ok(transcript) => transcript.is_empty(),
            Err(_) => false,
        };
        if empty {
            conversations.remove(key);
        }
    }

    /// Copy of a conversation's messages, empty if the key is unseen.
    pub async fn snapshot(&self, key: &ConversationKey) -> Vec<Message> {
        let entry = {
            let conversations = self.conversations.lock().expect("conversation map poisoned");
            conversations.get(key).cloned()
        };
        match entry {
            Some(transcript) => transcript.lock().await.messages().to_vec(),
            None => Vec::new(),
        }
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.lock().expect("conversation map poisoned").len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use parley_core::{Message, Role};

    use super::{ConversationKey, ConversationStore, Transcript, MAX_TRANSCRIPT_LEN};

    #[test]
    fn retention_keeps_only_the_newest_messages_in_order() {
        let mut transcript = Transcript::default();
        for n in 0..25 {
            transcript.push(Message::user(format!("turn-{n}")));
        }

        assert_eq!(transcript.len(), MAX_TRANSCRIPT_LEN);
        assert_eq!(transcript.messages()[0].content, "turn-5");
        assert_eq!(transcript.messages()[19].content, "turn-24");
    }

    #[test]
    fn retention_pins_the_system_message() {
        let mut transcript = Transcript::default();
        transcript.push(Message::system("behavior instruction"));
        for n in 0..24 {
            transcript.push(Message::user(format!("turn-{n}")));
        }

        assert_eq!(transcript.len(), MAX_TRANSCRIPT_LEN);
        assert_eq!(transcript.messages()[0].role, Role::System);
        assert_eq!(transcript.messages()[0].content, "behavior instruction");
        // The 19 newest non-system turns survive, oldest evicted first.
        assert_eq!(transcript.messages()[1].content, "turn-5");
        assert_eq!(transcript.messages()[19].content, "turn-23");
    }

    #[test]
    fn minted_ids_are_distinct_and_increasing() {
        let store = ConversationStore::new();
        let first = store.mint_id();
        let second = store.mint_id();
        let third = store.mint_id();

        assert!(first > 0);
        assert_eq!(second, first + 1);
        assert_eq!(third, second + 1);
    }

    #[tokio::test]
    async fn unseen_keys_snapshot_empty_without_creating_entries() {
        let store = ConversationStore::new();
        let key = ConversationKey::new("openid-1", 42);

        assert!(store.snapshot(&key).await.is_empty());
        assert_eq!(store.conversation_count(), 0);
    }

    #[tokio::test]
    async fn discard_reclaims_only_empty_entries() {
        let store = ConversationStore::new();
        let empty_key = ConversationKey::new("openid-1", 1);
        let used_key = ConversationKey::new("openid-1", 2);

        drop(store.entry(&empty_key));
        store.entry(&used_key).lock().await.push(Message::user("hello"));
        assert_eq!(store.conversation_count(), 2);

        store.discard_if_empty(&empty_key);
        store.discard_if_empty(&used_key);

        assert_eq!(store.conversation_count(), 1);
        assert_eq!(store.snapshot(&used_key).await.len(), 1);
    }

    #[tokio::test]
    async fn discard_leaves_entries_with_other_outstanding_handles() {
        let store = ConversationStore::new();
        let key = ConversationKey::new("openid-1", 1);

        let ours = store.entry(&key);
        let theirs = store.entry(&key);

        // Someone else still holds the handle, so the entry must survive.
        store.discard_if_empty(&key);
        assert_eq!(store.conversation_count(), 1);

        drop(theirs);
        store.discard_if_empty(&key);
        assert_eq!(store.conversation_count(), 0);
        drop(ours);
    }

    #[tokio::test]
    async fn distinct_keys_get_independent_transcripts() {
        let store = ConversationStore::new();
        let key_a = ConversationKey::new("openid-1", 1);
        let key_b = ConversationKey::new("openid-1", 2);

        store.entry(&key_a).lock().await.push(Message::user("hello"));
        store.entry(&key_b).lock().await.push(Message::user("goodbye"));

        assert_eq!(store.snapshot(&key_a).await.len(), 1);
        assert_eq!(store.snapshot(&key_b).await.len(), 1);
        assert_eq!(store.conversation_count(), 2);
    }
}
