use crate::models::chat::ChatMessage;
use log::{ debug, info };
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{ Mutex, OwnedMutexGuard, RwLock };

pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Process-lifetime conversation histories keyed by conversation id.
///
/// Every conversation sits behind its own async mutex. A turn holds the lock from the
/// user append to the assistant append, so turns within one conversation never
/// interleave while separate conversations proceed concurrently.
#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Mutex<Vec<ChatMessage>>>>>,
}

/// Exclusive access to one conversation for the duration of a turn.
pub struct ConversationGuard {
    messages: OwnedMutexGuard<Vec<ChatMessage>>,
}

impl ConversationGuard {
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, conversation_id: &str) -> Arc<Mutex<Vec<ChatMessage>>> {
        if let Some(existing) = self.conversations.read().await.get(conversation_id) {
            return Arc::clone(existing);
        }
        let mut conversations = self.conversations.write().await;
        let entry = conversations.entry(conversation_id.to_string()).or_insert_with(|| {
            debug!("Opening conversation '{}'", conversation_id);
            Arc::new(Mutex::new(Vec::new()))
        });
        Arc::clone(entry)
    }

    /// Waits for any in-flight turn on `conversation_id` and locks the conversation.
    pub async fn lock(&self, conversation_id: &str) -> ConversationGuard {
        let entry = self.entry(conversation_id).await;
        ConversationGuard {
            messages: entry.lock_owned().await,
        }
    }

    pub async fn append(&self, conversation_id: &str, message: ChatMessage) {
        self.lock(conversation_id).await.append(message);
    }

    async fn existing(&self, conversation_id: &str) -> Option<Arc<Mutex<Vec<ChatMessage>>>> {
        self.conversations.read().await.get(conversation_id).map(Arc::clone)
    }

    /// History of `conversation_id`; unknown ids read as empty without being recorded.
    pub async fn snapshot(&self, conversation_id: &str) -> Vec<ChatMessage> {
        match self.existing(conversation_id).await {
            Some(entry) => entry.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Waits for any in-flight turn, clears the history and drops the entry once
    /// nothing else holds it.
    pub async fn reset(&self, conversation_id: &str) {
        let Some(entry) = self.existing(conversation_id).await else {
            debug!("Reset of unknown conversation '{}' ignored", conversation_id);
            return;
        };

        let cleared = {
            let mut messages = entry.lock().await;
            let cleared = messages.len();
            messages.clear();
            cleared
        };

        let mut conversations = self.conversations.write().await;
        // Map plus `entry`; a waiting turn holds a third reference.
        let idle = Arc::strong_count(&entry) == 2 &&
            entry.try_lock().map(|messages| messages.is_empty()).unwrap_or(false);
        if idle {
            conversations.remove(conversation_id);
        }
        info!("Conversation '{}' reset ({} messages cleared)", conversation_id, cleared);
    }
}
