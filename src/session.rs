//! # Conversation Store
//!
//! Thread-safe per-sender dialogue state, keyed by the sender id.
//!
//! Each sender gets an `Arc<tokio::sync::Mutex<DialogueState>>` cell. The
//! webhook handler holds the sender's lock across the whole step, including
//! collaborator I/O, so concurrent deliveries for the same sender serialize
//! and a rapid double-send cannot lose a phase transition. Deliveries for
//! different senders proceed independently.
//!
//! State lives only for the process lifetime; a restart returns every sender
//! to `Idle`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::dialogue::DialogueState;

/// Process-wide mapping from sender id to that sender's dialogue state.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<DialogueState>>>>,
}

impl SessionStore {
    /// Create an empty store. Cells are created on first contact per sender.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the state cell for a sender.
    ///
    /// The outer map lock is only held for the lookup; callers then await the
    /// returned cell's own lock for the duration of their dialogue step.
    pub fn entry(&self, sender: &str) -> Arc<tokio::sync::Mutex<DialogueState>> {
        let mut sessions = self.sessions.lock().unwrap();
        Arc::clone(
            sessions
                .entry(sender.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(DialogueState::Idle))),
        )
    }

    /// Number of senders the store currently tracks.
    pub fn session_count(&self) -> usize {
        let sessions = self.sessions.lock().unwrap();
        sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_sender_starts_idle() {
        let store = SessionStore::new();
        let cell = store.entry("whatsapp:+15551234567");
        assert_eq!(*cell.lock().await, DialogueState::Idle);
    }

    #[tokio::test]
    async fn test_same_sender_shares_one_cell() {
        let store = SessionStore::new();
        let first = store.entry("whatsapp:+15551234567");
        *first.lock().await = DialogueState::AwaitingListingDetails;

        let second = store.entry("whatsapp:+15551234567");
        assert_eq!(*second.lock().await, DialogueState::AwaitingListingDetails);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_senders_are_isolated() {
        let store = SessionStore::new();
        let a = store.entry("whatsapp:+15551111111");
        let b = store.entry("whatsapp:+15552222222");

        *a.lock().await = DialogueState::AwaitingDeleteKeyword;
        assert_eq!(*b.lock().await, DialogueState::Idle);
        assert_eq!(store.session_count(), 2);
    }

    #[tokio::test]
    async fn test_cell_serializes_same_sender_steps() {
        let store = Arc::new(SessionStore::new());
        let cell = store.entry("whatsapp:+15551234567");

        // Hold the lock as a webhook step would, then let a second task in.
        let guard = cell.lock().await;
        let contender = {
            let cell = Arc::clone(&cell);
            tokio::spawn(async move {
                let mut state = cell.lock().await;
                *state = DialogueState::AwaitingListingDetails;
            })
        };
        assert!(!contender.is_finished());
        drop(guard);

        contender.await.unwrap();
        assert_eq!(
            *store.entry("whatsapp:+15551234567").lock().await,
            DialogueState::AwaitingListingDetails
        );
    }
}
