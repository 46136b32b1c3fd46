//! Per-agent engine state owned by the scheduler.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::rooms::{is_later, Message};

/// A processed message and the reply the agent posted for it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub message: Message,
    pub response: Option<Message>,
}

/// Everything the scheduler remembers between cycles.
///
/// Created empty at start and discarded at shutdown. Readers are public so
/// callers can inspect the state after a run; mutation stays inside the
/// interaction module.
#[derive(Debug, Default)]
pub struct EngineState {
    last_checked: HashMap<String, String>,
    last_response: HashMap<String, Instant>,
    message_cache: HashMap<String, Vec<Message>>,
    history: HashMap<String, Vec<HistoryEntry>>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watermark for `room_id`; empty when nothing has been processed.
    pub fn last_checked(&self, room_id: &str) -> &str {
        self.last_checked
            .get(room_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn last_response(&self, room_id: &str) -> Option<Instant> {
        self.last_response.get(room_id).copied()
    }

    pub fn cached_messages(&self, room_id: &str) -> &[Message] {
        self.message_cache
            .get(room_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn history(&self, room_id: &str) -> &[HistoryEntry] {
        self.history.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the room's history holds an entry for `message_id`.
    pub fn has_history_for(&self, room_id: &str, message_id: &str) -> bool {
        self.history(room_id)
            .iter()
            .any(|entry| entry.message.id == message_id)
    }

    /// Total replies recorded across all rooms.
    pub fn reply_count(&self) -> usize {
        self.history
            .values()
            .flatten()
            .filter(|entry| entry.response.is_some())
            .count()
    }

    /// Move the watermark forward. Returns `false` (and leaves it untouched)
    /// unless `timestamp` is strictly later than the stored value.
    pub(crate) fn advance_last_checked(&mut self, room_id: &str, timestamp: &str) -> bool {
        if !is_later(timestamp, self.last_checked(room_id)) {
            return false;
        }
        self.last_checked
            .insert(room_id.to_string(), timestamp.to_string());
        true
    }

    pub(crate) fn record_response_time(&mut self, room_id: &str, at: Instant) {
        self.last_response.insert(room_id.to_string(), at);
    }

    pub(crate) fn cache_messages(&mut self, room_id: &str, messages: Vec<Message>) {
        self.message_cache.insert(room_id.to_string(), messages);
    }

    pub(crate) fn record_processed(&mut self, room_id: &str, message: Message) {
        self.history
            .entry(room_id.to_string())
            .or_default()
            .push(HistoryEntry {
                message,
                response: None,
            });
    }

    /// Attach `reply` to the most recent history entry for `message_id`.
    pub(crate) fn attach_response(&mut self, room_id: &str, message_id: &str, reply: Message) {
        if let Some(entry) = self
            .history
            .get_mut(room_id)
            .and_then(|entries| entries.iter_mut().rev().find(|e| e.message.id == message_id))
        {
            entry.response = Some(reply);
        }
    }
}
