//! Room, message and identity types as exchanged with the room gateway.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Who an agent is to the room gateway (`ModelInfo` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub username: String,
    pub model: String,
}

impl AgentIdentity {
    pub fn new(username: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            model: model.into(),
        }
    }
}

/// A topic-tagged conversation channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Unique by username; later duplicates on the wire are dropped.
    #[serde(default, deserialize_with = "unique_participants")]
    pub participants: Vec<AgentIdentity>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub message_count: u64,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            topic: topic.into(),
            tags: BTreeSet::new(),
            participants: Vec::new(),
            created_at: String::new(),
            message_count: 0,
        }
    }

    /// Participants are unique by username.
    pub fn has_participant(&self, username: &str) -> bool {
        self.participants.iter().any(|p| p.username == username)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// The room name, or its id when the gateway sent no name.
    pub fn name_or_id(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

fn unique_participants<'de, D>(deserializer: D) -> Result<Vec<AgentIdentity>, D::Error>
where
    D: Deserializer<'de>,
{
    let listed = Vec::<AgentIdentity>::deserialize(deserializer)?;
    let mut seen = HashSet::new();
    Ok(listed
        .into_iter()
        .filter(|p| seen.insert(p.username.clone()))
        .collect())
}

/// A single chat message. Immutable once created by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: AgentIdentity,
    /// ISO-8601 creation time as issued by the gateway.
    pub timestamp: String,
    #[serde(default)]
    pub room_id: String,
}

impl Message {
    /// Whether this message was written by `username`.
    pub fn is_from(&self, username: &str) -> bool {
        self.sender.username == username
    }

    /// Case-insensitive `@username` mention.
    pub fn mentions(&self, username: &str) -> bool {
        let needle = format!("@{}", username.to_lowercase());
        self.content.to_lowercase().contains(&needle)
    }

    /// Case-insensitive substring match on the room topic. An empty topic
    /// never matches.
    pub fn mentions_topic(&self, topic: &str) -> bool {
        let topic = topic.trim();
        !topic.is_empty()
            && self
                .content
                .to_lowercase()
                .contains(&topic.to_lowercase())
    }
}

/// Order two gateway timestamps.
///
/// Compares as instants when both parse as RFC 3339, otherwise falls back to
/// plain string order (so the empty string sorts before any timestamp).
pub fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// `true` when `candidate` is strictly later than `reference`.
pub fn is_later(candidate: &str, reference: &str) -> bool {
    compare_timestamps(candidate, reference) == Ordering::Greater
}

// ============================================================================
// Wire envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct RoomsEnvelope {
    #[serde(default)]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryEnvelope {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageEnvelope {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomEnvelope {
    pub room: Room,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageBody<'a> {
    pub content: &'a str,
    pub sender: &'a AgentIdentity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JoinRoomBody<'a> {
    pub model_info: &'a AgentIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str, sender: &str) -> Message {
        Message {
            id: "m1".to_string(),
            content: content.to_string(),
            sender: AgentIdentity::new(sender, "gpt-4o"),
            timestamp: "2024-05-01T10:00:00.000Z".to_string(),
            room_id: "general".to_string(),
        }
    }

    #[test]
    fn test_mentions_case_insensitive() {
        let msg = message("hello @Agent-1, thoughts?", "agent-2");
        assert!(msg.mentions("agent-1"));
        assert!(msg.mentions("AGENT-1"));
        assert!(!msg.mentions("agent-3"));
    }

    #[test]
    fn test_mention_requires_at_sign() {
        let msg = message("agent-1 is here", "agent-2");
        assert!(!msg.mentions("agent-1"));
    }

    #[test]
    fn test_mentions_topic() {
        let msg = message("Anyone TESTING the new build?", "agent-2");
        assert!(msg.mentions_topic("testing"));
        assert!(!msg.mentions_topic("deployment"));
        assert!(!msg.mentions_topic(""));
        assert!(!msg.mentions_topic("   "));
    }

    #[test]
    fn test_is_from() {
        let msg = message("hi", "agent-2");
        assert!(msg.is_from("agent-2"));
        assert!(!msg.is_from("agent-1"));
    }

    #[test]
    fn test_compare_timestamps_parsed() {
        // Different offsets, same instant ordering.
        assert!(is_later(
            "2024-05-01T10:00:01Z",
            "2024-05-01T12:00:00+02:00"
        ));
        assert_eq!(
            compare_timestamps("2024-05-01T10:00:00Z", "2024-05-01T12:00:00+02:00"),
            Ordering::Equal
        );
    }

    #[test]
    fn test_empty_timestamp_sorts_first() {
        assert!(is_later("2024-05-01T10:00:00Z", ""));
        assert!(!is_later("", "2024-05-01T10:00:00Z"));
        assert!(!is_later("", ""));
    }

    #[test]
    fn test_room_deserializes_wire_format() {
        let json = r#"{
            "id": "general",
            "name": "General",
            "topic": "testing",
            "tags": ["ai", "test", "ai"],
            "participants": [{"username": "agent-2", "model": "claude"}],
            "createdAt": "2024-05-01T09:00:00.000Z",
            "messageCount": 12
        }"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert_eq!(room.tags.len(), 2);
        assert!(room.has_tag("ai"));
        assert!(room.has_participant("agent-2"));
        assert_eq!(room.message_count, 12);
        assert_eq!(room.created_at, "2024-05-01T09:00:00.000Z");
    }

    #[test]
    fn test_room_participants_unique_by_username() {
        let json = r#"{
            "id": "general",
            "participants": [
                {"username": "agent-2", "model": "claude"},
                {"username": "agent-3", "model": "gpt-4o"},
                {"username": "agent-2", "model": "llama"}
            ]
        }"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert_eq!(room.participants.len(), 2);
        assert_eq!(room.participants[0].model, "claude");
        assert_eq!(room.participants[1].username, "agent-3");
    }

    #[test]
    fn test_message_deserializes_wire_format() {
        let json = r#"{
            "id": "abc",
            "content": "hello",
            "sender": {"username": "agent-2", "model": "claude"},
            "timestamp": "2024-05-01T10:00:00.000Z",
            "roomId": "general"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.room_id, "general");
        assert_eq!(msg.sender.username, "agent-2");
    }

    #[test]
    fn test_join_body_uses_model_info_key() {
        let identity = AgentIdentity::new("agent-1", "gpt-4o");
        let body = serde_json::to_value(JoinRoomBody {
            model_info: &identity,
        })
        .unwrap();
        assert_eq!(body["modelInfo"]["username"], "agent-1");
    }
}
