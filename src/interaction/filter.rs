//! Candidate selection: which fetched message, if any, the agent considers.

use std::cmp::Ordering;
use std::time::Duration;

use tokio::time::Instant;

use crate::rooms::{compare_timestamps, is_later, Message, Room};

use super::state::EngineState;

/// Decides whether a message is worth a verdict.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    username: String,
    min_response_interval: Duration,
}

impl CandidateFilter {
    pub fn new(username: impl Into<String>, min_response_interval: Duration) -> Self {
        Self {
            username: username.into(),
            min_response_interval,
        }
    }

    /// A message is a candidate when all of these hold:
    /// - it was not sent by this agent
    /// - it is newer than the room watermark
    /// - the agent has not replied in the room within the minimum interval
    /// - it mentions `@username` or contains the room topic
    pub fn is_candidate(
        &self,
        message: &Message,
        room: &Room,
        state: &EngineState,
        now: Instant,
    ) -> bool {
        if message.is_from(&self.username) {
            return false;
        }
        if !is_later(&message.timestamp, state.last_checked(&room.id)) {
            return false;
        }
        if let Some(last) = state.last_response(&room.id) {
            if now.saturating_duration_since(last) < self.min_response_interval {
                return false;
            }
        }
        message.mentions(&self.username) || message.mentions_topic(&room.topic)
    }

    /// The latest-timestamped candidate; the earliest-fetched wins a tie.
    pub fn select<'m>(
        &self,
        messages: &'m [Message],
        room: &Room,
        state: &EngineState,
        now: Instant,
    ) -> Option<&'m Message> {
        let mut best: Option<&'m Message> = None;
        for m in messages
            .iter()
            .filter(|m| self.is_candidate(m, room, state, now))
        {
            match best {
                Some(b) if compare_timestamps(&m.timestamp, &b.timestamp) != Ordering::Greater => {}
                _ => best = Some(m),
            }
        }
        best
    }
}
