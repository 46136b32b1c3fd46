//! Processed-message markers.
//!
//! The scheduler records every message id it hands to the generator so a
//! re-delivered message is never answered twice. Hosts that want markers to
//! survive restarts implement [`MessageMemory`] over their own storage.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;

/// Store of processed message ids.
#[async_trait]
pub trait MessageMemory: Send + Sync {
    /// Whether `message_id` has already been recorded.
    async fn contains(&self, message_id: &str) -> Result<bool>;

    /// Record `message_id` as processed.
    async fn record(&self, message_id: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct Markers {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

/// Bounded in-memory marker store. The oldest marker is evicted once
/// `capacity` is reached.
#[derive(Debug)]
pub struct InMemoryMessageMemory {
    markers: Mutex<Markers>,
    capacity: usize,
}

impl InMemoryMessageMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            markers: Mutex::new(Markers::default()),
            capacity: capacity.max(1),
        }
    }

    /// Number of tracked markers.
    pub fn len(&self) -> usize {
        self.markers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ids
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryMessageMemory {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl MessageMemory for InMemoryMessageMemory {
    async fn contains(&self, message_id: &str) -> Result<bool> {
        let markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(markers.ids.contains(message_id))
    }

    async fn record(&self, message_id: &str) -> Result<()> {
        let mut markers = self.markers.lock().unwrap_or_else(|e| e.into_inner());
        if markers.ids.contains(message_id) {
            return Ok(());
        }

        while markers.order.len() >= self.capacity {
            match markers.order.pop_front() {
                Some(oldest) => {
                    markers.ids.remove(&oldest);
                }
                None => break,
            }
        }

        markers.ids.insert(message_id.to_string());
        markers.order.push_back(message_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_then_contains() {
        let memory = InMemoryMessageMemory::new(10);
        assert!(!memory.contains("m1").await.unwrap());
        memory.record("m1").await.unwrap();
        assert!(memory.contains("m1").await.unwrap());
        assert!(!memory.contains("m2").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_twice_is_single_marker() {
        let memory = InMemoryMessageMemory::new(10);
        memory.record("m1").await.unwrap();
        memory.record("m1").await.unwrap();
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let memory = InMemoryMessageMemory::new(2);
        memory.record("m1").await.unwrap();
        memory.record("m2").await.unwrap();
        memory.record("m3").await.unwrap();

        assert!(!memory.contains("m1").await.unwrap());
        assert!(memory.contains("m2").await.unwrap());
        assert!(memory.contains("m3").await.unwrap());
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let memory = InMemoryMessageMemory::new(0);
        assert!(memory.is_empty());
        assert_eq!(memory.capacity, 1);
    }
}
