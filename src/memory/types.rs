//! Conversational memory records

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One user turn and the model's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Bounded, time-stamped history of one user
///
/// Serialized as `{"exchanges": [...], "timestamp": <seconds>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMemory {
    /// Held exchanges: front = oldest, back = newest
    pub exchanges: VecDeque<Exchange>,
    /// Unix seconds of the most recent interaction
    #[serde(rename = "timestamp")]
    pub last_activity: f64,
}

impl UserMemory {
    /// Create an empty record stamped at `now`
    pub fn new(now: f64) -> Self {
        Self {
            exchanges: VecDeque::new(),
            last_activity: now,
        }
    }

    /// Whether the record has been idle longer than `timeout_secs` at `now`
    pub fn is_expired(&self, now: f64, timeout_secs: f64) -> bool {
        now - self.last_activity > timeout_secs
    }

    /// Append an exchange, dropping the oldest ones beyond `capacity`.
    /// Returns the evicted exchanges, oldest first.
    pub fn push(&mut self, exchange: Exchange, capacity: usize) -> Vec<Exchange> {
        self.exchanges.push_back(exchange);
        self.truncate_to(capacity)
    }

    /// Keep only the `capacity` most recent exchanges
    pub fn truncate_to(&mut self, capacity: usize) -> Vec<Exchange> {
        let mut evicted = Vec::new();
        while self.exchanges.len() > capacity {
            if let Some(oldest) = self.exchanges.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

/// Full store contents keyed by user identity, ordered for stable output
pub type MemorySnapshot = BTreeMap<String, UserMemory>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut memory = UserMemory::new(0.0);
        assert!(memory.push(Exchange::new("q1", "a1"), 2).is_empty());
        assert!(memory.push(Exchange::new("q2", "a2"), 2).is_empty());

        let evicted = memory.push(Exchange::new("q3", "a3"), 2);
        assert_eq!(evicted, vec![Exchange::new("q1", "a1")]);
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.exchanges.front().unwrap().question, "q2");
        assert_eq!(memory.exchanges.back().unwrap().question, "q3");
    }

    #[test]
    fn test_expiry_boundary() {
        let memory = UserMemory::new(1_000.0);
        assert!(!memory.is_expired(1_599.0, 600.0));
        assert!(!memory.is_expired(1_600.0, 600.0));
        assert!(memory.is_expired(1_601.0, 600.0));
    }

    #[test]
    fn test_json_layout() {
        let mut memory = UserMemory::new(12.5);
        memory.push(Exchange::new("hi", "hello"), 5);

        let value = serde_json::to_value(&memory).unwrap();
        assert_eq!(value["timestamp"], 12.5);
        assert_eq!(value["exchanges"][0]["question"], "hi");
        assert_eq!(value["exchanges"][0]["answer"], "hello");
        assert!(value.get("last_activity").is_none());
    }

    #[test]
    fn test_truncate_keeps_most_recent() {
        let mut memory = UserMemory::new(0.0);
        for i in 0..7 {
            memory.exchanges.push_back(Exchange::new(format!("q{}", i), "a"));
        }
        let evicted = memory.truncate_to(3);
        assert_eq!(evicted.len(), 4);
        let kept: Vec<&str> = memory.exchanges.iter().map(|e| e.question.as_str()).collect();
        assert_eq!(kept, vec!["q4", "q5", "q6"]);
    }
}
