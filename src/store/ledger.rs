//! Bounded, insertion-ordered record of delivered feed message ids.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::FeedMessageId;

/// How many delivered ids a destination remembers.
pub const DEFAULT_LEDGER_CAPACITY: usize = 100;

/// Remembers the most recent `capacity` delivered ids of one destination.
///
/// Membership is O(1); the oldest id is evicted first. Serializes as a plain
/// array, oldest first.
#[derive(Debug, Clone)]
pub struct DeliveryLedger {
    order: VecDeque<FeedMessageId>,
    index: HashSet<FeedMessageId>,
    capacity: usize,
}

impl DeliveryLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            index: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a ledger from ids in delivery order, keeping the newest `capacity`.
    pub fn from_ids(ids: impl IntoIterator<Item = FeedMessageId>, capacity: usize) -> Self {
        let mut ledger = Self::new(capacity);
        for id in ids {
            ledger.record(id);
        }
        ledger
    }

    pub fn contains(&self, id: &FeedMessageId) -> bool {
        self.index.contains(id)
    }

    /// Record a delivered id. Returns `false` if it was already present.
    pub fn record(&mut self, id: FeedMessageId) -> bool {
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.order.push_back(id);
        self.evict_overflow();
        true
    }

    /// Change the capacity, dropping the oldest ids if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_overflow();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    fn evict_overflow(&mut self) {
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.index.remove(&oldest);
            }
        }
    }
}

impl Default for DeliveryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}

impl PartialEq for DeliveryLedger {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Serialize for DeliveryLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.order.iter())
    }
}

impl<'de> Deserialize<'de> for DeliveryLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Keep everything on file; the store applies the configured capacity.
        let ids = Vec::<FeedMessageId>::deserialize(deserializer)?;
        let capacity = ids.len().max(DEFAULT_LEDGER_CAPACITY);
        Ok(Self::from_ids(ids, capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> FeedMessageId {
        FeedMessageId::from(n)
    }

    #[test]
    fn test_record_and_contains() {
        let mut ledger = DeliveryLedger::default();
        assert!(!ledger.contains(&id(1)));
        assert!(ledger.record(id(1)));
        assert!(ledger.contains(&id(1)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_duplicate_record_is_noop() {
        let mut ledger = DeliveryLedger::default();
        ledger.record(id(7));
        assert!(!ledger.record(id(7)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_bounded_to_most_recent() {
        for total in [1u64, 50, 100, 101, 250] {
            let mut ledger = DeliveryLedger::default();
            for n in 0..total {
                ledger.record(id(n));
            }

            let kept = total.min(DEFAULT_LEDGER_CAPACITY as u64);
            assert_eq!(ledger.len() as u64, kept);
            for n in 0..total {
                let recent = n >= total - kept;
                assert_eq!(ledger.contains(&id(n)), recent, "id {} of {}", n, total);
            }
        }
    }

    #[test]
    fn test_eviction_is_oldest_first() {
        let mut ledger = DeliveryLedger::new(3);
        for n in 1..=5 {
            ledger.record(id(n));
        }
        assert_eq!(serde_json::to_string(&ledger).unwrap(), r#"["3","4","5"]"#);
    }

    #[test]
    fn test_shrinking_capacity_drops_oldest() {
        let mut ledger = DeliveryLedger::from_ids((1..=10).map(id), 10);
        ledger.set_capacity(4);
        assert_eq!(ledger.len(), 4);
        assert!(!ledger.contains(&id(6)));
        assert!(ledger.contains(&id(7)));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let ledger = DeliveryLedger::from_ids([id(1), FeedMessageId::new("abc")], 10);
        assert_eq!(serde_json::to_string(&ledger).unwrap(), r#"["1","abc"]"#);

        let parsed: DeliveryLedger = serde_json::from_str(r#"[1, "2", 3]"#).unwrap();
        assert!(parsed.contains(&id(1)));
        assert!(parsed.contains(&id(2)));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn test_deserialize_keeps_more_than_default() {
        let ids: Vec<String> = (1..=150).map(|n| n.to_string()).collect();
        let parsed: DeliveryLedger = serde_json::from_value(serde_json::json!(ids)).unwrap();
        assert_eq!(parsed.len(), 150);
        assert!(parsed.contains(&id(1)));
    }
}
