//! Append-only event log
//!
//! The ledger appends a record after every committed transfer or burn.
//! Records are addressed by their sequence number so an observer can resume
//! from the last position it processed.

use crate::crypto::event_topic;
use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical signature of the transfer event
pub const TRANSFER_SIGNATURE: &str = "Transfer(address,address,uint256)";
/// Canonical signature of the burn event
pub const BURN_SIGNATURE: &str = "Burn(address,uint256)";

/// A state-changing effect of a committed operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// Value moved between two accounts
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    /// Value destroyed, reducing total supply
    Burn { from: Address, value: U256 },
}

impl LedgerEvent {
    /// Event name as seen by listeners
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Burn { .. } => "Burn",
        }
    }

    /// Keccak-256 topic of the event signature
    pub fn topic(&self) -> B256 {
        match self {
            LedgerEvent::Transfer { .. } => event_topic(TRANSFER_SIGNATURE),
            LedgerEvent::Burn { .. } => event_topic(BURN_SIGNATURE),
        }
    }

    /// Amount carried by the event
    pub fn value(&self) -> U256 {
        match self {
            LedgerEvent::Transfer { value, .. } | LedgerEvent::Burn { value, .. } => *value,
        }
    }
}

/// An event together with its position in the log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    /// Position in the log, starting at 0
    pub sequence: u64,
    /// Ledger that emitted the event
    pub ledger: Address,
    pub event: LedgerEvent,
    /// Wall-clock time the event was committed
    pub recorded_at: DateTime<Utc>,
}

/// Ordered record of emitted events
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append an event and return the stored record
    pub(crate) fn append(&mut self, ledger: Address, event: LedgerEvent) -> &EventRecord {
        let sequence = self.next_sequence();
        self.records.push(EventRecord {
            sequence,
            ledger,
            event,
            recorded_at: Utc::now(),
        });
        &self.records[self.records.len() - 1]
    }

    /// Drop records appended after `len`. Only used to undo a rolled back call.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence number the next record will receive
    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// All records in commit order
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Iterate over all records
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Get a record by sequence number
    pub fn get(&self, sequence: u64) -> Option<&EventRecord> {
        usize::try_from(sequence)
            .ok()
            .and_then(|index| self.records.get(index))
    }

    /// Records at or after `cursor`
    pub fn since(&self, cursor: u64) -> &[EventRecord] {
        let start = usize::try_from(cursor)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(value: u64) -> LedgerEvent {
        LedgerEvent::Transfer {
            from: Address::with_last_byte(1),
            to: Address::with_last_byte(2),
            value: U256::from(value),
        }
    }

    #[test]
    fn test_append_assigns_sequences() {
        let mut log = EventLog::new();
        let ledger = Address::with_last_byte(0xaa);

        assert!(log.is_empty());
        assert_eq!(log.append(ledger, transfer(1)).sequence, 0);
        assert_eq!(log.append(ledger, transfer(2)).sequence, 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.next_sequence(), 2);
        assert_eq!(log.get(1).unwrap().event.value(), U256::from(2u64));
        assert!(log.get(2).is_none());
    }

    #[test]
    fn test_since_cursor() {
        let mut log = EventLog::new();
        let ledger = Address::with_last_byte(0xaa);
        for i in 0..5 {
            log.append(ledger, transfer(i));
        }

        assert_eq!(log.since(0).len(), 5);
        assert_eq!(log.since(3).len(), 2);
        assert_eq!(log.since(3)[0].sequence, 3);
        assert!(log.since(5).is_empty());
        assert!(log.since(u64::MAX).is_empty());
    }

    #[test]
    fn test_truncate_reuses_sequences() {
        let mut log = EventLog::new();
        let ledger = Address::with_last_byte(0xaa);
        log.append(ledger, transfer(1));
        log.append(ledger, transfer(2));

        log.truncate(1);
        assert_eq!(log.next_sequence(), 1);
        assert_eq!(log.append(ledger, transfer(3)).sequence, 1);
    }

    #[test]
    fn test_event_metadata() {
        let burn = LedgerEvent::Burn {
            from: Address::with_last_byte(1),
            value: U256::from(9u64),
        };

        assert_eq!(burn.name(), "Burn");
        assert_eq!(burn.value(), U256::from(9u64));
        assert_eq!(burn.topic(), event_topic(BURN_SIGNATURE));
        assert_eq!(transfer(1).name(), "Transfer");
        assert_ne!(transfer(1).topic(), burn.topic());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(transfer(5)).unwrap();
        assert_eq!(json["type"], "Transfer");
        assert!(json.get("from").is_some());
        assert!(json.get("to").is_some());
        assert!(json.get("value").is_some());
    }
}
