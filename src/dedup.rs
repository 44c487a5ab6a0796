//! Deduplication of raw records across overlapping page fetches.
//!
//! Keys are computed on raw rows (see [`dedup_key`]) so this runs before any
//! normalization work. The first-seen record for a key always wins.

use std::collections::HashSet;

use tracing::debug;

use crate::model::record::RawMessageRecord;
use crate::normalize::dedup_key;

/// Drop records whose dedup key was already seen earlier in `records`.
/// Order of the kept records is preserved.
pub fn dedupe(records: &[RawMessageRecord]) -> Vec<RawMessageRecord> {
    let mut dedup = Deduplicator::new();
    dedup.admit(records).kept
}

/// Records admitted from one batch.
#[derive(Debug, Clone, Default)]
pub struct Admitted {
    pub kept: Vec<RawMessageRecord>,
    pub duplicates: usize,
}

/// Dedup state carried across the pages of one conversation view.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the records of `batch` not seen in this or any earlier batch.
    pub fn admit(&mut self, batch: &[RawMessageRecord]) -> Admitted {
        let mut admitted = Admitted::default();
        for record in batch {
            let key = dedup_key(record);
            if self.seen.contains(&key) {
                debug!(record = %record.id, key = %key, "Dropping duplicate record");
                admitted.duplicates += 1;
                continue;
            }
            self.seen.insert(key);
            admitted.kept.push(record.clone());
        }
        admitted
    }

    /// Whether a key has been admitted.
    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Number of distinct keys admitted so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::{ContentType, SenderKind};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(id: &str, external_id: Option<&str>, body: &str) -> RawMessageRecord {
        RawMessageRecord {
            id: id.to_string(),
            body: Some(body.to_string()),
            content_type: ContentType::Text,
            sender_kind: SenderKind::Customer,
            sender_id: None,
            is_internal: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            headers: BTreeMap::new(),
            external_id: external_id.map(str::to_string),
            channel: None,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_same_external_id_keeps_first_seen() {
        let records = vec![
            record("1", Some("abc"), "first"),
            record("2", Some("abc"), "second"),
        ];
        let kept = dedupe(&records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn test_order_is_stable() {
        let records = vec![
            record("3", Some("c"), "x"),
            record("1", Some("a"), "x"),
            record("2", Some("c"), "x"),
            record("4", Some("b"), "x"),
        ];
        let ids: Vec<String> = dedupe(&records).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["3", "1", "4"]);
    }

    #[test]
    fn test_fingerprint_duplicates_collapse() {
        let records = vec![record("1", None, "same"), record("2", None, "same")];
        assert_eq!(dedupe(&records).len(), 1);
    }

    #[test]
    fn test_state_carries_across_pages() {
        let mut dedup = Deduplicator::new();
        let first = dedup.admit(&[record("1", Some("a"), "x"), record("2", Some("b"), "x")]);
        assert_eq!(first.kept.len(), 2);

        // The next page re-includes the boundary row.
        let second = dedup.admit(&[record("2", Some("b"), "x"), record("3", Some("c"), "x")]);
        assert_eq!(second.duplicates, 1);
        assert_eq!(second.kept.len(), 1);
        assert_eq!(second.kept[0].id, "3");
        assert_eq!(dedup.len(), 3);
        assert!(dedup.contains("explicit:b"));
    }
}
