//! The paginated fetch boundary towards the persistence layer.
//!
//! This crate never fetches on its own; callers hand it pages. The
//! [`RecordSource`] trait describes what a page looks like, and
//! [`JsonFileSource`] serves pages from a JSON export for the CLI and tests.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ThreadlineError};
use crate::model::record::RawMessageRecord;

/// One page request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    /// Conversations to read; more than one for merged-thread views.
    pub conversation_ids: Vec<String>,
    /// Opaque cursor from the previous page; `None` for the first page.
    pub cursor: Option<String>,
    pub page_size: usize,
}

impl PageRequest {
    pub fn first(conversation_ids: Vec<String>, page_size: usize) -> Self {
        Self {
            conversation_ids,
            cursor: None,
            page_size,
        }
    }

    /// The request for the page after `page`, if there is one.
    pub fn next(&self, page: &RecordPage) -> Option<Self> {
        if !page.has_more {
            return None;
        }
        Some(Self {
            conversation_ids: self.conversation_ids.clone(),
            cursor: page.next_cursor.clone(),
            page_size: self.page_size,
        })
    }
}

/// One page of raw records, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<RawMessageRecord>,
    /// Raw rows in the whole conversation (or merged set), loaded or not.
    pub total_raw_count: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// A producer of raw record pages.
pub trait RecordSource {
    fn fetch(&self, request: &PageRequest) -> Result<RecordPage>;
}

/// Accepted file layouts: one conversation as a bare array, or an object
/// keyed by conversation id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Single(Vec<RawMessageRecord>),
    ByConversation(BTreeMap<String, Vec<RawMessageRecord>>),
}

/// Conversation id used for a bare-array file.
pub const DEFAULT_CONVERSATION: &str = "default";

/// Offset-paginated source over records loaded from JSON.
///
/// `overlap` re-includes that many rows from the end of the previous page in
/// the next one, the way a cursor over a live table can repeat boundary rows.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    conversations: BTreeMap<String, Vec<RawMessageRecord>>,
    overlap: usize,
}

impl JsonFileSource {
    /// Load a records file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| ThreadlineError::io(path, e))?;
        let file: RecordFile =
            serde_json::from_str(&data).map_err(|e| ThreadlineError::json(path, e))?;
        let conversations = match file {
            RecordFile::Single(records) => {
                BTreeMap::from([(DEFAULT_CONVERSATION.to_string(), records)])
            }
            RecordFile::ByConversation(map) => map,
        };
        debug!(
            path = %path.display(),
            conversations = conversations.len(),
            "Loaded record file"
        );
        Ok(Self {
            conversations,
            overlap: 0,
        })
    }

    /// A single-conversation source over in-memory records.
    pub fn from_records(records: Vec<RawMessageRecord>) -> Self {
        Self {
            conversations: BTreeMap::from([(DEFAULT_CONVERSATION.to_string(), records)]),
            overlap: 0,
        }
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn conversation_ids(&self) -> Vec<String> {
        self.conversations.keys().cloned().collect()
    }

    /// Every record of the requested conversations, newest first. An empty
    /// id list selects all conversations.
    fn selected(&self, ids: &[String]) -> Vec<&RawMessageRecord> {
        let mut records: Vec<&RawMessageRecord> = self
            .conversations
            .iter()
            .filter(|(id, _)| ids.is_empty() || ids.contains(id))
            .flat_map(|(_, records)| records.iter())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

impl RecordSource for JsonFileSource {
    fn fetch(&self, request: &PageRequest) -> Result<RecordPage> {
        if request.page_size == 0 {
            return Err(ThreadlineError::InvalidPage(
                "page size must be at least 1".to_string(),
            ));
        }
        let offset = match &request.cursor {
            None => 0,
            Some(cursor) => cursor.parse::<usize>().map_err(|_| {
                ThreadlineError::InvalidPage(format!("unrecognized cursor '{cursor}'"))
            })?,
        };

        let all = self.selected(&request.conversation_ids);
        let total = all.len();
        let start = offset.min(total);
        let end = start.saturating_add(request.page_size).min(total);
        let records: Vec<RawMessageRecord> = all[start..end].iter().map(|r| (*r).clone()).collect();

        let has_more = end < total;
        let step = request.page_size - self.overlap.min(request.page_size - 1);
        let next_cursor = has_more.then(|| (start + step).to_string());

        Ok(RecordPage {
            records,
            total_raw_count: total,
            has_more,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::{ContentType, SenderKind};
    use chrono::{Duration, TimeZone, Utc};

    fn records(n: usize) -> Vec<RawMessageRecord> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| RawMessageRecord {
                id: i.to_string(),
                body: Some(format!("message {i}")),
                content_type: ContentType::Text,
                sender_kind: SenderKind::Customer,
                sender_id: None,
                is_internal: false,
                created_at: base + Duration::minutes(i as i64),
                headers: Default::default(),
                external_id: Some(format!("ext-{i}")),
                channel: None,
                attachments: Vec::new(),
            })
            .collect()
    }

    fn ids(page: &RecordPage) -> Vec<&str> {
        page.records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_pages_are_newest_first() {
        let source = JsonFileSource::from_records(records(5));
        let first = source.fetch(&PageRequest::first(vec![], 2)).unwrap();
        assert_eq!(ids(&first), vec!["4", "3"]);
        assert_eq!(first.total_raw_count, 5);
        assert!(first.has_more);

        let request = PageRequest::first(vec![], 2);
        let second = source.fetch(&request.next(&first).unwrap()).unwrap();
        assert_eq!(ids(&second), vec!["2", "1"]);
    }

    #[test]
    fn test_overlap_repeats_boundary_rows() {
        let source = JsonFileSource::from_records(records(5)).with_overlap(1);
        let request = PageRequest::first(vec![], 3);
        let first = source.fetch(&request).unwrap();
        let second = source.fetch(&request.next(&first).unwrap()).unwrap();
        assert_eq!(ids(&first), vec!["4", "3", "2"]);
        assert_eq!(ids(&second), vec!["2", "1", "0"]);
        assert!(!second.has_more);
        assert!(request.next(&second).is_none());
    }

    #[test]
    fn test_overlap_never_stalls() {
        let source = JsonFileSource::from_records(records(3)).with_overlap(10);
        let request = PageRequest::first(vec![], 2);
        let first = source.fetch(&request).unwrap();
        assert_eq!(first.next_cursor.as_deref(), Some("1"));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let source = JsonFileSource::from_records(records(1));
        let err = source.fetch(&PageRequest::first(vec![], 0)).unwrap_err();
        assert!(matches!(err, ThreadlineError::InvalidPage(_)));
    }

    #[test]
    fn test_bad_cursor_is_rejected() {
        let source = JsonFileSource::from_records(records(1));
        let request = PageRequest {
            cursor: Some("abc".to_string()),
            ..PageRequest::first(vec![], 1)
        };
        assert!(source.fetch(&request).is_err());
    }

    #[test]
    fn test_load_keyed_file_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let all = records(4);
        let file = serde_json::json!({
            "a": [all[0], all[2]],
            "b": [all[1], all[3]],
        });
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let source = JsonFileSource::load(&path).unwrap();
        assert_eq!(source.conversation_ids(), vec!["a", "b"]);

        let only_a = source.fetch(&PageRequest::first(vec!["a".to_string()], 10)).unwrap();
        assert_eq!(ids(&only_a), vec!["2", "0"]);

        let merged = source
            .fetch(&PageRequest::first(vec!["a".to_string(), "b".to_string()], 10))
            .unwrap();
        assert_eq!(ids(&merged), vec!["3", "2", "1", "0"]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = JsonFileSource::load(Path::new("/nonexistent/records.json")).unwrap_err();
        assert!(matches!(err, ThreadlineError::Io { .. }));
    }
}
