//! Message cards: the unit the presentation layer renders.
//!
//! Every normalized message becomes at least one card (index 0). The thread
//! segmenter adds synthetic cards, one per quoted block, that are never
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::EmailAddress;
use super::message::{AuthorType, Direction, NormalizedMessage, QuoteKind, QuotedBlock};
use super::record::{Channel, ContentType};

/// A `NormalizedMessage`-shaped record ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageCard {
    /// Record id for the original card, `<record id>:quote:<n>` for synthetic ones.
    pub id: String,
    pub record_id: String,
    /// Cache key; synthetic cards extend the parent key with their index.
    pub dedup_key: String,
    /// 0 for the original message, n for the card built from quoted block n-1.
    pub quote_index: usize,
    pub synthetic: bool,
    pub created_at: DateTime<Utc>,
    /// Set when `created_at` was derived only to keep ordering strict. Such a
    /// time must never be shown as a real send time.
    pub timestamp_inferred: bool,
    pub channel: Option<Channel>,
    pub content_type: ContentType,
    pub from: Option<EmailAddress>,
    pub direction: Direction,
    pub author_type: AuthorType,
    pub author_label: String,
    pub is_internal: bool,
    pub visible_body: String,
    /// Quoted history still attached to this card (original cards only).
    pub quoted_blocks: Vec<QuotedBlock>,
    /// Convention the synthetic card's block was detected by.
    pub source_kind: Option<QuoteKind>,
}

impl MessageCard {
    /// Re-type a normalized message as its original (index 0) card.
    pub fn original(message: &NormalizedMessage) -> Self {
        Self {
            id: message.id.clone(),
            record_id: message.id.clone(),
            dedup_key: message.dedup_key.clone(),
            quote_index: 0,
            synthetic: false,
            created_at: message.created_at,
            timestamp_inferred: false,
            channel: message.channel,
            content_type: message.content_type,
            from: message.from.clone(),
            direction: message.direction,
            author_type: message.author_type,
            author_label: message.author_label.clone(),
            is_internal: message.is_internal,
            visible_body: message.visible_body.clone(),
            quoted_blocks: message.quoted_blocks.clone(),
            source_kind: None,
        }
    }
}
