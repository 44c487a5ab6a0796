//! Thread segmentation: one normalized message → one original card plus one
//! synthetic card per quoted block, and ordering of cards across a
//! conversation.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::resolve_captured;
use crate::model::address::EmailAddress;
use crate::model::card::MessageCard;
use crate::model::context::NormalizationContext;
use crate::model::message::{NormalizedMessage, QuotedBlock};
use crate::model::record::ContentType;
use crate::parser::html::html_to_text;
use crate::quote::attribution::match_attribution_at;
use crate::quote::separator::match_header_block_at;
use crate::quote::strip_quote_prefix;

/// Segmentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Step between inferred timestamps of consecutive synthetic cards.
    pub synthetic_offset: Duration,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            synthetic_offset: Duration::seconds(1),
        }
    }
}

impl SegmentOptions {
    fn step(&self) -> Duration {
        self.synthetic_offset.max(Duration::milliseconds(1))
    }
}

/// Caller-visible card order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Non-increasing timestamps.
    #[default]
    #[serde(alias = "desc", alias = "newest-first")]
    NewestFirst,
    /// Non-decreasing timestamps.
    #[serde(alias = "asc")]
    Chronological,
}

impl SortOrder {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "desc" | "newest-first" | "newestfirst" => Some(Self::NewestFirst),
            "asc" | "chronological" => Some(Self::Chronological),
            _ => None,
        }
    }
}

/// What the head of a quoted block says about its author.
#[derive(Debug, Default)]
struct BlockHead {
    author: Option<EmailAddress>,
    name: Option<String>,
    date: Option<DateTime<Utc>>,
    /// Lines taken by the attribution or header run.
    lines: usize,
    /// Index of the first line of the head.
    start: usize,
}

/// Find an attribution line or header run at the top of a block.
fn block_head(lines: &[&str]) -> BlockHead {
    let Some(start) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return BlockHead::default();
    };
    if let Some((attribution, used)) = match_attribution_at(lines, start) {
        return BlockHead {
            author: attribution.author(),
            name: attribution.name.clone(),
            date: attribution.date,
            lines: used,
            start,
        };
    }
    if let Some(run) = match_header_block_at(lines, start) {
        let name = run
            .from
            .as_ref()
            .map(|f| f.display_name.clone())
            .filter(|n| !n.is_empty());
        return BlockHead {
            author: run.from.filter(EmailAddress::is_email),
            name,
            date: run.date,
            lines: run.lines,
            start,
        };
    }
    BlockHead::default()
}

/// Drop the `>` quoting depth shared by every non-blank line.
fn unquote_common(text: &str) -> String {
    let depth = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| strip_quote_prefix(l).1)
        .min()
        .unwrap_or(0);
    if depth == 0 {
        return text.to_string();
    }
    text.lines()
        .map(|line| strip_markers(line, depth))
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_markers(line: &str, depth: usize) -> &str {
    let mut rest = line.trim_start();
    for level in 0..depth {
        if level > 0 {
            rest = rest.trim_start();
        }
        match rest.strip_prefix('>') {
            Some(stripped) => rest = stripped,
            None => return rest,
        }
    }
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// Card body and head of one quoted block.
fn block_content(block: &QuotedBlock) -> (String, BlockHead) {
    let text = if block.kind.is_html() {
        html_to_text(&block.text)
    } else {
        block.text.clone()
    };
    let lines: Vec<&str> = text.lines().collect();
    let head = block_head(&lines);
    let body_lines = if head.lines > 0 {
        &lines[head.start + head.lines..]
    } else {
        &lines[..]
    };
    let body = unquote_common(&body_lines.join("\n"));
    (body.trim().to_string(), head)
}

/// Split a message into its original card and one synthetic card per quoted
/// block. Card timestamps strictly decrease by index.
pub fn segment_message_into_cards(
    message: &NormalizedMessage,
    ctx: &NormalizationContext,
    options: &SegmentOptions,
) -> Vec<MessageCard> {
    let mut cards = Vec::with_capacity(message.quoted_blocks.len() + 1);
    cards.push(MessageCard::original(message));

    for (i, block) in message.quoted_blocks.iter().enumerate() {
        let index = i + 1;
        let Some(previous) = cards.last() else {
            break;
        };
        let (body, head) = block_content(block);
        let author = resolve_captured(
            head.author.as_ref(),
            head.name.as_deref(),
            previous.author_type,
            ctx,
        );

        let (created_at, timestamp_inferred) = match head.date {
            Some(date) if date < previous.created_at => (date, false),
            parsed => {
                if parsed.is_some() {
                    debug!(
                        record = %message.id,
                        index,
                        "Quoted date not earlier than the newer card; inferring"
                    );
                }
                (previous.created_at - options.step(), true)
            }
        };

        cards.push(MessageCard {
            id: format!("{}:quote:{index}", message.id),
            record_id: message.id.clone(),
            dedup_key: format!("{}:quote:{index}", message.dedup_key),
            quote_index: index,
            synthetic: true,
            created_at,
            timestamp_inferred,
            channel: message.channel,
            content_type: ContentType::Text,
            from: head.author,
            direction: author.direction,
            author_type: author.author_type,
            author_label: author.label,
            is_internal: message.is_internal,
            visible_body: body,
            quoted_blocks: Vec::new(),
            source_kind: Some(block.kind),
        });
    }

    cards
}

/// Numeric comparison when both ids are numbers, lexical otherwise.
fn compare_record_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Oldest-first comparison; newest-first is its exact reverse.
fn chronological(a: &MessageCard, b: &MessageCard) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| compare_record_ids(&a.record_id, &b.record_id))
        .then_with(|| b.quote_index.cmp(&a.quote_index))
}

/// Sort cards by timestamp, ties broken by record id then quote index.
pub fn sort_cards(cards: &mut [MessageCard], order: SortOrder) {
    match order {
        SortOrder::Chronological => cards.sort_by(chronological),
        SortOrder::NewestFirst => cards.sort_by(|a, b| chronological(b, a)),
    }
}

/// Cards for a set of messages, segmented when `options` is given, in the
/// requested order.
pub fn build_cards(
    messages: &[NormalizedMessage],
    ctx: &NormalizationContext,
    options: Option<&SegmentOptions>,
    order: SortOrder,
) -> Vec<MessageCard> {
    let mut cards: Vec<MessageCard> = match options {
        Some(options) => messages
            .iter()
            .flat_map(|m| segment_message_into_cards(m, ctx, options))
            .collect(),
        None => messages.iter().map(MessageCard::original).collect(),
    };
    sort_cards(&mut cards, order);
    cards
}
