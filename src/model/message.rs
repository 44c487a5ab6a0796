//! Normalized, display-ready messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::EmailAddress;
use super::attachment::AttachmentRef;
use super::record::{Channel, ContentType};

/// Effective author of a message after identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    Agent,
    Customer,
    System,
}

impl AuthorType {
    /// Agents and the system send; customers receive nothing from us.
    pub fn direction(self) -> Direction {
        match self {
            Self::Agent | Self::System => Direction::Outbound,
            Self::Customer => Direction::Inbound,
        }
    }
}

/// Sent/received from the support team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Client convention a quoted block was detected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteKind {
    /// `<div class="gmail_quote">` style wrappers.
    HtmlGmailContainer,
    /// Outlook's border-top / `divRplyFwdMsg` / `<hr>` delimited wrappers.
    HtmlOutlookBordered,
    /// Attribution lines and separator + header runs.
    HeaderBlock,
    /// Leading `>` lines.
    AngleBracketPlain,
}

impl QuoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HtmlGmailContainer => "html-gmail-container",
            Self::HtmlOutlookBordered => "html-outlook-bordered",
            Self::HeaderBlock => "header-block",
            Self::AngleBracketPlain => "angle-bracket-plain",
        }
    }

    /// Whether the block text is HTML markup.
    pub fn is_html(self) -> bool {
        matches!(self, Self::HtmlGmailContainer | Self::HtmlOutlookBordered)
    }
}

impl std::fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verbatim slice of quoted history, in body order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotedBlock {
    pub kind: QuoteKind,
    /// Captured text or markup, trimmed at both ends and otherwise untouched.
    pub text: String,
}

/// One raw record after normalization.
///
/// `visible_body` and the `quoted_blocks` are disjoint slices of the
/// original body: the blocks, in order, cover everything from the quote
/// boundary to the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Storage id of the originating record.
    pub id: String,
    /// Stable identity; the only valid cache key for this message.
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
    pub channel: Option<Channel>,
    pub content_type: ContentType,
    pub from: Option<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub subject: Option<String>,
    pub direction: Direction,
    pub author_type: AuthorType,
    pub author_label: String,
    pub is_internal: bool,
    /// Content authored fresh for this message.
    pub visible_body: String,
    pub quoted_blocks: Vec<QuotedBlock>,
    pub attachments: Vec<AttachmentRef>,
}

impl NormalizedMessage {
    /// Storage id of the record this message came from.
    pub fn record_id(&self) -> &str {
        &self.id
    }

    pub fn has_quotes(&self) -> bool {
        !self.quoted_blocks.is_empty()
    }
}
