//! Raw message rows as handed over by the persistence layer.
//!
//! Records are read-only here: nothing in this crate mutates one in place.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attachment::AttachmentRef;

/// Who the persistence layer says sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    Agent,
    Customer,
    System,
}

impl SenderKind {
    /// Stable lowercase name, used in dedup fingerprints.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Customer => "customer",
            Self::System => "system",
        }
    }
}

/// Body content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[serde(alias = "text/html")]
    Html,
    #[default]
    #[serde(alias = "text/plain", alias = "plain")]
    Text,
}

/// Transport the message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    /// Website chat widget.
    Widget,
    #[serde(other)]
    Other,
}

/// One stored message row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessageRecord {
    /// Storage id. Not a stable identity across segmentation; see `dedup_key`.
    pub id: String,

    /// Body content. `None` is a data-integrity fault upstream.
    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub content_type: ContentType,

    pub sender_kind: SenderKind,

    /// Storage id of the sending user or contact, if known.
    #[serde(default)]
    pub sender_id: Option<String>,

    /// Internal note, not visible to the customer.
    #[serde(default)]
    pub is_internal: bool,

    pub created_at: DateTime<Utc>,

    /// Transport headers (`From`, `To`, `Cc`, `Message-ID`, `Phone`, ...).
    /// Names are matched case-insensitively.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Explicit external identifier assigned by the provider.
    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub channel: Option<Channel>,

    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

impl RawMessageRecord {
    /// Look up a header value by name (case-insensitive). Blank values count
    /// as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The explicit external id, falling back to the `Message-ID` header.
    pub fn explicit_id(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or_else(|| self.header("message-id"))
    }

    /// Phone number of the sender, from a `Phone` header or an SMS `From`.
    pub fn phone(&self) -> Option<&str> {
        self.header("phone").or_else(|| {
            self.header("from")
                .filter(|from| super::address::looks_like_phone(from))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json(extra: &str) -> String {
        format!(
            r#"{{
                "id": "7",
                "body": "Hello",
                "sender_kind": "customer",
                "created_at": "2024-01-01T10:00:00Z"{extra}
            }}"#
        )
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let record: RawMessageRecord = serde_json::from_str(&record_json("")).unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.content_type, ContentType::Text);
        assert!(record.headers.is_empty());
        assert!(record.channel.is_none());
    }

    #[test]
    fn test_content_type_aliases() {
        let record: RawMessageRecord =
            serde_json::from_str(&record_json(r#", "content_type": "text/html""#)).unwrap();
        assert_eq!(record.content_type, ContentType::Html);
    }

    #[test]
    fn test_unknown_channel_is_other() {
        let record: RawMessageRecord =
            serde_json::from_str(&record_json(r#", "channel": "whatsapp""#)).unwrap();
        assert_eq!(record.channel, Some(Channel::Other));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let record: RawMessageRecord = serde_json::from_str(&record_json(
            r#", "headers": { "Message-ID": "<abc@x.com>", "From": "  " }"#,
        ))
        .unwrap();
        assert_eq!(record.header("message-id"), Some("<abc@x.com>"));
        assert_eq!(record.header("from"), None);
    }

    #[test]
    fn test_explicit_id_prefers_external_id() {
        let record: RawMessageRecord = serde_json::from_str(&record_json(
            r#", "external_id": "abc", "headers": { "Message-ID": "<other@x.com>" }"#,
        ))
        .unwrap();
        assert_eq!(record.explicit_id(), Some("abc"));

        let record: RawMessageRecord = serde_json::from_str(&record_json(
            r#", "external_id": " ", "headers": { "Message-ID": "<other@x.com>" }"#,
        ))
        .unwrap();
        assert_eq!(record.explicit_id(), Some("<other@x.com>"));
    }

    #[test]
    fn test_phone_from_sms_sender() {
        let record: RawMessageRecord = serde_json::from_str(&record_json(
            r#", "channel": "sms", "headers": { "From": "+47 400 00 000" }"#,
        ))
        .unwrap();
        assert_eq!(record.phone(), Some("+47 400 00 000"));
    }
}
