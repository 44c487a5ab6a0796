//! Message normalization: raw record + context → `NormalizedMessage`.
//!
//! Normalization is a pure function of its inputs. The only failure is a
//! record without a body, which batch normalization skips with a warning.

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{Result, ThreadlineError};
use crate::identity::resolve_author;
use crate::model::address::{looks_like_phone, EmailAddress};
use crate::model::context::NormalizationContext;
use crate::model::message::NormalizedMessage;
use crate::model::record::RawMessageRecord;
use crate::parser::header::{
    decode_text_header, normalize_message_id, parse_address_header, parse_single_address,
};
use crate::quote::QuoteDetectorSet;

/// Hex characters of the body hash kept in a fingerprint key.
const BODY_HASH_HEX_LEN: usize = 16;

/// Stable identity of a raw record.
///
/// `explicit:<id>` when the record carries an external id or `Message-ID`,
/// otherwise `fp:<sender kind>:<sender id>:<body hash>:<created_at ms>`.
/// Two rows only share a fingerprint when they are the same content from the
/// same sender at the same instant.
pub fn dedup_key(record: &RawMessageRecord) -> String {
    if let Some(id) = record.explicit_id() {
        let id = normalize_message_id(id);
        if !id.is_empty() {
            return format!("explicit:{id}");
        }
    }

    let digest = Sha256::digest(record.body.as_deref().unwrap_or_default().as_bytes());
    let hash: String = digest
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<String>()
        .chars()
        .take(BODY_HASH_HEX_LEN)
        .collect();

    format!(
        "fp:{}:{}:{}:{}",
        record.sender_kind.as_str(),
        record.sender_id.as_deref().map(str::trim).unwrap_or("-"),
        hash,
        record.created_at.timestamp_millis()
    )
}

/// The sender mailbox (or phone number for SMS) of a record.
fn sender_address(record: &RawMessageRecord) -> Option<EmailAddress> {
    match record.header("from") {
        Some(from) if looks_like_phone(from) => Some(EmailAddress::bare(from)),
        Some(from) => parse_single_address(from),
        None => record.phone().map(EmailAddress::bare),
    }
}

/// Normalize one record with the standard quote detectors.
pub fn normalize_message(
    record: &RawMessageRecord,
    ctx: &NormalizationContext,
) -> Result<NormalizedMessage> {
    normalize_message_with(record, ctx, &QuoteDetectorSet::standard())
}

/// Normalize one record with a caller-supplied detector set.
pub fn normalize_message_with(
    record: &RawMessageRecord,
    ctx: &NormalizationContext,
    detectors: &QuoteDetectorSet,
) -> Result<NormalizedMessage> {
    let body = record
        .body
        .as_deref()
        .ok_or_else(|| ThreadlineError::invalid_record(&record.id, "body is absent"))?;

    let from = sender_address(record);
    let author = resolve_author(record, from.as_ref(), ctx);
    let split = detectors.split(body, record.content_type);

    Ok(NormalizedMessage {
        id: record.id.clone(),
        dedup_key: dedup_key(record),
        created_at: record.created_at,
        channel: record.channel,
        content_type: record.content_type,
        from,
        to: record.header("to").map(parse_address_header).unwrap_or_default(),
        cc: record.header("cc").map(parse_address_header).unwrap_or_default(),
        subject: record.header("subject").and_then(decode_text_header),
        direction: author.direction,
        author_type: author.author_type,
        author_label: author.label,
        is_internal: record.is_internal,
        visible_body: split.visible_body,
        quoted_blocks: split.quoted_blocks,
        attachments: record.attachments.clone(),
    })
}

/// A record left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: String,
}

/// Output of [`normalize_batch`]: everything that normalized, in input
/// order, plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub messages: Vec<NormalizedMessage>,
    pub skipped: Vec<SkippedRecord>,
}

/// Normalize a batch, skipping (and logging) records that cannot be
/// normalized. One bad record never fails the batch.
pub fn normalize_batch(records: &[RawMessageRecord], ctx: &NormalizationContext) -> NormalizedBatch {
    let detectors = QuoteDetectorSet::standard();
    let mut batch = NormalizedBatch::default();
    for record in records {
        match normalize_message_with(record, ctx, &detectors) {
            Ok(message) => batch.messages.push(message),
            Err(err) => {
                warn!(record = %record.id, error = %err, "Skipping record");
                batch.skipped.push(SkippedRecord {
                    id: record.id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::{AuthorType, Direction, QuoteKind};
    use crate::model::record::{ContentType, SenderKind};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(id: &str, body: Option<&str>) -> RawMessageRecord {
        RawMessageRecord {
            id: id.to_string(),
            body: body.map(str::to_string),
            content_type: ContentType::Text,
            sender_kind: SenderKind::Customer,
            sender_id: Some("c-1".to_string()),
            is_internal: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap(),
            headers: BTreeMap::new(),
            external_id: None,
            channel: None,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_dedup_key_explicit() {
        let mut r = record("1", Some("Hi"));
        r.external_id = Some("abc".to_string());
        assert_eq!(dedup_key(&r), "explicit:abc");

        let mut r = record("2", Some("Hi"));
        r.headers.insert("Message-ID".to_string(), "<m1@x.com>".to_string());
        assert_eq!(dedup_key(&r), "explicit:m1@x.com");
    }

    #[test]
    fn test_dedup_key_fingerprint() {
        let a = record("1", Some("Hi"));
        let b = record("2", Some("Hi"));
        assert_eq!(dedup_key(&a), dedup_key(&b));
        assert!(dedup_key(&a).starts_with("fp:customer:c-1:"));

        let c = record("3", Some("Hi!"));
        assert_ne!(dedup_key(&a), dedup_key(&c));

        let mut d = record("4", Some("Hi"));
        d.created_at = d.created_at + chrono::Duration::milliseconds(1);
        assert_ne!(dedup_key(&a), dedup_key(&d));
    }

    #[test]
    fn test_blank_external_id_falls_back() {
        let mut r = record("1", Some("Hi"));
        r.external_id = Some("  ".to_string());
        assert!(dedup_key(&r).starts_with("fp:"));
    }

    #[test]
    fn test_normalize_message_fields() {
        let mut r = record("7", Some("Thanks!\n\nOn Mon, Jan 1, 2024 at 10:00 AM John <john@x.com> wrote:\n> Hi"));
        r.headers.insert("From".to_string(), "Kari <kari@x.no>".to_string());
        r.headers.insert("To".to_string(), "support@y.com, lead@y.com".to_string());
        r.headers.insert("Subject".to_string(), "Invoice".to_string());
        let msg = normalize_message(&r, &NormalizationContext::new()).unwrap();
        assert_eq!(msg.id, "7");
        assert_eq!(msg.author_type, AuthorType::Customer);
        assert_eq!(msg.direction, Direction::Inbound);
        assert_eq!(msg.author_label, "Kari");
        assert_eq!(msg.to.len(), 2);
        assert_eq!(msg.subject.as_deref(), Some("Invoice"));
        assert_eq!(msg.visible_body, "Thanks!");
        assert_eq!(msg.quoted_blocks.len(), 1);
        assert_eq!(msg.quoted_blocks[0].kind, QuoteKind::HeaderBlock);
    }

    #[test]
    fn test_absent_body_is_invalid_record() {
        let r = record("9", None);
        let err = normalize_message(&r, &NormalizationContext::new()).unwrap_err();
        assert!(matches!(err, ThreadlineError::InvalidRecord { ref id, .. } if id == "9"));
    }

    #[test]
    fn test_batch_skips_bad_records() {
        let records = vec![record("1", Some("a")), record("2", None), record("3", Some("c"))];
        let batch = normalize_batch(&records, &NormalizationContext::new());
        let ids: Vec<&str> = batch.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].id, "2");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let r = record("1", Some("Sure\n> earlier"));
        let ctx = NormalizationContext::new().with_agent_domain("y.com");
        assert_eq!(normalize_message(&r, &ctx).unwrap(), normalize_message(&r, &ctx).unwrap());
    }

    #[test]
    fn test_sms_phone_from() {
        let mut r = record("1", Some("Ring meg"));
        r.headers.insert("From".to_string(), "+47 123 45 678".to_string());
        let msg = normalize_message(&r, &NormalizationContext::new()).unwrap();
        assert_eq!(msg.from.unwrap().address, "+47 123 45 678");
    }
}
