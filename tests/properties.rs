//! Property tests for the normalization pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use threadline::dedup::dedupe;
use threadline::estimate::{estimate, Confidence, DEFAULT_MAX_CONFIDENT_REMAINING};
use threadline::model::context::NormalizationContext;
use threadline::model::record::{ContentType, RawMessageRecord, SenderKind};
use threadline::normalize::{dedup_key, normalize_message};
use threadline::quote::find_quote_boundary;
use threadline::segment::{segment_message_into_cards, SegmentOptions};

// ─── Configuration ──────────────────────────────────────────────────

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        max_shrink_iters: 2000,
        ..ProptestConfig::default()
    }
}

// ─── Strategies ─────────────────────────────────────────────────────

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn arb_words() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z][A-Za-z ,.!?]{0,40}").expect("valid regex")
}

/// One body line: prose, quoted prose, or one of the markers the detectors
/// look for.
fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => arb_words(),
        3 => arb_words().prop_map(|w| format!("> {w}")),
        1 => arb_words().prop_map(|w| format!(">> {w}")),
        1 => Just("On Mon, Jan 1, 2024 at 10:00 AM Ann <ann@x.com> wrote:".to_string()),
        1 => Just("Den 2. jan. 2024 kl. 09:15 skrev Ola <ola@support.com>:".to_string()),
        1 => Just("-----Original Message-----".to_string()),
        1 => Just("From: Bob <bob@y.com>".to_string()),
        1 => Just(String::new()),
    ]
}

fn arb_body() -> impl Strategy<Value = String> {
    proptest::collection::vec(arb_line(), 0..12).prop_map(|lines| lines.join("\n"))
}

fn arb_sender_kind() -> impl Strategy<Value = SenderKind> {
    prop_oneof![
        Just(SenderKind::Agent),
        Just(SenderKind::Customer),
        Just(SenderKind::System),
    ]
}

/// Records with a small id space for external ids and timestamps, so that
/// shared dedup keys actually occur.
fn arb_record() -> impl Strategy<Value = RawMessageRecord> {
    (
        0u32..1000,
        arb_body(),
        arb_sender_kind(),
        0i64..50,
        proptest::option::of(0u8..8),
    )
        .prop_map(|(id, body, kind, minutes, external)| RawMessageRecord {
            id: id.to_string(),
            body: Some(body),
            content_type: ContentType::Text,
            sender_kind: kind,
            sender_id: None,
            is_internal: false,
            created_at: base_time() + Duration::minutes(minutes),
            headers: BTreeMap::new(),
            external_id: external.map(|e| format!("ext-{e}")),
            channel: None,
            attachments: Vec::new(),
        })
}

fn ctx() -> NormalizationContext {
    NormalizationContext::new()
        .with_agent_domain("support.com")
        .with_customer(Some("ann@x.com"), Some("Ann"))
}

/// Fresh prose drawn from a vocabulary the quoted history never uses.
fn arb_fresh() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        proptest::string::string_regex("FRESH[0-9]{1,4}").expect("valid regex"),
        1..6,
    )
    .prop_map(|words| words.join(" "))
}

fn arb_history() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        proptest::string::string_regex("old[a-z]{1,8}( old[a-z]{1,8}){0,4}").expect("valid regex"),
        1..5,
    )
}

// ─── Properties ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(proptest_config())]

    /// Visible text and quoted blocks never repeat each other.
    #[test]
    fn proptest_no_content_duplication(fresh in arb_fresh(), history in arb_history()) {
        let quoted: Vec<String> = history.iter().map(|l| format!("> {l}")).collect();
        let body = format!(
            "{fresh}\n\nOn Mon, Jan 1, 2024 at 10:00 AM Ann <ann@x.com> wrote:\n{}",
            quoted.join("\n")
        );
        let split = find_quote_boundary(&body, ContentType::Text);
        let joined: String = split
            .quoted_blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        prop_assert_eq!(&split.visible_body, &fresh);
        prop_assert!(!split.quoted_blocks.is_empty());
        prop_assert!(!joined.contains(&split.visible_body));
        prop_assert!(!split.visible_body.contains(&joined));
    }

    /// For any body the split is an ordered, non-overlapping cut of it.
    #[test]
    fn proptest_split_is_ordered_slice_of_body(body in arb_body()) {
        let split = find_quote_boundary(&body, ContentType::Text);
        let trimmed = body.trim_start();
        prop_assert!(trimmed.starts_with(&split.visible_body));
        if !split.quoted_blocks.is_empty() {
            prop_assert!(!split.visible_body.is_empty());
        }

        let mut pos = body.len() - trimmed.len() + split.visible_body.len();
        for block in &split.quoted_blocks {
            prop_assert!(!block.text.is_empty());
            let found = body[pos..].find(&block.text);
            prop_assert!(found.is_some(), "block {:?} not found after {}", block.text, pos);
            pos += found.unwrap_or(0) + block.text.len();
        }
    }

    /// Normalization is a pure function of its inputs.
    #[test]
    fn proptest_normalize_is_idempotent(record in arb_record()) {
        let ctx = ctx();
        let first = normalize_message(&record, &ctx);
        let second = normalize_message(&record, &ctx);
        prop_assert!(first.is_ok());
        prop_assert_eq!(first.ok(), second.ok());
    }

    /// Re-appending already-seen records changes nothing.
    #[test]
    fn proptest_dedup_stable_under_repeats(
        records in proptest::collection::vec(arb_record(), 0..20),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let once = dedupe(&records);

        let mut extended = records.clone();
        if !records.is_empty() {
            extended.extend(picks.iter().map(|i| records[i.index(records.len())].clone()));
        }
        let twice = dedupe(&extended);

        let keys = |list: &[RawMessageRecord]| -> Vec<(String, String)> {
            list.iter().map(|r| (r.id.clone(), dedup_key(r))).collect()
        };
        prop_assert_eq!(keys(&once), keys(&twice));
    }

    /// Segmentation yields one card per quoted block plus the original, with
    /// strictly decreasing timestamps.
    #[test]
    fn proptest_segmentation_orders_cards(record in arb_record()) {
        let ctx = ctx();
        let message = normalize_message(&record, &ctx).expect("body present");
        let cards = segment_message_into_cards(&message, &ctx, &SegmentOptions::default());

        prop_assert_eq!(cards.len(), message.quoted_blocks.len() + 1);
        for pair in cards.windows(2) {
            prop_assert!(pair[1].created_at < pair[0].created_at);
        }
    }

    /// A large remaining tail is never reported with confidence.
    #[test]
    fn proptest_confidence_gating(
        total in 0usize..100_000,
        normalized in 0usize..5_000,
        raw in 0usize..5_000,
    ) {
        let e = estimate(total, normalized, raw);
        if e.remaining > DEFAULT_MAX_CONFIDENT_REMAINING {
            prop_assert_eq!(e.confidence, Confidence::Low);
            prop_assert_eq!(e.visible_remaining(), None);
        }
        prop_assert_eq!(e.remaining, e.estimated_total_normalized.saturating_sub(normalized));
    }
}
