//! Integration tests for the full pipeline: fixtures → dedup → normalize →
//! segment → estimate.

use std::path::{Path, PathBuf};

use threadline::dedup::dedupe;
use threadline::estimate::{estimate, CompletenessDisplay, Confidence};
use threadline::feed::{ConversationFeed, FeedOptions};
use threadline::model::context::NormalizationContext;
use threadline::model::message::{AuthorType, Direction, QuoteKind};
use threadline::model::record::{ContentType, RawMessageRecord};
use threadline::normalize::{normalize_batch, normalize_message};
use threadline::quote::find_quote_boundary;
use threadline::segment::{build_cards, segment_message_into_cards, SegmentOptions, SortOrder};
use threadline::source::{JsonFileSource, PageRequest, RecordSource};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_records() -> Vec<RawMessageRecord> {
    let data = std::fs::read_to_string(fixture("conversation.json")).unwrap();
    serde_json::from_str(&data).unwrap()
}

fn fixture_context() -> NormalizationContext {
    let data = std::fs::read_to_string(fixture("context.json")).unwrap();
    serde_json::from_str::<NormalizationContext>(&data)
        .unwrap()
        .normalized()
}

fn record<'a>(records: &'a [RawMessageRecord], id: &str) -> &'a RawMessageRecord {
    records.iter().find(|r| r.id == id).unwrap()
}

// ─── Quote detection scenarios ──────────────────────────────────────

#[test]
fn test_english_attribution_splits_one_header_block() {
    let body = "Thanks!\n\nOn Mon, Jan 1, 2024 at 10:00 AM John <john@x.com> wrote:\n> Hi\n> there";
    let split = find_quote_boundary(body, ContentType::Text);
    assert_eq!(split.visible_body, "Thanks!");
    assert_eq!(split.quoted_blocks.len(), 1);
    assert_eq!(split.quoted_blocks[0].kind, QuoteKind::HeaderBlock);
}

#[test]
fn test_sibling_gmail_containers_in_document_order() {
    let body = concat!(
        "<div>Latest answer</div>",
        "<div class=\"gmail_quote\">Second reply</div>",
        "<div class=\"gmail_quote\">First reply</div>"
    );
    let split = find_quote_boundary(body, ContentType::Html);
    assert_eq!(split.visible_body, "<div>Latest answer</div>");
    assert_eq!(split.quoted_blocks.len(), 2);
    assert!(split
        .quoted_blocks
        .iter()
        .all(|b| b.kind == QuoteKind::HtmlGmailContainer));
    assert!(split.quoted_blocks[0].text.contains("Second reply"));
    assert!(split.quoted_blocks[1].text.contains("First reply"));
}

#[test]
fn test_unrecognized_body_is_returned_trimmed() {
    let body = "\n\n  Can you call me tomorrow?\nThanks  \n";
    let split = find_quote_boundary(body, ContentType::Text);
    assert!(split.quoted_blocks.is_empty());
    assert_eq!(split.visible_body, body.trim());
}

#[test]
fn test_truncated_html_degrades_to_visible_body() {
    let body = "<div>Hello<div class=\"gmail_quote";
    let split = find_quote_boundary(body, ContentType::Html);
    assert!(split.quoted_blocks.is_empty());
    assert_eq!(split.visible_body, body);
}

#[test]
fn test_outlook_plain_text_reply() {
    let body = std::fs::read_to_string(fixture("outlook_reply.txt")).unwrap();
    let split = find_quote_boundary(&body, ContentType::Text);
    assert_eq!(
        split.visible_body,
        "Hi Kari,\n\nThe replacement is on its way.\n\nEva"
    );
    assert_eq!(split.quoted_blocks.len(), 1);
    assert_eq!(split.quoted_blocks[0].kind, QuoteKind::HeaderBlock);
    assert!(split.quoted_blocks[0]
        .text
        .starts_with("-----Original Message-----"));
}

// ─── Dedup and estimate scenarios ───────────────────────────────────

#[test]
fn test_duplicate_external_id_keeps_first_seen() {
    let records = fixture_records();
    let kept = dedupe(&records);
    assert_eq!(kept.len(), records.len() - 1);
    assert!(kept.iter().any(|r| r.id == "2"));
    assert!(kept.iter().all(|r| r.id != "3"));

    let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "4", "5", "6", "7"]);
}

#[test]
fn test_low_confidence_hides_remaining() {
    let e = estimate(1000, 3, 3);
    assert_eq!(e.confidence, Confidence::Low);
    assert_eq!(e.visible_remaining(), None);
    assert_eq!(e.display(), CompletenessDisplay::LoadMore);
}

// ─── Normalization over the fixture conversation ────────────────────

#[test]
fn test_fixture_authors_and_labels() {
    let records = fixture_records();
    let ctx = fixture_context();

    let first = normalize_message(record(&records, "1"), &ctx).unwrap();
    assert_eq!(first.author_type, AuthorType::Customer);
    assert_eq!(first.direction, Direction::Inbound);
    assert_eq!(first.author_label, "Kari Nordmann");
    assert_eq!(first.subject.as_deref(), Some("Bestilling #123"));
    assert_eq!(first.to[0].address, "help@support.com");

    let reply = normalize_message(record(&records, "2"), &ctx).unwrap();
    assert_eq!(reply.author_type, AuthorType::Agent);
    assert_eq!(reply.direction, Direction::Outbound);
    assert_eq!(reply.author_label, "Agent (eva@support.com)");
    assert_eq!(reply.visible_body, "<div>We have shipped it again.</div>");
    assert_eq!(reply.quoted_blocks.len(), 1);
    assert_eq!(reply.attachments.len(), 1);
    assert_eq!(reply.dedup_key, "explicit:m2");

    let closed = normalize_message(record(&records, "6"), &ctx).unwrap();
    assert_eq!(closed.author_type, AuthorType::System);
    assert_eq!(closed.author_label, "System");

    let note = normalize_message(record(&records, "7"), &ctx).unwrap();
    assert!(note.is_internal);
    assert_eq!(note.author_type, AuthorType::Agent);
}

#[test]
fn test_fixture_batch_skips_absent_body() {
    let records = dedupe(&fixture_records());
    let batch = normalize_batch(&records, &fixture_context());
    assert_eq!(batch.messages.len(), 5);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].id, "5");
    assert!(batch.skipped[0].reason.contains("body is absent"));
}

#[test]
fn test_norwegian_reply_segments_into_agent_card() {
    let records = fixture_records();
    let ctx = fixture_context();
    let message = normalize_message(record(&records, "4"), &ctx).unwrap();
    assert_eq!(message.visible_body, "Takk, den kom i dag!");
    assert_eq!(message.author_label, "Kari Nordmann");

    let cards = segment_message_into_cards(&message, &ctx, &SegmentOptions::default());
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[1].author_type, AuthorType::Agent);
    assert_eq!(cards[1].visible_body, "We have shipped it again.");
    assert!(cards[1].created_at < cards[0].created_at);
}

#[test]
fn test_gmail_reply_segments_into_customer_card() {
    let records = fixture_records();
    let ctx = fixture_context();
    let message = normalize_message(record(&records, "2"), &ctx).unwrap();
    let cards = segment_message_into_cards(&message, &ctx, &SegmentOptions::default());
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[1].author_type, AuthorType::Customer);
    assert_eq!(cards[1].content_type, ContentType::Text);
    assert!(cards[1].visible_body.contains("my order #123 never arrived"));
    assert!(!cards[1].visible_body.contains('<'));
}

#[test]
fn test_outlook_block_author_from_header_run() {
    let body = std::fs::read_to_string(fixture("outlook_reply.txt")).unwrap();
    let mut raw = fixture_records().remove(0);
    raw.id = "90".to_string();
    raw.body = Some(body);
    raw.sender_kind = threadline::model::record::SenderKind::Agent;
    raw.headers.clear();
    raw.headers
        .insert("From".to_string(), "eva@support.com".to_string());

    let ctx = fixture_context();
    let message = normalize_message(&raw, &ctx).unwrap();
    let cards = segment_message_into_cards(&message, &ctx, &SegmentOptions::default());
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[1].author_type, AuthorType::Customer);
    assert_eq!(cards[1].author_label, "Kari Nordmann");
    assert_eq!(cards[1].visible_body, "Hi, my order #123 never arrived.");
}

// ─── Paginated feed ─────────────────────────────────────────────────

#[test]
fn test_overlapping_pages_through_feed() {
    let source = JsonFileSource::load(&fixture("conversation.json"))
        .unwrap()
        .with_overlap(1);
    let options = FeedOptions {
        segment: Some(SegmentOptions::default()),
        ..FeedOptions::default()
    };
    let mut feed = ConversationFeed::new(fixture_context(), options);
    let reports = feed.load_all(&source, PageRequest::first(vec![], 3)).unwrap();

    assert_eq!(reports.len(), 3);
    let fetched: usize = reports.iter().map(|r| r.fetched).sum();
    let duplicates: usize = reports.iter().map(|r| r.duplicates).sum();
    assert_eq!(fetched, 9);
    // Two overlap rows plus the record sharing external id "m2".
    assert_eq!(duplicates, 3);
    assert_eq!(feed.messages().len(), 5);
    assert_eq!(feed.skipped().len(), 1);

    let last = reports.last().unwrap().estimate;
    assert_eq!(last.display(), CompletenessDisplay::Complete);

    let cards = feed.cards();
    assert_eq!(cards.len(), 7);
    assert!(cards
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
}

#[test]
fn test_first_page_estimate_extrapolates() {
    let source = JsonFileSource::load(&fixture("conversation.json")).unwrap();
    let page = source.fetch(&PageRequest::first(vec![], 2)).unwrap();
    assert_eq!(page.total_raw_count, 7);

    let mut feed = ConversationFeed::new(fixture_context(), FeedOptions::default());
    let report = feed.ingest(&page);
    assert_eq!(report.estimate.total_raw_count, 7);
    assert!(report.estimate.remaining > 0);
    // Two rows are below the minimum sample.
    assert_eq!(report.estimate.confidence, Confidence::Low);
}

#[test]
fn test_chronological_cards_across_messages() {
    let ctx = fixture_context();
    let batch = normalize_batch(&dedupe(&fixture_records()), &ctx);
    let cards = build_cards(
        &batch.messages,
        &ctx,
        Some(&SegmentOptions::default()),
        SortOrder::Chronological,
    );
    assert_eq!(cards.len(), 7);
    assert!(cards
        .windows(2)
        .all(|w| w[0].created_at <= w[1].created_at));
    assert_eq!(cards.last().unwrap().record_id, "6");
}

#[test]
fn test_context_file_is_normalized() {
    let ctx = fixture_context();
    assert_eq!(ctx.viewer_email.as_deref(), Some("eva@support.com"));
    assert_eq!(ctx.customer_email.as_deref(), Some("kari@x.no"));
    assert!(ctx.agent_domains.contains("support.com"));
}
