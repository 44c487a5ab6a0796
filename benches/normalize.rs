use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use threadline::model::context::NormalizationContext;
use threadline::model::record::{ContentType, RawMessageRecord};

fn load_fixture() -> Vec<RawMessageRecord> {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("conversation.json");
    let data = std::fs::read_to_string(fixture_path).unwrap();
    serde_json::from_str(&data).unwrap()
}

fn bench_normalize_batch(c: &mut Criterion) {
    let records = load_fixture();
    let ctx = NormalizationContext::new().with_agent_domain("support.com");

    c.bench_function("normalize_fixture_batch", |b| {
        b.iter(|| {
            let kept = threadline::dedup::dedupe(&records);
            threadline::normalize::normalize_batch(&kept, &ctx)
        })
    });
}

fn bench_quote_detection(c: &mut Criterion) {
    let mut body = String::from("Thanks, that worked.\n\n");
    for depth in 1..=20 {
        let prefix = ">".repeat(depth - 1);
        body.push_str(&format!(
            "{prefix} On Mon, Jan {depth}, 2024 at 10:00 AM Ann <ann@x.com> wrote:\n"
        ));
        body.push_str(&format!("{}> Reply number {depth}\n", prefix));
    }

    c.bench_function("find_quote_boundary_nested_20", |b| {
        b.iter(|| threadline::quote::find_quote_boundary(&body, ContentType::Text))
    });
}

fn bench_segment(c: &mut Criterion) {
    let records = load_fixture();
    let ctx = NormalizationContext::new().with_agent_domain("support.com");
    let batch = threadline::normalize::normalize_batch(&records, &ctx);
    let options = threadline::segment::SegmentOptions::default();

    c.bench_function("build_cards_segmented", |b| {
        b.iter(|| {
            threadline::segment::build_cards(
                &batch.messages,
                &ctx,
                Some(&options),
                threadline::segment::SortOrder::NewestFirst,
            )
        })
    });
}

criterion_group!(benches, bench_normalize_batch, bench_quote_detection, bench_segment);
criterion_main!(benches);
