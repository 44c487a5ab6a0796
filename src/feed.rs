//! A conversation view fed page by page: dedupe, normalize, segment on
//! demand, and estimate what is left after every page.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::dedup::Deduplicator;
use crate::error::Result;
use crate::estimate::{estimate_with, CompletenessEstimate, EstimatorConfig};
use crate::model::card::MessageCard;
use crate::model::context::NormalizationContext;
use crate::model::message::NormalizedMessage;
use crate::normalize::{normalize_batch, NormalizedBatch, SkippedRecord};
use crate::segment::{build_cards, SegmentOptions, SortOrder};
use crate::source::{PageRequest, RecordPage, RecordSource};

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedOptions {
    /// Expand quoted history into synthetic cards.
    pub segment: Option<SegmentOptions>,
    pub order: SortOrder,
    pub estimator: EstimatorConfig,
}

/// What one ingested page contributed.
#[derive(Debug, Clone)]
pub struct PageReport {
    pub fetched: usize,
    pub admitted: usize,
    pub duplicates: usize,
    pub skipped: Vec<SkippedRecord>,
    pub estimate: CompletenessEstimate,
}

/// Accumulated state of one conversation view.
#[derive(Debug)]
pub struct ConversationFeed {
    ctx: NormalizationContext,
    options: FeedOptions,
    dedup: Deduplicator,
    messages: Vec<NormalizedMessage>,
    skipped: Vec<SkippedRecord>,
    raw_seen: HashSet<String>,
    total_raw: usize,
}

impl ConversationFeed {
    pub fn new(ctx: NormalizationContext, options: FeedOptions) -> Self {
        Self {
            ctx,
            options,
            dedup: Deduplicator::new(),
            messages: Vec::new(),
            skipped: Vec::new(),
            raw_seen: HashSet::new(),
            total_raw: 0,
        }
    }

    /// Add one page. Duplicates of anything already loaded are dropped before
    /// normalization; invalid records are skipped and reported.
    pub fn ingest(&mut self, page: &RecordPage) -> PageReport {
        for record in &page.records {
            self.raw_seen.insert(record.id.clone());
        }
        self.total_raw = page.total_raw_count;

        let admitted = self.dedup.admit(&page.records);
        let NormalizedBatch { messages, skipped } = normalize_batch(&admitted.kept, &self.ctx);
        let admitted_count = messages.len();
        self.messages.extend(messages);
        self.skipped.extend(skipped.iter().cloned());

        let estimate = self.estimate();
        debug!(
            fetched = page.records.len(),
            admitted = admitted_count,
            duplicates = admitted.duplicates,
            skipped = skipped.len(),
            remaining = estimate.remaining,
            "Ingested page"
        );

        PageReport {
            fetched: page.records.len(),
            admitted: admitted_count,
            duplicates: admitted.duplicates,
            skipped,
            estimate,
        }
    }

    /// Fetch and ingest pages from `source` until it reports no more.
    pub fn load_all(
        &mut self,
        source: &dyn RecordSource,
        first: PageRequest,
    ) -> Result<Vec<PageReport>> {
        let mut reports = Vec::new();
        let mut request = Some(first);
        while let Some(current) = request {
            let page = source.fetch(&current)?;
            reports.push(self.ingest(&page));
            request = current.next(&page);
        }
        info!(
            pages = reports.len(),
            messages = self.messages.len(),
            "Conversation loaded"
        );
        Ok(reports)
    }

    /// Number of cards the current messages produce.
    fn card_count(&self) -> usize {
        match self.options.segment {
            Some(_) => self.messages.iter().map(|m| 1 + m.quoted_blocks.len()).sum(),
            None => self.messages.len(),
        }
    }

    pub fn estimate(&self) -> CompletenessEstimate {
        estimate_with(
            &self.options.estimator,
            self.total_raw,
            self.card_count(),
            self.raw_seen.len(),
        )
    }

    /// All loaded cards in the configured order.
    pub fn cards(&self) -> Vec<MessageCard> {
        build_cards(
            &self.messages,
            &self.ctx,
            self.options.segment.as_ref(),
            self.options.order,
        )
    }

    pub fn messages(&self) -> &[NormalizedMessage] {
        &self.messages
    }

    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn context(&self) -> &NormalizationContext {
        &self.ctx
    }
}
