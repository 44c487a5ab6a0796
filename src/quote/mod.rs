//! Quote boundary detection.
//!
//! A body is scanned by an ordered list of independent strategies, each
//! recognizing one client convention. The first strategy that finds a usable
//! boundary wins; its further cut points split the quoted remainder into
//! several [`QuotedBlock`]s of the same kind.
//!
//! Strategies only propose cut positions. This module turns them into a
//! visible body and verbatim blocks, and rejects cuts that would leave no
//! fresh content in front of the quote.

pub mod angle;
pub mod attribution;
pub mod html;
pub mod separator;

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::message::{QuoteKind, QuotedBlock};
use crate::model::record::ContentType;
use crate::parser::html::{decode_entities, has_visible_text, TextView};

/// A strategy recognizing one quoting convention.
pub trait QuoteDetector: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Kind assigned to every block this strategy produces.
    fn kind(&self) -> QuoteKind;

    /// Candidate cut positions as byte offsets into `view.source()`, in body
    /// order. The first one is the quote boundary.
    fn detect(&self, view: &TextView<'_>) -> Vec<usize>;
}

/// Result of splitting one body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSplit {
    pub visible_body: String,
    pub quoted_blocks: Vec<QuotedBlock>,
}

impl QuoteSplit {
    /// The whole (trimmed) body is visible.
    pub fn unquoted(body: &str) -> Self {
        Self {
            visible_body: body.trim().to_string(),
            quoted_blocks: Vec::new(),
        }
    }
}

/// Ordered set of strategies.
pub struct QuoteDetectorSet {
    detectors: Vec<Box<dyn QuoteDetector>>,
}

impl QuoteDetectorSet {
    /// An empty set; every body comes back unquoted.
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// The built-in strategies in priority order: HTML containers,
    /// attribution lines, separator/header blocks, leading `>` lines.
    pub fn standard() -> Self {
        Self::empty()
            .with(html::GmailContainerDetector)
            .with(html::OutlookContainerDetector)
            .with(attribution::AttributionDetector)
            .with(separator::SeparatorDetector)
            .with(angle::AngleBracketDetector)
    }

    /// Append a strategy with the lowest priority.
    pub fn with(mut self, detector: impl QuoteDetector + 'static) -> Self {
        self.push(detector);
        self
    }

    pub fn push(&mut self, detector: impl QuoteDetector + 'static) {
        self.detectors.push(Box::new(detector));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Split `body` into visible content and quoted blocks.
    ///
    /// Never fails: a body nothing recognizes (or that is too malformed to
    /// scan) is returned whole as the visible body.
    pub fn split(&self, body: &str, content_type: ContentType) -> QuoteSplit {
        let view = match content_type {
            ContentType::Html => TextView::html(body),
            ContentType::Text => TextView::plain(body),
        };

        for detector in &self.detectors {
            let cuts = detector.detect(&view);
            if cuts.is_empty() {
                continue;
            }
            if let Some(split) = build_split(&view, cuts, detector.kind()) {
                debug!(
                    detector = detector.name(),
                    blocks = split.quoted_blocks.len(),
                    "Quote boundary found"
                );
                return split;
            }
        }

        QuoteSplit::unquoted(body)
    }
}

impl Default for QuoteDetectorSet {
    fn default() -> Self {
        Self::standard()
    }
}

static STANDARD: LazyLock<QuoteDetectorSet> = LazyLock::new(QuoteDetectorSet::standard);

/// Split a body with the standard strategies.
pub fn find_quote_boundary(body: &str, content_type: ContentType) -> QuoteSplit {
    STANDARD.split(body, content_type)
}

/// Turn proposed cuts into a split, or `None` if no cut is usable.
fn build_split(view: &TextView<'_>, mut cuts: Vec<usize>, kind: QuoteKind) -> Option<QuoteSplit> {
    let source = view.source();
    cuts.sort_unstable();
    cuts.dedup();
    cuts.retain(|&c| c > 0 && c < source.len() && source.is_char_boundary(c));

    // The boundary must leave fresh content in front of it.
    let first_usable = cuts
        .iter()
        .position(|&c| has_content(&source[..c], view.is_html()))?;
    let cuts = &cuts[first_usable..];

    let mut bounds = cuts.to_vec();
    bounds.push(source.len());
    let quoted_blocks: Vec<QuotedBlock> = bounds
        .windows(2)
        .map(|w| source[w[0]..w[1]].trim())
        .filter(|text| !text.is_empty())
        .map(|text| QuotedBlock {
            kind,
            text: text.to_string(),
        })
        .collect();

    if quoted_blocks.is_empty() {
        return None;
    }

    Some(QuoteSplit {
        visible_body: source[..cuts[0]].trim().to_string(),
        quoted_blocks,
    })
}

fn has_content(prefix: &str, is_html: bool) -> bool {
    if is_html {
        has_visible_text(prefix)
    } else {
        prefix.chars().any(|c| !c.is_whitespace())
    }
}

static MAILTO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[<\[]mailto:[^>\]]*[>\]]").expect("valid regex"));

/// Normalize one line for pattern matching only: decode leftover HTML
/// entities (plain-text bodies pasted from HTML keep `&lt;addr&gt;`), drop
/// Outlook `<mailto:…>` link residue, turn non-breaking spaces into spaces,
/// collapse runs of whitespace and trim. Never used for emitted text.
pub(crate) fn normalize_for_match(line: &str) -> String {
    let decoded = if line.contains('&') {
        Cow::Owned(decode_entities(line))
    } else {
        Cow::Borrowed(line)
    };
    let without_links = MAILTO.replace_all(&decoded, "");
    without_links
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip leading `>` quote markers (with interleaved spaces). Returns the
/// remainder and the quote depth.
pub(crate) fn strip_quote_prefix(line: &str) -> (&str, usize) {
    let mut rest = line.trim_start();
    let mut depth = 0;
    while let Some(stripped) = rest.strip_prefix('>') {
        depth += 1;
        rest = stripped.trim_start();
    }
    (rest, depth)
}
