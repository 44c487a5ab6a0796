//! Client HTML quote containers (Gmail, Outlook).
//!
//! Both detectors cut the original markup at the opening tag of the
//! container, so a captured block keeps its own wrapper.

use std::sync::LazyLock;

use regex::Regex;

use super::QuoteDetector;
use crate::model::message::QuoteKind;
use crate::parser::html::{has_visible_text, TextView};

static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(div|blockquote|hr)\b([^>]*)>").expect("valid regex"));

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex")
});

/// One opening tag of interest.
struct OpenTag<'a> {
    start: usize,
    name: String,
    attrs: &'a str,
}

impl OpenTag<'_> {
    fn attr(&self, wanted: &str) -> Option<&str> {
        ATTR.captures_iter(self.attrs).find_map(|caps| {
            let name = caps.get(1)?.as_str();
            if !name.eq_ignore_ascii_case(wanted) {
                return None;
            }
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
        })
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|v| v.split_whitespace().any(|c| c.eq_ignore_ascii_case(class)))
    }

    fn id_is(&self, id: &str) -> bool {
        self.attr("id").is_some_and(|v| v.trim().eq_ignore_ascii_case(id))
    }
}

fn open_tags(source: &str) -> impl Iterator<Item = OpenTag<'_>> {
    OPEN_TAG.captures_iter(source).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(OpenTag {
            start: whole.start(),
            name: caps.get(1)?.as_str().to_ascii_lowercase(),
            attrs: caps.get(2).map_or("", |m| m.as_str()),
        })
    })
}

/// Drop markers that follow the previous kept marker with no visible text in
/// between; they belong to the same quote.
fn collapse_adjacent(source: &str, markers: Vec<usize>) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::with_capacity(markers.len());
    for marker in markers {
        match kept.last() {
            Some(&prev) if !has_visible_text(&source[prev..marker]) => {}
            _ => kept.push(marker),
        }
    }
    kept
}

/// `<div class="gmail_quote">` wrappers. Falls back to
/// `<blockquote class="gmail_quote">` when no wrapper div is present.
pub struct GmailContainerDetector;

impl QuoteDetector for GmailContainerDetector {
    fn name(&self) -> &'static str {
        "gmail-container"
    }

    fn kind(&self) -> QuoteKind {
        QuoteKind::HtmlGmailContainer
    }

    fn detect(&self, view: &TextView<'_>) -> Vec<usize> {
        if !view.is_html() {
            return Vec::new();
        }
        let source = view.source();
        let mut divs = Vec::new();
        let mut blockquotes = Vec::new();
        for tag in open_tags(source) {
            let marked = tag.has_class("gmail_quote") || tag.has_class("gmail_quote_container");
            match tag.name.as_str() {
                "div" if marked => divs.push(tag.start),
                "blockquote" if tag.has_class("gmail_quote") => blockquotes.push(tag.start),
                _ => {}
            }
        }
        let markers = if divs.is_empty() { blockquotes } else { divs };
        collapse_adjacent(source, markers)
    }
}

/// Outlook reply headers: `divRplyFwdMsg`/`appendonsend` anchors, the
/// border-top header div, and the `<hr tabindex="-1">` separator used by
/// Outlook on the web.
pub struct OutlookContainerDetector;

impl OutlookContainerDetector {
    fn is_marker(tag: &OpenTag<'_>) -> bool {
        match tag.name.as_str() {
            "div" => {
                tag.id_is("divRplyFwdMsg")
                    || tag.id_is("appendonsend")
                    || tag.has_class("OutlookMessageHeader")
                    || tag.attr("style").is_some_and(|style| {
                        let compact: String = style
                            .chars()
                            .filter(|c| !c.is_whitespace())
                            .collect::<String>()
                            .to_ascii_lowercase();
                        compact.contains("border-top:solid")
                    })
            }
            "hr" => tag.id_is("stopSpelling") || tag.attr("tabindex").is_some_and(|v| v.trim() == "-1"),
            _ => false,
        }
    }
}

impl QuoteDetector for OutlookContainerDetector {
    fn name(&self) -> &'static str {
        "outlook-container"
    }

    fn kind(&self) -> QuoteKind {
        QuoteKind::HtmlOutlookBordered
    }

    fn detect(&self, view: &TextView<'_>) -> Vec<usize> {
        if !view.is_html() {
            return Vec::new();
        }
        let source = view.source();
        let markers = open_tags(source)
            .filter(Self::is_marker)
            .map(|tag| tag.start)
            .collect();
        collapse_adjacent(source, markers)
    }
}
